use vesta_core::Clock;
use vesta_scheduler::Registry;

/// Everything the command and component handlers need: the job registry and
/// the configured-timezone clock. Built once at startup, shared via `Arc`.
pub struct EventApp {
    pub registry: Registry,
    pub clock: Clock,
}

impl EventApp {
    pub fn new(registry: Registry, clock: Clock) -> Self {
        Self { registry, clock }
    }
}
