/// Errors produced by the Discord adapter.
#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error("serenity error: {0}")]
    Serenity(#[from] serenity::Error),

    #[error("bad event action payload: {0}")]
    Action(#[from] vesta_core::VestaError),

    #[error("scheduler error: {0}")]
    Scheduler(#[from] vesta_scheduler::SchedulerError),

    #[error("timestamp out of range for Discord")]
    Timestamp,
}
