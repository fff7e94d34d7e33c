//! Fired-job delivery — turns engine firings into created events.
//!
//! One background task per process, spawned once off the first serenity
//! client's `Arc<Http>`. Failures are logged per job and isolated: a job
//! whose creation call fails stays registered and the next firing is
//! attempted normally.

use tokio::sync::mpsc;
use tracing::{info, warn};

use vesta_core::action::{EventAction, Occurrence};
use vesta_core::Clock;
use vesta_scheduler::{next_occurrence, FiredJob};

use crate::create::EventCreator;
use crate::error::DiscordError;

/// Receive fired jobs until the channel closes.
pub async fn run_event_delivery(
    creator: EventCreator,
    clock: Clock,
    mut rx: mpsc::Receiver<FiredJob>,
) {
    while let Some(fired) = rx.recv().await {
        if let Err(e) = deliver(&creator, &clock, &fired).await {
            warn!(job_id = %fired.id, error = %e, "event creation failed");
        }
    }
    info!("event delivery task exiting (channel closed)");
}

async fn deliver(
    creator: &EventCreator,
    clock: &Clock,
    fired: &FiredJob,
) -> Result<(), DiscordError> {
    let action = EventAction::from_json(&fired.action)?;

    let (start, end) = match &action.occurrence {
        Occurrence::Single { start, end } => (*start, *end),
        Occurrence::Recurring {
            first_start,
            first_end,
            lead_hours,
        } => {
            // Re-anchor in the configured timezone so the time-of-day
            // overwrite respects local wall time.
            let tz = clock.timezone();
            let (start, end) = next_occurrence(
                first_start.with_timezone(&tz),
                first_end.as_ref().map(|e| e.with_timezone(&tz)),
                *lead_hours,
                clock.now(),
            );
            (start.fixed_offset(), end.map(|e| e.fixed_offset()))
        }
    };

    creator.create(&action, start, end).await
}
