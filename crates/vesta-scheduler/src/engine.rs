//! Trigger engine — fires date and interval triggers at ±1 s precision.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::types::Job;

/// Guild → user → jobs, insertion-ordered per user.
pub(crate) type GuildIndex = BTreeMap<String, BTreeMap<String, Vec<Job>>>;

/// When a trigger fires.
#[derive(Debug, Clone, Copy)]
pub enum TriggerKind {
    /// Fire once at an absolute instant, then disappear.
    Date { run_at: DateTime<Utc> },
    /// Fire repeatedly on a grid of `every`-spaced slots counted from
    /// `anchor`. `next_run` is the next armed slot.
    Interval {
        anchor: DateTime<Utc>,
        every: Duration,
        next_run: DateTime<Utc>,
    },
}

/// An armed trigger: identity, firing rule and the opaque action payload
/// forwarded verbatim when it fires.
#[derive(Debug, Clone)]
pub struct Trigger {
    pub id: String,
    pub kind: TriggerKind,
    pub action: String,
}

impl Trigger {
    fn due_at(&self) -> DateTime<Utc> {
        match &self.kind {
            TriggerKind::Date { run_at } => *run_at,
            TriggerKind::Interval { next_run, .. } => *next_run,
        }
    }
}

/// A due trigger, forwarded to the delivery task.
#[derive(Debug, Clone)]
pub struct FiredJob {
    pub id: String,
    pub action: String,
}

/// The one piece of mutable scheduler state: the engine's trigger table and
/// the registry's job index, behind a single mutex so "engine knows trigger
/// X" and "index knows job X" always change together.
#[derive(Debug, Default)]
pub struct SchedulerState {
    pub(crate) triggers: HashMap<String, Trigger>,
    pub(crate) index: GuildIndex,
}

impl SchedulerState {
    pub fn shared() -> Arc<Mutex<SchedulerState>> {
        Arc::new(Mutex::new(SchedulerState::default()))
    }
}

/// Polls the trigger table every second and forwards due triggers to the
/// fired-job channel. Interval triggers are re-armed on their grid; date
/// triggers are removed after their single firing.
pub struct TriggerEngine {
    state: Arc<Mutex<SchedulerState>>,
    fired_tx: mpsc::Sender<FiredJob>,
}

impl TriggerEngine {
    pub fn new(state: Arc<Mutex<SchedulerState>>, fired_tx: mpsc::Sender<FiredJob>) -> Self {
        Self { state, fired_tx }
    }

    /// Main event loop. Ticks every second until `shutdown` broadcasts `true`.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!("trigger engine started");

        let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.tick(Utc::now());
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("trigger engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Fire everything due at `now`. Split from `run` so the firing logic is
    /// testable without the tick loop.
    fn tick(&self, now: DateTime<Utc>) {
        // Mutate the table under the lock, forward fired jobs after
        // releasing it.
        let fired: Vec<FiredJob> = {
            let mut state = self.state.lock().unwrap();

            let due_ids: Vec<String> = state
                .triggers
                .values()
                .filter(|t| t.due_at() <= now)
                .map(|t| t.id.clone())
                .collect();

            let mut fired = Vec::with_capacity(due_ids.len());
            for id in due_ids {
                let (kind, action) = match state.triggers.get(&id) {
                    Some(t) => (t.kind, t.action.clone()),
                    None => continue,
                };
                fired.push(FiredJob {
                    id: id.clone(),
                    action,
                });

                match kind {
                    TriggerKind::Date { .. } => {
                        // One-shot: not re-armed.
                        state.triggers.remove(&id);
                        info!(job_id = %id, "date trigger fired and removed");
                    }
                    TriggerKind::Interval {
                        anchor,
                        every,
                        next_run,
                    } => {
                        let next = next_grid_slot(anchor, every, now);
                        let skipped = slots_between(next_run, next, every);
                        if skipped > 1 {
                            warn!(job_id = %id, skipped, "interval trigger skipped past windows");
                        }
                        if let Some(t) = state.triggers.get_mut(&id) {
                            t.kind = TriggerKind::Interval {
                                anchor,
                                every,
                                next_run: next,
                            };
                        }
                        info!(job_id = %id, next_run = %next, "interval trigger fired and re-armed");
                    }
                }
            }
            fired
        };

        for job in fired {
            // try_send never blocks the tick loop.
            if let Err(e) = self.fired_tx.try_send(job) {
                error!("fired-job channel full or closed — job dropped: {e}");
            }
        }
    }
}

/// First slot on the `anchor + k * every` grid strictly after `now`.
fn next_grid_slot(anchor: DateTime<Utc>, every: Duration, now: DateTime<Utc>) -> DateTime<Utc> {
    let period = every.num_seconds().max(1);
    let elapsed = (now - anchor).num_seconds();
    let k = if elapsed < 0 { 1 } else { elapsed / period + 1 };
    anchor + Duration::seconds(k * period)
}

fn slots_between(from: DateTime<Utc>, to: DateTime<Utc>, every: Duration) -> i64 {
    let period = every.num_seconds().max(1);
    ((to - from).num_seconds() / period).max(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine_with(
        triggers: Vec<Trigger>,
    ) -> (TriggerEngine, Arc<Mutex<SchedulerState>>, mpsc::Receiver<FiredJob>) {
        let state = SchedulerState::shared();
        {
            let mut s = state.lock().unwrap();
            for t in triggers {
                s.triggers.insert(t.id.clone(), t);
            }
        }
        let (tx, rx) = mpsc::channel(8);
        (TriggerEngine::new(Arc::clone(&state), tx), state, rx)
    }

    fn utc(s: &str) -> DateTime<Utc> {
        format!("{s}:00Z").parse().unwrap()
    }

    #[tokio::test]
    async fn due_date_trigger_fires_once_and_leaves_the_table() {
        let run_at = utc("2024-03-15T10:00");
        let (engine, state, mut rx) = engine_with(vec![Trigger {
            id: "1_2_3".to_string(),
            kind: TriggerKind::Date { run_at },
            action: "{}".to_string(),
        }]);

        engine.tick(run_at);
        let fired = rx.try_recv().unwrap();
        assert_eq!(fired.id, "1_2_3");
        assert!(state.lock().unwrap().triggers.is_empty());

        // A later tick finds nothing.
        engine.tick(run_at + Duration::hours(1));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn future_date_trigger_is_left_alone() {
        let now = utc("2024-03-15T10:00");
        let (engine, state, mut rx) = engine_with(vec![Trigger {
            id: "1_2_3".to_string(),
            kind: TriggerKind::Date {
                run_at: now + Duration::minutes(5),
            },
            action: "{}".to_string(),
        }]);

        engine.tick(now);
        assert!(rx.try_recv().is_err());
        assert_eq!(state.lock().unwrap().triggers.len(), 1);
    }

    #[tokio::test]
    async fn interval_trigger_rearms_strictly_in_the_future() {
        let anchor = utc("2024-03-01T17:00");
        let every = Duration::days(1);
        let now = utc("2024-03-15T17:00");
        let (engine, state, mut rx) = engine_with(vec![Trigger {
            id: "1_2_3".to_string(),
            kind: TriggerKind::Interval {
                anchor,
                every,
                next_run: now,
            },
            action: "{}".to_string(),
        }]);

        engine.tick(now);
        assert_eq!(rx.try_recv().unwrap().id, "1_2_3");

        let state = state.lock().unwrap();
        let trigger = state.triggers.get("1_2_3").unwrap();
        match trigger.kind {
            TriggerKind::Interval { next_run, .. } => {
                assert_eq!(next_run, utc("2024-03-16T17:00"));
            }
            _ => panic!("expected interval trigger"),
        }
    }

    #[test]
    fn grid_slot_skips_missed_windows() {
        let anchor = utc("2024-03-01T17:00");
        // Ten days late: the next slot is tomorrow relative to now, still on
        // the 17:00 grid.
        let next = next_grid_slot(anchor, Duration::days(1), utc("2024-03-11T20:00"));
        assert_eq!(next, utc("2024-03-12T17:00"));
    }

    #[test]
    fn grid_slot_before_anchor_is_first_repeat() {
        let anchor = utc("2024-03-10T17:00");
        let next = next_grid_slot(anchor, Duration::weeks(1), utc("2024-03-08T12:00"));
        assert_eq!(next, utc("2024-03-17T17:00"));
    }
}
