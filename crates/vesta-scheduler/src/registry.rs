//! Job registry — management surface over the trigger table plus the
//! guild → user → jobs index used for permission-scoped listing.
//!
//! Only this module mutates the index. One-off jobs are *not* indexed: their
//! date trigger disappears from the engine after the single firing, so there
//! is nothing to list or cancel. Recurring jobs get an index record whose
//! lifetime matches their interval trigger exactly — both live behind the
//! same mutex and change in the same critical section.
//!
//! Duplicate-ID policy: `register_oneoff` rejects an ID that already has an
//! active trigger; `register_recurring` replaces both the trigger and the
//! index record, so re-registration is idempotent and the two tables can
//! never disagree.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::engine::{SchedulerState, Trigger, TriggerKind};
use crate::error::{Result, SchedulerError};
use crate::types::{Job, JobKey};

pub struct Registry {
    state: Arc<Mutex<SchedulerState>>,
}

impl Registry {
    pub fn new(state: Arc<Mutex<SchedulerState>>) -> Self {
        Self { state }
    }

    /// Arm a date trigger that fires `action` once at `run_at` (clamped to be
    /// no earlier than now, so a past request fires immediately instead of
    /// being rejected by the engine). Does not touch the index.
    pub fn register_oneoff(
        &self,
        job_id: &str,
        run_at: DateTime<Utc>,
        action: String,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.triggers.contains_key(job_id) {
            return Err(SchedulerError::TriggerConflict {
                id: job_id.to_string(),
            });
        }
        let run_at = run_at.max(Utc::now());
        state.triggers.insert(
            job_id.to_string(),
            Trigger {
                id: job_id.to_string(),
                kind: TriggerKind::Date { run_at },
                action,
            },
        );
        info!(job_id, run_at = %run_at, "one-off job registered");
        Ok(())
    }

    /// Arm an interval trigger for `job` and append it to the owner's index
    /// sequence. The trigger repeats with the period of `job.frequency` on a
    /// grid counted from `start_anchor`; the first firing happens at
    /// `first_run_at` (clamped to be no earlier than now).
    ///
    /// Re-registering an existing ID replaces the previous trigger and index
    /// record.
    pub fn register_recurring(
        &self,
        job: Job,
        start_anchor: DateTime<Utc>,
        first_run_at: DateTime<Utc>,
        action: String,
    ) -> Result<()> {
        let every = job
            .frequency
            .period()
            .ok_or_else(|| SchedulerError::NotRecurring {
                frequency: job.frequency.to_string(),
            })?;
        let id = job.id();

        let mut state = self.state.lock().unwrap();
        if state.triggers.remove(&id).is_some() {
            info!(job_id = %id, "replacing existing trigger for re-registered job");
        }
        remove_from_index(&mut state, &job.key);

        let next_run = first_run_at.max(Utc::now());
        state.triggers.insert(
            id.clone(),
            Trigger {
                id: id.clone(),
                kind: TriggerKind::Interval {
                    anchor: start_anchor,
                    every,
                    next_run,
                },
                action,
            },
        );
        info!(
            job_id = %id,
            frequency = %job.frequency,
            next_run = %next_run,
            "recurring job registered"
        );

        state
            .index
            .entry(job.key.guild_id.clone())
            .or_default()
            .entry(job.key.user_id.clone())
            .or_default()
            .push(job);
        Ok(())
    }

    /// Every indexed job of a guild, flattened across users in map order.
    pub fn list_all(&self, guild_id: &str) -> Vec<Job> {
        let state = self.state.lock().unwrap();
        state
            .index
            .get(guild_id)
            .map(|users| users.values().flatten().cloned().collect())
            .unwrap_or_default()
    }

    /// One user's jobs in insertion order.
    pub fn list_for_user(&self, guild_id: &str, user_id: &str) -> Vec<Job> {
        let state = self.state.lock().unwrap();
        state
            .index
            .get(guild_id)
            .and_then(|users| users.get(user_id))
            .cloned()
            .unwrap_or_default()
    }

    /// Look a job up by its display ID. `None` for unknown or malformed IDs.
    pub fn get(&self, job_id: &str) -> Option<Job> {
        let key = JobKey::parse(job_id).ok()?;
        let state = self.state.lock().unwrap();
        state
            .index
            .get(&key.guild_id)
            .and_then(|users| users.get(&key.user_id))
            .and_then(|jobs| jobs.iter().find(|j| j.id() == job_id))
            .cloned()
    }

    /// Disarm the trigger and drop the index record. Index absence (e.g. a
    /// one-off ID) is a no-op; a missing trigger is an error.
    pub fn unregister(&self, job_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if state.triggers.remove(job_id).is_none() {
            return Err(SchedulerError::TriggerNotFound {
                id: job_id.to_string(),
            });
        }
        if let Ok(key) = JobKey::parse(job_id) {
            remove_from_index(&mut state, &key);
        }
        info!(job_id, "job unregistered");
        Ok(())
    }

    /// Next instant the engine will fire this ID, if it is armed.
    pub fn next_fire_time(&self, job_id: &str) -> Option<DateTime<Utc>> {
        let state = self.state.lock().unwrap();
        state.triggers.get(job_id).map(|t| match t.kind {
            TriggerKind::Date { run_at } => run_at,
            TriggerKind::Interval { next_run, .. } => next_run,
        })
    }
}

/// Remove the job with `key` from the index, pruning empty buckets.
fn remove_from_index(state: &mut SchedulerState, key: &JobKey) {
    let id = key.display();
    let Some(users) = state.index.get_mut(&key.guild_id) else {
        return;
    };
    if let Some(jobs) = users.get_mut(&key.user_id) {
        jobs.retain(|j| j.id() != id);
        if jobs.is_empty() {
            users.remove(&key.user_id);
        }
    }
    if users.is_empty() {
        state.index.remove(&key.guild_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Frequency;
    use chrono::Duration;

    fn registry() -> Registry {
        Registry::new(SchedulerState::shared())
    }

    fn job(guild: &str, user: &str, nonce: &str, name: &str) -> Job {
        Job::new(
            JobKey::new(guild, user, nonce),
            name,
            Frequency::Weekly,
            "alice",
        )
    }

    #[test]
    fn recurring_job_is_listed_once_at_the_end() {
        let reg = registry();
        let start = Utc::now() + Duration::hours(2);
        reg.register_recurring(job("g1", "u1", "a", "first"), start, start, "{}".into())
            .unwrap();
        reg.register_recurring(job("g1", "u1", "b", "second"), start, start, "{}".into())
            .unwrap();

        let listed = reg.list_for_user("g1", "u1");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[1].id(), "g1_u1_b");
        assert_eq!(listed[1].name, "second");
    }

    #[test]
    fn reregistering_same_id_does_not_duplicate() {
        let reg = registry();
        let start = Utc::now() + Duration::hours(2);
        reg.register_recurring(job("g1", "u1", "a", "old"), start, start, "{}".into())
            .unwrap();
        reg.register_recurring(job("g1", "u1", "a", "new"), start, start, "{}".into())
            .unwrap();

        let listed = reg.list_for_user("g1", "u1");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "new");
    }

    #[test]
    fn once_frequency_is_rejected_for_recurring_registration() {
        let reg = registry();
        let start = Utc::now();
        let once = Job::new(JobKey::new("g", "u", "n"), "x", Frequency::Once, "bob");
        assert!(matches!(
            reg.register_recurring(once, start, start, "{}".into()),
            Err(SchedulerError::NotRecurring { .. })
        ));
    }

    #[test]
    fn unregister_removes_from_engine_and_index() {
        let reg = registry();
        let start = Utc::now() + Duration::hours(2);
        reg.register_recurring(job("g1", "u1", "a", "x"), start, start, "{}".into())
            .unwrap();

        reg.unregister("g1_u1_a").unwrap();
        assert!(reg.get("g1_u1_a").is_none());
        assert!(reg.list_all("g1").is_empty());
        assert!(reg.next_fire_time("g1_u1_a").is_none());
    }

    #[test]
    fn unregister_unknown_id_is_not_found() {
        let reg = registry();
        assert!(matches!(
            reg.unregister("g1_u1_zzz"),
            Err(SchedulerError::TriggerNotFound { .. })
        ));
    }

    #[test]
    fn oneoff_is_not_indexed_but_is_armed() {
        let reg = registry();
        let run_at = Utc::now() + Duration::hours(1);
        reg.register_oneoff("g1_u1_a", run_at, "{}".into()).unwrap();

        assert!(reg.get("g1_u1_a").is_none());
        assert!(reg.list_all("g1").is_empty());
        assert_eq!(reg.next_fire_time("g1_u1_a"), Some(run_at));

        // Unregistering it disarms the trigger; the missing index record is
        // a no-op, not an error.
        reg.unregister("g1_u1_a").unwrap();
        assert!(reg.next_fire_time("g1_u1_a").is_none());
    }

    #[test]
    fn duplicate_oneoff_id_conflicts() {
        let reg = registry();
        let run_at = Utc::now() + Duration::hours(1);
        reg.register_oneoff("g1_u1_a", run_at, "{}".into()).unwrap();
        assert!(matches!(
            reg.register_oneoff("g1_u1_a", run_at, "{}".into()),
            Err(SchedulerError::TriggerConflict { .. })
        ));
    }

    #[test]
    fn past_run_time_is_clamped_to_now() {
        let reg = registry();
        let before = Utc::now();
        reg.register_oneoff("g1_u1_a", before - Duration::days(30), "{}".into())
            .unwrap();
        let armed = reg.next_fire_time("g1_u1_a").unwrap();
        assert!(armed >= before);
        assert!(armed <= Utc::now());
    }

    #[test]
    fn listing_unknown_guild_is_empty_not_an_error() {
        let reg = registry();
        assert!(reg.list_all("nope").is_empty());
        assert!(reg.list_for_user("nope", "u").is_empty());
    }

    #[test]
    fn list_all_flattens_across_users() {
        let reg = registry();
        let start = Utc::now() + Duration::hours(2);
        reg.register_recurring(job("g1", "u1", "a", "x"), start, start, "{}".into())
            .unwrap();
        reg.register_recurring(job("g1", "u2", "b", "y"), start, start, "{}".into())
            .unwrap();
        reg.register_recurring(job("g2", "u1", "c", "z"), start, start, "{}".into())
            .unwrap();

        let all = reg.list_all("g1");
        assert_eq!(all.len(), 2);
        // BTreeMap order: u1 before u2.
        assert_eq!(all[0].user_id(), "u1");
        assert_eq!(all[1].user_id(), "u2");
    }

    #[test]
    fn get_returns_none_for_malformed_id() {
        let reg = registry();
        assert!(reg.get("not-a-key").is_none());
    }
}
