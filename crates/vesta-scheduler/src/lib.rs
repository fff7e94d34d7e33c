//! `vesta-scheduler` — in-memory trigger engine and job registry.
//!
//! # Overview
//!
//! The [`engine::TriggerEngine`] polls its trigger table every second and
//! forwards every due trigger as a [`engine::FiredJob`] over an mpsc channel.
//! The [`registry::Registry`] is the management surface: it registers and
//! removes triggers and maintains a guild → user → jobs index so listing can
//! be permission-scoped without scanning the whole table. Both share one
//! mutex, so the trigger table and the index never disagree about a job.
//!
//! Nothing here is persisted — the whole job table lives and dies with the
//! process.
//!
//! # Trigger kinds
//!
//! | Kind       | Behaviour                                                |
//! |------------|----------------------------------------------------------|
//! | `Date`     | Single fire at an absolute instant, then removed         |
//! | `Interval` | Repeats every N days/weeks on a grid from its anchor     |

pub mod engine;
pub mod error;
pub mod recurrence;
pub mod registry;
pub mod types;

pub use engine::{FiredJob, TriggerEngine};
pub use error::{Result, SchedulerError};
pub use recurrence::next_occurrence;
pub use registry::Registry;
pub use types::{Frequency, Job, JobKey};
