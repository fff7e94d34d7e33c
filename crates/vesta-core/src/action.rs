//! Event-creation payload — shared between the scheduler engine and the
//! Discord delivery task.
//!
//! Serialized to a JSON string when a trigger is registered; parsed back by
//! the delivery task when the engine fires the job.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Where the scheduled event takes place. A command invocation must supply
/// exactly one of these.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventLocation {
    Stage { channel_id: u64 },
    Voice { channel_id: u64 },
    /// Free-form address for offline events. These always carry an end time.
    External { address: String },
}

/// When the created event should take place.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Occurrence {
    /// One concrete window, fixed at registration time.
    Single {
        start: DateTime<FixedOffset>,
        end: Option<DateTime<FixedOffset>>,
    },
    /// Recurring window re-anchored at every firing. `first_start`/`first_end`
    /// are the originally requested first occurrence; `lead_hours` is how far
    /// ahead of the event the job fires.
    Recurring {
        first_start: DateTime<FixedOffset>,
        first_end: Option<DateTime<FixedOffset>>,
        lead_hours: i64,
    },
}

/// Stored as the trigger's action string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventAction {
    pub guild_id: u64,
    pub event_name: String,
    pub location: EventLocation,
    pub occurrence: Occurrence,
}

impl EventAction {
    pub fn to_json(&self) -> crate::error::Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(raw: &str) -> crate::error::Result<Self> {
        Ok(serde_json::from_str(raw)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_json_round_trip() {
        let action = EventAction {
            guild_id: 42,
            event_name: "Movie night".to_string(),
            location: EventLocation::Voice { channel_id: 7 },
            occurrence: Occurrence::Recurring {
                first_start: "2024-01-01T18:00:00-03:00".parse().unwrap(),
                first_end: None,
                lead_hours: 1,
            },
        };
        let raw = action.to_json().unwrap();
        let parsed = EventAction::from_json(&raw).unwrap();
        assert_eq!(parsed.guild_id, 42);
        assert!(matches!(
            parsed.occurrence,
            Occurrence::Recurring { lead_hours: 1, .. }
        ));
    }

    #[test]
    fn bad_action_json_is_an_error() {
        assert!(EventAction::from_json("{not json").is_err());
    }
}
