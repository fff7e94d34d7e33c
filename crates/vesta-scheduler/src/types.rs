use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SchedulerError;

/// Separator used in the display form of a [`JobKey`]. Guild and user IDs
/// are Discord snowflakes (digits only), so they can never contain it.
const KEY_SEPARATOR: char = '_';

/// How often a job fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Once,
    Daily,
    Weekly,
}

impl Frequency {
    /// Period between firings for recurring frequencies.
    pub fn period(&self) -> Option<Duration> {
        match self {
            Frequency::Once => None,
            Frequency::Daily => Some(Duration::days(1)),
            Frequency::Weekly => Some(Duration::weeks(1)),
        }
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self, Frequency::Daily | Frequency::Weekly)
    }
}

impl std::fmt::Display for Frequency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Frequency::Once => "once",
            Frequency::Daily => "daily",
            Frequency::Weekly => "weekly",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for Frequency {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "once" => Ok(Frequency::Once),
            "daily" => Ok(Frequency::Daily),
            "weekly" => Ok(Frequency::Weekly),
            other => Err(format!("unknown frequency: {other}")),
        }
    }
}

/// Structured job identity. The display form `{guild}_{user}_{nonce}` is
/// what Discord components and the engine see; the structured form is what
/// the index is routed by, so lookup never re-parses strings it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobKey {
    pub guild_id: String,
    pub user_id: String,
    /// Uniquifier within (guild, user) — the originating interaction ID.
    pub nonce: String,
}

impl JobKey {
    pub fn new(
        guild_id: impl Into<String>,
        user_id: impl Into<String>,
        nonce: impl Into<String>,
    ) -> Self {
        Self {
            guild_id: guild_id.into(),
            user_id: user_id.into(),
            nonce: nonce.into(),
        }
    }

    /// Opaque display form, used as the engine trigger ID.
    pub fn display(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.guild_id,
            self.user_id,
            self.nonce,
            sep = KEY_SEPARATOR
        )
    }

    /// Recover the structure from a display ID. The nonce may itself contain
    /// the separator; guild and user IDs cannot.
    pub fn parse(id: &str) -> crate::error::Result<Self> {
        let mut parts = id.splitn(3, KEY_SEPARATOR);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(guild), Some(user), Some(nonce))
                if !guild.is_empty() && !user.is_empty() && !nonce.is_empty() =>
            {
                Ok(Self::new(guild, user, nonce))
            }
            _ => Err(SchedulerError::InvalidJobId { id: id.to_string() }),
        }
    }
}

/// A registered recurring job — the unit the index stores and the
/// cancellation UI lists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub key: JobKey,
    /// Friendly label, e.g. `Create event 'Movie night'`.
    pub name: String,
    pub frequency: Frequency,
    /// Display name of the requester.
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(key: JobKey, name: impl Into<String>, frequency: Frequency, username: impl Into<String>) -> Self {
        Self {
            key,
            name: name.into(),
            frequency,
            username: username.into(),
            created_at: Utc::now(),
        }
    }

    /// Opaque display ID — also the engine trigger ID.
    pub fn id(&self) -> String {
        self.key.display()
    }

    pub fn guild_id(&self) -> &str {
        &self.key.guild_id
    }

    pub fn user_id(&self) -> &str {
        &self.key.user_id
    }

    /// Descriptive line shown under the job in the cancellation UI.
    pub fn message(&self) -> String {
        format!("Frequency: {} -- User: {}", self.frequency, self.username)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_display_parse_round_trip() {
        let key = JobKey::new("1122", "3344", "5566");
        assert_eq!(key.display(), "1122_3344_5566");
        assert_eq!(JobKey::parse("1122_3344_5566").unwrap(), key);
    }

    #[test]
    fn nonce_may_contain_separator() {
        let key = JobKey::parse("g1_u1_abc_def").unwrap();
        assert_eq!(key.guild_id, "g1");
        assert_eq!(key.user_id, "u1");
        assert_eq!(key.nonce, "abc_def");
    }

    #[test]
    fn malformed_ids_are_rejected() {
        assert!(JobKey::parse("").is_err());
        assert!(JobKey::parse("only_two").is_err());
        assert!(JobKey::parse("__x").is_err());
    }

    #[test]
    fn frequency_periods() {
        assert_eq!(Frequency::Once.period(), None);
        assert_eq!(Frequency::Daily.period(), Some(Duration::days(1)));
        assert_eq!(Frequency::Weekly.period(), Some(Duration::weeks(1)));
        assert!(!Frequency::Once.is_recurring());
        assert!(Frequency::Weekly.is_recurring());
    }

    #[test]
    fn job_message_names_frequency_and_requester() {
        let job = Job::new(
            JobKey::new("1", "2", "3"),
            "Create event 'Movie night'",
            Frequency::Weekly,
            "alice",
        );
        assert_eq!(job.message(), "Frequency: weekly -- User: alice");
        assert_eq!(job.id(), "1_2_3");
    }
}
