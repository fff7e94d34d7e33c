//! Timezone-aware time source and user-input date parsing.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

use crate::error::{Result, VestaError};

/// Accepted input format for slash command date arguments.
const DATE_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Supplies "now" and parses user-supplied dates, always in the configured
/// timezone. Constructed once at startup from the config's timezone name.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    tz: Tz,
}

impl Clock {
    /// Build a clock for an IANA timezone name.
    pub fn new(timezone: &str) -> Result<Self> {
        let tz: Tz = timezone
            .parse()
            .map_err(|_| VestaError::Config(format!("unknown timezone '{timezone}'")))?;
        Ok(Self { tz })
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// Current time in the configured timezone.
    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    /// Parse a `YYYY-MM-DD HH:mm` string as a local time in the configured
    /// timezone. Ambiguous local times (DST fold) resolve to the earlier
    /// instant; nonexistent local times are rejected.
    pub fn parse(&self, input: &str) -> Result<DateTime<Tz>> {
        let naive = NaiveDateTime::parse_from_str(input.trim(), DATE_FORMAT)
            .map_err(|_| VestaError::InvalidDate {
                input: input.to_string(),
            })?;
        self.tz
            .from_local_datetime(&naive)
            .earliest()
            .ok_or_else(|| VestaError::InvalidDate {
                input: input.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[test]
    fn parses_well_formed_date() {
        let clock = Clock::new("America/Buenos_Aires").unwrap();
        let dt = clock.parse("2024-03-15 18:30").unwrap();
        assert_eq!(dt.hour(), 18);
        assert_eq!(dt.minute(), 30);
        // Buenos Aires is UTC-3 year round.
        assert_eq!(dt.with_timezone(&Utc).hour(), 21);
    }

    #[test]
    fn rejects_malformed_date() {
        let clock = Clock::new("UTC").unwrap();
        assert!(matches!(
            clock.parse("next tuesday"),
            Err(VestaError::InvalidDate { .. })
        ));
        assert!(clock.parse("2024-13-01 10:00").is_err());
    }

    #[test]
    fn rejects_unknown_timezone() {
        assert!(matches!(
            Clock::new("Mars/Olympus_Mons"),
            Err(VestaError::Config(_))
        ));
    }
}
