//! Next-occurrence math for recurring jobs.
//!
//! A recurring job stores the *first* occurrence the user asked for. Every
//! firing after that first occurrence has to be re-anchored to a concrete
//! window near "now" while keeping the requested time-of-day and duration.

use chrono::{DateTime, Duration, TimeZone, Timelike};

/// Compute the concrete `(start, end)` window for the current firing of a
/// recurring job.
///
/// Before the first occurrence the requested window is returned unchanged.
/// Afterwards the start is `now + lead_hours` with its time-of-day overwritten
/// by `first_start`'s; the end keeps the original duration. When the
/// time-of-day overwrite lands more than a minute before `now` the window
/// moves one day forward. The sub-minute tolerance absorbs firing jitter: a
/// zero-lead job fires a moment after its nominal slot, and that slot is
/// still the occurrence being created, not yesterday's.
///
/// Deterministic: the same inputs always produce the same window.
pub fn next_occurrence<Tz: TimeZone>(
    first_start: DateTime<Tz>,
    first_end: Option<DateTime<Tz>>,
    lead_hours: i64,
    now: DateTime<Tz>,
) -> (DateTime<Tz>, Option<DateTime<Tz>>) {
    if now < first_start {
        return (first_start, first_end);
    }

    let duration = first_end
        .as_ref()
        .map(|end| end.clone() - first_start.clone());

    let candidate = now.clone() + Duration::hours(lead_hours);
    let start = candidate
        .clone()
        .with_hour(first_start.hour())
        .and_then(|c| c.with_minute(first_start.minute()))
        .and_then(|c| c.with_second(first_start.second()))
        .and_then(|c| c.with_nanosecond(0))
        // The requested time-of-day does not exist on candidate's date in
        // this timezone (DST gap) — keep the candidate instant.
        .unwrap_or(candidate);

    let start = if start.clone() + Duration::minutes(1) < now {
        start + Duration::days(1)
    } else {
        start
    };

    let end = duration.map(|d| start.clone() + d);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn utc(s: &str) -> DateTime<Utc> {
        format!("{s}:00Z").parse().unwrap()
    }

    #[test]
    fn before_first_occurrence_window_is_unchanged() {
        let start = utc("2024-01-01T18:00");
        let end = utc("2024-01-01T20:00");
        let now = utc("2023-12-25T09:00");
        let (s, e) = next_occurrence(start, Some(end), 1, now);
        assert_eq!(s, start);
        assert_eq!(e, Some(end));
    }

    #[test]
    fn reanchors_to_current_date_preserving_time_and_duration() {
        // Weekly job first scheduled for New Year, fired months later.
        let (s, e) = next_occurrence(
            utc("2024-01-01T18:00"),
            Some(utc("2024-01-01T20:00")),
            1,
            utc("2024-03-15T09:00"),
        );
        assert_eq!(s, utc("2024-03-15T18:00"));
        assert_eq!(e, Some(utc("2024-03-15T20:00")));
    }

    #[test]
    fn open_ended_window_stays_open_ended() {
        let (s, e) = next_occurrence(utc("2024-01-01T18:00"), None, 2, utc("2024-02-02T10:00"));
        assert_eq!(s, utc("2024-02-02T18:00"));
        assert_eq!(e, None);
    }

    #[test]
    fn never_moves_backward_from_now() {
        // now is already past today's time-of-day slot once the lead is added.
        let now = utc("2024-03-15T18:30");
        let (s, _) = next_occurrence(utc("2024-01-01T18:00"), None, 1, now);
        assert!(s >= now);
        assert_eq!(s, utc("2024-03-16T18:00"));
    }

    #[test]
    fn zero_lead_firing_keeps_the_fired_slot() {
        // A zero-lead job fires at its slot plus tick jitter; the window must
        // stay on the fired slot's date instead of bumping a day ahead.
        let slot = utc("2024-03-18T18:00");
        let now = slot + Duration::milliseconds(400);
        let (s, e) = next_occurrence(
            utc("2024-01-01T18:00"),
            Some(utc("2024-01-01T20:00")),
            0,
            now,
        );
        assert_eq!(s, slot);
        assert_eq!(e, Some(utc("2024-03-18T20:00")));
    }

    #[test]
    fn repeated_calls_with_same_now_agree() {
        let first = utc("2024-01-01T18:00");
        let now = utc("2024-06-01T12:00");
        let a = next_occurrence(first, Some(utc("2024-01-01T19:30")), 3, now);
        let b = next_occurrence(first, Some(utc("2024-01-01T19:30")), 3, now);
        assert_eq!(a, b);
    }

    #[test]
    fn exactly_at_first_start_counts_as_recurred() {
        let first = utc("2024-01-01T18:00");
        let (s, _) = next_occurrence(first, None, 0, first);
        assert_eq!(s, first);
    }
}
