//! Due-date urgency.
//!
//! Two regimes:
//!
//! - **pending** (deadline strictly after now):
//!   `urgency = (1 / (days + hours / 24)) * 10`, where `days` and `hours`
//!   are the floored whole days and remaining whole hours until the
//!   deadline. Decreases as the deadline moves further away.
//! - **overdue** (deadline at or before now):
//!   `urgency = 10 * (1 + ln(days_overdue + 1))` with `days_overdue`
//!   capped at [`OVERDUE_CAP_DAYS`]. Grows logarithmically, flat past the cap.
//!
//! A missing or unparseable due date scores 0.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime};

/// Overdue days beyond this no longer raise urgency.
pub const OVERDUE_CAP_DAYS: f64 = 30.0;

/// Smallest pending distance, in days, used as the formula's denominator.
///
/// A deadline less than one hour away would otherwise floor to a zero
/// denominator. Clamping to one hour bounds pending urgency at 240.
pub const MIN_PENDING_DAYS: f64 = 1.0 / 24.0;

const MS_PER_HOUR: f64 = 3_600_000.0;
const MS_PER_DAY: f64 = 86_400_000.0;

/// Urgency of a stored due date relative to `as_of`, in calendar days.
///
/// Both instants are aligned to the start of their day first, so a task
/// due today is treated as zero days overdue.
pub fn urgency(due_date: Option<&str>, as_of: NaiveDateTime) -> f64 {
    let Some(deadline) = due_date.and_then(parse_due_date) else {
        return 0.0;
    };
    urgency_between(start_of_day(deadline), start_of_day(as_of))
}

/// Urgency between two exact instants, without day alignment.
pub fn urgency_between(deadline: NaiveDateTime, now: NaiveDateTime) -> f64 {
    let diff_ms = deadline.signed_duration_since(now).num_milliseconds() as f64;

    if diff_ms > 0.0 {
        let total_hours = diff_ms / MS_PER_HOUR;
        let days = (total_hours / 24.0).floor();
        let hours = (total_hours % 24.0).floor();
        let remaining = (days + hours / 24.0).max(MIN_PENDING_DAYS);
        return (1.0 / remaining) * 10.0;
    }

    let days_overdue = (diff_ms / MS_PER_DAY).floor().abs().min(OVERDUE_CAP_DAYS);
    10.0 * (1.0 + (days_overdue + 1.0).ln())
}

/// Parse a stored due date.
///
/// Accepts RFC 3339 timestamps (converted to local time), naive
/// `YYYY-MM-DDTHH:MM[:SS[.fff]]` timestamps, and `YYYY-MM-DD` dates.
pub fn parse_due_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| date.and_time(NaiveTime::MIN))
}

fn start_of_day(instant: NaiveDateTime) -> NaiveDateTime {
    instant.date().and_time(NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn at(date: &str) -> NaiveDateTime {
        parse_due_date(date).expect("valid test date")
    }

    fn day_offset(base: &str, days: i64) -> String {
        (at(base).date() + Duration::days(days)).format("%Y-%m-%d").to_string()
    }

    #[test]
    fn five_days_out_is_two() {
        let now = at("2025-01-10T09:30:00");
        let urgency = urgency(Some("2025-01-15"), now);
        assert_eq!(urgency, 2.0);
    }

    #[test]
    fn five_days_overdue() {
        let now = at("2025-01-10T09:30:00");
        let urgency = urgency(Some("2025-01-05"), now);
        let expected = 10.0 * (1.0 + 6.0_f64.ln());
        assert_eq!(urgency, expected);
        assert!((urgency - 27.92).abs() < 0.01);
    }

    #[test]
    fn overdue_is_capped_at_thirty_days() {
        let now = at("2025-03-01");
        let forty = urgency(Some(&day_offset("2025-03-01", -40)), now);
        let thirty = urgency(Some(&day_offset("2025-03-01", -30)), now);
        assert_eq!(forty, thirty);
        assert!((forty - 44.34).abs() < 0.01);
    }

    #[test]
    fn due_today_is_zero_days_overdue() {
        let now = at("2025-01-10T23:59:00");
        assert_eq!(urgency(Some("2025-01-10"), now), 10.0);
    }

    #[test]
    fn missing_or_malformed_dates_score_zero() {
        let now = at("2025-01-10");
        assert_eq!(urgency(None, now), 0.0);
        assert_eq!(urgency(Some(""), now), 0.0);
        assert_eq!(urgency(Some("next tuesday"), now), 0.0);
        assert_eq!(urgency(Some("2025-13-40"), now), 0.0);
    }

    #[test]
    fn pending_urgency_strictly_decreases_with_distance() {
        let base = "2025-01-10";
        let now = at(base);
        let mut previous = f64::INFINITY;
        for days in 1..=90 {
            let current = urgency(Some(&day_offset(base, days)), now);
            assert!(current < previous, "day {days}: {current} !< {previous}");
            previous = current;
        }
    }

    #[test]
    fn overdue_urgency_increases_until_cap_then_flat() {
        let base = "2025-06-01";
        let now = at(base);
        let mut previous = f64::NEG_INFINITY;
        for days in 0..30 {
            let current = urgency(Some(&day_offset(base, -days)), now);
            assert!(current > previous, "day {days}: {current} !> {previous}");
            previous = current;
        }
        let capped = urgency(Some(&day_offset(base, -30)), now);
        assert!(capped > previous);
        for days in 31..=120 {
            assert_eq!(urgency(Some(&day_offset(base, -days)), now), capped);
        }
    }

    #[test]
    fn timestamps_align_to_calendar_days() {
        let now = at("2025-01-10T22:00:00");
        assert_eq!(urgency(Some("2025-01-12T01:00:00"), now), 5.0);
        assert_eq!(urgency(Some("2025-01-12T01:00"), now), 5.0);
    }

    #[test]
    fn sub_hour_deadline_is_bounded() {
        let now = at("2025-01-10T10:00:00");
        let deadline = now + Duration::minutes(20);
        assert_eq!(urgency_between(deadline, now), 240.0);
        assert!(urgency_between(now + Duration::hours(2), now) < 240.0);
    }

    #[test]
    fn exact_instants_keep_hour_remainder() {
        let now = at("2025-01-10T00:00:00");
        let deadline = now + Duration::days(2) + Duration::hours(12);
        let expected = (1.0 / (2.0 + 12.0 / 24.0)) * 10.0;
        assert_eq!(urgency_between(deadline, now), expected);
    }
}
