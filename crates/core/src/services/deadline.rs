//! Response deadline computation.
//!
//! Pure functions of two timestamps. Consumers re-poll on their own cadence;
//! nothing here holds a timer, and the countdown is advisory display state —
//! the store settles races at transition time.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Hours before the original session time by which the client must respond.
pub const RESPONSE_LEAD_HOURS: i64 = 3;

/// Remaining minutes under which a pending request is flagged urgent.
pub const URGENT_THRESHOLD_MINUTES: i64 = 60;

/// Display-ready countdown to a response deadline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeUntilDeadline {
    /// Whole hours remaining, floor-rounded, never negative.
    pub hours: i64,
    /// Minutes remaining past the whole hours, never negative.
    pub minutes: i64,
    /// Short human string, e.g. `"2h 15m remaining"` or `"Expired"`.
    pub formatted: String,
    /// Whether the deadline has passed.
    pub is_expired: bool,
}

impl TimeUntilDeadline {
    /// Whether the request should be flagged urgent: under an hour left and
    /// not yet expired. Derived from the same computation as the countdown
    /// so the two can never drift apart.
    #[must_use]
    pub const fn is_urgent(&self) -> bool {
        !self.is_expired && self.hours * 60 + self.minutes < URGENT_THRESHOLD_MINUTES
    }
}

/// Compute the countdown from `now` to `deadline`.
///
/// `is_expired` is true exactly when `now >= deadline`; a negative remainder
/// is never exposed.
#[must_use]
pub fn time_until_deadline(deadline: DateTime<Utc>, now: DateTime<Utc>) -> TimeUntilDeadline {
    let remaining = deadline - now;

    if remaining <= Duration::zero() {
        return TimeUntilDeadline {
            hours: 0,
            minutes: 0,
            formatted: "Expired".to_string(),
            is_expired: true,
        };
    }

    let total_minutes = remaining.num_minutes();
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    let formatted = if hours > 0 {
        format!("{hours}h {minutes}m remaining")
    } else {
        format!("{minutes}m remaining")
    };

    TimeUntilDeadline {
        hours,
        minutes,
        formatted,
        is_expired: false,
    }
}

/// The hard response cutoff for a session at `original_scheduled_at`:
/// the session time minus the lead window. Always strictly before the
/// session itself.
#[must_use]
pub fn response_deadline_for(original_scheduled_at: DateTime<Utc>) -> DateTime<Utc> {
    original_scheduled_at - Duration::hours(RESPONSE_LEAD_HOURS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).single().unwrap()
    }

    #[test]
    fn test_expired_at_and_after_deadline() {
        let deadline = at(0);

        let exactly = time_until_deadline(deadline, at(0));
        assert!(exactly.is_expired);
        assert_eq!(exactly.hours, 0);
        assert_eq!(exactly.formatted, "Expired");

        let after = time_until_deadline(deadline, at(1));
        assert!(after.is_expired);
        assert_eq!(after.hours, 0);
        assert_eq!(after.minutes, 0);
    }

    #[test]
    fn test_hours_floor_rounded() {
        let deadline = at(0);

        // 2h 59m 59s remaining floors to 2 hours
        let result = time_until_deadline(deadline, at(-(3 * 3600 - 1)));
        assert!(!result.is_expired);
        assert_eq!(result.hours, 2);
        assert_eq!(result.minutes, 59);

        // Exactly 2h remaining
        let result = time_until_deadline(deadline, at(-2 * 3600));
        assert_eq!(result.hours, 2);
        assert_eq!(result.minutes, 0);
        assert_eq!(result.formatted, "2h 0m remaining");
    }

    #[test]
    fn test_deadline_boundary_one_second_each_side() {
        // Session at T, deadline at T - 3h.
        let session_at = at(4 * 3600);
        let deadline = response_deadline_for(session_at);
        assert_eq!(deadline, at(3600));

        // One hour before the deadline (T - 4h): one whole hour remains.
        let result = time_until_deadline(deadline, at(0));
        assert!(!result.is_expired);
        assert_eq!(result.hours, 1);

        // One second before the deadline: still actionable.
        let result = time_until_deadline(deadline, at(3599));
        assert!(!result.is_expired);
        assert_eq!(result.hours, 0);

        // One second past the deadline: expired.
        let result = time_until_deadline(deadline, at(3601));
        assert!(result.is_expired);
    }

    #[test]
    fn test_sub_hour_formatting() {
        let deadline = at(45 * 60);
        let result = time_until_deadline(deadline, at(0));
        assert_eq!(result.formatted, "45m remaining");
        assert_eq!(result.hours, 0);
        assert_eq!(result.minutes, 45);
    }

    #[test]
    fn test_urgency_threshold() {
        let deadline = at(0);

        // 61 minutes out: not urgent yet
        let result = time_until_deadline(deadline, at(-61 * 60));
        assert!(!result.is_urgent());

        // 59 minutes out: urgent
        let result = time_until_deadline(deadline, at(-59 * 60));
        assert!(result.is_urgent());

        // Expired requests are never urgent, they are gone from the list
        let result = time_until_deadline(deadline, at(60));
        assert!(!result.is_urgent());
    }

    #[test]
    fn test_response_deadline_is_before_session() {
        let session_at = at(24 * 3600);
        let deadline = response_deadline_for(session_at);
        assert!(deadline < session_at);
        assert_eq!(session_at - deadline, Duration::hours(RESPONSE_LEAD_HOURS));
    }
}
