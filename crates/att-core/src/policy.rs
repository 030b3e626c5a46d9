//! System policy configuration.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::event::Event;

/// Process-wide attendance policy.
///
/// Owned and mutated by the administrative surface; the core only reads it.
/// Always passed explicitly into validator and statistics calls so the core
/// stays testable without ambient state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// Minimum attendance percentage a subject must reach to qualify.
    pub minimum_attendance_percentage: f64,

    /// Minutes before the event start at which registration opens.
    pub minutes_before_event: i64,

    /// Minutes after the event start during which registration stays open.
    pub minutes_after_start: i64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            minimum_attendance_percentage: 80.0,
            minutes_before_event: 10,
            minutes_after_start: 25,
        }
    }
}

impl PolicyConfig {
    /// The window during which live registration for `event` is accepted:
    /// `[start − minutes_before_event, start + minutes_after_start]`.
    #[must_use]
    pub fn registration_window(&self, event: &Event) -> (DateTime<Utc>, DateTime<Utc>) {
        let start = event.starts_at();
        (
            start - Duration::minutes(self.minutes_before_event),
            start + Duration::minutes(self.minutes_after_start),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::EventId;
    use chrono::{NaiveDate, NaiveTime};

    #[test]
    fn registration_window_brackets_event_start() {
        let event = Event::new(
            EventId::new(1),
            "keynote",
            NaiveDate::from_ymd_opt(2025, 10, 21).unwrap(),
            NaiveTime::from_hms_opt(11, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            true,
        )
        .unwrap();

        let (opens, closes) = PolicyConfig::default().registration_window(&event);
        assert_eq!(opens.to_rfc3339(), "2025-10-21T10:50:00+00:00");
        assert_eq!(closes.to_rfc3339(), "2025-10-21T11:25:00+00:00");
    }

    #[test]
    fn defaults_match_deployment_seed() {
        let policy = PolicyConfig::default();
        assert!((policy.minimum_attendance_percentage - 80.0).abs() < f64::EPSILON);
        assert_eq!(policy.minutes_before_event, 10);
        assert_eq!(policy.minutes_after_start, 25);
    }
}
