//! Scheduled session events.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::EventId;

/// An event's end time did not come after its start time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("event end time {end} must be after start time {start}")]
pub struct InvalidEventWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

/// A scheduled session attendees can be registered for.
///
/// Times are civil clock times on the event's date; the system treats them
/// as UTC when comparing against the current time. The occupied interval is
/// half-open: `[start_time, end_time)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for this event.
    pub id: EventId,
    /// Human-readable session title.
    pub title: String,
    /// Calendar date the session takes place on.
    pub date: NaiveDate,
    /// Clock time the session starts.
    pub start_time: NaiveTime,
    /// Clock time the session ends. Always after `start_time`.
    pub end_time: NaiveTime,
    /// Soft-disable flag. Inactive events are excluded from statistics and
    /// conflict checks but keep their attendance rows for audit.
    pub is_active: bool,
}

impl Event {
    /// Creates an event, enforcing `end_time > start_time`.
    pub fn new(
        id: EventId,
        title: impl Into<String>,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
        is_active: bool,
    ) -> Result<Self, InvalidEventWindow> {
        if end_time <= start_time {
            return Err(InvalidEventWindow {
                start: start_time,
                end: end_time,
            });
        }
        Ok(Self {
            id,
            title: title.into(),
            date,
            start_time,
            end_time,
            is_active,
        })
    }

    /// The instant the session starts.
    #[must_use]
    pub fn starts_at(&self) -> DateTime<Utc> {
        self.date.and_time(self.start_time).and_utc()
    }

    /// True when both events share a date and their `[start, end)` intervals
    /// intersect.
    #[must_use]
    pub fn overlaps(&self, other: &Self) -> bool {
        self.date == other.date
            && self.start_time < other.end_time
            && self.end_time > other.start_time
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 10, d).unwrap()
    }

    fn event(id: i64, d: u32, start: (u32, u32), end: (u32, u32)) -> Event {
        Event::new(
            EventId::new(id),
            format!("session {id}"),
            date(d),
            time(start.0, start.1),
            time(end.0, end.1),
            true,
        )
        .unwrap()
    }

    #[test]
    fn rejects_inverted_window() {
        let err = Event::new(
            EventId::new(1),
            "backwards",
            date(21),
            time(13, 0),
            time(12, 0),
            true,
        )
        .unwrap_err();
        assert_eq!(err.start, time(13, 0));

        assert!(
            Event::new(
                EventId::new(1),
                "empty",
                date(21),
                time(12, 0),
                time(12, 0),
                true,
            )
            .is_err()
        );
    }

    #[test]
    fn overlap_requires_same_date() {
        let a = event(1, 21, (12, 0), (13, 0));
        let b = event(2, 22, (12, 0), (13, 0));
        assert!(!a.overlaps(&b));
    }

    #[test]
    fn overlap_is_half_open() {
        let a = event(1, 21, (12, 0), (13, 0));
        let back_to_back = event(2, 21, (13, 0), (14, 0));
        let partial = event(3, 21, (12, 30), (13, 30));
        assert!(!a.overlaps(&back_to_back));
        assert!(!back_to_back.overlaps(&a));
        assert!(a.overlaps(&partial));
        assert!(partial.overlaps(&a));
    }

    #[test]
    fn containment_counts_as_overlap() {
        let outer = event(1, 21, (9, 0), (17, 0));
        let inner = event(2, 21, (12, 0), (13, 0));
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn starts_at_combines_date_and_time() {
        let e = event(1, 21, (11, 0), (12, 0));
        assert_eq!(e.starts_at().to_rfc3339(), "2025-10-21T11:00:00+00:00");
    }
}
