//! Event slot clustering.
//!
//! A "slot" is a maximal cluster of active events on the same date whose
//! time intervals transitively overlap. Slots are the unit of "opportunity
//! to attend": a subject can physically be in at most one of a slot's
//! events, so the statistics aggregator counts slots rather than events,
//! and the validator uses the same overlap test to reject double-attendance
//! in simultaneous sessions.

use chrono::{NaiveDate, NaiveTime};

use crate::event::Event;
use crate::types::EventId;

/// A cluster of same-date events with transitively overlapping intervals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    /// The date shared by every event in the slot.
    pub date: NaiveDate,
    /// Earliest start time of any member event.
    pub start: NaiveTime,
    /// Latest end time of any member event.
    pub end: NaiveTime,
    /// Ids of the member events.
    pub events: Vec<EventId>,
}

impl Slot {
    /// True when any member event id appears in `attended`.
    pub fn contains_any<'a, I>(&self, attended: I) -> bool
    where
        I: IntoIterator<Item = &'a EventId>,
    {
        attended.into_iter().any(|id| self.events.contains(id))
    }
}

/// Partitions events into slots.
///
/// Events are sorted by (date, start, end, id) first, so the partition is
/// independent of input order. Each event then joins the open slot it
/// overlaps, extending the slot's covered interval; otherwise it opens a new
/// slot. Because input is start-ordered, an event overlaps a slot exactly
/// when its start falls before the slot's covered end, which makes the
/// clustering transitive: if A overlaps B and B overlaps C, all three land
/// in one slot even when A and C are disjoint.
///
/// Callers are expected to pass only active events; inactive ones are not
/// filtered here.
#[must_use]
pub fn cluster_slots(events: &[Event]) -> Vec<Slot> {
    let mut ordered: Vec<&Event> = events.iter().collect();
    ordered.sort_by_key(|e| (e.date, e.start_time, e.end_time, e.id));

    let mut slots: Vec<Slot> = Vec::new();
    for event in ordered {
        let existing = slots
            .iter_mut()
            .find(|slot| slot.date == event.date && event.start_time < slot.end);
        match existing {
            Some(slot) => {
                slot.end = slot.end.max(event.end_time);
                slot.events.push(event.id);
            }
            None => slots.push(Slot {
                date: event.date,
                start: event.start_time,
                end: event.end_time,
                events: vec![event.id],
            }),
        }
    }
    slots
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn event(id: i64, day: u32, start: (u32, u32), end: (u32, u32)) -> Event {
        Event::new(
            EventId::new(id),
            format!("session {id}"),
            NaiveDate::from_ymd_opt(2025, 10, day).unwrap(),
            NaiveTime::from_hms_opt(start.0, start.1, 0).unwrap(),
            NaiveTime::from_hms_opt(end.0, end.1, 0).unwrap(),
            true,
        )
        .unwrap()
    }

    fn membership(slots: &[Slot]) -> Vec<Vec<i64>> {
        let mut sets: Vec<Vec<i64>> = slots
            .iter()
            .map(|s| {
                let mut ids: Vec<i64> = s.events.iter().map(|id| id.get()).collect();
                ids.sort_unstable();
                ids
            })
            .collect();
        sets.sort();
        sets
    }

    #[test]
    fn overlapping_same_date_events_share_a_slot() {
        let events = vec![
            event(1, 21, (12, 0), (13, 0)),
            event(2, 21, (12, 0), (13, 0)),
            event(3, 22, (9, 0), (10, 0)),
        ];
        let slots = cluster_slots(&events);
        assert_eq!(slots.len(), 2);
        assert_eq!(membership(&slots), vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn same_time_different_date_stays_separate() {
        let events = vec![event(1, 21, (12, 0), (13, 0)), event(2, 22, (12, 0), (13, 0))];
        assert_eq!(cluster_slots(&events).len(), 2);
    }

    #[test]
    fn back_to_back_events_do_not_cluster() {
        // [12:00, 13:00) and [13:00, 14:00) share only the boundary instant.
        let events = vec![event(1, 21, (12, 0), (13, 0)), event(2, 21, (13, 0), (14, 0))];
        assert_eq!(cluster_slots(&events).len(), 2);
    }

    #[test]
    fn transitive_chain_lands_in_one_slot() {
        // A overlaps B, B overlaps C, but A and C are disjoint.
        let a = event(1, 21, (12, 0), (13, 0));
        let b = event(2, 21, (12, 30), (14, 0));
        let c = event(3, 21, (13, 30), (15, 0));
        let slots = cluster_slots(&[a, b, c]);
        assert_eq!(membership(&slots), vec![vec![1, 2, 3]]);
        assert_eq!(slots[0].start, NaiveTime::from_hms_opt(12, 0, 0).unwrap());
        assert_eq!(slots[0].end, NaiveTime::from_hms_opt(15, 0, 0).unwrap());
    }

    #[test]
    fn contained_event_does_not_swallow_later_disjoint_one() {
        // The long event covers the short one; a later event past the long
        // event's end still opens its own slot.
        let long = event(1, 21, (9, 0), (12, 0));
        let short = event(2, 21, (9, 30), (10, 0));
        let later = event(3, 21, (12, 0), (13, 0));
        let slots = cluster_slots(&[short, later, long]);
        assert_eq!(membership(&slots), vec![vec![1, 2], vec![3]]);
    }

    #[test]
    fn partition_is_input_order_independent() {
        let mut events = vec![
            event(4, 22, (9, 0), (10, 0)),
            event(1, 21, (12, 0), (13, 0)),
            event(3, 21, (12, 30), (13, 30)),
            event(2, 21, (11, 0), (12, 15)),
        ];
        let forward = membership(&cluster_slots(&events));
        events.reverse();
        let backward = membership(&cluster_slots(&events));
        assert_eq!(forward, backward);
    }

    #[test]
    fn empty_catalog_yields_no_slots() {
        assert!(cluster_slots(&[]).is_empty());
    }

    #[test]
    fn contains_any_checks_membership() {
        let slots =
            cluster_slots(&[event(1, 21, (12, 0), (13, 0)), event(2, 21, (12, 0), (13, 0))]);
        let slot = &slots[0];
        assert!(slot.contains_any(&[EventId::new(2)]));
        assert!(!slot.contains_any(&[EventId::new(9)]));
        let none: [EventId; 0] = [];
        assert!(!slot.contains_any(&none));
    }
}
