//! Per-subject attendance statistics.
//!
//! Statistics are computed over slots, not raw events: the active catalog is
//! partitioned by the clusterer and a subject is credited once per slot with
//! at least one valid attendance record. A student cannot physically attend
//! two simultaneous sessions, so scheduling several options in one slot must
//! not deflate anyone's percentage.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::event::Event;
use crate::policy::PolicyConfig;
use crate::slot::cluster_slots;
use crate::types::EventId;

/// A subject's attendance figures, always recomputable from events and
/// attendance records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SubjectStats {
    /// Number of slots in the active catalog.
    pub total_blocks: u32,
    /// Number of slots with at least one attended event.
    pub attended_blocks: u32,
    /// `attended / total × 100`, rounded to two decimals. 0.0 when the
    /// catalog is empty.
    pub percentage: f64,
}

impl SubjectStats {
    /// Statistics for an empty catalog.
    pub const ZERO: Self = Self {
        total_blocks: 0,
        attended_blocks: 0,
        percentage: 0.0,
    };
}

/// Computes statistics for one subject.
///
/// `active_events` is the full active catalog; `attended` the set of event
/// ids the subject holds valid records for. Pure and deterministic, so
/// redundant recomputation under concurrency is harmless.
#[must_use]
pub fn compute_stats(active_events: &[Event], attended: &HashSet<EventId>) -> SubjectStats {
    let slots = cluster_slots(active_events);
    if slots.is_empty() {
        return SubjectStats::ZERO;
    }

    let attended_blocks = slots.iter().filter(|s| s.contains_any(attended)).count();

    #[allow(clippy::cast_possible_truncation)]
    let (total, attended_count) = (slots.len() as u32, attended_blocks as u32);
    let percentage = round_two(f64::from(attended_count) / f64::from(total) * 100.0);

    SubjectStats {
        total_blocks: total,
        attended_blocks: attended_count,
        percentage,
    }
}

/// Whether the subject meets the policy's minimum attendance percentage.
///
/// Always evaluated against the policy value passed in, never a cached
/// threshold.
#[must_use]
pub fn meets_minimum(stats: &SubjectStats, policy: &PolicyConfig) -> bool {
    stats.percentage >= policy.minimum_attendance_percentage
}

fn round_two(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
