//! Core domain logic for the attendance tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Validation: deciding whether an attendance submission is legal
//! - Slot clustering: grouping overlapping events into time blocks
//! - Statistics: per-subject attendance percentages over those blocks

pub mod event;
pub mod policy;
pub mod slot;
pub mod stats;
pub mod types;
pub mod validator;

pub use event::{Event, InvalidEventWindow};
pub use policy::PolicyConfig;
pub use slot::{Slot, cluster_slots};
pub use stats::{SubjectStats, compute_stats, meets_minimum};
pub use types::{
    AccountNumber, AttendanceId, AttendeeRef, EventId, GuestId, OperatorId, RegistrationMethod,
    SubjectId, TypeError,
};
pub use validator::{
    AttendanceRecord, Submission, ValidationError, ValidationInput, validate_submission,
};
