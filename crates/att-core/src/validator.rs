//! Attendance submission validation.
//!
//! The validator decides whether a candidate attendance record may be
//! persisted. It is a pure, single-pass function over data the caller has
//! already loaded; the storage layer runs it inside the same transaction as
//! the insert so concurrent submissions cannot both pass.
//!
//! Checks run in order and short-circuit on the first failure:
//!
//! 1. attendee exclusivity (structural via [`AttendeeRef`])
//! 2. registrar capability
//! 3. registration time window (the only skippable check)
//! 4. duplicate record for the same attendee and event
//! 5. simultaneous-event conflict (registered subjects only)
//!
//! Checks 4 and 5 always run, even when the time window is skipped for
//! historical imports: bulk loads must not corrupt the one-record-per-slot
//! invariant the statistics aggregator depends on.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::Event;
use crate::policy::PolicyConfig;
use crate::types::{AttendanceId, AttendeeRef, EventId, OperatorId, RegistrationMethod};

/// Why a submission was rejected.
///
/// Every variant carries enough context to render a human-readable message;
/// none is retried automatically. A failed submission persists nothing and
/// leaves statistics untouched.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Neither or both of the subject/guest references were set.
    #[error("an attendance record must reference exactly one subject or guest")]
    InvalidAttendeeReference,

    /// The registering operator lacks the registrar capability.
    #[error("operator {operator} is not a registrar")]
    UnauthorizedRegistrar { operator: OperatorId },

    /// The submission arrived outside the registration window.
    #[error("registration for event {event} is only open from {opens} to {closes}")]
    OutsideRegistrationWindow {
        event: EventId,
        opens: DateTime<Utc>,
        closes: DateTime<Utc>,
    },

    /// A valid record for this attendee and event already exists.
    #[error("attendee already has a valid attendance record for event {event}")]
    DuplicateAttendance { event: EventId },

    /// The subject already attended a concurrent session.
    #[error(
        "subject already has a valid attendance record for event {conflicting}, \
         which overlaps event {event}"
    )]
    SimultaneousEventConflict {
        event: EventId,
        conflicting: EventId,
    },

    /// No subject or approved guest matched the given account number.
    #[error("no subject or approved guest with account number {account}")]
    SubjectNotFound { account: String },

    /// The guest exists but has not been approved for registration.
    #[error("guest with account number {account} is not approved")]
    GuestNotApproved { account: String },

    /// The referenced event does not exist or is inactive.
    #[error("event {event} not found or inactive")]
    EventNotFound { event: EventId },
}

/// A candidate attendance record, not yet persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub attendee: AttendeeRef,
    pub event_id: EventId,
    pub registered_by: OperatorId,
    pub method: RegistrationMethod,
    pub note: Option<String>,
}

/// A persisted attendance record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: AttendanceId,
    pub attendee: AttendeeRef,
    pub event_id: EventId,
    pub registered_at: DateTime<Utc>,
    pub registered_by: OperatorId,
    pub method: RegistrationMethod,
    pub note: Option<String>,
    /// Soft-invalidation flag. Invalid records are kept for audit but
    /// excluded from duplicate, conflict, and statistics computations.
    pub is_valid: bool,
}

/// Everything the validator needs besides the candidate itself.
#[derive(Debug, Clone, Copy)]
pub struct ValidationInput<'a> {
    /// The event being registered for.
    pub event: &'a Event,
    /// Current policy, read fresh for each submission.
    pub policy: &'a PolicyConfig,
    /// The submission instant.
    pub now: DateTime<Utc>,
    /// Whether the registering operator holds the registrar capability.
    pub operator_is_registrar: bool,
    /// The attendee's existing records (any validity, any event).
    pub prior_records: &'a [AttendanceRecord],
    /// The full active event catalog, for the conflict check.
    pub active_events: &'a [Event],
    /// When re-saving an existing record, its own id, excluded from the
    /// duplicate check.
    pub exclude: Option<AttendanceId>,
    /// Skip the time-window check (historical imports). Duplicate and
    /// conflict checks are unaffected.
    pub skip_time_window: bool,
}

/// Validates a candidate submission.
///
/// On `Ok(())` the record is eligible for persistence. Statistics
/// recomputation is a separate explicit step, never a side effect here.
pub fn validate_submission(
    submission: &Submission,
    input: &ValidationInput<'_>,
) -> Result<(), ValidationError> {
    debug_assert_eq!(submission.event_id, input.event.id);

    if !input.operator_is_registrar {
        return Err(ValidationError::UnauthorizedRegistrar {
            operator: submission.registered_by,
        });
    }

    if !input.skip_time_window {
        let (opens, closes) = input.policy.registration_window(input.event);
        if input.now < opens || input.now > closes {
            return Err(ValidationError::OutsideRegistrationWindow {
                event: input.event.id,
                opens,
                closes,
            });
        }
    }

    let valid_prior = || {
        input
            .prior_records
            .iter()
            .filter(|r| r.is_valid && r.attendee == submission.attendee)
            .filter(|r| input.exclude != Some(r.id))
    };

    if valid_prior().any(|r| r.event_id == input.event.id) {
        return Err(ValidationError::DuplicateAttendance {
            event: input.event.id,
        });
    }

    // Concurrent-session conflicts only bind registered subjects; guests
    // keep the observed exemption.
    if submission.attendee.is_subject() {
        let conflict = valid_prior()
            .filter(|r| r.event_id != input.event.id)
            .find_map(|r| {
                input
                    .active_events
                    .iter()
                    .find(|e| e.id == r.event_id && e.overlaps(input.event))
            });
        if let Some(conflicting) = conflict {
            tracing::debug!(
                event = %input.event.id,
                conflicting = %conflicting.id,
                "rejected simultaneous attendance"
            );
            return Err(ValidationError::SimultaneousEventConflict {
                event: input.event.id,
                conflicting: conflicting.id,
            });
        }
    }

    Ok(())
}
