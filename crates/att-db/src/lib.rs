//! Storage layer for the attendance tracker.
//!
//! Provides persistence for events, attendees, attendance records, and
//! derived statistics using `rusqlite`.
//!
//! # Thread Safety
//!
//! The [`Database`] type wraps a `rusqlite::Connection`, which is `Send` but
//! not `Sync`. For multi-threaded access use a `Mutex<Database>` or separate
//! instances per thread.
//!
//! # Schema
//!
//! Timestamps are stored as TEXT in ISO 8601 format (`2025-10-21T12:05:00Z`),
//! dates as `YYYY-MM-DD`, clock times as `HH:MM:SS`. Lexicographic ordering
//! matches chronological ordering for all three.
//!
//! Attendance submission runs the core validator inside an IMMEDIATE write
//! transaction, and partial unique indexes over valid records back the
//! duplicate check so two concurrent submissions for the same attendee and
//! event cannot both commit.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use rusqlite::{Connection, OptionalExtension, TransactionBehavior, params};
use serde::Serialize;
use thiserror::Error;

use att_core::{
    AccountNumber, AttendanceId, AttendanceRecord, AttendeeRef, Event, EventId, GuestId,
    InvalidEventWindow, OperatorId, PolicyConfig, RegistrationMethod, SubjectId, SubjectStats,
    Submission, ValidationError, ValidationInput, compute_stats, meets_minimum,
    validate_submission,
};

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A submission was rejected by the validator.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// An event row with a non-positive duration was submitted.
    #[error(transparent)]
    EventWindow(#[from] InvalidEventWindow),
    /// Failed to parse a stored timestamp.
    #[error("invalid timestamp {value:?}")]
    TimestampParse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// Failed to parse a stored date or clock time.
    #[error("invalid date or time {value:?}")]
    DateParse {
        value: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored registration method string was not recognized.
    #[error("unknown registration method {0:?}")]
    UnknownMethod(String),
    /// A stored guest status string was not recognized.
    #[error("unknown guest status {0:?}")]
    UnknownGuestStatus(String),
    /// The referenced attendance record does not exist.
    #[error("attendance record {0} not found")]
    AttendanceNotFound(AttendanceId),
    /// The referenced operator does not exist.
    #[error("operator {0} not found")]
    OperatorNotFound(OperatorId),
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Connection,
}

/// A registered subject row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubjectRecord {
    pub id: SubjectId,
    pub account_number: AccountNumber,
    pub full_name: String,
    pub created_at: DateTime<Utc>,
}

/// Approval state of an external guest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GuestStatus {
    Pending,
    Approved,
}

impl GuestStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
        }
    }

    fn parse(value: &str) -> Result<Self, DbError> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            other => Err(DbError::UnknownGuestStatus(other.to_string())),
        }
    }
}

impl fmt::Display for GuestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An external guest row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GuestRecord {
    pub id: GuestId,
    pub account_number: AccountNumber,
    pub full_name: String,
    pub status: GuestStatus,
}

/// An operator row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorRecord {
    pub id: OperatorId,
    pub account_number: AccountNumber,
    pub full_name: String,
    pub is_registrar: bool,
}

/// An event waiting to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub title: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

/// A persisted statistics row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StatsRecord {
    pub subject_id: SubjectId,
    pub stats: SubjectStats,
    pub updated_at: DateTime<Utc>,
}

/// An attendance submission request.
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub attendee: AttendeeRef,
    pub event_id: EventId,
    pub operator_id: OperatorId,
    pub method: RegistrationMethod,
    pub note: Option<String>,
    /// Bypass the registration window for historical imports. Duplicate and
    /// conflict checks still apply.
    pub skip_time_window: bool,
}

/// Outcome of a full statistics recomputation pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RecomputeSummary {
    pub updated: usize,
    pub failed: usize,
}

/// Row counts for the status overview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusCounts {
    pub subjects: usize,
    pub guests: usize,
    pub events: usize,
    pub attendances: usize,
    pub valid_attendances: usize,
}

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection
    /// closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initializes the database schema.
    ///
    /// Idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        self.conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS subjects (
                id INTEGER PRIMARY KEY,
                account_number TEXT NOT NULL UNIQUE,
                full_name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS guests (
                id INTEGER PRIMARY KEY,
                account_number TEXT NOT NULL UNIQUE,
                full_name TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'pending'
            );

            CREATE TABLE IF NOT EXISTS operators (
                id INTEGER PRIMARY KEY,
                account_number TEXT NOT NULL UNIQUE,
                full_name TEXT NOT NULL,
                is_registrar INTEGER NOT NULL DEFAULT 0
            );

            -- date: YYYY-MM-DD, times: HH:MM:SS
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY,
                title TEXT NOT NULL,
                date TEXT NOT NULL,
                start_time TEXT NOT NULL,
                end_time TEXT NOT NULL,
                is_active INTEGER NOT NULL DEFAULT 1,
                CHECK (end_time > start_time)
            );

            CREATE INDEX IF NOT EXISTS idx_events_date ON events(date, start_time);

            -- Exactly one of subject_id/guest_id is set (structural in the
            -- core, CHECKed here as the storage-level backstop).
            CREATE TABLE IF NOT EXISTS attendances (
                id INTEGER PRIMARY KEY,
                subject_id INTEGER REFERENCES subjects(id),
                guest_id INTEGER REFERENCES guests(id),
                event_id INTEGER NOT NULL REFERENCES events(id),
                registered_at TEXT NOT NULL,
                registered_by INTEGER NOT NULL REFERENCES operators(id),
                method TEXT NOT NULL DEFAULT 'manual',
                note TEXT,
                is_valid INTEGER NOT NULL DEFAULT 1,
                CHECK ((subject_id IS NULL) <> (guest_id IS NULL))
            );

            CREATE INDEX IF NOT EXISTS idx_att_event ON attendances(event_id);
            CREATE INDEX IF NOT EXISTS idx_att_subject ON attendances(subject_id);
            CREATE INDEX IF NOT EXISTS idx_att_guest ON attendances(guest_id);

            -- At most one valid record per attendee and event. Backstops the
            -- validator's duplicate check against concurrent submissions.
            CREATE UNIQUE INDEX IF NOT EXISTS idx_att_subject_event_valid
                ON attendances(subject_id, event_id)
                WHERE is_valid = 1 AND subject_id IS NOT NULL;
            CREATE UNIQUE INDEX IF NOT EXISTS idx_att_guest_event_valid
                ON attendances(guest_id, event_id)
                WHERE is_valid = 1 AND guest_id IS NOT NULL;

            CREATE TABLE IF NOT EXISTS stats (
                subject_id INTEGER PRIMARY KEY REFERENCES subjects(id),
                total_blocks INTEGER NOT NULL DEFAULT 0,
                attended_blocks INTEGER NOT NULL DEFAULT 0,
                percentage REAL NOT NULL DEFAULT 0.0,
                updated_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS policy (
                id INTEGER PRIMARY KEY CHECK (id = 1),
                minimum_attendance_percentage REAL NOT NULL,
                minutes_before_event INTEGER NOT NULL,
                minutes_after_start INTEGER NOT NULL
            );
            ",
        )?;

        let defaults = PolicyConfig::default();
        self.conn.execute(
            "
            INSERT OR IGNORE INTO policy
            (id, minimum_attendance_percentage, minutes_before_event, minutes_after_start)
            VALUES (1, ?, ?, ?)
            ",
            params![
                defaults.minimum_attendance_percentage,
                defaults.minutes_before_event,
                defaults.minutes_after_start,
            ],
        )?;
        Ok(())
    }

    // ========== Policy ==========

    /// Reads the current policy configuration.
    pub fn policy(&self) -> Result<PolicyConfig, DbError> {
        query_policy(&self.conn)
    }

    /// Replaces the policy configuration.
    pub fn set_policy(&self, policy: &PolicyConfig) -> Result<(), DbError> {
        self.conn.execute(
            "
            UPDATE policy SET
                minimum_attendance_percentage = ?,
                minutes_before_event = ?,
                minutes_after_start = ?
            WHERE id = 1
            ",
            params![
                policy.minimum_attendance_percentage,
                policy.minutes_before_event,
                policy.minutes_after_start,
            ],
        )?;
        Ok(())
    }

    // ========== Subjects, guests, operators ==========

    /// Inserts a registered subject.
    pub fn insert_subject(
        &self,
        account: &AccountNumber,
        full_name: &str,
        now: DateTime<Utc>,
    ) -> Result<SubjectId, DbError> {
        self.conn.execute(
            "INSERT INTO subjects (account_number, full_name, created_at) VALUES (?, ?, ?)",
            params![account.as_str(), full_name, format_timestamp(now)],
        )?;
        Ok(SubjectId::new(self.conn.last_insert_rowid()))
    }

    /// Lists subjects ordered by account number.
    pub fn list_subjects(&self) -> Result<Vec<SubjectRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, account_number, full_name, created_at
            FROM subjects
            ORDER BY account_number ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        let mut subjects = Vec::new();
        for row in rows {
            let (id, account, name, created) = row?;
            subjects.push(SubjectRecord {
                id: SubjectId::new(id),
                account_number: account_number(account)?,
                full_name: name,
                created_at: parse_timestamp(&created)?,
            });
        }
        Ok(subjects)
    }

    /// Looks up a subject by account number.
    pub fn subject_by_account(
        &self,
        account: &AccountNumber,
    ) -> Result<Option<SubjectRecord>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, account_number, full_name, created_at
                FROM subjects WHERE account_number = ?
                ",
                params![account.as_str()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(id, account, name, created)| {
            Ok(SubjectRecord {
                id: SubjectId::new(id),
                account_number: account_number(account)?,
                full_name: name,
                created_at: parse_timestamp(&created)?,
            })
        })
        .transpose()
    }

    /// Inserts an external guest in pending status.
    pub fn insert_guest(
        &self,
        account: &AccountNumber,
        full_name: &str,
    ) -> Result<GuestId, DbError> {
        self.conn.execute(
            "INSERT INTO guests (account_number, full_name, status) VALUES (?, ?, 'pending')",
            params![account.as_str(), full_name],
        )?;
        Ok(GuestId::new(self.conn.last_insert_rowid()))
    }

    /// Marks a guest as approved. Returns false when no such guest exists.
    pub fn approve_guest(&self, account: &AccountNumber) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE guests SET status = 'approved' WHERE account_number = ?",
            params![account.as_str()],
        )?;
        Ok(changed > 0)
    }

    /// Lists guests ordered by account number.
    pub fn list_guests(&self) -> Result<Vec<GuestRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, account_number, full_name, status
            FROM guests
            ORDER BY account_number ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;
        let mut guests = Vec::new();
        for row in rows {
            let (id, account, name, status) = row?;
            guests.push(GuestRecord {
                id: GuestId::new(id),
                account_number: account_number(account)?,
                full_name: name,
                status: GuestStatus::parse(&status)?,
            });
        }
        Ok(guests)
    }

    /// Looks up a guest by account number.
    pub fn guest_by_account(
        &self,
        account: &AccountNumber,
    ) -> Result<Option<GuestRecord>, DbError> {
        let row = self
            .conn
            .query_row(
                "SELECT id, account_number, full_name, status FROM guests WHERE account_number = ?",
                params![account.as_str()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(id, account, name, status)| {
            Ok(GuestRecord {
                id: GuestId::new(id),
                account_number: account_number(account)?,
                full_name: name,
                status: GuestStatus::parse(&status)?,
            })
        })
        .transpose()
    }

    /// Inserts an operator.
    pub fn insert_operator(
        &self,
        account: &AccountNumber,
        full_name: &str,
        is_registrar: bool,
    ) -> Result<OperatorId, DbError> {
        self.conn.execute(
            "INSERT INTO operators (account_number, full_name, is_registrar) VALUES (?, ?, ?)",
            params![account.as_str(), full_name, i32::from(is_registrar)],
        )?;
        Ok(OperatorId::new(self.conn.last_insert_rowid()))
    }

    /// Lists operators ordered by account number.
    pub fn list_operators(&self) -> Result<Vec<OperatorRecord>, DbError> {
        let mut stmt = self.conn.prepare(
            "
            SELECT id, account_number, full_name, is_registrar
            FROM operators
            ORDER BY account_number ASC
            ",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, bool>(3)?,
            ))
        })?;
        let mut operators = Vec::new();
        for row in rows {
            let (id, account, name, is_registrar) = row?;
            operators.push(OperatorRecord {
                id: OperatorId::new(id),
                account_number: account_number(account)?,
                full_name: name,
                is_registrar,
            });
        }
        Ok(operators)
    }

    /// Looks up an operator by account number.
    pub fn operator_by_account(
        &self,
        account: &AccountNumber,
    ) -> Result<Option<OperatorRecord>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT id, account_number, full_name, is_registrar
                FROM operators WHERE account_number = ?
                ",
                params![account.as_str()],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, bool>(3)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(id, account, name, is_registrar)| {
            Ok(OperatorRecord {
                id: OperatorId::new(id),
                account_number: account_number(account)?,
                full_name: name,
                is_registrar,
            })
        })
        .transpose()
    }

    /// Resolves an account number to an attendee reference.
    ///
    /// Subjects win over guests, matching the original registration flow;
    /// guests must be approved. Returns the attendee's full name alongside
    /// the reference for display.
    pub fn resolve_attendee(
        &self,
        account: &AccountNumber,
    ) -> Result<(AttendeeRef, String), DbError> {
        if let Some(subject) = self.subject_by_account(account)? {
            return Ok((AttendeeRef::Subject(subject.id), subject.full_name));
        }
        match self.guest_by_account(account)? {
            Some(guest) if guest.status == GuestStatus::Approved => {
                Ok((AttendeeRef::Guest(guest.id), guest.full_name))
            }
            Some(_) => Err(ValidationError::GuestNotApproved {
                account: account.to_string(),
            }
            .into()),
            None => Err(ValidationError::SubjectNotFound {
                account: account.to_string(),
            }
            .into()),
        }
    }

    // ========== Events ==========

    /// Inserts an event, enforcing the end-after-start invariant.
    pub fn insert_event(&self, event: &NewEvent) -> Result<EventId, DbError> {
        if event.end_time <= event.start_time {
            return Err(InvalidEventWindow {
                start: event.start_time,
                end: event.end_time,
            }
            .into());
        }
        self.conn.execute(
            "INSERT INTO events (title, date, start_time, end_time, is_active) VALUES (?, ?, ?, ?, 1)",
            params![
                event.title,
                format_date(event.date),
                format_time(event.start_time),
                format_time(event.end_time),
            ],
        )?;
        Ok(EventId::new(self.conn.last_insert_rowid()))
    }

    /// Lists all events ordered by date then start time.
    pub fn list_events(&self) -> Result<Vec<Event>, DbError> {
        query_events(&self.conn, false)
    }

    /// Lists active events ordered by date then start time.
    pub fn active_events(&self) -> Result<Vec<Event>, DbError> {
        query_events(&self.conn, true)
    }

    /// Fetches one event by id.
    pub fn event(&self, id: EventId) -> Result<Option<Event>, DbError> {
        query_event(&self.conn, id)
    }

    /// Toggles an event's active flag. Returns false when no such event
    /// exists. Callers are responsible for triggering the full statistics
    /// recomputation afterwards; the total block count changed for everyone.
    pub fn set_event_active(&self, id: EventId, is_active: bool) -> Result<bool, DbError> {
        let changed = self.conn.execute(
            "UPDATE events SET is_active = ? WHERE id = ?",
            params![i32::from(is_active), id.get()],
        )?;
        Ok(changed > 0)
    }

    // ========== Attendance ==========

    /// Validates and persists an attendance submission.
    ///
    /// The validator runs inside an IMMEDIATE transaction together with the
    /// insert, so the duplicate and conflict checks are serialized against
    /// concurrent submissions; the partial unique indexes backstop whatever
    /// slips through. Statistics are not touched - recomputation is an
    /// explicit separate step so bulk callers can batch it.
    pub fn submit_attendance(
        &mut self,
        request: &SubmitRequest,
        now: DateTime<Utc>,
    ) -> Result<AttendanceId, DbError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let event = query_event(&tx, request.event_id)?
            .filter(|e| e.is_active)
            .ok_or(ValidationError::EventNotFound {
                event: request.event_id,
            })?;
        let operator_is_registrar = tx
            .query_row(
                "SELECT is_registrar FROM operators WHERE id = ?",
                params![request.operator_id.get()],
                |row| row.get::<_, bool>(0),
            )
            .optional()?
            .ok_or(DbError::OperatorNotFound(request.operator_id))?;
        let policy = query_policy(&tx)?;
        let prior_records = query_attendee_records(&tx, request.attendee)?;
        let active_events = query_events(&tx, true)?;

        let submission = Submission {
            attendee: request.attendee,
            event_id: request.event_id,
            registered_by: request.operator_id,
            method: request.method,
            note: request.note.clone(),
        };
        validate_submission(
            &submission,
            &ValidationInput {
                event: &event,
                policy: &policy,
                now,
                operator_is_registrar,
                prior_records: &prior_records,
                active_events: &active_events,
                exclude: None,
                skip_time_window: request.skip_time_window,
            },
        )?;

        let insert = tx.execute(
            "
            INSERT INTO attendances
            (subject_id, guest_id, event_id, registered_at, registered_by, method, note, is_valid)
            VALUES (?, ?, ?, ?, ?, ?, ?, 1)
            ",
            params![
                request.attendee.subject_id().map(SubjectId::get),
                match request.attendee {
                    AttendeeRef::Guest(id) => Some(id.get()),
                    AttendeeRef::Subject(_) => None,
                },
                request.event_id.get(),
                format_timestamp(now),
                request.operator_id.get(),
                request.method.as_str(),
                request.note,
            ],
        );
        if let Err(err) = insert {
            // Lost a race despite the transaction: the unique index caught a
            // concurrent valid record for the same attendee and event.
            if is_constraint_violation(&err) {
                return Err(ValidationError::DuplicateAttendance {
                    event: request.event_id,
                }
                .into());
            }
            return Err(err.into());
        }
        let id = AttendanceId::new(tx.last_insert_rowid());
        tx.commit()?;

        tracing::debug!(attendance = %id, attendee = %request.attendee, event = %request.event_id, "attendance recorded");
        Ok(id)
    }

    /// Fetches one attendance record by id.
    pub fn attendance(&self, id: AttendanceId) -> Result<Option<AttendanceRecord>, DbError> {
        let raw = self
            .conn
            .query_row(
                &format!("{ATTENDANCE_SELECT} WHERE id = ?"),
                params![id.get()],
                map_attendance_row,
            )
            .optional()?;
        raw.map(RawAttendance::into_record).transpose()
    }

    /// Lists an attendee's records, newest first.
    pub fn attendee_records(
        &self,
        attendee: AttendeeRef,
    ) -> Result<Vec<AttendanceRecord>, DbError> {
        query_attendee_records(&self.conn, attendee)
    }

    /// Lists all records for an event, newest first.
    pub fn event_records(&self, event: EventId) -> Result<Vec<AttendanceRecord>, DbError> {
        let mut stmt = self
            .conn
            .prepare(&format!(
                "{ATTENDANCE_SELECT} WHERE event_id = ? ORDER BY registered_at DESC, id DESC"
            ))?;
        let rows = stmt.query_map(params![event.get()], map_attendance_row)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?.into_record()?);
        }
        Ok(records)
    }

    /// Soft-invalidates a record, returning its attendee so the caller can
    /// recompute statistics. The record stays in place for audit.
    pub fn invalidate_attendance(&self, id: AttendanceId) -> Result<AttendeeRef, DbError> {
        let record = self
            .attendance(id)?
            .ok_or(DbError::AttendanceNotFound(id))?;
        self.conn.execute(
            "UPDATE attendances SET is_valid = 0 WHERE id = ?",
            params![id.get()],
        )?;
        Ok(record.attendee)
    }

    /// Hard-deletes a record, returning its attendee so the caller can
    /// recompute statistics. Prefer [`Self::invalidate_attendance`] outside
    /// of data-correction scripts.
    pub fn delete_attendance(&self, id: AttendanceId) -> Result<AttendeeRef, DbError> {
        let record = self
            .attendance(id)?
            .ok_or(DbError::AttendanceNotFound(id))?;
        self.conn
            .execute("DELETE FROM attendances WHERE id = ?", params![id.get()])?;
        Ok(record.attendee)
    }

    // ========== Statistics ==========

    /// Recomputes and stores one subject's statistics.
    pub fn recompute_subject_stats(
        &self,
        subject: SubjectId,
        now: DateTime<Utc>,
    ) -> Result<SubjectStats, DbError> {
        let active = query_events(&self.conn, true)?;
        let attended = self.valid_attended_event_ids(subject)?;
        let stats = compute_stats(&active, &attended);

        self.conn.execute(
            "
            INSERT INTO stats (subject_id, total_blocks, attended_blocks, percentage, updated_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(subject_id) DO UPDATE SET
                total_blocks = excluded.total_blocks,
                attended_blocks = excluded.attended_blocks,
                percentage = excluded.percentage,
                updated_at = excluded.updated_at
            ",
            params![
                subject.get(),
                stats.total_blocks,
                stats.attended_blocks,
                stats.percentage,
                format_timestamp(now),
            ],
        )?;
        Ok(stats)
    }

    /// Recomputes statistics for every subject.
    ///
    /// Fail-soft per subject: a failure is logged and skipped, never
    /// aborting the pass. Idempotent and safely restartable - rerunning
    /// the pass converges on the same rows.
    pub fn recompute_all_stats(&self, now: DateTime<Utc>) -> Result<RecomputeSummary, DbError> {
        let subjects = self.list_subjects()?;
        let mut summary = RecomputeSummary::default();
        for subject in subjects {
            match self.recompute_subject_stats(subject.id, now) {
                Ok(_) => summary.updated += 1,
                Err(err) => {
                    tracing::warn!(
                        subject = %subject.account_number,
                        error = %err,
                        "statistics recomputation failed; skipping subject"
                    );
                    summary.failed += 1;
                }
            }
        }
        tracing::info!(updated = summary.updated, failed = summary.failed, "statistics pass complete");
        Ok(summary)
    }

    /// Reads a subject's cached statistics row.
    pub fn subject_stats(&self, subject: SubjectId) -> Result<Option<StatsRecord>, DbError> {
        let row = self
            .conn
            .query_row(
                "
                SELECT total_blocks, attended_blocks, percentage, updated_at
                FROM stats WHERE subject_id = ?
                ",
                params![subject.get()],
                |row| {
                    Ok((
                        row.get::<_, u32>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, f64>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                },
            )
            .optional()?;
        row.map(|(total, attended, percentage, updated)| {
            Ok(StatsRecord {
                subject_id: subject,
                stats: SubjectStats {
                    total_blocks: total,
                    attended_blocks: attended,
                    percentage,
                },
                updated_at: parse_timestamp(&updated)?,
            })
        })
        .transpose()
    }

    /// Whether a subject's cached statistics meet the current policy
    /// minimum. `None` when no statistics row exists yet.
    pub fn subject_meets_minimum(&self, subject: SubjectId) -> Result<Option<bool>, DbError> {
        let policy = self.policy()?;
        Ok(self
            .subject_stats(subject)?
            .map(|record| meets_minimum(&record.stats, &policy)))
    }

    /// Event ids the subject holds valid records for.
    pub fn valid_attended_event_ids(
        &self,
        subject: SubjectId,
    ) -> Result<HashSet<EventId>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT event_id FROM attendances WHERE subject_id = ? AND is_valid = 1",
        )?;
        let rows = stmt.query_map(params![subject.get()], |row| row.get::<_, i64>(0))?;
        let mut ids = HashSet::new();
        for row in rows {
            ids.insert(EventId::new(row?));
        }
        Ok(ids)
    }

    // ========== Status ==========

    /// Row counts for the status overview.
    pub fn status_counts(&self) -> Result<StatusCounts, DbError> {
        let count = |sql: &str| -> Result<usize, DbError> {
            let n: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
            Ok(usize::try_from(n).unwrap_or_default())
        };
        Ok(StatusCounts {
            subjects: count("SELECT COUNT(*) FROM subjects")?,
            guests: count("SELECT COUNT(*) FROM guests")?,
            events: count("SELECT COUNT(*) FROM events")?,
            attendances: count("SELECT COUNT(*) FROM attendances")?,
            valid_attendances: count("SELECT COUNT(*) FROM attendances WHERE is_valid = 1")?,
        })
    }
}

// ========== Row mapping ==========

const ATTENDANCE_SELECT: &str = "
    SELECT id, subject_id, guest_id, event_id, registered_at, registered_by,
           method, note, is_valid
    FROM attendances
";

struct RawAttendance {
    id: i64,
    subject_id: Option<i64>,
    guest_id: Option<i64>,
    event_id: i64,
    registered_at: String,
    registered_by: i64,
    method: String,
    note: Option<String>,
    is_valid: bool,
}

fn map_attendance_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAttendance> {
    Ok(RawAttendance {
        id: row.get(0)?,
        subject_id: row.get(1)?,
        guest_id: row.get(2)?,
        event_id: row.get(3)?,
        registered_at: row.get(4)?,
        registered_by: row.get(5)?,
        method: row.get(6)?,
        note: row.get(7)?,
        is_valid: row.get(8)?,
    })
}

impl RawAttendance {
    fn into_record(self) -> Result<AttendanceRecord, DbError> {
        let attendee = AttendeeRef::from_parts(
            self.subject_id.map(SubjectId::new),
            self.guest_id.map(GuestId::new),
        )?;
        let method = self
            .method
            .parse::<RegistrationMethod>()
            .map_err(|_| DbError::UnknownMethod(self.method.clone()))?;
        Ok(AttendanceRecord {
            id: AttendanceId::new(self.id),
            attendee,
            event_id: EventId::new(self.event_id),
            registered_at: parse_timestamp(&self.registered_at)?,
            registered_by: OperatorId::new(self.registered_by),
            method,
            note: self.note,
            is_valid: self.is_valid,
        })
    }
}

fn query_policy(conn: &Connection) -> Result<PolicyConfig, DbError> {
    let policy = conn.query_row(
        "
        SELECT minimum_attendance_percentage, minutes_before_event, minutes_after_start
        FROM policy WHERE id = 1
        ",
        [],
        |row| {
            Ok(PolicyConfig {
                minimum_attendance_percentage: row.get(0)?,
                minutes_before_event: row.get(1)?,
                minutes_after_start: row.get(2)?,
            })
        },
    )?;
    Ok(policy)
}

fn query_event(conn: &Connection, id: EventId) -> Result<Option<Event>, DbError> {
    let row = conn
        .query_row(
            "SELECT id, title, date, start_time, end_time, is_active FROM events WHERE id = ?",
            params![id.get()],
            map_event_row,
        )
        .optional()?;
    row.map(RawEvent::into_event).transpose()
}

fn query_events(conn: &Connection, active_only: bool) -> Result<Vec<Event>, DbError> {
    let sql = if active_only {
        "SELECT id, title, date, start_time, end_time, is_active FROM events \
         WHERE is_active = 1 ORDER BY date ASC, start_time ASC, id ASC"
    } else {
        "SELECT id, title, date, start_time, end_time, is_active FROM events \
         ORDER BY date ASC, start_time ASC, id ASC"
    };
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map([], map_event_row)?;
    let mut events = Vec::new();
    for row in rows {
        events.push(row?.into_event()?);
    }
    Ok(events)
}

struct RawEvent {
    id: i64,
    title: String,
    date: String,
    start_time: String,
    end_time: String,
    is_active: bool,
}

fn map_event_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawEvent> {
    Ok(RawEvent {
        id: row.get(0)?,
        title: row.get(1)?,
        date: row.get(2)?,
        start_time: row.get(3)?,
        end_time: row.get(4)?,
        is_active: row.get(5)?,
    })
}

impl RawEvent {
    fn into_event(self) -> Result<Event, DbError> {
        Ok(Event::new(
            EventId::new(self.id),
            self.title,
            parse_date(&self.date)?,
            parse_time(&self.start_time)?,
            parse_time(&self.end_time)?,
            self.is_active,
        )?)
    }
}

fn query_attendee_records(
    conn: &Connection,
    attendee: AttendeeRef,
) -> Result<Vec<AttendanceRecord>, DbError> {
    let (column, id) = match attendee {
        AttendeeRef::Subject(id) => ("subject_id", id.get()),
        AttendeeRef::Guest(id) => ("guest_id", id.get()),
    };
    let mut stmt = conn.prepare(&format!(
        "{ATTENDANCE_SELECT} WHERE {column} = ? ORDER BY registered_at DESC, id DESC"
    ))?;
    let rows = stmt.query_map(params![id], map_attendance_row)?;
    let mut records = Vec::new();
    for row in rows {
        records.push(row?.into_record()?);
    }
    Ok(records)
}

// ========== Encoding helpers ==========

fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, DbError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| DbError::TimestampParse {
            value: value.to_string(),
            source,
        })
}

fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn parse_date(value: &str) -> Result<NaiveDate, DbError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|source| DbError::DateParse {
        value: value.to_string(),
        source,
    })
}

fn format_time(time: NaiveTime) -> String {
    time.format("%H:%M:%S").to_string()
}

fn parse_time(value: &str) -> Result<NaiveTime, DbError> {
    NaiveTime::parse_from_str(value, "%H:%M:%S").map_err(|source| DbError::DateParse {
        value: value.to_string(),
        source,
    })
}

fn account_number(value: String) -> Result<AccountNumber, DbError> {
    // UNIQUE NOT NULL column; an empty value would mean external tampering.
    AccountNumber::new(value.clone()).map_err(|_| {
        DbError::Sqlite(rusqlite::Error::InvalidColumnType(
            0,
            value,
            rusqlite::types::Type::Text,
        ))
    })
}

fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
