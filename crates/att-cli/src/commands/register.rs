//! Register an attendee for an event.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;

use att_core::{AttendeeRef, EventId, RegistrationMethod};
use att_db::{Database, SubmitRequest};

use super::util;

#[derive(Debug, Args)]
pub struct RegisterArgs {
    /// Attendee account number (subject or approved guest).
    pub account: String,

    /// Event id.
    pub event: i64,

    /// Registering operator's account number.
    #[arg(long)]
    pub operator: String,

    /// How the record was captured.
    #[arg(long, default_value = "manual", value_parser = parse_method)]
    pub method: RegistrationMethod,

    /// Free-form note attached to the record.
    #[arg(long)]
    pub note: Option<String>,

    /// Bypass the registration time window. Duplicate and conflict checks
    /// still apply.
    #[arg(long)]
    pub skip_time_window: bool,
}

fn parse_method(value: &str) -> Result<RegistrationMethod, String> {
    value.parse().map_err(|err| format!("{err}"))
}

pub fn run(db: &mut Database, args: &RegisterArgs) -> Result<()> {
    let account = util::account(&args.account)?;
    let (attendee, name) = db
        .resolve_attendee(&account)
        .with_context(|| format!("cannot register account {account}"))?;
    let operator_id = util::operator_id(db, &args.operator)?;

    let now = Utc::now();
    let request = SubmitRequest {
        attendee,
        event_id: EventId::new(args.event),
        operator_id,
        method: args.method,
        note: args.note.clone(),
        skip_time_window: args.skip_time_window,
    };
    let id = db.submit_attendance(&request, now)?;

    // Guests carry no statistics, so only subject registrations trigger a
    // recomputation.
    if let AttendeeRef::Subject(subject) = attendee {
        let stats = db.recompute_subject_stats(subject, now)?;
        println!(
            "Registered {name} for event {} (record {id}). Attendance: {}/{} blocks ({:.2}%).",
            args.event, stats.attended_blocks, stats.total_blocks, stats.percentage
        );
    } else {
        println!("Registered guest {name} for event {} (record {id}).", args.event);
    }

    Ok(())
}
