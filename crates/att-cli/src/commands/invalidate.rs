//! Invalidate or delete an attendance record.

use anyhow::Result;
use chrono::Utc;
use clap::Args;

use att_core::{AttendanceId, AttendeeRef};
use att_db::Database;

#[derive(Debug, Args)]
pub struct InvalidateArgs {
    /// Attendance record id.
    pub id: i64,

    /// Hard-delete the record instead of soft-invalidating it.
    #[arg(long)]
    pub delete: bool,
}

pub fn run(db: &Database, args: &InvalidateArgs) -> Result<()> {
    let id = AttendanceId::new(args.id);
    let attendee = if args.delete {
        db.delete_attendance(id)?
    } else {
        db.invalidate_attendance(id)?
    };

    let verb = if args.delete { "Deleted" } else { "Invalidated" };
    println!("{verb} attendance record {id}.");

    if let AttendeeRef::Subject(subject) = attendee {
        let stats = db.recompute_subject_stats(subject, Utc::now())?;
        println!(
            "Subject now at {}/{} blocks ({:.2}%).",
            stats.attended_blocks, stats.total_blocks, stats.percentage
        );
    }

    Ok(())
}
