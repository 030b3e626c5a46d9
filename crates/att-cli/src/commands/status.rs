//! Status command showing a database overview.

use std::io::Write;

use anyhow::Result;

use att_db::Database;

use crate::Config;

pub fn run<W: Write>(writer: &mut W, db: &Database, config: &Config) -> Result<()> {
    let counts = db.status_counts()?;
    let policy = db.policy()?;

    writeln!(writer, "Attendance tracker status")?;
    writeln!(writer, "Database: {}", config.database_path.display())?;
    writeln!(writer, "Subjects: {}", counts.subjects)?;
    writeln!(writer, "Guests: {}", counts.guests)?;
    writeln!(writer, "Events: {}", counts.events)?;
    writeln!(
        writer,
        "Attendance records: {} ({} valid)",
        counts.attendances, counts.valid_attendances
    )?;
    writeln!(
        writer,
        "Minimum attendance: {:.2}%",
        policy.minimum_attendance_percentage
    )?;
    Ok(())
}
