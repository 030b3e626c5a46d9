//! Show a subject's attendance statistics.

use std::io::Write;

use anyhow::Result;
use chrono::Utc;
use clap::Args;
use serde::Serialize;

use att_db::Database;

use super::util;

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Subject account number.
    pub account: String,

    /// Recompute before showing instead of serving the cached row.
    #[arg(long)]
    pub recompute: bool,

    /// Output as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct StatsOutput<'a> {
    account_number: &'a str,
    full_name: &'a str,
    total_blocks: u32,
    attended_blocks: u32,
    percentage: f64,
    meets_minimum: bool,
}

pub fn run<W: Write>(writer: &mut W, db: &Database, args: &StatsArgs) -> Result<()> {
    let subject = util::subject(db, &args.account)?;

    if args.recompute {
        db.recompute_subject_stats(subject.id, Utc::now())?;
    }

    let Some(record) = db.subject_stats(subject.id)? else {
        writeln!(
            writer,
            "No statistics for {} yet. Run `att recompute` or pass --recompute.",
            subject.account_number
        )?;
        return Ok(());
    };
    let meets = db
        .subject_meets_minimum(subject.id)?
        .unwrap_or(false);

    if args.json {
        let output = StatsOutput {
            account_number: subject.account_number.as_str(),
            full_name: &subject.full_name,
            total_blocks: record.stats.total_blocks,
            attended_blocks: record.stats.attended_blocks,
            percentage: record.stats.percentage,
            meets_minimum: meets,
        };
        serde_json::to_writer_pretty(&mut *writer, &output)?;
        writeln!(writer)?;
    } else {
        let policy = db.policy()?;
        writeln!(writer, "{} ({})", subject.full_name, subject.account_number)?;
        writeln!(
            writer,
            "Attended {}/{} blocks ({:.2}%)",
            record.stats.attended_blocks, record.stats.total_blocks, record.stats.percentage
        )?;
        writeln!(
            writer,
            "Minimum {:.2}%: {}",
            policy.minimum_attendance_percentage,
            if meets { "met" } else { "not met" }
        )?;
        writeln!(writer, "Last computed: {}", record.updated_at)?;
    }

    Ok(())
}
