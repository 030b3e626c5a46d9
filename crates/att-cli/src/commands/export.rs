//! Export subjects and their statistics as JSONL.

use std::io::Write;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use att_core::meets_minimum;
use att_db::Database;

#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Only subjects meeting the minimum attendance percentage.
    #[arg(long)]
    pub qualified: bool,
}

#[derive(Serialize)]
struct ExportRow<'a> {
    account_number: &'a str,
    full_name: &'a str,
    total_blocks: u32,
    attended_blocks: u32,
    percentage: f64,
    meets_minimum: bool,
}

pub fn run<W: Write>(writer: &mut W, db: &Database, args: &ExportArgs) -> Result<()> {
    let policy = db.policy()?;

    for subject in db.list_subjects()? {
        // Subjects without a cached row export as zeros rather than being
        // silently dropped.
        let stats = db
            .subject_stats(subject.id)?
            .map(|record| record.stats)
            .unwrap_or(att_core::SubjectStats::ZERO);
        let meets = meets_minimum(&stats, &policy);
        if args.qualified && !meets {
            continue;
        }

        let row = ExportRow {
            account_number: subject.account_number.as_str(),
            full_name: &subject.full_name,
            total_blocks: stats.total_blocks,
            attended_blocks: stats.attended_blocks,
            percentage: stats.percentage,
            meets_minimum: meets,
        };
        serde_json::to_writer(&mut *writer, &row)?;
        writeln!(writer)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use att_core::{AccountNumber, PolicyConfig};
    use chrono::{TimeZone, Utc};

    #[test]
    fn qualified_filters_below_minimum() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc.with_ymd_and_hms(2025, 10, 20, 8, 0, 0).unwrap();
        db.insert_subject(&AccountNumber::new("20251001").unwrap(), "Ada Lovelace", now)
            .unwrap();
        db.recompute_all_stats(now).unwrap();

        // Empty catalog: 0.0% against the default 80% minimum.
        let mut output = Vec::new();
        run(&mut output, &db, &ExportArgs { qualified: true }).unwrap();
        assert!(output.is_empty());

        // Relax the minimum to zero and the subject qualifies.
        db.set_policy(&PolicyConfig {
            minimum_attendance_percentage: 0.0,
            ..PolicyConfig::default()
        })
        .unwrap();
        let mut output = Vec::new();
        run(&mut output, &db, &ExportArgs { qualified: true }).unwrap();
        let line: serde_json::Value = serde_json::from_slice(&output).unwrap();
        assert_eq!(line["account_number"], "20251001");
        assert_eq!(line["meets_minimum"], true);
    }
}
