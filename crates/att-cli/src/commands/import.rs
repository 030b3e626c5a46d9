//! Import attendance records from JSONL on stdin.
//!
//! Historical imports bypass the registration time window but keep every
//! other rule: duplicates and simultaneous conflicts are rejected per line
//! without aborting the rest of the batch.

use std::io::{self, BufRead};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Deserialize;

use att_core::{EventId, RegistrationMethod};
use att_db::{Database, SubmitRequest};

use super::util;

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Default operator account when incoming records omit `operator`.
    #[arg(long)]
    pub operator: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ImportLine {
    account: String,
    event_id: i64,
    #[serde(default)]
    operator: Option<String>,
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    note: Option<String>,
    #[serde(default)]
    registered_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported: usize,
    pub skipped: usize,
}

pub fn run(db: &mut Database, args: &ImportArgs) -> Result<()> {
    let stdin = io::stdin();
    let summary = import_lines(db, stdin.lock(), args.operator.as_deref())?;

    println!(
        "Imported {} record(s), skipped {}.",
        summary.imported, summary.skipped
    );

    if summary.imported > 0 {
        let recomputed = db.recompute_all_stats(Utc::now())?;
        println!("Recomputed statistics for {} subject(s).", recomputed.updated);
    }
    Ok(())
}

fn import_lines<R: BufRead>(
    db: &mut Database,
    reader: R,
    default_operator: Option<&str>,
) -> Result<ImportSummary> {
    let mut summary = ImportSummary::default();

    for (idx, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("failed to read line {}", idx + 1))?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        match import_one(db, trimmed, default_operator) {
            Ok(()) => summary.imported += 1,
            Err(err) => {
                eprintln!("line {}: {err:#}", idx + 1);
                summary.skipped += 1;
            }
        }
    }
    Ok(summary)
}

fn import_one(db: &mut Database, line: &str, default_operator: Option<&str>) -> Result<()> {
    let parsed: ImportLine = serde_json::from_str(line).context("invalid JSON")?;

    let operator = parsed
        .operator
        .as_deref()
        .or(default_operator)
        .context("missing operator and no --operator default given")?;
    let operator_id = util::operator_id(db, operator)?;

    let account = util::account(&parsed.account)?;
    let (attendee, _name) = db.resolve_attendee(&account)?;

    let method = match parsed.method.as_deref() {
        Some(value) => value
            .parse::<RegistrationMethod>()
            .with_context(|| format!("invalid method {value:?}"))?,
        None => RegistrationMethod::Imported,
    };

    let request = SubmitRequest {
        attendee,
        event_id: EventId::new(parsed.event_id),
        operator_id,
        method,
        note: parsed.note,
        skip_time_window: true,
    };
    let registered_at = parsed.registered_at.unwrap_or_else(Utc::now);
    db.submit_attendance(&request, registered_at)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Cursor;

    use att_core::AccountNumber;
    use att_db::NewEvent;
    use chrono::{NaiveDate, NaiveTime, TimeZone};

    fn seeded_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        let now = Utc.with_ymd_and_hms(2025, 10, 20, 8, 0, 0).unwrap();
        db.insert_subject(&AccountNumber::new("20251001").unwrap(), "Ada Lovelace", now)
            .unwrap();
        db.insert_operator(&AccountNumber::new("90000001").unwrap(), "Front Desk", true)
            .unwrap();
        db.insert_event(&NewEvent {
            title: "IIoT Workshop".to_string(),
            date: NaiveDate::from_ymd_opt(2025, 10, 21).unwrap(),
            start_time: NaiveTime::from_hms_opt(12, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(13, 0, 0).unwrap(),
        })
        .unwrap();
        db
    }

    #[test]
    fn import_uses_default_operator_and_window_skip() {
        let mut db = seeded_db();
        // Historical timestamp far outside the registration window.
        let input = r#"{"account":"20251001","event_id":1,"registered_at":"2025-10-21T18:00:00Z"}"#;

        let summary = import_lines(&mut db, Cursor::new(input), Some("90000001")).unwrap();
        assert_eq!(summary, ImportSummary { imported: 1, skipped: 0 });

        let records = db
            .attendee_records(att_core::AttendeeRef::Subject(att_core::SubjectId::new(1)))
            .unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].method, RegistrationMethod::Imported);
    }

    #[test]
    fn bad_lines_are_skipped_not_fatal() {
        let mut db = seeded_db();
        let input = concat!(
            "not valid json\n",
            r#"{"account":"20251001","event_id":1,"operator":"90000001"}"#,
            "\n",
            // Duplicate of the line above.
            r#"{"account":"20251001","event_id":1,"operator":"90000001"}"#,
            "\n",
        );

        let summary = import_lines(&mut db, Cursor::new(input), None).unwrap();
        assert_eq!(summary, ImportSummary { imported: 1, skipped: 2 });
    }

    #[test]
    fn missing_operator_without_default_is_skipped() {
        let mut db = seeded_db();
        let input = r#"{"account":"20251001","event_id":1}"#;
        let summary = import_lines(&mut db, Cursor::new(input), None).unwrap();
        assert_eq!(summary, ImportSummary { imported: 0, skipped: 1 });
    }
}
