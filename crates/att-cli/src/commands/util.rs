//! Shared parsing and lookup helpers for subcommands.

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDate, NaiveTime};

use att_core::{AccountNumber, OperatorId};
use att_db::{Database, SubjectRecord};

pub fn account(value: &str) -> Result<AccountNumber> {
    AccountNumber::new(value).with_context(|| format!("invalid account number {value:?}"))
}

pub fn date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("invalid date {value:?}, expected YYYY-MM-DD"))
}

/// Accepts `HH:MM` or `HH:MM:SS`.
pub fn clock(value: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(value, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M"))
        .with_context(|| format!("invalid time {value:?}, expected HH:MM or HH:MM:SS"))
}

pub fn operator_id(db: &Database, account_value: &str) -> Result<OperatorId> {
    let account = account(account_value)?;
    db.operator_by_account(&account)?
        .map(|op| op.id)
        .ok_or_else(|| anyhow!("no operator with account number {account}"))
}

pub fn subject(db: &Database, account_value: &str) -> Result<SubjectRecord> {
    let account = account(account_value)?;
    db.subject_by_account(&account)?
        .ok_or_else(|| anyhow!("no subject with account number {account}"))
}
