//! Subject roster management.

use anyhow::Result;
use chrono::Utc;

use att_db::Database;

use super::util;

pub fn add(db: &Database, account: &str, name: &str) -> Result<()> {
    let account = util::account(account)?;
    let id = db.insert_subject(&account, name, Utc::now())?;
    db.recompute_subject_stats(id, Utc::now())?;
    println!("Added subject {account}: {name}");
    Ok(())
}

pub fn list(db: &Database, json: bool) -> Result<()> {
    let subjects = db.list_subjects()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&subjects)?);
        return Ok(());
    }

    if subjects.is_empty() {
        println!("No subjects.");
        return Ok(());
    }
    for subject in subjects {
        println!("{}  {}", subject.account_number, subject.full_name);
    }
    Ok(())
}
