//! Guest roster management.

use anyhow::{Result, anyhow};

use att_db::Database;

use super::util;

pub fn add(db: &Database, account: &str, name: &str) -> Result<()> {
    let account = util::account(account)?;
    db.insert_guest(&account, name)?;
    println!("Added guest {account}: {name} (pending approval)");
    Ok(())
}

pub fn approve(db: &Database, account: &str) -> Result<()> {
    let account = util::account(account)?;
    if !db.approve_guest(&account)? {
        return Err(anyhow!("no guest with account number {account}"));
    }
    println!("Approved guest {account}.");
    Ok(())
}

pub fn list(db: &Database, json: bool) -> Result<()> {
    let guests = db.list_guests()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&guests)?);
        return Ok(());
    }

    if guests.is_empty() {
        println!("No guests.");
        return Ok(());
    }
    for guest in guests {
        println!(
            "{}  {} ({})",
            guest.account_number, guest.full_name, guest.status
        );
    }
    Ok(())
}
