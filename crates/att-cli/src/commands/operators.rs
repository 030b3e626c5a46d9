//! Operator roster management.

use anyhow::Result;

use att_db::Database;

use super::util;

pub fn add(db: &Database, account: &str, name: &str, registrar: bool) -> Result<()> {
    let account = util::account(account)?;
    db.insert_operator(&account, name, registrar)?;
    let role = if registrar { "registrar" } else { "operator" };
    println!("Added {role} {account}: {name}");
    Ok(())
}

pub fn list(db: &Database, json: bool) -> Result<()> {
    let operators = db.list_operators()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&operators)?);
        return Ok(());
    }

    if operators.is_empty() {
        println!("No operators.");
        return Ok(());
    }
    for operator in operators {
        let role = if operator.is_registrar {
            "registrar"
        } else {
            "operator"
        };
        println!(
            "{}  {} ({role})",
            operator.account_number, operator.full_name
        );
    }
    Ok(())
}
