//! Show or change the registration policy.

use anyhow::Result;

use att_db::Database;

pub fn show(db: &Database) -> Result<()> {
    let policy = db.policy()?;
    println!(
        "Minimum attendance: {:.2}%",
        policy.minimum_attendance_percentage
    );
    println!(
        "Registration window: {} minute(s) before start to {} minute(s) after start",
        policy.minutes_before_event, policy.minutes_after_start
    );
    Ok(())
}

pub fn set(
    db: &Database,
    minimum: Option<f64>,
    minutes_before: Option<i64>,
    minutes_after: Option<i64>,
) -> Result<()> {
    let mut policy = db.policy()?;
    if let Some(value) = minimum {
        policy.minimum_attendance_percentage = value;
    }
    if let Some(value) = minutes_before {
        policy.minutes_before_event = value;
    }
    if let Some(value) = minutes_after {
        policy.minutes_after_start = value;
    }
    db.set_policy(&policy)?;

    // The minimum is evaluated live against cached percentages, so no
    // recomputation is needed here.
    println!("Policy updated.");
    show(db)
}
