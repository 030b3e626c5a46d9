//! Event catalog management.

use anyhow::{Result, anyhow};
use chrono::Utc;

use att_core::{EventId, cluster_slots};
use att_db::{Database, NewEvent};

use super::util;

pub fn add(db: &Database, title: &str, date: &str, start: &str, end: &str) -> Result<()> {
    let id = db.insert_event(&NewEvent {
        title: title.to_string(),
        date: util::date(date)?,
        start_time: util::clock(start)?,
        end_time: util::clock(end)?,
    })?;
    println!("Added event {id}: {title}");

    // The catalog changed, so every subject's block totals are stale.
    let summary = db.recompute_all_stats(Utc::now())?;
    tracing::debug!(updated = summary.updated, "statistics refreshed");
    Ok(())
}

pub fn list(db: &Database, json: bool) -> Result<()> {
    let events = db.list_events()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&events)?);
        return Ok(());
    }

    if events.is_empty() {
        println!("No events.");
        return Ok(());
    }
    for event in events {
        let marker = if event.is_active { "" } else { " (inactive)" };
        println!(
            "{}: {} {}-{}{marker}  {}",
            event.id, event.date, event.start_time, event.end_time, event.title
        );
    }
    Ok(())
}

pub fn slots(db: &Database) -> Result<()> {
    let events = db.active_events()?;
    let slots = cluster_slots(&events);

    if slots.is_empty() {
        println!("No active events.");
        return Ok(());
    }
    println!("{} time block(s):", slots.len());
    for slot in slots {
        let ids: Vec<String> = slot.events.iter().map(ToString::to_string).collect();
        println!(
            "  {} {}-{}  events [{}]",
            slot.date,
            slot.start,
            slot.end,
            ids.join(", ")
        );
    }
    Ok(())
}

pub fn records(db: &Database, id: i64) -> Result<()> {
    let id = EventId::new(id);
    if db.event(id)?.is_none() {
        return Err(anyhow!("no event with id {id}"));
    }

    let records = db.event_records(id)?;
    if records.is_empty() {
        println!("No attendance records for event {id}.");
        return Ok(());
    }
    for record in records {
        let marker = if record.is_valid { "" } else { " (invalid)" };
        println!(
            "{}: {} at {} via {}{marker}",
            record.id, record.attendee, record.registered_at, record.method
        );
    }
    Ok(())
}

pub fn set_active(db: &Database, id: i64, is_active: bool) -> Result<()> {
    let id = EventId::new(id);
    if !db.set_event_active(id, is_active)? {
        return Err(anyhow!("no event with id {id}"));
    }
    let verb = if is_active { "Activated" } else { "Deactivated" };
    println!("{verb} event {id}.");

    let summary = db.recompute_all_stats(Utc::now())?;
    println!("Recomputed statistics for {} subject(s).", summary.updated);
    Ok(())
}
