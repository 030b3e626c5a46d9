//! Recompute statistics, for one subject or everyone.

use anyhow::Result;
use chrono::Utc;
use clap::Args;

use att_db::Database;

use super::util;

#[derive(Debug, Args)]
pub struct RecomputeArgs {
    /// Recompute only this subject instead of the full pass.
    #[arg(long)]
    pub account: Option<String>,
}

pub fn run(db: &Database, args: &RecomputeArgs) -> Result<()> {
    if let Some(account) = &args.account {
        let subject = util::subject(db, account)?;
        let stats = db.recompute_subject_stats(subject.id, Utc::now())?;
        println!(
            "{}: {}/{} blocks ({:.2}%)",
            subject.account_number, stats.attended_blocks, stats.total_blocks, stats.percentage
        );
        return Ok(());
    }

    let summary = db.recompute_all_stats(Utc::now())?;
    if summary.updated == 0 && summary.failed == 0 {
        println!("No subjects to recompute.");
        return Ok(());
    }

    println!("Updated statistics for {} subject(s).", summary.updated);
    if summary.failed > 0 {
        println!("{} subject(s) failed; see log output.", summary.failed);
    }
    Ok(())
}
