//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::{export, import, invalidate, recompute, register, stats};

/// Conference attendance tracker.
///
/// Records who attended which session, enforces registration rules, and
/// reports per-subject attendance percentages over clustered time blocks.
#[derive(Debug, Parser)]
#[command(name = "att", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Register an attendee for an event.
    Register(register::RegisterArgs),

    /// Invalidate (or delete) an attendance record.
    Invalidate(invalidate::InvalidateArgs),

    /// Show a subject's attendance statistics.
    Stats(stats::StatsArgs),

    /// Recompute statistics for one subject or everyone.
    Recompute(recompute::RecomputeArgs),

    /// Manage the event catalog.
    Events {
        #[command(subcommand)]
        action: EventsAction,
    },

    /// Manage registered subjects.
    Subjects {
        #[command(subcommand)]
        action: SubjectsAction,
    },

    /// Manage external guests.
    Guests {
        #[command(subcommand)]
        action: GuestsAction,
    },

    /// Manage operators.
    Operators {
        #[command(subcommand)]
        action: OperatorsAction,
    },

    /// Import attendance records from JSONL on stdin.
    Import(import::ImportArgs),

    /// Export subjects and their statistics as JSONL.
    Export(export::ExportArgs),

    /// Show or change the registration policy.
    Policy {
        #[command(subcommand)]
        action: PolicyAction,
    },

    /// Show database overview.
    Status,
}

/// Event catalog actions.
#[derive(Debug, Subcommand)]
pub enum EventsAction {
    /// Add an event.
    Add {
        /// Session title.
        title: String,

        /// Date (YYYY-MM-DD).
        #[arg(long)]
        date: String,

        /// Start time (HH:MM or HH:MM:SS).
        #[arg(long)]
        start: String,

        /// End time (HH:MM or HH:MM:SS).
        #[arg(long)]
        end: String,
    },

    /// List events.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Show the clustered time blocks of the active catalog.
    Slots,

    /// List attendance records for an event, newest first.
    Records {
        /// Event id.
        id: i64,
    },

    /// Reactivate an event.
    Activate {
        /// Event id.
        id: i64,
    },

    /// Deactivate an event, excluding it from statistics and conflicts.
    Deactivate {
        /// Event id.
        id: i64,
    },
}

/// Subject roster actions.
#[derive(Debug, Subcommand)]
pub enum SubjectsAction {
    /// Add a subject.
    Add {
        /// Account number.
        account: String,

        /// Full name.
        name: String,
    },

    /// List subjects.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Guest roster actions.
#[derive(Debug, Subcommand)]
pub enum GuestsAction {
    /// Add a guest in pending status.
    Add {
        /// Account number.
        account: String,

        /// Full name.
        name: String,
    },

    /// Approve a pending guest for registration.
    Approve {
        /// Account number.
        account: String,
    },

    /// List guests.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Operator roster actions.
#[derive(Debug, Subcommand)]
pub enum OperatorsAction {
    /// Add an operator.
    Add {
        /// Account number.
        account: String,

        /// Full name.
        name: String,

        /// Grant the registrar capability.
        #[arg(long)]
        registrar: bool,
    },

    /// List operators.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

/// Policy actions.
#[derive(Debug, Subcommand)]
pub enum PolicyAction {
    /// Show the current policy.
    Show,

    /// Change policy values. Unset flags keep their current value.
    Set {
        /// Minimum attendance percentage a subject must reach.
        #[arg(long)]
        minimum: Option<f64>,

        /// Minutes before event start that registration opens.
        #[arg(long)]
        minutes_before: Option<i64>,

        /// Minutes after event start that registration closes.
        #[arg(long)]
        minutes_after: Option<i64>,
    },
}
