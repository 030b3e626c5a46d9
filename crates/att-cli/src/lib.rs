//! Attendance tracker CLI library.
//!
//! This crate provides the command-line interface over the attendance core
//! and its SQLite store.

mod cli;
pub mod commands;
mod config;

pub use cli::{
    Cli, Commands, EventsAction, GuestsAction, OperatorsAction, PolicyAction, SubjectsAction,
};
pub use config::Config;
