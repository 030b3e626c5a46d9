//! CLI subcommand implementations.

pub mod events;
pub mod export;
pub mod guests;
pub mod import;
pub mod invalidate;
pub mod operators;
pub mod policy;
pub mod recompute;
pub mod register;
pub mod stats;
pub mod status;
pub mod subjects;
mod util;
