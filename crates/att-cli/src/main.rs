use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use att_cli::commands::{
    events, export, guests, import, invalidate, operators, policy, recompute, register, stats,
    status, subjects,
};
use att_cli::{
    Cli, Commands, Config, EventsAction, GuestsAction, OperatorsAction, PolicyAction,
    SubjectsAction,
};

/// Load config and open database, ensuring the parent directory exists.
fn open_database(config_path: Option<&Path>) -> Result<(att_db::Database, Config)> {
    let config = Config::load_from(config_path).context("failed to load configuration")?;
    tracing::debug!(?config, "loaded configuration");

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent).context("failed to create database directory")?;
    }

    let db = att_db::Database::open(&config.database_path).context("failed to open database")?;
    Ok((db, config))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    // try_init so tests that run multiple commands in-process don't panic.
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();

    match &cli.command {
        Some(Commands::Register(args)) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            register::run(&mut db, args)?;
        }
        Some(Commands::Invalidate(args)) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            invalidate::run(&db, args)?;
        }
        Some(Commands::Stats(args)) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            stats::run(&mut std::io::stdout(), &db, args)?;
        }
        Some(Commands::Recompute(args)) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            recompute::run(&db, args)?;
        }
        Some(Commands::Events { action }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            match action {
                EventsAction::Add {
                    title,
                    date,
                    start,
                    end,
                } => events::add(&db, title, date, start, end)?,
                EventsAction::List { json } => events::list(&db, *json)?,
                EventsAction::Slots => events::slots(&db)?,
                EventsAction::Records { id } => events::records(&db, *id)?,
                EventsAction::Activate { id } => events::set_active(&db, *id, true)?,
                EventsAction::Deactivate { id } => events::set_active(&db, *id, false)?,
            }
        }
        Some(Commands::Subjects { action }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            match action {
                SubjectsAction::Add { account, name } => subjects::add(&db, account, name)?,
                SubjectsAction::List { json } => subjects::list(&db, *json)?,
            }
        }
        Some(Commands::Guests { action }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            match action {
                GuestsAction::Add { account, name } => guests::add(&db, account, name)?,
                GuestsAction::Approve { account } => guests::approve(&db, account)?,
                GuestsAction::List { json } => guests::list(&db, *json)?,
            }
        }
        Some(Commands::Operators { action }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            match action {
                OperatorsAction::Add {
                    account,
                    name,
                    registrar,
                } => operators::add(&db, account, name, *registrar)?,
                OperatorsAction::List { json } => operators::list(&db, *json)?,
            }
        }
        Some(Commands::Import(args)) => {
            let (mut db, _config) = open_database(cli.config.as_deref())?;
            import::run(&mut db, args)?;
        }
        Some(Commands::Export(args)) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            export::run(&mut std::io::stdout(), &db, args)?;
        }
        Some(Commands::Policy { action }) => {
            let (db, _config) = open_database(cli.config.as_deref())?;
            match action {
                PolicyAction::Show => policy::show(&db)?,
                PolicyAction::Set {
                    minimum,
                    minutes_before,
                    minutes_after,
                } => policy::set(&db, *minimum, *minutes_before, *minutes_after)?,
            }
        }
        Some(Commands::Status) => {
            let (db, config) = open_database(cli.config.as_deref())?;
            status::run(&mut std::io::stdout(), &db, &config)?;
        }
        None => {
            // No subcommand, show help
            use clap::CommandFactory;
            Cli::command().print_help()?;
            println!();
        }
    }

    Ok(())
}
