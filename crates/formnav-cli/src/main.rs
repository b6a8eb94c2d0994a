use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "formnav")]
#[command(about = "FORMNAV CLI - inspect navigation sessions, config and the lock table", long_about = None)]
struct Cli {
    /// Config file to use instead of the platform default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the effective configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Inspect persisted sessions
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
    /// Show which lock buckets the given session ids map to
    LockTable {
        /// Override the configured mask (e.g. 0xFF or 255)
        #[arg(long, value_parser = commands::lock_table::parse_mask)]
        mask: Option<u32>,
        /// Session ids to place in the table
        #[arg(required = true)]
        keys: Vec<String>,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the config as TOML, defaults filled in
    Show,
    /// Print where the config file is read from
    Path,
}

#[derive(Subcommand)]
enum SessionAction {
    /// List stored session ids
    List,
    /// Print one record, by id or by path to its TOML file
    Inspect { target: String },
}

fn main() -> Result<()> {
    formnav_application::logging::init_logging(Some("formnav=warn"), None)?;
    let cli = Cli::parse();
    let config = commands::load_config(cli.config)?;

    match cli.command {
        Commands::Config { action } => match action {
            ConfigAction::Show => commands::config::show(&config)?,
            ConfigAction::Path => commands::config::path(&config)?,
        },
        Commands::Session { action } => match action {
            SessionAction::List => commands::session::list(&config.config)?,
            SessionAction::Inspect { target } => {
                commands::session::inspect(&config.config, &target)?
            }
        },
        Commands::LockTable { mask, keys } => {
            commands::lock_table::show(&config.config, mask, &keys)?
        }
    }

    Ok(())
}
