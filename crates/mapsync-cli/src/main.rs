//! mapsync CLI - Command-line interface for mapsync
//!
//! Provides commands for:
//! - Initializing the database/project pair in either direction
//! - Viewing synchronization status
//! - Pulling new project versions into the database
//! - Pushing database edits to the hosted project

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{
    init::{InitFromDbCommand, InitFromGpkgCommand},
    pull::PullCommand,
    push::PushCommand,
    status::StatusCommand,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "mapsync",
    version,
    about = "Two-way synchronization between a PostGIS database and a hosted GeoPackage project"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create the database schemas from the project's GeoPackage
    InitFromGpkg(InitFromGpkgCommand),
    /// Create the GeoPackage and project version from the database
    InitFromDb(InitFromDbCommand),
    /// Show pending changes in both directions
    Status(StatusCommand),
    /// Download new project versions and merge them into the database
    Pull(PullCommand),
    /// Upload database edits as a new project version
    Push(PushCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup tracing
    let filter = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .init();

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };

    let command = match cli.command {
        Some(command) => command,
        None => {
            // bare invocation shows usage and succeeds
            Cli::command().print_help()?;
            return Ok(());
        }
    };

    let config = cli.config.as_deref();
    match command {
        Commands::InitFromGpkg(cmd) => cmd.execute(config, format).await,
        Commands::InitFromDb(cmd) => cmd.execute(config, format).await,
        Commands::Status(cmd) => cmd.execute(config, format).await,
        Commands::Pull(cmd) => cmd.execute(config, format).await,
        Commands::Push(cmd) => cmd.execute(config, format).await,
    }
}
