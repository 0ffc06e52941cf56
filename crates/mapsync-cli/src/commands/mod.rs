//! CLI command implementations
//!
//! Every command follows the same shape: load and validate the configuration,
//! wire the adapters into one engine per configured pair, run the requested
//! operation through the orchestrator, render the reports.

pub mod init;
pub mod pull;
pub mod push;
pub mod status;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use mapsync_core::config::Config;
use mapsync_engine::{Operation, Orchestrator, SyncEngine};
use mapsync_geodiff::GeodiffEngine;
use mapsync_pg::{DatabasePool, PgSchemaCatalog};
use mapsync_remote::{RemoteClient, RemoteProjectClient};

use crate::output::{print_reports, OutputFormat};

/// Load config, wire adapters, run one operation over all pairs
pub async fn run_operation(
    config_path: Option<&str>,
    format: OutputFormat,
    operation: Operation,
) -> Result<()> {
    let config_path = config_path
        .map(PathBuf::from)
        .unwrap_or_else(Config::default_path);
    let config = Config::load(&config_path)?;
    config.validate()?;
    info!(config_path = %config_path.display(), "Loaded configuration");

    // password presence was validated above
    let password = config.password().unwrap_or_default();
    let client = RemoteClient::login(&config.server.url, &config.server.username, &password)
        .await
        .context("Failed to log in to the project server")?;
    let project_client = Arc::new(RemoteProjectClient::new(client));
    let diff_engine = Arc::new(GeodiffEngine::new(&config.geodiff_exe));

    let mut engines = Vec::with_capacity(config.connections.len());
    for conn in &config.connections {
        let pool = DatabasePool::new(&conn.conn_info)?;
        let catalog = Arc::new(PgSchemaCatalog::new(pool));
        engines.push(SyncEngine::new(
            conn.clone(),
            config.working_dir.clone(),
            diff_engine.clone(),
            project_client.clone(),
            catalog,
        )?);
    }

    let orchestrator = Orchestrator::new(engines);
    let reports = orchestrator.run(operation).await?;
    print_reports(format, &reports);
    Ok(())
}
