//! Init commands - create the schema/project pair in either direction

use anyhow::Result;
use clap::Args;

use mapsync_engine::Operation;

use crate::commands::run_operation;
use crate::output::OutputFormat;

/// `mapsync init-from-gpkg`: the project's GeoPackage is authoritative and
/// seeds the `base` and `modified` schemas
#[derive(Debug, Args)]
pub struct InitFromGpkgCommand {}

impl InitFromGpkgCommand {
    pub async fn execute(&self, config: Option<&str>, format: OutputFormat) -> Result<()> {
        run_operation(config, format, Operation::InitFromGpkg).await
    }
}

/// `mapsync init-from-db`: the `modified` schema is authoritative and seeds
/// the GeoPackage, uploaded as a new project version
#[derive(Debug, Args)]
pub struct InitFromDbCommand {}

impl InitFromDbCommand {
    pub async fn execute(&self, config: Option<&str>, format: OutputFormat) -> Result<()> {
        run_operation(config, format, Operation::InitFromDb).await
    }
}
