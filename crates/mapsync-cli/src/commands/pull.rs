//! Pull command - merge new project versions into the database

use anyhow::Result;
use clap::Args;

use mapsync_engine::Operation;

use crate::commands::run_operation;
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct PullCommand {}

impl PullCommand {
    pub async fn execute(&self, config: Option<&str>, format: OutputFormat) -> Result<()> {
        run_operation(config, format, Operation::Pull).await
    }
}
