//! Status command - report pending changes in both directions

use anyhow::Result;
use clap::Args;

use mapsync_engine::Operation;

use crate::commands::run_operation;
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct StatusCommand {}

impl StatusCommand {
    pub async fn execute(&self, config: Option<&str>, format: OutputFormat) -> Result<()> {
        run_operation(config, format, Operation::Status).await
    }
}
