//! Push command - upload database edits as a new project version

use anyhow::Result;
use clap::Args;

use mapsync_engine::Operation;

use crate::commands::run_operation;
use crate::output::OutputFormat;

#[derive(Debug, Args)]
pub struct PushCommand {}

impl PushCommand {
    pub async fn execute(&self, config: Option<&str>, format: OutputFormat) -> Result<()> {
        run_operation(config, format, Operation::Push).await
    }
}
