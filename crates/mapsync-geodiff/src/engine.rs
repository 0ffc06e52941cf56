//! GeodiffEngine - IDiffEngine implementation over the geodiff executable
//!
//! Translates port operations into geodiff invocations. geodiff has two
//! invocation forms: a single-driver form when both datasets live on the same
//! backend (e.g. two schemas of one database) and a dual-driver form for
//! cross-backend operations (e.g. GeoPackage against a database schema).
//!
//! ## Design Notes
//!
//! - Changeset summaries and details are not printed by geodiff; it writes
//!   JSON to a file we name. Those temp files are removed before reuse and
//!   after parsing so a later run can never pick up a stale artifact.
//! - Output changeset paths are also cleared before a diff, for the same
//!   reason.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use mapsync_core::domain::{Dataset, RowChange, TableChangeSummary};
use mapsync_core::ports::IDiffEngine;

use crate::runner::run_geodiff;

/// Envelope of `geodiff as-summary` output
#[derive(Debug, Deserialize)]
struct SummaryDocument {
    geodiff_summary: Vec<TableChangeSummary>,
}

/// Envelope of `geodiff as-json` output
#[derive(Debug, Deserialize)]
struct DetailsDocument {
    geodiff: Vec<RowChange>,
}

/// IDiffEngine implementation spawning the geodiff binary
pub struct GeodiffEngine {
    exe: String,
}

impl GeodiffEngine {
    pub fn new(exe: impl Into<String>) -> Self {
        Self { exe: exe.into() }
    }

    async fn run(&self, args: Vec<String>) -> Result<()> {
        run_geodiff(&self.exe, &args).await
    }

    /// Remove a file if it exists, so no stale artifact is ever read
    async fn clear(path: &Path) -> Result<()> {
        match tokio::fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Cannot remove {}", path.display())),
        }
    }

    /// Temp path for a JSON rendering of a changeset
    fn json_output_path(changeset: &Path, kind: &str) -> PathBuf {
        let name = changeset
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "changeset".to_string());
        std::env::temp_dir().join(format!("{name}-{kind}.json"))
    }

    /// Run `as-summary`/`as-json` and read back the JSON document
    async fn render_json(&self, subcommand: &str, changeset: &Path, kind: &str) -> Result<String> {
        let output = Self::json_output_path(changeset, kind);
        Self::clear(&output).await?;

        self.run(vec![
            subcommand.to_string(),
            changeset.display().to_string(),
            output.display().to_string(),
        ])
        .await?;

        let content = tokio::fs::read_to_string(&output)
            .await
            .with_context(|| format!("geodiff produced no output at {}", output.display()))?;
        Self::clear(&output).await?;
        Ok(content)
    }
}

// Argument layout helpers. geodiff addresses a dataset as
// (driver, connection descriptor, name).
fn dual_driver_args(subcommand: &str, a: &Dataset, b: &Dataset) -> Vec<String> {
    vec![
        subcommand.to_string(),
        "--driver-1".to_string(),
        a.driver().to_string(),
        a.conn_info().to_string(),
        "--driver-2".to_string(),
        b.driver().to_string(),
        b.conn_info().to_string(),
        a.name(),
        b.name(),
    ]
}

#[async_trait]
impl IDiffEngine for GeodiffEngine {
    async fn create_changeset(&self, from: &Dataset, to: &Dataset, output: &Path) -> Result<()> {
        Self::clear(output).await?;
        debug!(%from, %to, output = %output.display(), "Creating changeset");

        let args = if from.same_backend(to) {
            vec![
                "diff".to_string(),
                "--driver".to_string(),
                from.driver().to_string(),
                from.conn_info().to_string(),
                from.name(),
                to.name(),
                output.display().to_string(),
            ]
        } else {
            let mut args = dual_driver_args("diff", from, to);
            args.push(output.display().to_string());
            args
        };
        self.run(args).await
    }

    async fn apply_changeset(&self, target: &Dataset, changeset: &Path) -> Result<()> {
        debug!(%target, changeset = %changeset.display(), "Applying changeset");
        self.run(vec![
            "apply".to_string(),
            "--driver".to_string(),
            target.driver().to_string(),
            target.conn_info().to_string(),
            target.name(),
            changeset.display().to_string(),
        ])
        .await
    }

    async fn rebase(
        &self,
        base: &Dataset,
        ours: &Dataset,
        base2theirs: &Path,
        conflicts: &Path,
    ) -> Result<()> {
        debug!(%base, %ours, "Rebasing database edits onto upstream changes");
        Self::clear(conflicts).await?;
        self.run(vec![
            "rebase-db".to_string(),
            "--driver".to_string(),
            base.driver().to_string(),
            base.conn_info().to_string(),
            base.name(),
            ours.name(),
            base2theirs.display().to_string(),
            conflicts.display().to_string(),
        ])
        .await
    }

    async fn make_copy(&self, src: &Dataset, dst: &Dataset) -> Result<()> {
        debug!(%src, %dst, "Copying dataset");
        self.run(dual_driver_args("copy", src, dst)).await
    }

    async fn changes_summary(&self, changeset: &Path) -> Result<Vec<TableChangeSummary>> {
        let content = self.render_json("as-summary", changeset, "summary").await?;
        let doc: SummaryDocument =
            serde_json::from_str(&content).context("Cannot parse geodiff summary output")?;
        Ok(doc.geodiff_summary)
    }

    async fn changes_details(&self, changeset: &Path) -> Result<Vec<RowChange>> {
        let content = self.render_json("as-json", changeset, "details").await?;
        let doc: DetailsDocument =
            serde_json::from_str(&content).context("Cannot parse geodiff changeset output")?;
        Ok(doc.geodiff)
    }
}
