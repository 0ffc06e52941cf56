//! geodiff process invocation
//!
//! Runs the configured executable, relays its stderr through tracing, and
//! fails with the full argument list on a non-zero exit. geodiff writes its
//! diagnostics to stderr regardless of outcome, so stderr is always captured
//! and logged.

use std::process::Stdio;

use anyhow::{bail, Context, Result};
use tokio::process::Command;
use tracing::{debug, warn};

/// Verbosity for the geodiff logger, passed via environment.
/// 0 = nothing, 1 = errors, 2 = warnings, 3 = info, 4 = debug.
const GEODIFF_LOGGER_LEVEL: &str = "4";

/// Run geodiff with the given arguments, treating non-zero exit as an error
pub async fn run_geodiff(exe: &str, args: &[String]) -> Result<()> {
    debug!(exe, ?args, "Running geodiff");

    let output = Command::new(exe)
        .args(args)
        .env("GEODIFF_LOGGER_LEVEL", GEODIFF_LOGGER_LEVEL)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .with_context(|| format!("Failed to launch geodiff executable: {exe}"))?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
        for line in stderr.lines() {
            warn!(target: "geodiff", "{line}");
        }
    }

    if !output.status.success() {
        bail!("geodiff failed: {exe} {}", args.join(" "));
    }
    Ok(())
}
