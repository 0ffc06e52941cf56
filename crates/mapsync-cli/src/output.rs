//! CLI output rendering
//!
//! Human output goes to stdout with a short line per project pair; JSON mode
//! prints one machine-readable document for the whole run. Diagnostic detail
//! stays on the tracing layer, this module only renders results.

use mapsync_core::domain::changes::total_changes;
use mapsync_core::domain::SyncOutcome;
use mapsync_engine::PairReport;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputFormat {
    Human,
    Json,
}

/// Render the reports of one finished run
pub fn print_reports(format: OutputFormat, reports: &[PairReport]) {
    match format {
        OutputFormat::Human => {
            for report in reports {
                print_human(report);
            }
        }
        OutputFormat::Json => {
            let documents: Vec<serde_json::Value> = reports.iter().map(to_json).collect();
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({ "projects": documents }))
                    .unwrap_or_default()
            );
        }
    }
}

fn print_human(report: &PairReport) {
    if let Some(status) = &report.status {
        println!("{}", report.project);
        println!("  local version:  {}", status.local_version);
        println!("  server version: {}", status.server_version);
        if status.in_sync() {
            println!("  in sync");
            return;
        }
        if !status.pending_remote.is_empty() {
            println!("  pending on the server (run pull):");
            print!("{}", status.pending_remote.describe());
        }
        if !status.db_changes.is_empty() {
            println!(
                "  unpushed database changes (run push): {} rows",
                total_changes(&status.db_changes)
            );
            for item in &status.db_changes {
                println!("    {item}");
            }
        }
        return;
    }

    match &report.outcome {
        Some(SyncOutcome::Applied { version }) => {
            println!("\u{2713} {}: now at {version}", report.project);
        }
        Some(SyncOutcome::NoOpAlreadySynced) => {
            println!("\u{2713} {}: already up to date", report.project);
        }
        Some(SyncOutcome::PendingManualResolution { summary }) => {
            println!(
                "\u{26a0} {}: {} pending rows, run pull/push to synchronize",
                report.project,
                total_changes(summary)
            );
            for item in summary {
                println!("    {item}");
            }
        }
        None => {}
    }
}

fn to_json(report: &PairReport) -> serde_json::Value {
    if let Some(status) = &report.status {
        return serde_json::json!({
            "project": report.project,
            "local_version": status.local_version,
            "server_version": status.server_version,
            "in_sync": status.in_sync(),
            "pending_remote": status.pending_remote,
            "db_changes": status.db_changes,
        });
    }
    let (result, detail) = match &report.outcome {
        Some(SyncOutcome::Applied { version }) => {
            ("applied", serde_json::json!({ "version": version }))
        }
        Some(SyncOutcome::NoOpAlreadySynced) => ("noop", serde_json::Value::Null),
        Some(SyncOutcome::PendingManualResolution { summary }) => {
            ("pending", serde_json::json!({ "summary": summary }))
        }
        None => ("unknown", serde_json::Value::Null),
    };
    serde_json::json!({
        "project": report.project,
        "result": result,
        "detail": detail,
    })
}
