//! Multi-pair orchestration
//!
//! The [`Orchestrator`] runs one requested operation across every configured
//! schema/project pair, in configuration order. The first failing pair aborts
//! the whole run: later pairs are not attempted, and the process exit status
//! reflects the failure. Pairs are independent, so a partial run leaves the
//! completed pairs fully consistent.

use tracing::{error, info};

use mapsync_core::domain::{InitSource, StatusReport, SyncError, SyncOutcome};

use crate::engine::SyncEngine;

/// The operation requested on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    InitFromGpkg,
    InitFromDb,
    Status,
    Pull,
    Push,
}

/// What one pair produced during a run
#[derive(Debug)]
pub struct PairReport {
    /// `namespace/name` of the pair's hosted project
    pub project: String,
    /// Outcome for mutating operations, absent for `status`
    pub outcome: Option<SyncOutcome>,
    /// Report for `status`, absent for mutating operations
    pub status: Option<StatusReport>,
}

/// Runs an operation over all configured pairs, failing fast
pub struct Orchestrator {
    engines: Vec<SyncEngine>,
}

impl Orchestrator {
    pub fn new(engines: Vec<SyncEngine>) -> Self {
        Self { engines }
    }

    pub async fn run(&self, operation: Operation) -> Result<Vec<PairReport>, SyncError> {
        let mut reports = Vec::with_capacity(self.engines.len());
        for engine in &self.engines {
            let project = engine.project().to_string();
            info!(%project, ?operation, "Processing pair");
            let report = match operation {
                Operation::Status => {
                    let status = engine.status().await.map_err(|e| {
                        error!(%project, "Status failed: {e}");
                        e
                    })?;
                    PairReport {
                        project,
                        outcome: None,
                        status: Some(status),
                    }
                }
                _ => {
                    let result = match operation {
                        Operation::InitFromGpkg => engine.init(InitSource::Gpkg).await,
                        Operation::InitFromDb => engine.init(InitSource::Database).await,
                        Operation::Pull => engine.pull().await,
                        Operation::Push => engine.push().await,
                        Operation::Status => unreachable!(),
                    };
                    let outcome = result.map_err(|e| {
                        error!(%project, "Operation failed: {e}");
                        e
                    })?;
                    PairReport {
                        project,
                        outcome: Some(outcome),
                        status: None,
                    }
                }
            };
            reports.push(report);
        }
        Ok(reports)
    }
}
