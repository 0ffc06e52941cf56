//! Operation outcomes
//!
//! `init`, `pull` and `push` report what they did through a tagged result
//! instead of mixing early returns with error unwinding. `status` produces a
//! read-only report for display.

use super::changes::{PendingFiles, TableChangeSummary};
use super::newtypes::ProjectVersion;

/// Which side is authoritative during `init`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitSource {
    /// The GeoPackage in the working copy seeds the database schemas
    Gpkg,
    /// The `modified` database schema seeds the GeoPackage and the project
    Database,
}

/// What a mutating operation did
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Changes were transferred; the pair is now at `version`
    Applied { version: ProjectVersion },
    /// Everything was already consistent; nothing was touched
    NoOpAlreadySynced,
    /// The pair is in a state the operation will not fix on its own;
    /// the summary shows the pending differences the caller must resolve
    /// by running pull/push first
    PendingManualResolution { summary: Vec<TableChangeSummary> },
}

/// Read-only state report produced by `status`
#[derive(Debug, Clone, PartialEq)]
pub struct StatusReport {
    /// Local working-copy version
    pub local_version: ProjectVersion,
    /// Version the server is at
    pub server_version: ProjectVersion,
    /// Files waiting on the server for download (informational)
    pub pending_remote: PendingFiles,
    /// Summary of database edits not yet pushed (`base` → `modified`)
    pub db_changes: Vec<TableChangeSummary>,
}

impl StatusReport {
    /// Whether there is nothing to pull and nothing to push
    pub fn in_sync(&self) -> bool {
        self.pending_remote.is_empty()
            && self.db_changes.is_empty()
            && self.local_version == self.server_version
    }
}
