//! Changeset summaries, row-level details, and pending file reports
//!
//! Record types for what the diff engine and the project client report back.
//! The diff engine emits per-table counts (`as-summary`) and per-row values
//! (`as-json`); the project client reports added/updated/removed files.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};

// ============================================================================
// Diff engine summaries
// ============================================================================

/// Per-table insert/update/delete counts from a changeset summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableChangeSummary {
    pub table: String,
    #[serde(rename = "insert")]
    pub inserts: u64,
    #[serde(rename = "update")]
    pub updates: u64,
    #[serde(rename = "delete")]
    pub deletes: u64,
}

impl TableChangeSummary {
    pub fn total(&self) -> u64 {
        self.inserts + self.updates + self.deletes
    }
}

impl Display for TableChangeSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        // fixed-width layout so multi-table summaries line up
        write!(
            f,
            "{:20} {:4} {:4} {:4}",
            self.table, self.inserts, self.updates, self.deletes
        )
    }
}

/// Sums the row counts across all tables of a summary
pub fn total_changes(summary: &[TableChangeSummary]) -> u64 {
    summary.iter().map(TableChangeSummary::total).sum()
}

// ============================================================================
// Diff engine row details
// ============================================================================

/// Kind of row-level edit within a changeset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOperation {
    Insert,
    Update,
    Delete,
}

/// Old/new value of a single column in a row edit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnChange {
    pub column: String,
    #[serde(default)]
    pub old: Option<serde_json::Value>,
    #[serde(default)]
    pub new: Option<serde_json::Value>,
}

/// One row-level edit with its per-column old/new values
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RowChange {
    pub table: String,
    #[serde(rename = "type")]
    pub operation: ChangeOperation,
    pub changes: Vec<ColumnChange>,
}

// ============================================================================
// Project client file reports
// ============================================================================

/// A file entry as the server reports it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerFile {
    pub path: String,
    pub size: u64,
    #[serde(default)]
    pub checksum: Option<String>,
}

/// One changed file in a pending-changes report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileChange {
    pub path: String,
    #[serde(default)]
    pub size: u64,
}

/// Files pending transfer, grouped by kind of change
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PendingFiles {
    pub added: Vec<FileChange>,
    pub updated: Vec<FileChange>,
    pub removed: Vec<FileChange>,
}

impl PendingFiles {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.updated.is_empty() && self.removed.is_empty()
    }

    /// Human-readable one-file-per-line listing
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for item in &self.added {
            out.push_str(&format!("  added:   {}\n", item.path));
        }
        for item in &self.updated {
            out.push_str(&format!("  updated: {}\n", item.path));
        }
        for item in &self.removed {
            out.push_str(&format!("  removed: {}\n", item.path));
        }
        out
    }
}
