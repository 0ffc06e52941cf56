//! Diff engine port (driven/secondary port)
//!
//! Interface to the external binary diff/patch/rebase machinery operating on
//! two datasets of the same schema. The primary implementation shells out to
//! the `geodiff` executable, but the engine never sees process details - only
//! typed operations and their results.
//!
//! ## Design Notes
//!
//! - Uses `anyhow::Result` because errors at port boundaries are
//!   adapter-specific and don't need domain-level classification; the engine
//!   wraps them into `SyncError::Collaborator`.
//! - Changesets are opaque files identified by path. A zero-byte changeset
//!   means "no differences"; callers check the size themselves.
//! - Every failure is fatal for the current operation - the contract has no
//!   partial retry.

use std::path::Path;

use async_trait::async_trait;

use crate::domain::{Dataset, RowChange, TableChangeSummary};

/// Operations the synchronization engine needs from the diff machinery
#[async_trait]
pub trait IDiffEngine {
    /// Compute the changeset turning `from` into `to` and write it to `output`
    async fn create_changeset(
        &self,
        from: &Dataset,
        to: &Dataset,
        output: &Path,
    ) -> anyhow::Result<()>;

    /// Apply a previously computed changeset to `target`
    async fn apply_changeset(&self, target: &Dataset, changeset: &Path) -> anyhow::Result<()>;

    /// Rebase local edits in `ours` on top of upstream history
    ///
    /// `base2theirs` is the changeset from the common ancestor to the new
    /// upstream state. `ours` is mutated in place to the equivalent of
    /// replaying its edits on top of `base2theirs`; structural conflicts are
    /// resolved by a fixed policy internal to the diff engine and written to
    /// `conflicts` for diagnosis.
    async fn rebase(
        &self,
        base: &Dataset,
        ours: &Dataset,
        base2theirs: &Path,
        conflicts: &Path,
    ) -> anyhow::Result<()>;

    /// Copy the full content of `src` into `dst`, creating it as needed
    async fn make_copy(&self, src: &Dataset, dst: &Dataset) -> anyhow::Result<()>;

    /// Per-table insert/update/delete counts of a changeset
    async fn changes_summary(&self, changeset: &Path) -> anyhow::Result<Vec<TableChangeSummary>>;

    /// Full per-row old/new values of a changeset
    async fn changes_details(&self, changeset: &Path) -> anyhow::Result<Vec<RowChange>>;
}
