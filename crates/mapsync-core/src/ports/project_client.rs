//! Project client port (driven/secondary port)
//!
//! Interface to the hosted-project server and the local working copy it
//! manages. The working copy is an on-disk mirror of one project version plus
//! the metadata needed to detect local and remote pending changes.
//!
//! ## Design Notes
//!
//! - `pull` performs its own file-level rebase if local file edits exist;
//!   the synchronization engine guarantees there are none before calling it.
//! - Version arguments are optional where the server default (latest) is
//!   meaningful.

use std::path::Path;

use async_trait::async_trait;

use crate::domain::{PendingFiles, ProjectPath, ProjectVersion, ServerFile};

/// Server-side project metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectInfo {
    /// Version the server is currently at
    pub version: ProjectVersion,
    /// Files making up that version
    pub files: Vec<ServerFile>,
}

/// Operations the synchronization engine needs from the hosted project
#[async_trait]
pub trait IProjectClient {
    /// Fetch current server version and file list for a project
    ///
    /// `since` lets the server include change history relative to a known
    /// version; it does not affect which version is reported.
    async fn project_info(
        &self,
        project: &ProjectPath,
        since: Option<&ProjectVersion>,
    ) -> anyhow::Result<ProjectInfo>;

    /// Download a project into `dir`, at `version` or latest when `None`
    async fn download(
        &self,
        project: &ProjectPath,
        dir: &Path,
        version: Option<&ProjectVersion>,
    ) -> anyhow::Result<()>;

    /// Bring the working copy in `dir` up to the latest server version
    ///
    /// Returns the file changes that were applied locally.
    async fn pull(&self, dir: &Path) -> anyhow::Result<PendingFiles>;

    /// Upload local working-copy changes as a new project version
    async fn push(&self, dir: &Path) -> anyhow::Result<()>;

    /// Version recorded in the working copy's metadata
    async fn local_version(&self, dir: &Path) -> anyhow::Result<ProjectVersion>;

    /// Files changed in the working directory since the last sync
    ///
    /// Anything reported here means someone edited files by hand; the
    /// synchronization engine treats that as fatal.
    async fn pending_local_changes(&self, dir: &Path) -> anyhow::Result<PendingFiles>;

    /// Files that would change locally if the given server state were pulled
    async fn pending_remote_changes(
        &self,
        dir: &Path,
        server_files: &[ServerFile],
    ) -> anyhow::Result<PendingFiles>;

    /// Whether `dir` is a valid working copy of a hosted project
    async fn is_working_copy(&self, dir: &Path) -> bool;

    /// Path of the pristine base copy of a synchronized file
    ///
    /// The base copy tracks the file exactly as the server delivered it at
    /// the working copy's version; `pull` repositions it to the new version.
    /// The synchronization engine snapshots it across a pull to obtain the
    /// upstream file-level changeset.
    fn base_file_path(&self, dir: &Path, file: &str) -> std::path::PathBuf;
}
