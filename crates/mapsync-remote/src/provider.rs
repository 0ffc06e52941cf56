//! RemoteProjectClient - IProjectClient implementation
//!
//! Glues the HTTP [`RemoteClient`] and the on-disk [`WorkingCopy`] together
//! to fulfil the `IProjectClient` port contract.
//!
//! ## Design Notes
//!
//! - `pull` downloads changed files at the new server version and refreshes
//!   both the working tree and the pristine base copies. The caller (the
//!   synchronization engine) guarantees there are no local file edits, so no
//!   file-level merge is ever needed here.
//! - `push` uploads whatever `local_changes` reports inside one server
//!   transaction and records the committed version in the metadata.
//! - Filesystem access is inline `std::fs`: a project holds a handful of
//!   files and the network transfer dominates every operation.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use tracing::{debug, info};

use mapsync_core::domain::{PendingFiles, ProjectPath, ProjectVersion, ServerFile};
use mapsync_core::ports::{IProjectClient, ProjectInfo};

use crate::client::RemoteClient;
use crate::workdir::{self, FileRecord, WorkingCopy, WorkingCopyMeta};

/// IProjectClient implementation over the server API and working copies
pub struct RemoteProjectClient {
    client: RemoteClient,
}

impl RemoteProjectClient {
    pub fn new(client: RemoteClient) -> Self {
        Self { client }
    }

    /// Write one downloaded file into the working tree and its base copy
    fn write_file(copy: &WorkingCopy, file: &str, content: &[u8]) -> Result<()> {
        let target = copy.file_path(file);
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, content)
            .with_context(|| format!("Cannot write {}", target.display()))?;

        let base = copy.base_file_path(file);
        if let Some(parent) = base.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&base, content)
            .with_context(|| format!("Cannot write {}", base.display()))?;
        Ok(())
    }

    fn records_from_server(files: &[ServerFile], copy: &WorkingCopy) -> Result<Vec<FileRecord>> {
        files
            .iter()
            .map(|f| {
                Ok(FileRecord {
                    path: f.path.clone(),
                    size: f.size,
                    checksum: match &f.checksum {
                        Some(c) => c.clone(),
                        // server omitted it; compute from the copy we just wrote
                        None => workdir::file_checksum(&copy.file_path(&f.path))?,
                    },
                })
            })
            .collect()
    }
}

#[async_trait]
impl IProjectClient for RemoteProjectClient {
    async fn project_info(
        &self,
        project: &ProjectPath,
        since: Option<&ProjectVersion>,
    ) -> Result<ProjectInfo> {
        self.client.project_info(project, None, since).await
    }

    async fn download(
        &self,
        project: &ProjectPath,
        dir: &Path,
        version: Option<&ProjectVersion>,
    ) -> Result<()> {
        let info = self.client.project_info(project, version, None).await?;
        info!(%project, version = %info.version, dir = %dir.display(), "Downloading project");

        std::fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create working directory {}", dir.display()))?;
        let mut copy = WorkingCopy::create(
            dir,
            WorkingCopyMeta::new(project.clone(), info.version.clone()),
        )?;

        for file in &info.files {
            let content = self
                .client
                .download_file(project, &file.path, &info.version)
                .await?;
            Self::write_file(&copy, &file.path, &content)?;
        }

        let records = Self::records_from_server(&info.files, &copy)?;
        copy.set_state(info.version, records)?;
        Ok(())
    }

    async fn pull(&self, dir: &Path) -> Result<PendingFiles> {
        let mut copy = WorkingCopy::open(dir)?;
        let project = copy.project().clone();
        let info = self
            .client
            .project_info(&project, None, Some(copy.version()))
            .await?;

        if &info.version == copy.version() {
            debug!(%project, "Working copy already at server version");
            return Ok(PendingFiles::default());
        }

        let changes = copy.remote_changes(&info.files);
        info!(%project, from = %copy.version(), to = %info.version, "Pulling project");

        for change in changes.added.iter().chain(changes.updated.iter()) {
            let content = self
                .client
                .download_file(&project, &change.path, &info.version)
                .await?;
            Self::write_file(&copy, &change.path, &content)?;
        }
        for change in &changes.removed {
            let _ = std::fs::remove_file(copy.file_path(&change.path));
            let _ = std::fs::remove_file(copy.base_file_path(&change.path));
        }

        let records = Self::records_from_server(&info.files, &copy)?;
        copy.set_state(info.version, records)?;
        Ok(changes)
    }

    async fn push(&self, dir: &Path) -> Result<()> {
        let mut copy = WorkingCopy::open(dir)?;
        let project = copy.project().clone();
        let changes = copy.local_changes()?;
        if changes.is_empty() {
            debug!(%project, "Nothing to push");
            return Ok(());
        }
        if !changes.removed.is_empty() {
            // removals would orphan the database schemas; nothing produces
            // them in normal operation
            bail!("Refusing to push file removals: {}", changes.describe());
        }

        let transaction = self
            .client
            .push_start(&project, copy.version(), &changes)
            .await?;

        for change in changes.added.iter().chain(changes.updated.iter()) {
            let content = std::fs::read(copy.file_path(&change.path))
                .with_context(|| format!("Cannot read {}", change.path))?;
            self.client.push_file(&transaction, change, content).await?;
        }

        let new_version = self.client.push_finish(&transaction).await?;
        info!(%project, version = %new_version, "Pushed new project version");

        for change in changes.added.iter().chain(changes.updated.iter()) {
            copy.refresh_base_copy(&change.path)?;
        }
        let records = copy.meta().files.clone();
        copy.set_state(new_version, records)?;
        Ok(())
    }

    async fn local_version(&self, dir: &Path) -> Result<ProjectVersion> {
        Ok(WorkingCopy::open(dir)?.version().clone())
    }

    async fn pending_local_changes(&self, dir: &Path) -> Result<PendingFiles> {
        WorkingCopy::open(dir)?.local_changes()
    }

    async fn pending_remote_changes(
        &self,
        dir: &Path,
        server_files: &[ServerFile],
    ) -> Result<PendingFiles> {
        Ok(WorkingCopy::open(dir)?.remote_changes(server_files))
    }

    async fn is_working_copy(&self, dir: &Path) -> bool {
        workdir::is_working_copy(dir)
    }

    fn base_file_path(&self, dir: &Path, file: &str) -> PathBuf {
        dir.join(workdir::META_DIR).join(file)
    }
}
