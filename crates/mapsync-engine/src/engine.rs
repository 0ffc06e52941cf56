//! The synchronization state machine
//!
//! One [`SyncEngine`] drives one configured schema/project pair. Every
//! operation is an ordered sequence: precondition checks first (the first
//! failure aborts with no mutation), then changeset computations, then
//! collaborator calls. Temporary changeset files are named from the
//! project's short name plus operation and removed before reuse and after
//! consumption, so a run can never read a previous run's artifact.
//!
//! ## Error classification
//!
//! Port calls return `anyhow` errors; the engine wraps them into
//! `SyncError::Collaborator`. Violated orderings and missing prerequisites
//! become `SyncError::Precondition`. A failed post-copy self-check during
//! `init` becomes `SyncError::Integrity` and additionally tags the base
//! schema's comment with a persistent error.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use mapsync_core::config::ConnectionConfig;
use mapsync_core::domain::{
    Dataset, InitSource, ProjectPath, ProjectVersion, SchemaComment, StatusReport, SyncError,
    SyncOutcome, TableChangeSummary,
};
use mapsync_core::ports::{IDiffEngine, IProjectClient, ISchemaCatalog};

/// Message recorded in the schema comment when the init self-check fails.
/// Stays in place until manually cleared; every later run fails fast on it.
const INIT_FAILED_ERROR: &str =
    "Initialization failed: data differs between the GeoPackage and the base schema \
     after an internal copy. Please report this problem to the mapsync developers.";

/// The synchronization state machine for one schema/project pair
pub struct SyncEngine {
    diff: Arc<dyn IDiffEngine + Send + Sync>,
    client: Arc<dyn IProjectClient + Send + Sync>,
    catalog: Arc<dyn ISchemaCatalog + Send + Sync>,
    conn: ConnectionConfig,
    project: ProjectPath,
    working_root: PathBuf,
}

impl SyncEngine {
    pub fn new(
        conn: ConnectionConfig,
        working_root: PathBuf,
        diff: Arc<dyn IDiffEngine + Send + Sync>,
        client: Arc<dyn IProjectClient + Send + Sync>,
        catalog: Arc<dyn ISchemaCatalog + Send + Sync>,
    ) -> Result<Self, SyncError> {
        let project = conn.project_path()?;
        Ok(Self {
            diff,
            client,
            catalog,
            conn,
            project,
            working_root,
        })
    }

    pub fn project(&self) -> &ProjectPath {
        &self.project
    }

    // ------------------------------------------------------------------
    // Paths and datasets
    // ------------------------------------------------------------------

    /// Per-project working directory under the configured working root
    fn work_dir(&self) -> PathBuf {
        self.working_root.join(self.project.short_name())
    }

    /// The synchronized GeoPackage inside the working copy
    fn gpkg_path(&self) -> PathBuf {
        self.work_dir().join(&self.conn.sync_file)
    }

    fn gpkg_dataset(&self) -> Dataset {
        Dataset::gpkg(self.gpkg_path())
    }

    fn base_dataset(&self) -> Dataset {
        Dataset::pg_schema(&self.conn.conn_info, &self.conn.base)
    }

    fn modified_dataset(&self) -> Dataset {
        Dataset::pg_schema(&self.conn.conn_info, &self.conn.modified)
    }

    /// Temp changeset path under the working root, unique per project,
    /// operation and leg
    fn tmp_changeset(&self, operation: &str, leg: &str) -> PathBuf {
        self.working_root.join(format!(
            "{}-{operation}-{leg}.changeset",
            self.project.short_name()
        ))
    }

    // ------------------------------------------------------------------
    // Shared checks and helpers
    // ------------------------------------------------------------------

    fn collaborator<T>(result: anyhow::Result<T>) -> Result<T, SyncError> {
        result.map_err(SyncError::collaborator)
    }

    /// Working directory and sync file must exist and be a working copy
    async fn check_working_copy(&self) -> Result<(), SyncError> {
        let work_dir = self.work_dir();
        if !self.client.is_working_copy(&work_dir).await {
            return Err(SyncError::Precondition(format!(
                "The project working directory does not exist or is not a working copy: {}",
                work_dir.display()
            )));
        }
        let gpkg = self.gpkg_path();
        if !gpkg.exists() {
            return Err(SyncError::Precondition(format!(
                "The synchronized GPKG file does not exist: {}",
                gpkg.display()
            )));
        }
        Ok(())
    }

    /// Field edits must always arrive through the hosted project; a pending
    /// change in the working directory means external interference
    async fn check_no_local_changes(&self) -> Result<(), SyncError> {
        let pending = Self::collaborator(
            self.client.pending_local_changes(&self.work_dir()).await,
        )?;
        if !pending.is_empty() {
            return Err(SyncError::Precondition(format!(
                "There are pending changes in the local directory - that should never happen!\n{}",
                pending.describe()
            )));
        }
        Ok(())
    }

    async fn check_schemas_exist(&self) -> Result<(), SyncError> {
        for schema in [&self.conn.base, &self.conn.modified] {
            let exists = Self::collaborator(self.catalog.schema_exists(schema).await)?;
            if !exists {
                return Err(SyncError::Precondition(format!(
                    "The schema does not exist: {schema}"
                )));
            }
        }
        Ok(())
    }

    /// Byte size of a changeset file; zero means no differences
    ///
    /// The diff engine writes the file even when the datasets are equal, so
    /// a missing file means it failed without reporting an error.
    async fn changeset_size(path: &Path) -> Result<u64, SyncError> {
        match tokio::fs::metadata(path).await {
            Ok(meta) => Ok(meta.len()),
            Err(e) => Err(SyncError::Collaborator(format!(
                "Diff engine produced no changeset at {}: {e}",
                path.display()
            ))),
        }
    }

    async fn remove_quietly(path: &Path) {
        let _ = tokio::fs::remove_file(path).await;
    }

    /// Diff two datasets and return the summary, cleaning up the changeset
    async fn compare_datasets(
        &self,
        from: &Dataset,
        to: &Dataset,
        leg: &str,
    ) -> Result<Vec<TableChangeSummary>, SyncError> {
        let tmp = self.tmp_changeset("compare", leg);
        Self::collaborator(self.diff.create_changeset(from, to, &tmp).await)?;
        let summary = if Self::changeset_size(&tmp).await? == 0 {
            Vec::new()
        } else {
            Self::collaborator(self.diff.changes_summary(&tmp).await)?
        };
        Self::remove_quietly(&tmp).await;
        Ok(summary)
    }

    /// Diff the source GeoPackage against the base schema and log the full
    /// row-level details, used for diagnosing a failed initialization.
    /// Best-effort: the stored error is the authoritative diagnosis, so a
    /// failure here must not replace it.
    async fn log_base_divergence(&self) {
        let tmp = self.tmp_changeset("init", "gpkg2base");
        let created = self
            .diff
            .create_changeset(&self.gpkg_dataset(), &self.base_dataset(), &tmp)
            .await;
        match created {
            Ok(()) => {
                let size = tokio::fs::metadata(&tmp).await.map(|m| m.len()).unwrap_or(0);
                if size > 0 {
                    if let Ok(details) = self.diff.changes_details(&tmp).await {
                        warn!(
                            changes = %serde_json::to_string_pretty(&details).unwrap_or_default(),
                            "Changeset between the GeoPackage and the base schema"
                        );
                    }
                }
            }
            Err(e) => debug!("Cannot diff the GeoPackage against the base schema: {e}"),
        }
        Self::remove_quietly(&tmp).await;
    }

    async fn record_version(&self, version: &ProjectVersion) -> Result<(), SyncError> {
        let comment = SchemaComment::new(self.project.clone(), version.clone());
        Self::collaborator(self.catalog.write_comment(&self.conn.base, &comment).await)
    }

    fn log_summary(label: &str, summary: &[TableChangeSummary]) {
        for item in summary {
            info!("{label}: {item}");
        }
    }

    // ------------------------------------------------------------------
    // status
    // ------------------------------------------------------------------

    /// Read-only report: pending server changes and unpushed database edits
    pub async fn status(&self) -> Result<StatusReport, SyncError> {
        info!(project = %self.project, "Checking status");
        self.check_working_copy().await?;
        self.check_no_local_changes().await?;

        let work_dir = self.work_dir();
        let local_version =
            Self::collaborator(self.client.local_version(&work_dir).await)?;
        let server_info = Self::collaborator(
            self.client
                .project_info(&self.project, Some(&local_version))
                .await,
        )?;
        let pending_remote = Self::collaborator(
            self.client
                .pending_remote_changes(&work_dir, &server_info.files)
                .await,
        )?;

        self.check_schemas_exist().await?;

        let tmp = self.tmp_changeset("status", "base2our");
        Self::collaborator(
            self.diff
                .create_changeset(&self.base_dataset(), &self.modified_dataset(), &tmp)
                .await,
        )?;
        let db_changes = if Self::changeset_size(&tmp).await? == 0 {
            Vec::new()
        } else {
            Self::collaborator(self.diff.changes_summary(&tmp).await)?
        };
        Self::remove_quietly(&tmp).await;

        Ok(StatusReport {
            local_version,
            server_version: server_info.version,
            pending_remote,
            db_changes,
        })
    }

    // ------------------------------------------------------------------
    // pull
    // ------------------------------------------------------------------

    /// Download new upstream versions and merge them into the database
    pub async fn pull(&self) -> Result<SyncOutcome, SyncError> {
        info!(project = %self.project, "Pulling");
        self.check_working_copy().await?;
        self.check_no_local_changes().await?;

        let work_dir = self.work_dir();
        let local_version =
            Self::collaborator(self.client.local_version(&work_dir).await)?;
        let server_info =
            Self::collaborator(self.client.project_info(&self.project, None).await)?;

        if server_info.version == local_version {
            info!("No changes on the server.");
            return Ok(SyncOutcome::NoOpAlreadySynced);
        }

        // After the client pull the base copy becomes "their" version, so
        // snapshot the current one first.
        let base_file = self.client.base_file_path(&work_dir, &self.conn.sync_file);
        let base_file_old = PathBuf::from(format!("{}-old", base_file.display()));
        tokio::fs::copy(&base_file, &base_file_old)
            .await
            .map_err(|e| {
                SyncError::Collaborator(format!(
                    "Cannot snapshot base file {}: {e}",
                    base_file.display()
                ))
            })?;

        let tmp_base2our = self.tmp_changeset("pull", "base2our");
        let tmp_base2their = self.tmp_changeset("pull", "base2their");

        // our local database edits; non-empty means a rebase is required
        Self::collaborator(
            self.diff
                .create_changeset(&self.base_dataset(), &self.modified_dataset(), &tmp_base2our)
                .await,
        )?;
        let needs_rebase = Self::changeset_size(&tmp_base2our).await? != 0;
        if needs_rebase {
            let summary = Self::collaborator(self.diff.changes_summary(&tmp_base2our).await)?;
            Self::log_summary("DB changes", &summary);
        }

        // no local file edits exist (checked above), so this never merges
        Self::collaborator(self.client.pull(&work_dir).await)?;
        let new_version = Self::collaborator(self.client.local_version(&work_dir).await)?;
        info!(version = %new_version, "Pulled new version from the server");

        // upstream edits as a file-to-file changeset
        Self::collaborator(
            self.diff
                .create_changeset(
                    &Dataset::gpkg(&base_file_old),
                    &Dataset::gpkg(&base_file),
                    &tmp_base2their,
                )
                .await,
        )?;
        let summary = Self::collaborator(self.diff.changes_summary(&tmp_base2their).await)?;
        Self::log_summary("Server changes", &summary);

        if !needs_rebase {
            info!("Applying new version [no rebase]");
            // base first: modified may carry independent edits on top
            Self::collaborator(
                self.diff
                    .apply_changeset(&self.base_dataset(), &tmp_base2their)
                    .await,
            )?;
            Self::collaborator(
                self.diff
                    .apply_changeset(&self.modified_dataset(), &tmp_base2their)
                    .await,
            )?;
        } else {
            info!("Applying new version [WITH rebase]");
            let conflicts = self.tmp_changeset("pull", "conflicts");
            Self::collaborator(
                self.diff
                    .rebase(
                        &self.base_dataset(),
                        &self.modified_dataset(),
                        &tmp_base2their,
                        &conflicts,
                    )
                    .await,
            )?;
            if conflicts.exists() {
                warn!(conflicts = %conflicts.display(), "Rebase produced a conflicts file");
            }
            // base had no local edits; bring it up plainly
            Self::collaborator(
                self.diff
                    .apply_changeset(&self.base_dataset(), &tmp_base2their)
                    .await,
            )?;
        }

        Self::remove_quietly(&base_file_old).await;
        Self::remove_quietly(&tmp_base2our).await;
        Self::remove_quietly(&tmp_base2their).await;

        self.record_version(&new_version).await?;
        Ok(SyncOutcome::Applied {
            version: new_version,
        })
    }

    // ------------------------------------------------------------------
    // push
    // ------------------------------------------------------------------

    /// Transfer database edits onto the server as a new project version
    pub async fn push(&self) -> Result<SyncOutcome, SyncError> {
        info!(project = %self.project, "Pushing");
        self.check_working_copy().await?;
        self.check_no_local_changes().await?;

        let work_dir = self.work_dir();
        let local_version =
            Self::collaborator(self.client.local_version(&work_dir).await)?;
        let server_info =
            Self::collaborator(self.client.project_info(&self.project, None).await)?;
        if server_info.version != local_version {
            return Err(SyncError::Precondition(
                "There are pending changes on the server - need to pull them first.".into(),
            ));
        }

        self.check_schemas_exist().await?;

        let tmp = self.tmp_changeset("push", "base2our");
        Self::collaborator(
            self.diff
                .create_changeset(&self.base_dataset(), &self.modified_dataset(), &tmp)
                .await,
        )?;
        if Self::changeset_size(&tmp).await? == 0 {
            info!("No changes in the database.");
            Self::remove_quietly(&tmp).await;
            return Ok(SyncOutcome::NoOpAlreadySynced);
        }
        let summary = Self::collaborator(self.diff.changes_summary(&tmp).await)?;
        Self::log_summary("DB changes", &summary);

        info!("Writing database changes to the working copy");
        Self::collaborator(
            self.diff
                .apply_changeset(&self.gpkg_dataset(), &tmp)
                .await,
        )?;

        // If the upload fails, base must stay untouched: its truth is
        // "last state known to be reflected on the server".
        Self::collaborator(self.client.push(&work_dir).await)?;
        let new_version = Self::collaborator(self.client.local_version(&work_dir).await)?;
        info!(version = %new_version, "Pushed new version to the server");

        info!("Updating the base schema");
        Self::collaborator(
            self.diff
                .apply_changeset(&self.base_dataset(), &tmp)
                .await,
        )?;
        Self::remove_quietly(&tmp).await;

        self.record_version(&new_version).await?;
        Ok(SyncOutcome::Applied {
            version: new_version,
        })
    }

    // ------------------------------------------------------------------
    // init
    // ------------------------------------------------------------------

    /// Initialize the pair for two-way synchronization
    ///
    /// `InitSource::Gpkg` treats the project's GeoPackage as authoritative
    /// and creates the database schemas from it; `InitSource::Database`
    /// treats the `modified` schema as authoritative and creates the
    /// GeoPackage (uploading it as a new project version).
    pub async fn init(&self, source: InitSource) -> Result<SyncOutcome, SyncError> {
        info!(project = %self.project, ?source, "Initializing");

        info!("Connecting to the database...");
        Self::collaborator(self.catalog.ping().await)?;

        let base_exists = Self::collaborator(self.catalog.schema_exists(&self.conn.base).await)?;
        let modified_exists =
            Self::collaborator(self.catalog.schema_exists(&self.conn.modified).await)?;

        let work_dir = self.work_dir();
        if base_exists && modified_exists {
            info!("The base and modified schemas already exist");
            let comment = Self::collaborator(self.catalog.read_comment(&self.conn.base).await)?
                .ok_or_else(|| {
                    SyncError::Precondition(
                        "The base schema exists but it is unknown which project it belongs to"
                            .into(),
                    )
                })?;
            if let Some(error) = comment.error {
                self.log_base_divergence().await;
                return Err(SyncError::Integrity(error));
            }
            self.ensure_working_copy_at(&comment.version).await?;
        } else if !work_dir.exists() {
            info!(dir = %work_dir.display(), "Downloading latest project version");
            Self::collaborator(self.client.download(&self.project, &work_dir, None).await)?;
        } else {
            let version = Self::collaborator(self.client.local_version(&work_dir).await)?;
            info!(dir = %work_dir.display(), %version, "Working directory already exists");
        }

        // only the working copy itself; the sync file may not exist yet when
        // initializing from the database
        if !self.client.is_working_copy(&work_dir).await {
            return Err(SyncError::Precondition(format!(
                "The project working directory does not contain a valid working copy: {}",
                work_dir.display()
            )));
        }
        let local_version = Self::collaborator(self.client.local_version(&work_dir).await)?;

        // server-side pending changes are fine (pull after init); local ones
        // are never fine
        let server_info = Self::collaborator(
            self.client
                .project_info(&self.project, Some(&local_version))
                .await,
        )?;
        let pending_remote = Self::collaborator(
            self.client
                .pending_remote_changes(&work_dir, &server_info.files)
                .await,
        )?;
        if !pending_remote.is_empty() {
            info!("There are pending changes on the server, run the pull command after init");
        }
        self.check_no_local_changes().await?;

        match source {
            InitSource::Gpkg => {
                self.init_from_gpkg(base_exists, modified_exists, &local_version)
                    .await
            }
            InitSource::Database => {
                self.init_from_db(base_exists, modified_exists, &local_version)
                    .await
            }
        }
    }

    /// Make the working copy directory match the recorded version
    ///
    /// A stale local copy is deleted and re-downloaded, never merged.
    async fn ensure_working_copy_at(&self, version: &ProjectVersion) -> Result<(), SyncError> {
        let work_dir = self.work_dir();
        if !work_dir.exists() {
            info!(%version, dir = %work_dir.display(), "Downloading recorded project version");
            return Self::collaborator(
                self.client
                    .download(&self.project, &work_dir, Some(version))
                    .await,
            );
        }

        let local_version = Self::collaborator(self.client.local_version(&work_dir).await)?;
        if &local_version != version {
            info!(
                %local_version, recorded = %version,
                "Removing stale working directory and re-downloading"
            );
            tokio::fs::remove_dir_all(&work_dir).await.map_err(|e| {
                SyncError::Collaborator(format!(
                    "Cannot remove stale working directory {}: {e}",
                    work_dir.display()
                ))
            })?;
            Self::collaborator(
                self.client
                    .download(&self.project, &work_dir, Some(version))
                    .await,
            )?;
        }
        Ok(())
    }

    async fn init_from_gpkg(
        &self,
        base_exists: bool,
        modified_exists: bool,
        local_version: &ProjectVersion,
    ) -> Result<SyncOutcome, SyncError> {
        let gpkg = self.gpkg_path();
        if !gpkg.exists() {
            return Err(SyncError::Precondition(format!(
                "The input GPKG file does not exist: {}",
                gpkg.display()
            )));
        }

        if base_exists && modified_exists {
            // already initialized: either fully in sync, or the database has
            // unpushed edits, or someone touched base directly (forbidden)
            let summary_modified = self
                .compare_datasets(&self.gpkg_dataset(), &self.modified_dataset(), "gpkg2modified")
                .await?;
            let summary_base = self
                .compare_datasets(&self.gpkg_dataset(), &self.base_dataset(), "gpkg2base")
                .await?;

            if !summary_base.is_empty() {
                Self::log_summary("Base schema changes", &summary_base);
                return Err(SyncError::Precondition(
                    "The schemas already exist but the base schema is not synchronized \
                     with the source GPKG"
                        .into(),
                ));
            }
            if !summary_modified.is_empty() {
                info!("The modified schema has pending changes, run pull/push to synchronize");
                Self::log_summary("Pending changes", &summary_modified);
                return Ok(SyncOutcome::PendingManualResolution {
                    summary: summary_modified,
                });
            }
            info!("The GPKG file, base and modified schemas are already initialized and in sync");
            return Ok(SyncOutcome::NoOpAlreadySynced);
        }
        if modified_exists {
            return Err(SyncError::Precondition(format!(
                "The modified schema exists but the base schema is missing: {}",
                self.conn.base
            )));
        }
        if base_exists {
            return Err(SyncError::Precondition(format!(
                "The base schema exists but the modified schema is missing: {}",
                self.conn.modified
            )));
        }

        info!("The base and modified schemas do not exist yet, initializing them");
        // two independent copies, so a copy bug on one leg cannot mask
        // corruption on the other; the self-check below verifies the result
        Self::collaborator(
            self.diff
                .make_copy(&self.gpkg_dataset(), &self.modified_dataset())
                .await,
        )?;
        Self::collaborator(
            self.diff
                .make_copy(&self.modified_dataset(), &self.base_dataset())
                .await,
        )?;
        self.init_self_check(local_version).await?;

        self.record_version(local_version).await?;
        Ok(SyncOutcome::Applied {
            version: local_version.clone(),
        })
    }

    async fn init_from_db(
        &self,
        base_exists: bool,
        modified_exists: bool,
        local_version: &ProjectVersion,
    ) -> Result<SyncOutcome, SyncError> {
        if !modified_exists {
            return Err(SyncError::Precondition(format!(
                "The modified schema does not exist: {}",
                self.conn.modified
            )));
        }

        let gpkg = self.gpkg_path();
        if gpkg.exists() && base_exists {
            let summary_modified = self
                .compare_datasets(&self.modified_dataset(), &self.gpkg_dataset(), "modified2gpkg")
                .await?;
            let summary_base = self
                .compare_datasets(&self.base_dataset(), &self.gpkg_dataset(), "base2gpkg")
                .await?;

            if !summary_base.is_empty() {
                Self::log_summary("Base schema changes", &summary_base);
                return Err(SyncError::Precondition(
                    "The output GPKG file exists already but is not synchronized \
                     with the base schema"
                        .into(),
                ));
            }
            if !summary_modified.is_empty() {
                info!("The output GPKG exists but the modified schema has pending changes");
                Self::log_summary("Pending changes", &summary_modified);
                return Ok(SyncOutcome::PendingManualResolution {
                    summary: summary_modified,
                });
            }
            info!("The GPKG file, base and modified schemas are already initialized and in sync");
            return Ok(SyncOutcome::NoOpAlreadySynced);
        }
        if gpkg.exists() {
            return Err(SyncError::Precondition(format!(
                "The output GPKG exists but the base schema is missing: {}",
                self.conn.base
            )));
        }
        if base_exists {
            return Err(SyncError::Precondition(format!(
                "The base schema exists but the output GPKG is missing: {}",
                gpkg.display()
            )));
        }

        info!("The base schema and the output GPKG do not exist yet, initializing them");
        Self::collaborator(
            self.diff
                .make_copy(&self.modified_dataset(), &self.base_dataset())
                .await,
        )?;
        Self::collaborator(
            self.diff
                .make_copy(&self.modified_dataset(), &self.gpkg_dataset())
                .await,
        )?;
        self.init_self_check(local_version).await?;

        // upload the new GeoPackage as a new project version
        Self::collaborator(self.client.push(&self.work_dir()).await)?;
        let version = Self::collaborator(self.client.local_version(&self.work_dir()).await)?;

        self.record_version(&version).await?;
        Ok(SyncOutcome::Applied { version })
    }

    /// Verify that copying data back and forth kept it intact
    ///
    /// Immediately after initialization the GeoPackage and the base schema
    /// must not differ at all. A nonzero diff means a systemic bug in the
    /// copy/diff path; the base schema is tagged with a persistent error so
    /// every later run fails fast until it is cleared manually.
    async fn init_self_check(&self, local_version: &ProjectVersion) -> Result<(), SyncError> {
        let tmp = self.tmp_changeset("init", "selfcheck");
        Self::collaborator(
            self.diff
                .create_changeset(&self.gpkg_dataset(), &self.base_dataset(), &tmp)
                .await,
        )?;
        let size = Self::changeset_size(&tmp).await?;
        if size == 0 {
            Self::remove_quietly(&tmp).await;
            debug!("Init self-check passed");
            return Ok(());
        }

        let details = Self::collaborator(self.diff.changes_details(&tmp).await)?;
        warn!(
            changes = %serde_json::to_string_pretty(&details).unwrap_or_default(),
            "Changeset after internal copy (should be empty)"
        );
        Self::remove_quietly(&tmp).await;

        let comment = SchemaComment::with_error(
            self.project.clone(),
            local_version.clone(),
            INIT_FAILED_ERROR,
        );
        Self::collaborator(self.catalog.write_comment(&self.conn.base, &comment).await)?;
        Err(SyncError::Integrity(INIT_FAILED_ERROR.into()))
    }
}
