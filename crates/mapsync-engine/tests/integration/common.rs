//! Shared fakes and harness for engine tests
//!
//! Database schemas live in a shared in-memory map (the "world"), GeoPackage
//! datasets are plain files, and changesets are tiny JSON documents recording
//! the content they turn `from` and what they turn it in`to`. The fake project
//! server keeps a full version history, so downloads at an older version work
//! like the real service. Content equality stands in for table-level
//! equality; the engine never looks inside any of these artifacts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use mapsync_core::config::ConnectionConfig;
use mapsync_core::domain::{
    ChangeOperation, ColumnChange, Dataset, FileChange, PendingFiles, ProjectPath, ProjectVersion,
    RowChange, SchemaComment, ServerFile, TableChangeSummary,
};
use mapsync_core::ports::{IDiffEngine, IProjectClient, ISchemaCatalog, ProjectInfo};
use mapsync_engine::SyncEngine;

pub const BASE_SCHEMA: &str = "mergin_base";
pub const MODIFIED_SCHEMA: &str = "mergin_main";
pub const SYNC_FILE: &str = "sync.gpkg";
pub const PROJECT: &str = "john/dbsync";

/// Schema name → dataset content
pub type World = Arc<Mutex<HashMap<String, String>>>;

/// On-disk changeset format of the fake diff engine
#[derive(Serialize, Deserialize)]
struct Changeset {
    from: String,
    to: String,
}

// ============================================================================
// Fake diff engine
// ============================================================================

pub struct FakeDiffEngine {
    world: World,
    /// When set, `make_copy` writes corrupted content, so the init
    /// self-check finds a divergence
    pub corrupt_copies: AtomicBool,
    /// When set, `create_changeset` exits cleanly without writing its
    /// output file
    pub drop_output: AtomicBool,
}

impl FakeDiffEngine {
    fn new(world: World) -> Self {
        Self {
            world,
            corrupt_copies: AtomicBool::new(false),
            drop_output: AtomicBool::new(false),
        }
    }

    async fn read_dataset(&self, dataset: &Dataset) -> anyhow::Result<String> {
        match dataset {
            Dataset::Gpkg { path } => Ok(tokio::fs::read_to_string(path).await?),
            Dataset::PgSchema { schema, .. } => self
                .world
                .lock()
                .unwrap()
                .get(schema)
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("schema does not exist: {schema}")),
        }
    }

    async fn write_dataset(&self, dataset: &Dataset, content: String) -> anyhow::Result<()> {
        match dataset {
            Dataset::Gpkg { path } => {
                tokio::fs::write(path, content).await?;
            }
            Dataset::PgSchema { schema, .. } => {
                self.world.lock().unwrap().insert(schema.clone(), content);
            }
        }
        Ok(())
    }

    async fn read_changeset(path: &Path) -> anyhow::Result<Option<Changeset>> {
        let raw = tokio::fs::read_to_string(path).await?;
        if raw.is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&raw)?))
    }
}

#[async_trait]
impl IDiffEngine for FakeDiffEngine {
    async fn create_changeset(
        &self,
        from: &Dataset,
        to: &Dataset,
        output: &Path,
    ) -> anyhow::Result<()> {
        let from_content = self.read_dataset(from).await?;
        let to_content = self.read_dataset(to).await?;
        if self.drop_output.load(Ordering::SeqCst) {
            return Ok(());
        }
        if from_content == to_content {
            // zero-byte file means "no differences"
            tokio::fs::write(output, b"").await?;
        } else {
            let changeset = Changeset {
                from: from_content,
                to: to_content,
            };
            tokio::fs::write(output, serde_json::to_vec(&changeset)?).await?;
        }
        Ok(())
    }

    async fn apply_changeset(&self, target: &Dataset, changeset: &Path) -> anyhow::Result<()> {
        if let Some(changeset) = Self::read_changeset(changeset).await? {
            self.write_dataset(target, changeset.to).await?;
        }
        Ok(())
    }

    async fn rebase(
        &self,
        _base: &Dataset,
        ours: &Dataset,
        base2theirs: &Path,
        _conflicts: &Path,
    ) -> anyhow::Result<()> {
        let changeset = Self::read_changeset(base2theirs)
            .await?
            .ok_or_else(|| anyhow::anyhow!("rebase with an empty changeset"))?;
        let local = self.read_dataset(ours).await?;
        self.write_dataset(ours, format!("merge({},{})", changeset.to, local))
            .await
    }

    async fn make_copy(&self, src: &Dataset, dst: &Dataset) -> anyhow::Result<()> {
        let mut content = self.read_dataset(src).await?;
        if self.corrupt_copies.load(Ordering::SeqCst) {
            content.push_str("-corrupt");
        }
        self.write_dataset(dst, content).await
    }

    async fn changes_summary(&self, changeset: &Path) -> anyhow::Result<Vec<TableChangeSummary>> {
        match Self::read_changeset(changeset).await? {
            None => Ok(Vec::new()),
            Some(_) => Ok(vec![TableChangeSummary {
                table: "points".into(),
                inserts: 0,
                updates: 1,
                deletes: 0,
            }]),
        }
    }

    async fn changes_details(&self, changeset: &Path) -> anyhow::Result<Vec<RowChange>> {
        match Self::read_changeset(changeset).await? {
            None => Ok(Vec::new()),
            Some(changeset) => Ok(vec![RowChange {
                table: "points".into(),
                operation: ChangeOperation::Update,
                changes: vec![ColumnChange {
                    column: "name".into(),
                    old: Some(serde_json::json!(changeset.from)),
                    new: Some(serde_json::json!(changeset.to)),
                }],
            }]),
        }
    }
}

// ============================================================================
// Fake project client
// ============================================================================

const VERSION_FILE: &str = ".version";
const BASEFILES_DIR: &str = ".basefiles";

pub struct FakeProjectClient {
    /// `history[i]` holds the files of version `i + 1`
    history: Mutex<Vec<HashMap<String, String>>>,
    /// When set, `push` fails before touching the server state
    pub fail_push: AtomicBool,
}

impl FakeProjectClient {
    fn new(initial: HashMap<String, String>) -> Self {
        Self {
            history: Mutex::new(vec![initial]),
            fail_push: AtomicBool::new(false),
        }
    }

    pub fn server_version(&self) -> u64 {
        self.history.lock().unwrap().len() as u64
    }

    pub fn server_files(&self) -> HashMap<String, String> {
        self.history.lock().unwrap().last().cloned().unwrap_or_default()
    }

    /// Publish a new version with one file changed, as another collaborator
    /// of the hosted project would
    pub fn publish_file(&self, path: &str, content: &str) {
        let mut history = self.history.lock().unwrap();
        let mut files = history.last().cloned().unwrap_or_default();
        files.insert(path.to_string(), content.to_string());
        history.push(files);
    }

    fn files_at(&self, version: Option<&ProjectVersion>) -> anyhow::Result<(u64, HashMap<String, String>)> {
        let history = self.history.lock().unwrap();
        let number = match version {
            Some(v) => v.number(),
            None => history.len() as u64,
        };
        let files = history
            .get(number as usize - 1)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no such version: v{number}"))?;
        Ok((number, files))
    }

    /// Top-level files of the working copy, skipping dot-entries
    fn local_files(dir: &Path) -> anyhow::Result<HashMap<String, String>> {
        let mut files = HashMap::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().to_string();
            if name.starts_with('.') || !entry.file_type()?.is_file() {
                continue;
            }
            files.insert(name, std::fs::read_to_string(entry.path())?);
        }
        Ok(files)
    }

    fn write_state(dir: &Path, version: u64, files: &HashMap<String, String>) -> anyhow::Result<()> {
        std::fs::create_dir_all(dir.join(BASEFILES_DIR))?;
        for (name, content) in files {
            std::fs::write(dir.join(name), content)?;
            std::fs::write(dir.join(BASEFILES_DIR).join(name), content)?;
        }
        std::fs::write(dir.join(VERSION_FILE), format!("v{version}"))?;
        Ok(())
    }

    fn diff_files(
        old: &HashMap<String, String>,
        new: &HashMap<String, String>,
    ) -> PendingFiles {
        let change = |path: &String, content: &String| FileChange {
            path: path.clone(),
            size: content.len() as u64,
        };
        let mut pending = PendingFiles::default();
        for (path, content) in new {
            match old.get(path) {
                None => pending.added.push(change(path, content)),
                Some(previous) if previous != content => {
                    pending.updated.push(change(path, content));
                }
                Some(_) => {}
            }
        }
        for (path, content) in old {
            if !new.contains_key(path) {
                pending.removed.push(change(path, content));
            }
        }
        pending
    }
}

#[async_trait]
impl IProjectClient for FakeProjectClient {
    async fn project_info(
        &self,
        _project: &ProjectPath,
        _since: Option<&ProjectVersion>,
    ) -> anyhow::Result<ProjectInfo> {
        let (number, files) = self.files_at(None)?;
        let mut files: Vec<ServerFile> = files
            .into_iter()
            .map(|(path, content)| ServerFile {
                path,
                size: content.len() as u64,
                // the checksum slot carries the content so pending-change
                // detection can compare without another fetch
                checksum: Some(content),
            })
            .collect();
        files.sort_by(|a, b| a.path.cmp(&b.path));
        Ok(ProjectInfo {
            version: ProjectVersion::new(format!("v{number}"))?,
            files,
        })
    }

    async fn download(
        &self,
        _project: &ProjectPath,
        dir: &Path,
        version: Option<&ProjectVersion>,
    ) -> anyhow::Result<()> {
        let (number, files) = self.files_at(version)?;
        std::fs::create_dir_all(dir)?;
        Self::write_state(dir, number, &files)
    }

    async fn pull(&self, dir: &Path) -> anyhow::Result<PendingFiles> {
        let (number, server) = self.files_at(None)?;
        let local = Self::local_files(dir)?;
        let pending = Self::diff_files(&local, &server);
        for removed in &pending.removed {
            std::fs::remove_file(dir.join(&removed.path))?;
            let _ = std::fs::remove_file(dir.join(BASEFILES_DIR).join(&removed.path));
        }
        Self::write_state(dir, number, &server)?;
        Ok(pending)
    }

    async fn push(&self, dir: &Path) -> anyhow::Result<()> {
        if self.fail_push.load(Ordering::SeqCst) {
            anyhow::bail!("server rejected the upload");
        }
        let local = Self::local_files(dir)?;
        let mut history = self.history.lock().unwrap();
        let server = history.last().cloned().unwrap_or_default();
        if local == server {
            return Ok(());
        }
        history.push(local.clone());
        let number = history.len() as u64;
        drop(history);
        Self::write_state(dir, number, &local)
    }

    async fn local_version(&self, dir: &Path) -> anyhow::Result<ProjectVersion> {
        let raw = std::fs::read_to_string(dir.join(VERSION_FILE))?;
        Ok(ProjectVersion::new(raw.trim())?)
    }

    async fn pending_local_changes(&self, dir: &Path) -> anyhow::Result<PendingFiles> {
        let local = Self::local_files(dir)?;
        let base = Self::local_files(&dir.join(BASEFILES_DIR)).unwrap_or_default();
        Ok(Self::diff_files(&base, &local))
    }

    async fn pending_remote_changes(
        &self,
        dir: &Path,
        server_files: &[ServerFile],
    ) -> anyhow::Result<PendingFiles> {
        let local = Self::local_files(dir)?;
        let server: HashMap<String, String> = server_files
            .iter()
            .map(|f| (f.path.clone(), f.checksum.clone().unwrap_or_default()))
            .collect();
        Ok(Self::diff_files(&local, &server))
    }

    async fn is_working_copy(&self, dir: &Path) -> bool {
        dir.join(VERSION_FILE).exists()
    }

    fn base_file_path(&self, dir: &Path, file: &str) -> PathBuf {
        dir.join(BASEFILES_DIR).join(file)
    }
}

// ============================================================================
// Fake schema catalog
// ============================================================================

pub struct FakeSchemaCatalog {
    world: World,
    comments: Mutex<HashMap<String, SchemaComment>>,
}

impl FakeSchemaCatalog {
    fn new(world: World) -> Self {
        Self {
            world,
            comments: Mutex::new(HashMap::new()),
        }
    }

    pub fn comment(&self, schema: &str) -> Option<SchemaComment> {
        self.comments.lock().unwrap().get(schema).cloned()
    }

    pub fn set_comment(&self, schema: &str, comment: SchemaComment) {
        self.comments
            .lock()
            .unwrap()
            .insert(schema.to_string(), comment);
    }
}

#[async_trait]
impl ISchemaCatalog for FakeSchemaCatalog {
    async fn ping(&self) -> anyhow::Result<()> {
        Ok(())
    }

    async fn schema_exists(&self, schema: &str) -> anyhow::Result<bool> {
        Ok(self.world.lock().unwrap().contains_key(schema))
    }

    async fn read_comment(&self, schema: &str) -> anyhow::Result<Option<SchemaComment>> {
        Ok(self.comments.lock().unwrap().get(schema).cloned())
    }

    async fn write_comment(&self, schema: &str, comment: &SchemaComment) -> anyhow::Result<()> {
        self.comments
            .lock()
            .unwrap()
            .insert(schema.to_string(), comment.clone());
        Ok(())
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub tmp: tempfile::TempDir,
    pub world: World,
    pub diff: Arc<FakeDiffEngine>,
    pub client: Arc<FakeProjectClient>,
    pub catalog: Arc<FakeSchemaCatalog>,
    pub engine: SyncEngine,
}

impl Harness {
    /// Server starts at v1 with one GeoPackage
    pub fn new() -> Self {
        Self::with_server_files([(SYNC_FILE, "state-v1")])
    }

    /// Server starts at v1 with no files, as a freshly created project
    pub fn empty_project() -> Self {
        Self::with_server_files([])
    }

    fn with_server_files<'a>(files: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let tmp = tempfile::tempdir().unwrap();
        let world: World = Arc::new(Mutex::new(HashMap::new()));
        let diff = Arc::new(FakeDiffEngine::new(world.clone()));
        let client = Arc::new(FakeProjectClient::new(
            files
                .into_iter()
                .map(|(path, content)| (path.to_string(), content.to_string()))
                .collect(),
        ));
        let catalog = Arc::new(FakeSchemaCatalog::new(world.clone()));

        let conn = ConnectionConfig {
            driver: "postgres".into(),
            conn_info: "host=localhost dbname=gis".into(),
            base: BASE_SCHEMA.into(),
            modified: MODIFIED_SCHEMA.into(),
            project: PROJECT.into(),
            sync_file: SYNC_FILE.into(),
        };
        let engine = SyncEngine::new(
            conn,
            tmp.path().join("working"),
            diff.clone(),
            client.clone(),
            catalog.clone(),
        )
        .unwrap();

        Self {
            tmp,
            world,
            diff,
            client,
            catalog,
            engine,
        }
    }

    pub fn work_dir(&self) -> PathBuf {
        self.tmp.path().join("working").join("dbsync")
    }

    pub fn gpkg_path(&self) -> PathBuf {
        self.work_dir().join(SYNC_FILE)
    }

    pub fn schema(&self, name: &str) -> Option<String> {
        self.world.lock().unwrap().get(name).cloned()
    }

    pub fn set_schema(&self, name: &str, content: &str) {
        self.world
            .lock()
            .unwrap()
            .insert(name.to_string(), content.to_string());
    }

    pub fn drop_schema(&self, name: &str) {
        self.world.lock().unwrap().remove(name);
    }
}
