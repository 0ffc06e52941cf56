//! Working-copy layout and metadata
//!
//! A working copy mirrors one version of a hosted project on disk. Next to
//! the project files lives a `.mapsync/` directory holding:
//!
//! - `metadata.json` - project path, mirrored version, and a record
//!   (path, size, checksum) per synchronized file
//! - a pristine base copy of every synchronized file, exactly as the server
//!   delivered it
//!
//! The base copies are what give the synchronization engine a file-level
//! "old base vs new base" diff across a pull. Checksums are SHA-256 over
//! file content. A directory without `.mapsync/metadata.json` is not a
//! working copy.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use mapsync_core::domain::{FileChange, PendingFiles, ProjectPath, ProjectVersion, ServerFile};

/// Name of the metadata directory inside a working copy
pub const META_DIR: &str = ".mapsync";

/// Name of the metadata document inside [`META_DIR`]
pub const META_FILE: &str = "metadata.json";

/// Record of one synchronized file as of the mirrored version
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub size: u64,
    pub checksum: String,
}

/// Contents of `metadata.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkingCopyMeta {
    pub name: ProjectPath,
    pub version: ProjectVersion,
    pub files: Vec<FileRecord>,
    /// When the mirrored state was last brought in line with the server
    pub synced_at: DateTime<Utc>,
}

impl WorkingCopyMeta {
    pub fn new(name: ProjectPath, version: ProjectVersion) -> Self {
        Self {
            name,
            version,
            files: Vec::new(),
            synced_at: Utc::now(),
        }
    }
}

/// A working copy rooted at a directory, with loaded metadata
#[derive(Debug, Clone)]
pub struct WorkingCopy {
    root: PathBuf,
    meta: WorkingCopyMeta,
}

/// SHA-256 checksum of a file, lowercase hex
pub fn file_checksum(path: &Path) -> Result<String> {
    let content = std::fs::read(path)
        .with_context(|| format!("Cannot read file for checksum: {}", path.display()))?;
    let digest = Sha256::digest(&content);
    Ok(hex::encode(digest))
}

/// Whether `dir` looks like a working copy
pub fn is_working_copy(dir: &Path) -> bool {
    dir.join(META_DIR).join(META_FILE).is_file()
}

impl WorkingCopy {
    /// Open an existing working copy, reading its metadata
    pub fn open(dir: &Path) -> Result<Self> {
        let meta_path = dir.join(META_DIR).join(META_FILE);
        let content = std::fs::read_to_string(&meta_path).with_context(|| {
            format!(
                "The directory does not contain a working copy: {}",
                dir.display()
            )
        })?;
        let meta: WorkingCopyMeta = serde_json::from_str(&content)
            .with_context(|| format!("Corrupt working copy metadata: {}", meta_path.display()))?;
        Ok(Self {
            root: dir.to_path_buf(),
            meta,
        })
    }

    /// Create a fresh working copy's metadata directory and document
    pub fn create(dir: &Path, meta: WorkingCopyMeta) -> Result<Self> {
        std::fs::create_dir_all(dir.join(META_DIR))
            .with_context(|| format!("Cannot create metadata dir in {}", dir.display()))?;
        let copy = Self {
            root: dir.to_path_buf(),
            meta,
        };
        copy.save()?;
        Ok(copy)
    }

    pub fn meta(&self) -> &WorkingCopyMeta {
        &self.meta
    }

    pub fn version(&self) -> &ProjectVersion {
        &self.meta.version
    }

    pub fn project(&self) -> &ProjectPath {
        &self.meta.name
    }

    /// Absolute path of a synchronized file in the working tree
    pub fn file_path(&self, file: &str) -> PathBuf {
        self.root.join(file)
    }

    /// Absolute path of a file's pristine base copy
    pub fn base_file_path(&self, file: &str) -> PathBuf {
        self.root.join(META_DIR).join(file)
    }

    /// Persist the metadata document
    pub fn save(&self) -> Result<()> {
        let meta_path = self.root.join(META_DIR).join(META_FILE);
        let content = serde_json::to_string_pretty(&self.meta)?;
        std::fs::write(&meta_path, content)
            .with_context(|| format!("Cannot write {}", meta_path.display()))?;
        Ok(())
    }

    /// Record a new mirrored state after a pull or push
    pub fn set_state(&mut self, version: ProjectVersion, files: Vec<FileRecord>) -> Result<()> {
        self.meta.version = version;
        self.meta.files = files;
        self.meta.synced_at = Utc::now();
        self.save()
    }

    /// Refresh a single file record and its base copy from the working tree
    pub fn refresh_base_copy(&mut self, file: &str) -> Result<()> {
        let src = self.file_path(file);
        let dst = self.base_file_path(file);
        if let Some(parent) = dst.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(&src, &dst)
            .with_context(|| format!("Cannot refresh base copy of {file}"))?;

        let record = FileRecord {
            path: file.to_string(),
            size: std::fs::metadata(&src)?.len(),
            checksum: file_checksum(&src)?,
        };
        match self.meta.files.iter_mut().find(|r| r.path == file) {
            Some(existing) => *existing = record,
            None => self.meta.files.push(record),
        }
        self.save()
    }

    /// Files in the working tree, relative to the root, metadata excluded
    fn tree_files(&self) -> Result<Vec<String>> {
        let mut files = Vec::new();
        collect_files(&self.root, &self.root, &mut files)?;
        files.sort();
        Ok(files)
    }

    /// Local edits: working tree compared against the mirrored records
    ///
    /// Anything reported here means files were changed by hand; field edits
    /// must always arrive through the hosted project instead.
    pub fn local_changes(&self) -> Result<PendingFiles> {
        let mut pending = PendingFiles::default();
        let tree = self.tree_files()?;

        for file in &tree {
            let path = self.file_path(file);
            let size = std::fs::metadata(&path)?.len();
            match self.meta.files.iter().find(|r| &r.path == file) {
                None => pending.added.push(FileChange {
                    path: file.clone(),
                    size,
                }),
                Some(record) => {
                    // cheap size check first, checksum only on same-size files
                    if record.size != size || record.checksum != file_checksum(&path)? {
                        pending.updated.push(FileChange {
                            path: file.clone(),
                            size,
                        });
                    }
                }
            }
        }
        for record in &self.meta.files {
            if !tree.iter().any(|f| f == &record.path) {
                pending.removed.push(FileChange {
                    path: record.path.clone(),
                    size: record.size,
                });
            }
        }
        Ok(pending)
    }

    /// Server-side changes: a server file list compared against the records
    pub fn remote_changes(&self, server_files: &[ServerFile]) -> PendingFiles {
        let mut pending = PendingFiles::default();

        for server_file in server_files {
            match self.meta.files.iter().find(|r| r.path == server_file.path) {
                None => pending.added.push(FileChange {
                    path: server_file.path.clone(),
                    size: server_file.size,
                }),
                Some(record) => {
                    let changed = match &server_file.checksum {
                        Some(checksum) => checksum != &record.checksum,
                        None => server_file.size != record.size,
                    };
                    if changed {
                        pending.updated.push(FileChange {
                            path: server_file.path.clone(),
                            size: server_file.size,
                        });
                    }
                }
            }
        }
        for record in &self.meta.files {
            if !server_files.iter().any(|f| f.path == record.path) {
                pending.removed.push(FileChange {
                    path: record.path.clone(),
                    size: record.size,
                });
            }
        }
        pending
    }
}

/// Recursively collect file paths relative to `root`, skipping the
/// metadata directory and hidden entries
fn collect_files(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, out)?;
        } else {
            let relative = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .to_string_lossy()
                .into_owned();
            out.push(relative);
        }
    }
    Ok(())
}
