//! Configuration module for mapsync.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, validation and defaults. All operational parameters -
//! server credentials, working directory, diff-engine executable and the list
//! of schema/project pairs - come from here; the CLI adds nothing beyond the
//! subcommand.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{ProjectPath, SyncError};

/// Environment variable naming an alternate configuration file
pub const CONFIG_ENV: &str = "MAPSYNC_CONFIG";

/// Environment variable supplying the server password when the config
/// file omits it
pub const PASSWORD_ENV: &str = "MAPSYNC_PASSWORD";

/// Top-level configuration for mapsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    /// Directory holding one working copy per configured project
    pub working_dir: PathBuf,
    /// Path to the geodiff executable
    pub geodiff_exe: String,
    /// Schema/project pairs to synchronize, processed in order
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
}

/// Hosted project server settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerConfig {
    pub url: String,
    pub username: String,
    /// May be omitted and supplied via `MAPSYNC_PASSWORD` instead
    #[serde(default)]
    pub password: Option<String>,
}

/// One (database schema pair, hosted project, sync file) association.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database driver identifier; only `postgres` is supported
    pub driver: String,
    /// Driver connection descriptor (libpq keyword/value string)
    pub conn_info: String,
    /// Schema holding the last-synchronized snapshot
    pub base: String,
    /// Schema receiving live database edits
    pub modified: String,
    /// Hosted project path, `namespace/name`
    pub project: String,
    /// Name of the synchronized GeoPackage inside the working copy
    pub sync_file: String,
}

impl ConnectionConfig {
    /// Validated project path
    pub fn project_path(&self) -> Result<ProjectPath, SyncError> {
        ProjectPath::new(self.project.clone())
    }
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            SyncError::Config(format!("Cannot read config file {}: {e}", path.display()))
        })?;
        serde_yaml::from_str(&content)
            .map_err(|e| SyncError::Config(format!("Cannot parse config file: {e}")))
    }

    /// Configuration file path: `$MAPSYNC_CONFIG`, else `./mapsync.yaml`,
    /// else the platform config dir.
    pub fn default_path() -> PathBuf {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        let local = PathBuf::from("mapsync.yaml");
        if local.exists() {
            return local;
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("mapsync")
            .join("mapsync.yaml")
    }

    /// The server password, from the config file or `MAPSYNC_PASSWORD`.
    pub fn password(&self) -> Option<String> {
        self.server
            .password
            .clone()
            .or_else(|| std::env::var(PASSWORD_ENV).ok())
    }

    /// Validate that every operational parameter is present and consistent.
    ///
    /// Runs before any operation; a failure here aborts with no side effects.
    pub fn validate(&self) -> Result<(), SyncError> {
        if self.server.url.is_empty() || self.server.username.is_empty() {
            return Err(SyncError::Config("Incorrect server settings".into()));
        }
        if self.password().is_none() {
            return Err(SyncError::Config(format!(
                "Server password is not set (config file or {PASSWORD_ENV})"
            )));
        }
        if self.working_dir.as_os_str().is_empty() {
            return Err(SyncError::Config("Working directory is not set".into()));
        }
        if self.geodiff_exe.is_empty() {
            return Err(SyncError::Config(
                "Path to geodiff executable is not set".into(),
            ));
        }
        if self.connections.is_empty() {
            return Err(SyncError::Config("Connections list can not be empty".into()));
        }
        for conn in &self.connections {
            if conn.conn_info.is_empty()
                || conn.base.is_empty()
                || conn.modified.is_empty()
                || conn.sync_file.is_empty()
            {
                return Err(SyncError::Config(format!(
                    "Incorrect connection settings for project '{}'",
                    conn.project
                )));
            }
            if conn.driver != "postgres" {
                return Err(SyncError::Config(
                    "Only 'postgres' driver is currently supported".into(),
                ));
            }
            if conn.base == conn.modified {
                return Err(SyncError::Config(format!(
                    "The base and modified schemas must differ: {}",
                    conn.base
                )));
            }
            conn.project_path()?;
        }
        Ok(())
    }
}
