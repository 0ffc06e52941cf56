//! Dataset addressing
//!
//! A [`Dataset`] names one copy of the synchronized data in a form the diff
//! engine can address: a GeoPackage file or a database schema. Three roles
//! exist per synchronized pair (`base` schema, `modified` schema, working-copy
//! file); the server-side file is never addressed directly, only through
//! project client version operations.

use std::fmt::{self, Display, Formatter};
use std::path::{Path, PathBuf};

/// One addressable copy of the synchronized dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dataset {
    /// A GeoPackage file on the local filesystem
    Gpkg { path: PathBuf },
    /// A schema inside a PostGIS database
    PgSchema { conn_info: String, schema: String },
}

impl Dataset {
    pub fn gpkg(path: impl Into<PathBuf>) -> Self {
        Dataset::Gpkg { path: path.into() }
    }

    pub fn pg_schema(conn_info: impl Into<String>, schema: impl Into<String>) -> Self {
        Dataset::PgSchema {
            conn_info: conn_info.into(),
            schema: schema.into(),
        }
    }

    /// The geodiff driver identifier for this dataset
    pub fn driver(&self) -> &'static str {
        match self {
            Dataset::Gpkg { .. } => "sqlite",
            Dataset::PgSchema { .. } => "postgres",
        }
    }

    /// The driver-specific connection descriptor (empty for files)
    pub fn conn_info(&self) -> &str {
        match self {
            Dataset::Gpkg { .. } => "",
            Dataset::PgSchema { conn_info, .. } => conn_info,
        }
    }

    /// The dataset name the driver resolves: file path or schema name
    pub fn name(&self) -> String {
        match self {
            Dataset::Gpkg { path } => path.display().to_string(),
            Dataset::PgSchema { schema, .. } => schema.clone(),
        }
    }

    /// The file path, if this dataset is file-based
    pub fn file_path(&self) -> Option<&Path> {
        match self {
            Dataset::Gpkg { path } => Some(path),
            Dataset::PgSchema { .. } => None,
        }
    }

    /// Whether two datasets are served by the same driver and connection
    ///
    /// The diff engine can compare such datasets with its single-driver
    /// invocation form; anything else needs the dual-driver form.
    pub fn same_backend(&self, other: &Dataset) -> bool {
        self.driver() == other.driver() && self.conn_info() == other.conn_info()
    }
}

impl Display for Dataset {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Dataset::Gpkg { path } => write!(f, "gpkg:{}", path.display()),
            Dataset::PgSchema { schema, .. } => write!(f, "pg:{schema}"),
        }
    }
}
