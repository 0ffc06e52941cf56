//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for project identifiers and versions.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::errors::SyncError;

// ============================================================================
// ProjectPath
// ============================================================================

/// Full path of a hosted project: `namespace/name`
///
/// The namespace identifies the owning workspace on the server, the name the
/// project within it. Both halves must be non-empty and the path must contain
/// exactly one slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectPath(String);

impl ProjectPath {
    /// Parse and validate a `namespace/name` string
    pub fn new(path: impl Into<String>) -> Result<Self, SyncError> {
        let path = path.into();
        let mut parts = path.splitn(2, '/');
        match (parts.next(), parts.next()) {
            (Some(ns), Some(name)) if !ns.is_empty() && !name.is_empty() && !name.contains('/') => {
                Ok(Self(path))
            }
            _ => Err(SyncError::Config(format!(
                "Invalid project path (expected namespace/name): {path}"
            ))),
        }
    }

    /// The owning namespace (the part before the slash)
    pub fn namespace(&self) -> &str {
        self.0.split('/').next().unwrap_or_default()
    }

    /// The project name within its namespace (the part after the slash)
    ///
    /// Also used as the name of the per-project working directory.
    pub fn short_name(&self) -> &str {
        self.0.split('/').nth(1).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProjectPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProjectPath {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

// ============================================================================
// ProjectVersion
// ============================================================================

/// A hosted project version identifier, e.g. `v42`
///
/// Versions are assigned by the server and increase monotonically with each
/// accepted push. Ordering compares the numeric component so that `v10`
/// sorts after `v9`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectVersion(String);

impl ProjectVersion {
    /// Parse and validate a `v<N>` version string
    ///
    /// Only the canonical form is accepted: no leading zeros, so equal
    /// numbers always mean equal strings.
    pub fn new(version: impl Into<String>) -> Result<Self, SyncError> {
        let version = version.into();
        match version.strip_prefix('v') {
            Some(num)
                if !num.is_empty()
                    && num.bytes().all(|b| b.is_ascii_digit())
                    && (num == "0" || !num.starts_with('0')) =>
            {
                Ok(Self(version))
            }
            _ => Err(SyncError::Config(format!(
                "Invalid project version (expected v<number>): {version}"
            ))),
        }
    }

    /// The numeric component of the version
    pub fn number(&self) -> u64 {
        self.0[1..].parse().unwrap_or(0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ProjectVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ProjectVersion {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl PartialOrd for ProjectVersion {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ProjectVersion {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.number().cmp(&other.number())
    }
}
