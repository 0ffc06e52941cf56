//! The persisted schema comment
//!
//! A JSON document stored as the Postgres `COMMENT ON SCHEMA` of the `base`
//! schema. It is the sole durable record of which hosted project and version
//! the database is synchronized to. A failed initialization leaves an `error`
//! field in place so later runs refuse to proceed until it is cleared.

use serde::{Deserialize, Serialize};

use super::newtypes::{ProjectPath, ProjectVersion};

/// Sync metadata attached to the `base` schema
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaComment {
    /// Full `namespace/name` path of the hosted project
    pub name: ProjectPath,
    /// Last hosted version the schema is known to reflect
    pub version: ProjectVersion,
    /// Set when initialization failed its integrity self-check; never
    /// cleared automatically
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SchemaComment {
    pub fn new(name: ProjectPath, version: ProjectVersion) -> Self {
        Self {
            name,
            version,
            error: None,
        }
    }

    pub fn with_error(name: ProjectPath, version: ProjectVersion, error: impl Into<String>) -> Self {
        Self {
            name,
            version,
            error: Some(error.into()),
        }
    }

    /// Serialize for storage in the schema comment
    pub fn to_json(&self) -> String {
        // struct is always serializable; fields are strings
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Parse a stored comment; `None` when missing or not ours
    ///
    /// Comments left by other tools (or hand-written text) must read as
    /// "absent", never as an error, so callers treat the schema as
    /// uninitialized.
    pub fn from_json(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}
