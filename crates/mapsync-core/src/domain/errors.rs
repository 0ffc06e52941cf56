//! Domain error types
//!
//! A single error enum classifies every failure the synchronization engine
//! can surface. The four variants match the failure taxonomy of the tool:
//! bad configuration, violated preconditions, failing external collaborators
//! (diff engine, project server, database), and integrity self-check failures.

use thiserror::Error;

/// Errors surfaced by synchronization operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    /// Configuration is incomplete or inconsistent; detected before any work
    #[error("Config error: {0}")]
    Config(String),

    /// A precondition for the requested operation does not hold
    /// (missing working directory or schema, pending local edits,
    /// server version diverged, ...)
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// An external collaborator failed: geodiff exited non-zero, the
    /// project server rejected a request, or the database was unreachable
    #[error("Collaborator failed: {0}")]
    Collaborator(String),

    /// A post-operation self-check found the copies diverged; the base
    /// schema is tagged with a persistent error until manually cleared
    #[error("Integrity violation: {0}")]
    Integrity(String),
}

impl SyncError {
    /// Shorthand for wrapping an adapter error into [`SyncError::Collaborator`]
    pub fn collaborator(err: impl std::fmt::Display) -> Self {
        SyncError::Collaborator(err.to_string())
    }
}
