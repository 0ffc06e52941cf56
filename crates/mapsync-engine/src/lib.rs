//! mapsync synchronization engine
//!
//! The [`SyncEngine`] is the synchronization state machine: it implements
//! `init`, `status`, `pull` and `push` as ordered sequences of precondition
//! checks, changeset computations and collaborator calls, and owns the
//! invariant that the three copies of the data (server project, local
//! working copy, database base/modified schemas) never diverge unnoticed.
//!
//! The [`Orchestrator`] iterates the configured schema/project pairs and
//! runs one engine per pair, stopping at the first error.
//!
//! ## Sync model
//!
//! Four datasets hold the same tables: the server-side project file, the
//! local working-copy file, and the `base` and `modified` database schemas.
//! `base` is the last state known to be reflected on the server; `modified`
//! receives live database edits. Pull merges upstream edits into both
//! schemas (rebasing `modified` when it has local edits); push transfers
//! `base`→`modified` changes through the working copy onto the server.

pub mod engine;
pub mod orchestrator;

pub use engine::SyncEngine;
pub use orchestrator::{Operation, Orchestrator, PairReport};
