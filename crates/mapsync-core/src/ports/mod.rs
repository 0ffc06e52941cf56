//! Port definitions (hexagonal architecture interfaces)
//!
//! This module defines the port traits that form the boundaries of the
//! hexagonal architecture. Ports are interfaces that the synchronization
//! engine depends on, but whose implementations live in adapter crates.
//!
//! ## Ports Overview
//!
//! - [`IDiffEngine`] - Changeset computation, application, rebase and copy
//!   between datasets (the external geodiff binary)
//! - [`IProjectClient`] - Versioned hosted-project operations: download,
//!   pull, push, pending-change reports
//! - [`ISchemaCatalog`] - Database schema inspection and the persisted
//!   schema comment

pub mod diff_engine;
pub mod project_client;
pub mod schema_catalog;

pub use diff_engine::IDiffEngine;
pub use project_client::{IProjectClient, ProjectInfo};
pub use schema_catalog::ISchemaCatalog;
