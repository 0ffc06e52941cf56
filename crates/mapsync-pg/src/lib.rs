//! mapsync Postgres adapter - schema catalog access
//!
//! Implements the `ISchemaCatalog` port from `mapsync-core` against a
//! PostGIS database. It is a driven (secondary) adapter in the hexagonal
//! architecture.
//!
//! The adapter touches only catalog state: `pg_namespace` existence checks
//! and the JSON sync comment stored with `COMMENT ON SCHEMA` on the `base`
//! schema. Table data never moves through here - that is the diff engine's
//! job, which connects to the database on its own.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Lazily-connecting sqlx pool wrapper
//! - [`PgSchemaCatalog`] - Full `ISchemaCatalog` implementation
//! - [`CatalogError`] - Connection setup error type

pub mod catalog;
pub mod pool;

pub use catalog::PgSchemaCatalog;
pub use pool::DatabasePool;

/// Errors that can occur while setting up catalog access
///
/// Query failures surface as plain `anyhow` errors through the port traits.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Failed to establish a database connection
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
}
