//! Schema catalog port (driven/secondary port)
//!
//! Interface to the database catalog: schema existence checks and the
//! persisted schema comment on the `base` schema. This is the only database
//! state the synchronization engine reads or writes directly - all table data
//! moves through the diff engine.

use async_trait::async_trait;

use crate::domain::SchemaComment;

/// Catalog operations against the synchronized database
#[async_trait]
pub trait ISchemaCatalog {
    /// Verify the database is reachable
    async fn ping(&self) -> anyhow::Result<()>;

    /// Whether a schema of this name exists
    async fn schema_exists(&self, schema: &str) -> anyhow::Result<bool>;

    /// Read the sync comment from a schema
    ///
    /// Missing or unparsable comments read as `None`; callers treat absence
    /// as "uninitialized".
    async fn read_comment(&self, schema: &str) -> anyhow::Result<Option<SchemaComment>>;

    /// Write (overwrite) the sync comment on a schema
    async fn write_comment(&self, schema: &str, comment: &SchemaComment) -> anyhow::Result<()>;
}
