//! PgSchemaCatalog - ISchemaCatalog implementation for Postgres
//!
//! Schema existence comes from `pg_namespace`; the sync comment is stored
//! with `COMMENT ON SCHEMA` and read back through `obj_description`.
//!
//! ## Design Notes
//!
//! - `COMMENT ON` takes no bind parameters, so the statement is assembled
//!   with explicit identifier and literal quoting.
//! - A comment that is missing or does not parse as our JSON document reads
//!   as `None`; other tools may legitimately have commented the schema.

use async_trait::async_trait;
use sqlx::Row;
use tracing::debug;

use mapsync_core::domain::SchemaComment;
use mapsync_core::ports::ISchemaCatalog;

use crate::DatabasePool;

/// ISchemaCatalog implementation over a [`DatabasePool`]
pub struct PgSchemaCatalog {
    pool: DatabasePool,
}

impl PgSchemaCatalog {
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Quote a schema name as a SQL identifier
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Quote a string as a SQL literal
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[async_trait]
impl ISchemaCatalog for PgSchemaCatalog {
    async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1")
            .execute(self.pool.pool())
            .await
            .map_err(|e| anyhow::anyhow!("Unable to connect to the database: {e}"))?;
        Ok(())
    }

    async fn schema_exists(&self, schema: &str) -> anyhow::Result<bool> {
        let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM pg_namespace WHERE nspname = $1)")
            .bind(schema)
            .fetch_one(self.pool.pool())
            .await?;
        Ok(row.try_get::<bool, _>(0)?)
    }

    async fn read_comment(&self, schema: &str) -> anyhow::Result<Option<SchemaComment>> {
        let row = sqlx::query("SELECT obj_description($1::regnamespace, 'pg_namespace')")
            .bind(schema)
            .fetch_one(self.pool.pool())
            .await?;
        let raw: Option<String> = row.try_get(0)?;
        Ok(raw.as_deref().and_then(SchemaComment::from_json))
    }

    async fn write_comment(&self, schema: &str, comment: &SchemaComment) -> anyhow::Result<()> {
        debug!(schema, version = %comment.version, "Writing schema comment");
        let statement = format!(
            "COMMENT ON SCHEMA {} IS {}",
            quote_ident(schema),
            quote_literal(&comment.to_json())
        );
        sqlx::query(&statement).execute(self.pool.pool()).await?;
        Ok(())
    }
}
