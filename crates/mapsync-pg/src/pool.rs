//! Database connection pool management
//!
//! Wraps sqlx's PgPool with lazy connection establishment so that building
//! the adapter is infallible; the first query (normally the engine's ping)
//! surfaces connectivity problems. Accepts both URL and libpq keyword/value
//! connection strings, matching what the geodiff postgres driver takes.

use std::str::FromStr;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};

use crate::CatalogError;

/// Maximum connections per synchronized database
///
/// Operations are strictly sequential, so the pool exists only to reuse a
/// connection across catalog calls.
const MAX_CONNECTIONS: u32 = 2;

/// Seconds to wait for a connection before giving up
const ACQUIRE_TIMEOUT_SECS: u64 = 5;

/// Manages a pool of Postgres connections for one synchronized database
pub struct DatabasePool {
    pool: PgPool,
}

impl DatabasePool {
    /// Creates a lazily-connecting pool from a connection string
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::ConnectionFailed` when the connection string
    /// cannot be parsed. Actual connectivity is verified on first use.
    pub fn new(conn_info: &str) -> Result<Self, CatalogError> {
        let options = PgConnectOptions::from_str(conn_info).map_err(|e| {
            CatalogError::ConnectionFailed(format!("Invalid connection info: {e}"))
        })?;

        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(ACQUIRE_TIMEOUT_SECS))
            .connect_lazy_with(options);

        Ok(Self { pool })
    }

    /// Access the underlying sqlx pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
