use super::{UserRecord, UserStore};
use crate::auth::UserKind;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{
    Connection, PgPool, Row,
    postgres::{PgPoolOptions, PgRow},
};
use std::time::Duration;
use tracing::{Instrument, info_span};

/// Connection pool sizing and timeouts.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub min_connections: u32,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
    pub max_lifetime: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            min_connections: 1,
            // 5 persistent connections plus up to 10 overflow
            max_connections: 15,
            acquire_timeout: Duration::from_secs(30),
            max_lifetime: Duration::from_secs(60 * 60),
        }
    }
}

impl PoolConfig {
    #[must_use]
    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self.min_connections = self.min_connections.min(self.max_connections);
        self
    }

    #[must_use]
    pub fn with_acquire_timeout(mut self, acquire_timeout: Duration) -> Self {
        self.acquire_timeout = acquire_timeout;
        self
    }
}

/// `PostgreSQL` backed record spaces: the `teacher` and `student` tables.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Open a connection pool to `dsn`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be reached.
    pub async fn connect(dsn: &str, config: &PoolConfig) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(config.min_connections)
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .max_lifetime(config.max_lifetime)
            .test_before_acquire(true)
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        Ok(Self::new(pool))
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn select_query(kind: UserKind) -> String {
    format!(
        "SELECT {id} AS identifier, first_name, last_name, password FROM {table} WHERE {id} = $1",
        id = kind.id_column(),
        table = kind.table(),
    )
}

fn record_from_row(row: &PgRow) -> Result<UserRecord, sqlx::Error> {
    Ok(UserRecord {
        identifier: row.try_get("identifier")?,
        first_name: row.try_get("first_name")?,
        last_name: row.try_get("last_name")?,
        password_hash: row.try_get("password")?,
    })
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_one(&self, kind: UserKind, identifier: &str) -> Result<Option<UserRecord>> {
        // Postgres text cannot hold NUL, so no stored identifier can match one.
        if identifier.contains('\0') {
            return Ok(None);
        }

        // The connection goes back to the pool when `conn` drops, on every path.
        let acquire_span = info_span!(
            "db.acquire",
            db.system = "postgresql",
            db.operation = "ACQUIRE"
        );
        let mut conn = self
            .pool
            .acquire()
            .instrument(acquire_span)
            .await
            .context("Failed to acquire database connection")?;

        let query = select_query(kind);
        let select_span = info_span!(
            "db.select",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.sql.table = kind.table()
        );
        let row = sqlx::query(&query)
            .bind(identifier)
            .fetch_optional(&mut *conn)
            .instrument(select_span)
            .await
            .with_context(|| format!("Failed to query {} records", kind.table()))?;

        row.as_ref()
            .map(record_from_row)
            .transpose()
            .with_context(|| format!("Malformed {} record", kind.table()))
    }

    async fn ping(&self) -> Result<()> {
        let mut conn = self
            .pool
            .acquire()
            .await
            .context("Failed to acquire database connection")?;
        let ping_span = info_span!("db.ping", db.system = "postgresql", db.operation = "PING");
        conn.ping()
            .instrument(ping_span)
            .await
            .context("Failed to ping database")
    }
}
