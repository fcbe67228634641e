//! Database access for chat queries.
//!
//! A `Database` wraps a PostgreSQL or SQLite pool behind one `fetch` call
//! that returns stringified rows, ready for CSV rendering and prompt
//! embedding. Model-generated SQL runs verbatim; the only guard is the
//! per-query timeout.

pub mod executor;
pub mod postgres;
pub mod schema_loader;
pub mod sqlite;

use crate::domain::error::{AppError, Result};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Pool, Postgres, Row, Sqlite};
use std::time::Duration;
use tracing::info;

/// Pooling and timeout knobs for the chat database.
#[derive(Debug, Clone)]
pub struct DbConfig {
    pub max_connections: u32,
    pub connect_timeout_secs: u64,
    pub query_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            connect_timeout_secs: 10,
            query_timeout_secs: 30,
            idle_timeout_secs: 300,
        }
    }
}

/// A query result with every cell rendered to text. NULL renders as an empty
/// string.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

enum DbPool {
    Postgres(Pool<Postgres>),
    Sqlite(Pool<Sqlite>),
}

pub struct Database {
    pool: DbPool,
    query_timeout: Duration,
}

impl Database {
    /// Connect to the database named by `url`. The URL scheme selects the
    /// engine: `postgres://` (or `postgresql://`) and `sqlite:` are
    /// supported.
    pub async fn connect(url: &str, config: &DbConfig) -> Result<Self> {
        let query_timeout = Duration::from_secs(config.query_timeout_secs);

        let pool = if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            let pool = PgPoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
                .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
                .connect(url)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Failed to connect to PostgreSQL: {}", e))
                })?;
            DbPool::Postgres(pool)
        } else if url.starts_with("sqlite:") {
            let pool = SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
                .connect(url)
                .await
                .map_err(|e| {
                    AppError::DatabaseError(format!("Failed to connect to SQLite: {}", e))
                })?;
            DbPool::Sqlite(pool)
        } else {
            return Err(AppError::ConfigError(format!(
                "Unsupported database URL scheme: {}",
                url
            )));
        };

        let db = Self {
            pool,
            query_timeout,
        };
        info!("Connected to {} database", db.engine_label());
        Ok(db)
    }

    pub fn engine_label(&self) -> &'static str {
        match self.pool {
            DbPool::Postgres(_) => "postgres",
            DbPool::Sqlite(_) => "sqlite",
        }
    }

    pub(crate) fn postgres(&self) -> Option<&Pool<Postgres>> {
        match &self.pool {
            DbPool::Postgres(pool) => Some(pool),
            DbPool::Sqlite(_) => None,
        }
    }

    pub(crate) fn sqlite(&self) -> Option<&Pool<Sqlite>> {
        match &self.pool {
            DbPool::Sqlite(pool) => Some(pool),
            DbPool::Postgres(_) => None,
        }
    }

    /// Run `sql` verbatim and return its rows as text. No retry; errors carry
    /// the driver's message.
    pub async fn fetch(&self, sql: &str) -> Result<RowSet> {
        match &self.pool {
            DbPool::Postgres(pool) => {
                let rows = tokio::time::timeout(
                    self.query_timeout,
                    sqlx::query(sql).fetch_all(pool),
                )
                .await
                .map_err(|_| self.timeout_error())?
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;

                let columns = rows
                    .first()
                    .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
                    .unwrap_or_default();
                let rows = rows
                    .iter()
                    .map(|row| {
                        (0..row.columns().len())
                            .map(|i| pg_cell_to_string(row, i))
                            .collect()
                    })
                    .collect();
                Ok(RowSet { columns, rows })
            }
            DbPool::Sqlite(pool) => {
                let rows = tokio::time::timeout(
                    self.query_timeout,
                    sqlx::query(sql).fetch_all(pool),
                )
                .await
                .map_err(|_| self.timeout_error())?
                .map_err(|e| AppError::DatabaseError(e.to_string()))?;

                let columns = rows
                    .first()
                    .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
                    .unwrap_or_default();
                let rows = rows
                    .iter()
                    .map(|row| {
                        (0..row.columns().len())
                            .map(|i| sqlite_cell_to_string(row, i))
                            .collect()
                    })
                    .collect();
                Ok(RowSet { columns, rows })
            }
        }
    }

    fn timeout_error(&self) -> AppError {
        AppError::DatabaseError(format!(
            "Query timed out after {} seconds",
            self.query_timeout.as_secs()
        ))
    }
}

/// Render one PostgreSQL cell as text, trying types in order of likelihood.
fn pg_cell_to_string(row: &PgRow, index: usize) -> String {
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v.unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.map(|n| n.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<i32>, _>(index) {
        return v.map(|n| n.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<i16>, _>(index) {
        return v.map(|n| n.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.map(|n| n.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<f32>, _>(index) {
        return v.map(|n| n.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return v.map(|b| b.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<bigdecimal::BigDecimal>, _>(index) {
        return v.map(|n| n.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<chrono::DateTime<chrono::Utc>>, _>(index) {
        return v.map(|dt| dt.to_rfc3339()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDateTime>, _>(index) {
        return v.map(|dt| dt.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<chrono::NaiveDate>, _>(index) {
        return v.map(|d| d.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return v
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();
    }

    String::new()
}

/// Render one SQLite cell as text. SQLite is dynamically typed, so fewer
/// shapes to try.
fn sqlite_cell_to_string(row: &SqliteRow, index: usize) -> String {
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v.unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.map(|n| n.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.map(|n| n.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return v.map(|b| b.to_string()).unwrap_or_default();
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return v
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default();
    }

    String::new()
}
