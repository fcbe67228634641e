//! Schema introspection.
//!
//! Loads the table/column layout plus one sample row per table, producing the
//! `Schema` value a conversation embeds into every prompt. Engine-specific
//! catalog queries live in the per-engine loaders; callers only see
//! `load_schema`.

use crate::domain::error::{AppError, Result};
use crate::domain::schema::{Schema, Table};
use crate::infrastructure::db::postgres::PostgresLoader;
use crate::infrastructure::db::sqlite::SqliteLoader;
use crate::infrastructure::db::Database;
use async_trait::async_trait;
use tracing::info;

#[async_trait]
pub(crate) trait SchemaLoader {
    async fn table_list(&self, db: &Database) -> Result<Vec<String>>;
    async fn describe_table(&self, db: &Database, table: &str) -> Result<Table>;
}

/// Load the full schema of the connected database. Fatal to conversation
/// creation on failure; nothing is cached.
pub async fn load_schema(db: &Database) -> Result<Schema> {
    let loader: Box<dyn SchemaLoader + Send + Sync> = match db.engine_label() {
        "postgres" => Box::new(PostgresLoader),
        "sqlite" => Box::new(SqliteLoader),
        other => {
            return Err(AppError::SchemaError(format!(
                "Unsupported database type {}",
                other
            )))
        }
    };

    let table_names = loader
        .table_list(db)
        .await
        .map_err(|e| AppError::SchemaError(format!("Getting tables: {}", e)))?;

    info!("Got {} tables", table_names.len());

    let mut tables = Vec::new();
    for name in &table_names {
        let table = loader
            .describe_table(db, name)
            .await
            .map_err(|e| AppError::SchemaError(format!("Describing table {}: {}", name, e)))?;
        tables.push(table);
    }

    Ok(Schema { tables })
}

/// Fetch at most one row of a table, stringified, for prompt context.
pub(crate) async fn sample_row(db: &Database, table: &str) -> Result<Option<Vec<String>>> {
    let rows = db
        .fetch(&format!("SELECT * FROM {} LIMIT 1", table))
        .await
        .map_err(|e| AppError::SchemaError(format!("Loading example row: {}", e)))?;
    Ok(rows.rows.into_iter().next())
}
