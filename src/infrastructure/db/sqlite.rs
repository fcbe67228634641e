use crate::domain::error::{AppError, Result};
use crate::domain::schema::{Column, Table};
use crate::infrastructure::db::schema_loader::{sample_row, SchemaLoader};
use crate::infrastructure::db::Database;
use async_trait::async_trait;
use sqlx::Row;

pub(crate) struct SqliteLoader;

impl SqliteLoader {
    fn pool<'a>(db: &'a Database) -> Result<&'a sqlx::Pool<sqlx::Sqlite>> {
        db.sqlite()
            .ok_or_else(|| AppError::SchemaError("Not a SQLite database".to_string()))
    }
}

#[async_trait]
impl SchemaLoader for SqliteLoader {
    async fn table_list(&self, db: &Database) -> Result<Vec<String>> {
        let pool = Self::pool(db)?;
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Listing tables: {}", e)))?;
        Ok(tables)
    }

    async fn describe_table(&self, db: &Database, table: &str) -> Result<Table> {
        let pool = Self::pool(db)?;
        let rows = sqlx::query("SELECT name, type FROM pragma_table_info(?1)")
            .bind(table)
            .fetch_all(pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Describing table: {}", e)))?;

        let mut columns = Vec::new();
        for row in rows {
            let name: String = row
                .try_get("name")
                .map_err(|e| AppError::DatabaseError(format!("Reading column name: {}", e)))?;
            let ty: String = row
                .try_get("type")
                .map_err(|e| AppError::DatabaseError(format!("Reading column type: {}", e)))?;
            columns.push(Column { name, ty });
        }

        let sample_row = sample_row(db, table).await?;

        Ok(Table {
            name: table.to_string(),
            columns,
            sample_row,
        })
    }
}
