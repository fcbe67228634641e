use crate::domain::error::{AppError, Result};
use crate::domain::schema::{Column, Table};
use crate::infrastructure::db::schema_loader::{sample_row, SchemaLoader};
use crate::infrastructure::db::Database;
use async_trait::async_trait;
use sqlx::Row;

pub(crate) struct PostgresLoader;

impl PostgresLoader {
    fn pool<'a>(db: &'a Database) -> Result<&'a sqlx::Pool<sqlx::Postgres>> {
        db.postgres()
            .ok_or_else(|| AppError::SchemaError("Not a PostgreSQL database".to_string()))
    }
}

#[async_trait]
impl SchemaLoader for PostgresLoader {
    async fn table_list(&self, db: &Database) -> Result<Vec<String>> {
        let pool = Self::pool(db)?;
        let tables: Vec<String> = sqlx::query_scalar(
            "SELECT tablename FROM pg_catalog.pg_tables \
             WHERE schemaname != 'pg_catalog' AND schemaname != 'information_schema'",
        )
        .fetch_all(pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Listing tables: {}", e)))?;
        Ok(tables)
    }

    async fn describe_table(&self, db: &Database, table: &str) -> Result<Table> {
        let pool = Self::pool(db)?;
        let rows = sqlx::query(
            "SELECT column_name, data_type FROM information_schema.columns \
             WHERE table_name = $1 ORDER BY ordinal_position",
        )
        .bind(table)
        .fetch_all(pool)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Describing table: {}", e)))?;

        let mut columns = Vec::new();
        for row in rows {
            let name: String = row
                .try_get("column_name")
                .map_err(|e| AppError::DatabaseError(format!("Reading column_name: {}", e)))?;
            let ty: String = row
                .try_get("data_type")
                .map_err(|e| AppError::DatabaseError(format!("Reading data_type: {}", e)))?;
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
