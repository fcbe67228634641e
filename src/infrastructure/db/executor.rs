use crate::domain::error::{AppError, Result};
use crate::infrastructure::csv::to_csv_text;
use crate::infrastructure::db::Database;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Runs a candidate SQL string and renders its result set as CSV text.
///
/// The seam exists so the conversation engine can be exercised without a live
/// database.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, sql: &str) -> Result<String>;
}

pub struct DbExecutor {
    db: Arc<Database>,
}

impl DbExecutor {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl QueryExecutor for DbExecutor {
    async fn execute(&self, sql: &str) -> Result<String> {
        debug!("Executing candidate query ({} chars)", sql.len());

        let rows = self.db.fetch(sql).await.map_err(|err| {
            let detail = match err {
                AppError::DatabaseError(msg) => msg,
                other => other.to_string(),
            };
            AppError::DatabaseError(format!("query:\n{}\n{}", sql, detail))
        })?;

        to_csv_text(&rows)
    }
}
