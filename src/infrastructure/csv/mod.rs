//! CSV rendering for query results.
//!
//! A result set renders to a header row followed by one record per row.
//! Prompt embedding truncates this text separately (see
//! `domain::exchange::SAMPLE_LINES`); the full text here is unbounded.

use crate::domain::error::{AppError, Result};
use crate::infrastructure::db::RowSet;

/// Render a row set as CSV text. An empty result renders as an empty string.
pub fn to_csv_text(rows: &RowSet) -> Result<String> {
    if rows.columns.is_empty() {
        return Ok(String::new());
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    writer
        .write_record(&rows.columns)
        .map_err(|e| AppError::Internal(format!("Failed to write CSV header: {}", e)))?;
    for row in &rows.rows {
        writer
            .write_record(row)
            .map_err(|e| AppError::Internal(format!("Failed to write CSV row: {}", e)))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("Failed to flush CSV: {}", e)))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV was not UTF-8: {}", e)))
}
