use serde::{Deserialize, Serialize};
use std::fmt;

/// A column in a table.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Column {
    pub name: String,
    pub ty: String,
}

/// A table in a database, with at most one sample row of stringified values.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    pub sample_row: Option<Vec<String>>,
}

/// A simplified database schema: an ordered list of tables.
///
/// The textual form produced by `Display` is what the model sees; the
/// structured form exists only so loaders can build it.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Schema {
    pub tables: Vec<Table>,
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let columns = self
            .columns
            .iter()
            .map(|c| format!("{} {}", c.name, c.ty))
            .collect::<Vec<_>>()
            .join(", ");

        write!(f, "CREATE TABLE {} ({})", self.name, columns)?;
        if let Some(sample) = &self.sample_row {
            write!(
                f,
                "\nINSERT INTO {} VALUES ({});",
                self.name,
                sample.join(", ")
            )?;
        }
        Ok(())
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables = self
            .tables
            .iter()
            .map(|t| t.to_string())
            .collect::<Vec<_>>()
            .join("\n\n");
        write!(f, "{}", tables)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_table() -> Table {
        Table {
            name: "users".to_string(),
            columns: vec![
                Column {
                    name: "id".to_string(),
                    ty: "integer".to_string(),
                },
                Column {
                    name: "name".to_string(),
                    ty: "text".to_string(),
                },
            ],
            sample_row: Some(vec!["1".to_string(), "Alice".to_string()]),
        }
    }

    #[test]
    fn test_table_renders_create_and_insert() {
        let rendered = users_table().to_string();
        assert_eq!(
            rendered,
            "CREATE TABLE users (id integer, name text)\nINSERT INTO users VALUES (1, Alice);"
        );
    }

    #[test]
    fn test_empty_table_skips_insert() {
        let table = Table {
            sample_row: None,
            ..users_table()
        };
        let rendered = table.to_string();
        assert_eq!(rendered, "CREATE TABLE users (id integer, name text)");
        assert!(!rendered.contains("INSERT"));
    }

    #[test]
    fn test_schema_joins_tables_with_blank_line() {
        let schema = Schema {
            tables: vec![users_table(), users_table()],
        };
        let rendered = schema.to_string();
        assert_eq!(rendered.matches("CREATE TABLE").count(), 2);
        assert!(rendered.contains(";\n\nCREATE TABLE"));
    }

    #[test]
    fn test_schema_rendering_is_deterministic() {
        let schema = Schema {
            tables: vec![users_table()],
        };
        assert_eq!(schema.to_string(), schema.to_string());
    }
}
