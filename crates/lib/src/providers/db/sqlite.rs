use crate::errors::AskError;
use crate::providers::db::storage::Storage;
use crate::types::{FieldType, Row, RowLimit, TableField, TableSchema};
use async_trait::async_trait;
use serde_json::Value;
use std::fmt::{self, Debug};
use turso::{Database, Value as TursoValue};

/// A provider for a local SQLite database using Turso.
///
/// Used for development and tests. `PRAGMA table_info` stands in for the
/// `INFORMATION_SCHEMA` views a server database would expose. Cloning shares
/// the underlying database, so an in-memory instance can be shared across
/// handles.
#[derive(Clone)]
pub struct SqliteProvider {
    pub db: Database,
}

impl SqliteProvider {
    /// Creates a new `SqliteProvider` from a file path, or ":memory:".
    pub async fn new(db_path: &str) -> Result<Self, AskError> {
        let db = turso::Builder::new_local(db_path)
            .build()
            .await
            .map_err(|e| AskError::StorageConnection(e.to_string()))?;

        // WAL improves concurrency for file-backed databases and is a no-op
        // in memory. PRAGMA returns a row, so query rather than execute.
        let conn = db
            .connect()
            .map_err(|e| AskError::StorageConnection(e.to_string()))?;
        conn.query("PRAGMA journal_mode=WAL;", ())
            .await
            .map_err(|e| AskError::StorageConnection(e.to_string()))?;

        Ok(Self { db })
    }

    /// A helper for tests to pre-populate data by executing multiple SQL statements.
    pub async fn initialize_with_data(&self, init_sql: &str) -> Result<(), AskError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| AskError::StorageConnection(e.to_string()))?;

        for statement in init_sql.split(';').filter(|s| !s.trim().is_empty()) {
            conn.execute(statement, ())
                .await
                .map_err(|e| AskError::StorageQueryFailed(e.to_string()))?;
        }
        Ok(())
    }
}

impl Debug for SqliteProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteProvider").finish_non_exhaustive()
    }
}

/// Converts a Turso value to a serde_json::Value.
fn turso_value_to_json(v: TursoValue) -> Value {
    match v {
        TursoValue::Null => Value::Null,
        TursoValue::Integer(i) => Value::Number(i.into()),
        TursoValue::Real(f) => serde_json::Number::from_f64(f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        TursoValue::Text(s) => Value::String(s),
        TursoValue::Blob(_) => Value::String("<blob>".to_string()),
    }
}

#[async_trait]
impl Storage for SqliteProvider {
    fn name(&self) -> &str {
        "SQLite"
    }

    fn language(&self) -> &str {
        "SQL"
    }

    fn row_limit(&self) -> RowLimit {
        RowLimit::Limit
    }

    async fn execute_query(&self, sql: &str) -> Result<Vec<Row>, AskError> {
        tracing::debug!(query = %sql, "--> Executing SQLite query");

        let conn = self
            .db
            .connect()
            .map_err(|e| AskError::StorageConnection(e.to_string()))?;

        let mut stmt = conn
            .prepare(sql)
            .await
            .map_err(|e| AskError::StorageQueryFailed(e.to_string()))?;

        let column_names: Vec<String> = stmt
            .columns()
            .iter()
            .map(|c| c.name().to_string())
            .collect();

        let mut rows = stmt
            .query(())
            .await
            .map_err(|e| AskError::StorageQueryFailed(e.to_string()))?;

        let mut results: Vec<Row> = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AskError::StorageQueryFailed(e.to_string()))?
        {
            let mut row_map = Row::new();
            for (i, name) in column_names.iter().enumerate() {
                let value = row
                    .get_value(i)
                    .map_err(|e| AskError::StorageQueryFailed(e.to_string()))?;
                row_map.insert(name.clone(), turso_value_to_json(value));
            }
            results.push(row_map);
        }

        Ok(results)
    }

    async fn get_table_schema(&self, table_name: &str) -> Result<TableSchema, AskError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| AskError::StorageConnection(e.to_string()))?;

        let query = format!("PRAGMA table_info({table_name});");
        let mut rows = conn
            .query(&query, ())
            .await
            .map_err(|e| AskError::StorageQueryFailed(e.to_string()))?;

        let mut fields = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AskError::StorageQueryFailed(e.to_string()))?
        {
            // PRAGMA table_info columns: cid, name, type, notnull, dflt_value, pk
            if let (Ok(TursoValue::Text(name)), Ok(TursoValue::Text(type_str))) =
                (row.get_value(1), row.get_value(2))
            {
                let field_type = match type_str.to_uppercase().as_str() {
                    "INTEGER" => FieldType::Integer,
                    "TEXT" => FieldType::String,
                    "REAL" => FieldType::Float,
                    "BLOB" => FieldType::Bytes,
                    "BOOLEAN" => FieldType::Boolean,
                    "DATETIME" | "TIMESTAMP" => FieldType::Timestamp,
                    "DATE" => FieldType::Date,
                    _ => FieldType::String,
                };
                let nullable = !matches!(row.get_value(3), Ok(TursoValue::Integer(1)));

                fields.push(TableField {
                    name,
                    r#type: field_type,
                    max_length: None,
                    nullable,
                });
            }
        }

        if fields.is_empty() {
            return Err(AskError::StorageQueryFailed(format!(
                "Table '{table_name}' not found or has no columns."
            )));
        }

        Ok(TableSchema { fields })
    }

    async fn sample_rows(&self, table_name: &str, limit: u32) -> Result<Vec<Row>, AskError> {
        let sql = RowLimit::Limit.select("*", &format!("FROM {table_name}"), limit);
        self.execute_query(&sql).await
    }

    async fn list_tables(&self) -> Result<Vec<String>, AskError> {
        let conn = self
            .db
            .connect()
            .map_err(|e| AskError::StorageConnection(e.to_string()))?;

        let mut rows = conn
            .query(
                "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' ORDER BY name;",
                (),
            )
            .await
            .map_err(|e| AskError::StorageQueryFailed(e.to_string()))?;

        let mut tables = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| AskError::StorageQueryFailed(e.to_string()))?
        {
            if let Ok(TursoValue::Text(name)) = row.get_value(0) {
                tables.push(name);
            }
        }
        Ok(tables)
    }
}
