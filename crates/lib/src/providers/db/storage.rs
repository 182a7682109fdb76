use crate::errors::AskError;
use crate::types::{Row, RowLimit, TableSchema};
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

/// A trait for interacting with a storage backend.
///
/// This is the external database collaborator: query execution plus an
/// `INFORMATION_SCHEMA`-equivalent introspection surface. The `row_limit`
/// hook tells query builders and generation prompts which row-capping syntax
/// the backend's dialect uses, so the same pipeline can face a `TOP n`
/// server or a `LIMIT n` one.
#[async_trait]
pub trait Storage: Send + Sync + DynClone + Debug {
    /// The name of the storage provider (e.g., "SQLite").
    fn name(&self) -> &str;

    /// The query language name used in prompts (e.g., "SQL").
    fn language(&self) -> &str;

    /// The dialect's row-capping syntax.
    fn row_limit(&self) -> RowLimit {
        RowLimit::Limit
    }

    /// Executes a query and returns its rows with columns in SELECT order.
    async fn execute_query(&self, sql: &str) -> Result<Vec<Row>, AskError>;

    /// Retrieves ordered column metadata for a table.
    async fn get_table_schema(&self, table_name: &str) -> Result<TableSchema, AskError>;

    /// Fetches up to `limit` arbitrary rows from a table, for prompt context.
    async fn sample_rows(&self, table_name: &str, limit: u32) -> Result<Vec<Row>, AskError>;

    /// Lists the base tables available in the database.
    async fn list_tables(&self) -> Result<Vec<String>, AskError>;
}

dyn_clone::clone_trait_object!(Storage);
