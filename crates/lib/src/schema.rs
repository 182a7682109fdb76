//! # Schema Cache
//!
//! Column metadata and a couple of sample rows per registered table, loaded
//! once at startup and read-only afterwards. A table whose introspection
//! fails is logged and skipped: text-to-SQL generation is silently disabled
//! for it and questions fall through to the legacy heuristics. The cache is
//! never refreshed, so schema drift requires a restart.

use crate::constants::SCHEMA_SAMPLE_ROWS;
use crate::providers::db::storage::Storage;
use crate::registry::TableRegistry;
use crate::types::{Row, TableSchema};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

/// Cached introspection for one table.
#[derive(Debug, Clone)]
pub struct SchemaEntry {
    pub table_name: String,
    pub schema: TableSchema,
    pub sample_rows: Vec<Row>,
}

/// Process-wide cache of per-table schema entries.
#[derive(Debug, Default)]
pub struct SchemaCache {
    entries: RwLock<HashMap<String, Arc<SchemaEntry>>>,
}

impl SchemaCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Introspects every registered table, sequentially.
    ///
    /// One table failing does not block the others; a completely unreachable
    /// database simply leaves the cache empty and the service degrades to
    /// AI-only answers.
    pub async fn warm(&self, storage: &dyn Storage, registry: &TableRegistry) {
        for mapping in registry.mappings() {
            let table = &mapping.table_name;
            let schema = match storage.get_table_schema(table).await {
                Ok(schema) => schema,
                Err(e) => {
                    warn!(%table, error = %e, "Schema load failed; generation disabled for table");
                    continue;
                }
            };
            let sample_rows = match storage.sample_rows(table, SCHEMA_SAMPLE_ROWS).await {
                Ok(rows) => rows,
                Err(e) => {
                    warn!(%table, error = %e, "Sample row load failed; continuing without samples");
                    Vec::new()
                }
            };

            info!(
                %table,
                columns = schema.fields.len(),
                samples = sample_rows.len(),
                "Cached table schema"
            );
            self.entries.write().await.insert(
                table.clone(),
                Arc::new(SchemaEntry {
                    table_name: table.clone(),
                    schema,
                    sample_rows,
                }),
            );
        }
    }

    /// The cached entry for a table; `None` means generation is unavailable.
    pub async fn get(&self, table_name: &str) -> Option<Arc<SchemaEntry>> {
        self.entries.read().await.get(table_name).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Test hook: inserts a pre-built entry without touching storage.
    pub async fn insert(&self, entry: SchemaEntry) {
        self.entries
            .write()
            .await
            .insert(entry.table_name.clone(), Arc::new(entry));
    }
}
