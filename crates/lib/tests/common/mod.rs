#![allow(dead_code)]
//! # Common Test Utilities
//!
//! Mock AI and storage providers with scripted responses and recorded call
//! history, so pipeline behavior can be asserted without external services.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::fmt::Debug;
use std::sync::{Arc, Mutex, Once, RwLock};
use tanya::errors::AskError;
use tanya::providers::ai::AiProvider;
use tanya::providers::db::storage::Storage;
use tanya::types::{FieldType, Row, RowLimit, TableField, TableSchema};

static INIT: Once = Once::new();

/// Initializes the tracing subscriber and loads .env for tests.
pub fn setup_tracing() {
    INIT.call_once(|| {
        dotenvy::dotenv().ok();
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .compact()
            .try_init();
    });
}

// --- Mock AI Provider ---

#[derive(Clone, Debug)]
pub struct MockAiProvider {
    pub call_history: Arc<RwLock<Vec<(String, String)>>>,
    pub responses: Arc<RwLock<Vec<String>>>,
}

impl MockAiProvider {
    pub fn new(responses: Vec<String>) -> Self {
        Self {
            call_history: Arc::new(RwLock::new(Vec::new())),
            responses: Arc::new(RwLock::new(responses.into_iter().rev().collect())),
        }
    }

    pub fn calls(&self) -> Vec<(String, String)> {
        self.call_history.read().unwrap().clone()
    }
}

#[async_trait]
impl AiProvider for MockAiProvider {
    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, AskError> {
        self.call_history
            .write()
            .unwrap()
            .push((system_prompt.to_string(), user_prompt.to_string()));

        if let Some(response) = self.responses.write().unwrap().pop() {
            Ok(response)
        } else {
            Ok("Default mock response".to_string())
        }
    }
}

/// An AI provider whose every call fails, for upstream-failure tests.
#[derive(Clone, Debug)]
pub struct FailingAiProvider;

#[async_trait]
impl AiProvider for FailingAiProvider {
    async fn generate(&self, _system: &str, _user: &str) -> Result<String, AskError> {
        Err(AskError::AiApi("mock outage".to_string()))
    }
}

// --- Mock Storage Provider ---

#[derive(Clone, Debug)]
pub struct MockStorageProvider {
    pub results: Arc<Mutex<VecDeque<Result<Vec<Row>, String>>>>,
    pub executed: Arc<Mutex<Vec<String>>>,
    pub schemas: Arc<Mutex<HashMap<String, TableSchema>>>,
    pub tables: Arc<Mutex<Vec<String>>>,
}

impl MockStorageProvider {
    pub fn new() -> Self {
        Self {
            results: Arc::new(Mutex::new(VecDeque::new())),
            executed: Arc::new(Mutex::new(Vec::new())),
            schemas: Arc::new(Mutex::new(HashMap::new())),
            tables: Arc::new(Mutex::new(vec![
                "RecordOBCard".to_string(),
                "employees".to_string(),
            ])),
        }
    }

    /// Registers an all-TEXT schema so generation is enabled for the table.
    pub fn with_text_schema(self, table: &str, columns: &[&str]) -> Self {
        let fields = columns
            .iter()
            .map(|name| TableField {
                name: name.to_string(),
                r#type: FieldType::String,
                max_length: None,
                nullable: true,
            })
            .collect();
        self.schemas
            .lock()
            .unwrap()
            .insert(table.to_string(), TableSchema { fields });
        self
    }

    /// Queues the result of the next `execute_query` call.
    pub fn push_rows(&self, rows: Vec<Row>) {
        self.results.lock().unwrap().push_back(Ok(rows));
    }

    pub fn push_error(&self, message: &str) {
        self.results
            .lock()
            .unwrap()
            .push_back(Err(message.to_string()));
    }

    pub fn executed_queries(&self) -> Vec<String> {
        self.executed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Storage for MockStorageProvider {
    fn name(&self) -> &str {
        "MockDB"
    }

    fn language(&self) -> &str {
        "SQL"
    }

    fn row_limit(&self) -> RowLimit {
        RowLimit::Limit
    }

    async fn execute_query(&self, sql: &str) -> Result<Vec<Row>, AskError> {
        self.executed.lock().unwrap().push(sql.to_string());
        match self.results.lock().unwrap().pop_front() {
            Some(Ok(rows)) => Ok(rows),
            Some(Err(message)) => Err(AskError::StorageQueryFailed(message)),
            None => Ok(Vec::new()),
        }
    }

    async fn get_table_schema(&self, table_name: &str) -> Result<TableSchema, AskError> {
        self.schemas
            .lock()
            .unwrap()
            .get(table_name)
            .cloned()
            .ok_or_else(|| {
                AskError::StorageQueryFailed(format!("no schema for '{table_name}'"))
            })
    }

    async fn sample_rows(&self, _table_name: &str, _limit: u32) -> Result<Vec<Row>, AskError> {
        Ok(Vec::new())
    }

    async fn list_tables(&self) -> Result<Vec<String>, AskError> {
        Ok(self.tables.lock().unwrap().clone())
    }
}

/// Builds a row from column/value pairs, preserving column order.
pub fn row(pairs: &[(&str, serde_json::Value)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}
