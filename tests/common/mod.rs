//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::Connection;
use tempfile::TempDir;

use mcp_sql::config::{CatalogSettings, StoreConfig};
use mcp_sql::gateway::{GatewayResult, ModelBackend, ModelGateway, OutputFormat};
use mcp_sql::metadata::{MetadataProvider, SchemaCatalog, StoreMetadataProvider};
use mcp_sql::store::PoolManager;

pub const TOKEN: &str = "test-token";

/// A database with `Patients(id INT, name VARCHAR)` holding two rows.
pub fn patients_db() -> (TempDir, StoreConfig) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("clinic.db");

    let conn = Connection::open(&path).unwrap();
    conn.execute_batch(
        "CREATE TABLE Patients (id INT, name VARCHAR);
         INSERT INTO Patients (id, name) VALUES (1, 'Ana');
         INSERT INTO Patients (id, name) VALUES (2, 'Ben');",
    )
    .unwrap();

    let mut config = StoreConfig::sqlite(path.to_string_lossy());
    config.max_connections = 4;
    (dir, config)
}

/// Count rows in `Patients` through a separate, writable connection.
pub fn patient_count(config: &StoreConfig) -> i64 {
    let conn = Connection::open(&config.path).unwrap();
    conn.query_row("SELECT count(*) FROM Patients", [], |r| r.get(0))
        .unwrap()
}

pub fn catalog(pools: &Arc<PoolManager>, default_tables: &[&str]) -> SchemaCatalog {
    let provider: Arc<dyn MetadataProvider> =
        Arc::new(StoreMetadataProvider::new(Arc::clone(pools)));
    SchemaCatalog::new(
        provider,
        CatalogSettings {
            default_schema: "main".to_string(),
            default_tables: default_tables.iter().map(|t| t.to_string()).collect(),
        },
    )
}

/// Backend that answers every prompt with a fixed reply.
pub struct MockBackend {
    name: String,
    reply: String,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl MockBackend {
    pub fn new(name: &str, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ModelBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn generate(&self, prompt: &str, _format: OutputFormat) -> GatewayResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

pub fn gateway_with(backends: &[Arc<MockBackend>]) -> ModelGateway {
    let mut gateway = ModelGateway::new();
    for backend in backends {
        gateway.register(Arc::clone(backend) as Arc<dyn ModelBackend>);
    }
    gateway
}
