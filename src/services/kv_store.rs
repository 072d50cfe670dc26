//! Durable key-value store adapters.
//!
//! The manager persists its state as a handful of JSON values keyed by name,
//! the same shape an extension's local storage area offers.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use serde_json::Value;

use crate::database::connection::Database;
use crate::types::errors::StoreError;

/// Extension-scoped storage that survives process restarts.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Returns the subset of `keys` that have a stored value.
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StoreError>;
    async fn set(&self, entries: HashMap<String, Value>) -> Result<(), StoreError>;
    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError>;
}

/// Non-durable store for tests and the headless harness.
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store pre-populated with `entries`.
    pub fn with_entries(entries: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            entries: Mutex::new(entries.into_iter().collect()),
        }
    }

    /// Snapshot of one stored value.
    pub fn peek(&self, key: &str) -> Option<Value> {
        self.lock().get(key).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Value>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StoreError> {
        let entries = self.lock();
        Ok(keys
            .iter()
            .filter_map(|k| entries.get(*k).map(|v| (k.to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, entries: HashMap<String, Value>) -> Result<(), StoreError> {
        self.lock().extend(entries);
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let mut entries = self.lock();
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

/// SQLite-backed store. Values are stored as JSON text.
pub struct SqliteStore {
    db: Arc<Database>,
}

impl SqliteStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Opens the database file at `path`, creating parent directories as needed.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    StoreError::DatabaseError(format!("Failed to create data directory: {}", e))
                })?;
            }
        }
        let db = Database::open(path)?;
        Ok(Self::new(Arc::new(db)))
    }

    fn now() -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, Value>, StoreError> {
        let conn = self.db.connection();
        let mut stmt = conn.prepare("SELECT value FROM kv_store WHERE key = ?1")?;
        let mut found = HashMap::new();
        for key in keys {
            let raw: Option<String> = stmt.query_row(params![key], |row| row.get(0)).optional()?;
            if let Some(raw) = raw {
                found.insert(key.to_string(), serde_json::from_str(&raw)?);
            }
        }
        Ok(found)
    }

    async fn set(&self, entries: HashMap<String, Value>) -> Result<(), StoreError> {
        let mut conn = self.db.connection();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO kv_store (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            )?;
            let now = Self::now();
            for (key, value) in &entries {
                stmt.execute(params![key, serde_json::to_string(value)?, now])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    async fn remove(&self, keys: &[&str]) -> Result<(), StoreError> {
        let conn = self.db.connection();
        for key in keys {
            conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        }
        Ok(())
    }
}
