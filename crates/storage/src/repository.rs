use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("store unavailable")]
    Unavailable,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Local string key-value store (device storage).
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be written.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Remote per-user document store used as a best-effort mirror.
#[async_trait]
pub trait RemoteDocumentStore: Send + Sync {
    /// Whether this store can be reached at all. Resolved once at startup.
    fn is_available(&self) -> bool {
        true
    }

    /// Fetch the document at `path` once.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be fetched.
    async fn read(&self, path: &str) -> Result<Option<Value>, StorageError>;

    /// Overwrite the document at `path`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the document cannot be written.
    async fn write(&self, path: &str, document: &Value) -> Result<(), StorageError>;
}

/// Simple in-memory key-value store for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryKeyValueStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryKeyValueStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self
            .entries
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.remove(key);
        Ok(())
    }
}

/// In-memory document store standing in for the remote backend in tests.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    documents: Arc<Mutex<HashMap<String, Value>>>,
}

impl InMemoryDocumentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the document at `path`, bypassing the trait.
    #[must_use]
    pub fn document(&self, path: &str) -> Option<Value> {
        self.documents
            .lock()
            .ok()
            .and_then(|guard| guard.get(path).cloned())
    }
}

#[async_trait]
impl RemoteDocumentStore for InMemoryDocumentStore {
    async fn read(&self, path: &str) -> Result<Option<Value>, StorageError> {
        let guard = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(path).cloned())
    }

    async fn write(&self, path: &str, document: &Value) -> Result<(), StorageError> {
        let mut guard = self
            .documents
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        guard.insert(path.to_owned(), document.clone());
        Ok(())
    }
}

/// Remote store used when no backend is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDocumentStore;

#[async_trait]
impl RemoteDocumentStore for NullDocumentStore {
    fn is_available(&self) -> bool {
        false
    }

    async fn read(&self, _path: &str) -> Result<Option<Value>, StorageError> {
        Err(StorageError::Unavailable)
    }

    async fn write(&self, _path: &str, _document: &Value) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }
}

/// Aggregates the local and remote stores behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub local: Arc<dyn KeyValueStore>,
    pub remote: Arc<dyn RemoteDocumentStore>,
}

impl Storage {
    /// In-memory local store with no remote backend.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            local: Arc::new(InMemoryKeyValueStore::new()),
            remote: Arc::new(NullDocumentStore),
        }
    }

    #[must_use]
    pub fn with_remote(mut self, remote: Arc<dyn RemoteDocumentStore>) -> Self {
        self.remote = remote;
        self
    }
}
