use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use study_core::model::{HistoryEntry, HistoryEntryId, HistorySettings};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Durable key/value storage for opaque string payloads.
#[async_trait]
pub trait BlobRepository: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn read_blob(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the value cannot be stored.
    async fn write_blob(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove `key`. Missing keys are not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be written.
    async fn remove_blob(&self, key: &str) -> Result<(), StorageError>;
}

/// Log of completed study sessions, newest first.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Add an entry as the newest one.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id already exists, or other storage errors.
    async fn append(&self, entry: &HistoryEntry) -> Result<(), StorageError>;

    /// List entries, newest first, optionally capped at `limit`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if entries cannot be read or decoded.
    async fn list(&self, limit: Option<u32>) -> Result<Vec<HistoryEntry>, StorageError>;

    /// Fetch a single entry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn get(&self, id: HistoryEntryId) -> Result<HistoryEntry, StorageError>;

    /// Delete a single entry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if missing, or other storage errors.
    async fn delete(&self, id: HistoryEntryId) -> Result<(), StorageError>;

    /// Delete every entry.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if entries cannot be removed.
    async fn clear(&self) -> Result<(), StorageError>;

    /// Keep only the newest `max_entries` entries; returns how many were dropped.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if entries cannot be removed.
    async fn trim(&self, max_entries: u32) -> Result<u64, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if settings cannot be read or decoded.
    async fn get_settings(&self) -> Result<Option<HistorySettings>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if settings cannot be stored.
    async fn save_settings(&self, settings: &HistorySettings) -> Result<(), StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    blobs: Arc<Mutex<HashMap<String, String>>>,
    history: Arc<Mutex<VecDeque<HistoryEntry>>>,
    history_settings: Arc<Mutex<Option<HistorySettings>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl BlobRepository for InMemoryRepository {
    async fn read_blob(&self, key: &str) -> Result<Option<String>, StorageError> {
        let guard = self.blobs.lock().map_err(poisoned)?;
        Ok(guard.get(key).cloned())
    }

    async fn write_blob(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut guard = self.blobs.lock().map_err(poisoned)?;
        guard.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    async fn remove_blob(&self, key: &str) -> Result<(), StorageError> {
        let mut guard = self.blobs.lock().map_err(poisoned)?;
        guard.remove(key);
        Ok(())
    }
}

#[async_trait]
impl HistoryRepository for InMemoryRepository {
    async fn append(&self, entry: &HistoryEntry) -> Result<(), StorageError> {
        let mut guard = self.history.lock().map_err(poisoned)?;
        if guard.iter().any(|existing| existing.id == entry.id) {
            return Err(StorageError::Conflict);
        }
        guard.push_front(entry.clone());
        Ok(())
    }

    async fn list(&self, limit: Option<u32>) -> Result<Vec<HistoryEntry>, StorageError> {
        let guard = self.history.lock().map_err(poisoned)?;
        let take = limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));
        Ok(guard.iter().take(take).cloned().collect())
    }

    async fn get(&self, id: HistoryEntryId) -> Result<HistoryEntry, StorageError> {
        let guard = self.history.lock().map_err(poisoned)?;
        guard
            .iter()
            .find(|entry| entry.id == id)
            .cloned()
            .ok_or(StorageError::NotFound)
    }

    async fn delete(&self, id: HistoryEntryId) -> Result<(), StorageError> {
        let mut guard = self.history.lock().map_err(poisoned)?;
        let before = guard.len();
        guard.retain(|entry| entry.id != id);
        if guard.len() == before {
            return Err(StorageError::NotFound);
        }
        Ok(())
    }

    async fn clear(&self) -> Result<(), StorageError> {
        self.history.lock().map_err(poisoned)?.clear();
        Ok(())
    }

    async fn trim(&self, max_entries: u32) -> Result<u64, StorageError> {
        let mut guard = self.history.lock().map_err(poisoned)?;
        let keep = usize::try_from(max_entries).unwrap_or(usize::MAX);
        let dropped = guard.len().saturating_sub(keep);
        guard.truncate(keep);
        Ok(u64::try_from(dropped).unwrap_or(u64::MAX))
    }

    async fn get_settings(&self) -> Result<Option<HistorySettings>, StorageError> {
        Ok(*self.history_settings.lock().map_err(poisoned)?)
    }

    async fn save_settings(&self, settings: &HistorySettings) -> Result<(), StorageError> {
        *self.history_settings.lock().map_err(poisoned)? = Some(*settings);
        Ok(())
    }
}

/// Aggregates the repositories the services layer depends on.
#[derive(Clone)]
pub struct Storage {
    pub blobs: Arc<dyn BlobRepository>,
    pub history: Arc<dyn HistoryRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let blobs: Arc<dyn BlobRepository> = Arc::new(repo.clone());
        let history: Arc<dyn HistoryRepository> = Arc::new(repo);
        Self { blobs, history }
    }
}
