//! Extension-local key/value storage.
//!
//! Values are JSON. Every write is broadcast as a [`StorageChange`] so other
//! parts of the background context can react to it.

use std::future::Future;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tokio::sync::{broadcast, Mutex};

use crate::error::StorageError;

const CHANGE_CAPACITY: usize = 64;

/// One key's transition, as seen by subscribers.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

/// Async key/value persistence with change notifications.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> impl Future<Output = Result<Option<Value>, StorageError>> + Send;

    fn set(&self, key: &str, value: Value) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn remove(&self, key: &str) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

/// Reads `key` and decodes it as `T`. A missing key is `Ok(None)`.
///
/// # Errors
///
/// Returns [`StorageError::Decode`] if the stored value does not fit `T`,
/// or whatever the underlying store reports.
pub async fn read_json<T, S>(storage: &S, key: &str) -> Result<Option<T>, StorageError>
where
    T: DeserializeOwned,
    S: Storage + ?Sized,
{
    let Some(value) = storage.get(key).await? else {
        return Ok(None);
    };
    serde_json::from_value(value)
        .map(Some)
        .map_err(|source| StorageError::Decode {
            key: key.to_string(),
            source,
        })
}

/// Encodes `value` and stores it under `key`.
///
/// # Errors
///
/// Returns [`StorageError::Encode`] if `value` cannot be represented as
/// JSON, or whatever the underlying store reports.
pub async fn write_json<T, S>(storage: &S, key: &str, value: &T) -> Result<(), StorageError>
where
    T: Serialize + Sync + ?Sized,
    S: Storage + ?Sized,
{
    let encoded = serde_json::to_value(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })?;
    storage.set(key, encoded).await
}

/// Map-backed store, optionally mirrored to a JSON file.
///
/// The whole map is rewritten on every change; the data set is a handful of
/// keys.
pub struct LocalStore {
    path: Option<PathBuf>,
    entries: Mutex<Map<String, Value>>,
    changes: broadcast::Sender<StorageChange>,
}

impl LocalStore {
    #[must_use]
    pub fn in_memory() -> Self {
        Self::with_entries(None, Map::new())
    }

    /// Opens (or prepares to create) the store file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Io`] if the file exists but cannot be read,
    /// or [`StorageError::Corrupt`] if it does not hold a JSON object.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Map::new(),
            Ok(bytes) => {
                serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
                    path: path.display().to_string(),
                    source,
                })?
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "storage file not found, starting empty");
                Map::new()
            }
            Err(source) => {
                return Err(StorageError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        Ok(Self::with_entries(Some(path), entries))
    }

    fn with_entries(path: Option<PathBuf>, entries: Map<String, Value>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);
        Self {
            path,
            entries: Mutex::new(entries),
            changes,
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    async fn persist(&self, key: &str, entries: &Map<String, Value>) -> Result<(), StorageError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let bytes = serde_json::to_vec_pretty(entries).map_err(|source| StorageError::Encode {
            key: key.to_string(),
            source,
        })?;
        let io_err = |source| StorageError::Io {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }
        let staging = path.with_extension("tmp");
        tokio::fs::write(&staging, bytes).await.map_err(io_err)?;
        tokio::fs::rename(&staging, path).await.map_err(io_err)
    }

    fn notify(&self, key: &str, old_value: Option<Value>, new_value: Option<Value>) {
        if old_value == new_value {
            return;
        }
        // No subscribers is fine.
        let _ = self.changes.send(StorageChange {
            key: key.to_string(),
            old_value,
            new_value,
        });
    }
}

impl Storage for LocalStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StorageError> {
        Ok(self.entries.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().await;
        let old_value = entries.insert(key.to_string(), value.clone());
        if let Err(e) = self.persist(key, &entries).await {
            match &old_value {
                Some(old) => entries.insert(key.to_string(), old.clone()),
                None => entries.remove(key),
            };
            return Err(e);
        }
        drop(entries);
        self.notify(key, old_value, Some(value));
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().await;
        let Some(old_value) = entries.remove(key) else {
            return Ok(());
        };
        if let Err(e) = self.persist(key, &entries).await {
            entries.insert(key.to_string(), old_value);
            return Err(e);
        }
        drop(entries);
        self.notify(key, Some(old_value), None);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.changes.subscribe()
    }
}
