//! # Persistence Layer
//!
//! Durable string key/value storage consumed by the coordinator, plus the
//! codec for the reduced snapshot it persists after every state-changing
//! operation. Only the `get`/`set` contract belongs to this engine; the
//! storage mechanism behind it is a collaborator.
//!
//! The snapshot is restored at startup before the first fetch resolves, so
//! a restart shows cached state immediately rather than a blank screen.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::SyncError;
use crate::queue::PendingOperation;
use crate::task::Task;

/// Durable string key/value storage
pub trait SnapshotStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, SyncError>;
    fn set(&self, key: &str, value: &str) -> Result<(), SyncError>;
}

impl<T> SnapshotStore for std::sync::Arc<T>
where
    T: SnapshotStore + ?Sized,
{
    fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        (**self).set(key, value)
    }
}

/// The reduced snapshot persisted under one fixed key
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedState {
    pub tasks: Vec<Task>,
    pub pending_syncs: Vec<PendingOperation>,
    pub last_sync: Option<String>,
}

impl CachedState {
    pub fn encode(&self) -> Result<String, SyncError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn decode(raw: &str) -> Result<Self, SyncError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// In-memory store, used by tests and as a null persistence layer
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        let entries = self
            .entries
            .lock()
            .map_err(|_| SyncError::persistence("memory store poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| SyncError::persistence("memory store poisoned"))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// File-backed store: one JSON file per key under a directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store rooted at the platform data directory
    pub fn default_location() -> Result<Self, SyncError> {
        let base = dirs::data_dir()
            .ok_or_else(|| SyncError::persistence("no platform data directory"))?;
        Ok(Self::new(base.join("driftsync")))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        // Keys are not file names; strip anything path-like.
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{}.json", safe))
    }
}

impl SnapshotStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, SyncError> {
        let path = self.path_for(key);
        match std::fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(SyncError::persistence(format!(
                "failed to read {}: {}",
                path.display(),
                err
            ))),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SyncError> {
        std::fs::create_dir_all(&self.dir).map_err(|err| {
            SyncError::persistence(format!(
                "failed to create {}: {}",
                self.dir.display(),
                err
            ))
        })?;
        let path = self.path_for(key);
        std::fs::write(&path, value).map_err(|err| {
            SyncError::persistence(format!("failed to write {}: {}", path.display(), err))
        })
    }
}
