// SPDX-License-Identifier: AGPL-3.0
// Colony Core - Persisted application state
//
// A single JSON file holding the app's key-value state. The file is read
// lazily on first access; a missing or unparsable file degrades to an empty
// map rather than failing startup.

use crate::types::AppError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::path::PathBuf;
use tokio::sync::Mutex;

const STATE_FILE: &str = "colony-app-state.json";
const VERSION_KEY: &str = "__version";
const INTRO_KEY: &str = "hasUserCompletedIntro";

/// Current on-disk schema version
pub const STORE_VERSION: u64 = 1;

struct Inner {
    loaded: bool,
    entries: Map<String, Value>,
}

/// Lazily-loaded, disk-backed key-value store for application state
pub struct StateStore {
    file_path: PathBuf,
    inner: Mutex<Inner>,
}

impl StateStore {
    /// Point the store at the default state file in the app data directory
    pub fn open_default() -> Result<Self, AppError> {
        let data_dir = directories::ProjectDirs::from("org", "colony", "colony")
            .ok_or_else(|| AppError::FileIo("Could not determine data directory".to_string()))?
            .data_dir()
            .to_path_buf();

        std::fs::create_dir_all(&data_dir)
            .map_err(|e| AppError::FileIo(format!("Failed to create data dir: {}", e)))?;

        Ok(Self::with_path(data_dir.join(STATE_FILE)))
    }

    /// Point the store at an explicit file path
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: path.into(),
            inner: Mutex::new(Inner {
                loaded: false,
                entries: Map::new(),
            }),
        }
    }

    /// Stamp the schema version and write the file out
    pub async fn init(&self) -> Result<(), AppError> {
        self.set(VERSION_KEY, &STORE_VERSION).await?;
        self.save().await
    }

    async fn lock_loaded(&self) -> tokio::sync::MutexGuard<'_, Inner> {
        let mut inner = self.inner.lock().await;
        if !inner.loaded {
            inner.entries = match tokio::fs::read_to_string(&self.file_path).await {
                Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                    tracing::warn!("Failed to parse state file, starting fresh: {}", e);
                    Map::new()
                }),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
                Err(e) => {
                    tracing::warn!("Failed to read state file, starting fresh: {}", e);
                    Map::new()
                }
            };
            inner.loaded = true;
        }
        inner
    }

    /// Read a value by key, deserializing into the requested type
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        let inner = self.lock_loaded().await;
        match inner.entries.get(key) {
            Some(value) => Ok(Some(serde_json::from_value(value.clone())?)),
            None => Ok(None),
        }
    }

    /// Set a value by key, in memory only; call `save` to flush
    pub async fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<(), AppError> {
        let json = serde_json::to_value(value)?;
        let mut inner = self.lock_loaded().await;
        inner.entries.insert(key.to_string(), json);
        Ok(())
    }

    /// Write the whole map to disk
    pub async fn save(&self) -> Result<(), AppError> {
        let content = {
            let inner = self.lock_loaded().await;
            serde_json::to_string_pretty(&inner.entries)?
        };
        tokio::fs::write(&self.file_path, content)
            .await
            .map_err(|e| AppError::FileIo(format!("Failed to write state file: {}", e)))?;
        Ok(())
    }

    /// Drop every entry, in memory only
    pub async fn clear(&self) {
        let mut inner = self.lock_loaded().await;
        inner.entries.clear();
    }

    /// Drop every entry and flush the empty map to disk
    pub async fn erase(&self) -> Result<(), AppError> {
        self.clear().await;
        self.save().await
    }

    pub async fn set_user_completed_intro(&self, has: bool) -> Result<(), AppError> {
        self.set(INTRO_KEY, &has).await?;
        self.save().await
    }

    pub async fn user_completed_intro(&self) -> Result<Option<bool>, AppError> {
        self.get(INTRO_KEY).await
    }
}
