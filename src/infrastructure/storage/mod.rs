//! JSON file storage for small per-plugin state.

use std::fs;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::application::errors::StorageError;

/// A directory of JSON documents, one file per name.
pub struct JsonStore {
    dir: PathBuf,
}

impl JsonStore {
    /// Create the store, making the directory if it does not exist.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn have(&self, name: &str) -> bool {
        self.dir.join(name).exists()
    }

    pub fn read<T: DeserializeOwned>(&self, name: &str) -> Result<T, StorageError> {
        let content = fs::read_to_string(self.dir.join(name))?;
        serde_json::from_str(&content).map_err(|e| StorageError::Serialization(e.to_string()))
    }

    pub fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<(), StorageError> {
        let content = serde_json::to_string(value)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        fs::write(self.dir.join(name), content)?;
        Ok(())
    }
}
