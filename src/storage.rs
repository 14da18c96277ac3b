//! Page-scoped persistence of the "lookup active" flag.
//!
//! Values are stored as the strings `"true"` / `"false"`, the way browser
//! session storage holds them.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::error::StorageError;

pub trait FlagStorage: Send + Sync {
    fn get_flag(&self, key: &str) -> Result<Option<bool>, StorageError>;
    fn set_flag(&self, key: &str, value: bool) -> Result<(), StorageError>;
}

fn parse_flag(value: &str) -> Option<bool> {
    match value {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

fn format_flag(value: bool) -> String {
    if value { "true" } else { "false" }.to_string()
}

/// In-memory storage; forgotten when the process ends.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FlagStorage for MemoryStorage {
    fn get_flag(&self, key: &str) -> Result<Option<bool>, StorageError> {
        Ok(self.values.lock().get(key).and_then(|value| parse_flag(value)))
    }

    fn set_flag(&self, key: &str, value: bool) -> Result<(), StorageError> {
        self.values.lock().insert(key.to_string(), format_flag(value));
        Ok(())
    }
}

/// A JSON object on disk, rewritten on every change.
#[derive(Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn read(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(err) => Err(err.into()),
        }
    }
}

impl FlagStorage for JsonFileStorage {
    fn get_flag(&self, key: &str) -> Result<Option<bool>, StorageError> {
        let _guard = self.lock.lock();
        Ok(self.read()?.get(key).and_then(|value| parse_flag(value)))
    }

    fn set_flag(&self, key: &str, value: bool) -> Result<(), StorageError> {
        let _guard = self.lock.lock();
        let mut values = self.read()?;
        values.insert(key.to_string(), format_flag(value));
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&values)?)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Storage that is never available, as when the page forbids it.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableStorage;

impl FlagStorage for UnavailableStorage {
    fn get_flag(&self, _key: &str) -> Result<Option<bool>, StorageError> {
        Err(StorageError::Unavailable)
    }

    fn set_flag(&self, _key: &str, _value: bool) -> Result<(), StorageError> {
        Err(StorageError::Unavailable)
    }
}
