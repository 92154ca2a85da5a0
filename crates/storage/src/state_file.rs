//! State File Implementation

use crate::PersistenceError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, info, warn};

/// Default state file name, relative to the working directory
pub const DEFAULT_STATE_FILE: &str = "state.json";

/// JSON object on disk mapping module keys to their saved state
pub struct StateFile {
    /// Backing file path
    path: PathBuf,
    /// Serializes read-modify-write cycles from concurrent poll loops
    write_lock: Mutex<()>,
}

impl StateFile {
    /// Open a state file at `path`. The file is created on first save.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        info!("Using state file {}", path.display());
        Self {
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the state saved under `key`.
    ///
    /// A missing file, missing key, or unreadable content yields `None`.
    pub fn load<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.try_load(key) {
            Ok(state) => state,
            Err(e) => {
                warn!("Failed to load state for {}: {}", key, e);
                None
            }
        }
    }

    /// Load the state saved under `key`, reporting why it could not be read
    pub fn try_load<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PersistenceError> {
        let mut modules = match self.read_modules()? {
            Some(modules) => modules,
            None => return Ok(None),
        };

        match modules.remove(key) {
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|e| PersistenceError::Corrupt(format!("{}: {}", key, e))),
            None => Ok(None),
        }
    }

    /// Save `state` under `key`, keeping every other module's entry
    pub fn save<T: Serialize>(&self, key: &str, state: &T) -> Result<(), PersistenceError> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| PersistenceError::Lock(e.to_string()))?;

        let value = serde_json::to_value(state)
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;

        let mut modules = match self.read_modules() {
            Ok(modules) => modules.unwrap_or_default(),
            Err(PersistenceError::Corrupt(e)) => {
                warn!("Discarding corrupt state file {}: {}", self.path.display(), e);
                Map::new()
            }
            Err(e) => return Err(e),
        };
        modules.insert(key.to_string(), value);

        let body = serde_json::to_string_pretty(&Value::Object(modules))
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        // Write beside the target and rename so readers never see a partial file
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, body)?;
        fs::rename(&tmp, &self.path)?;

        debug!("Saved state for {} to {}", key, self.path.display());
        Ok(())
    }

    fn read_modules(&self) -> Result<Option<Map<String, Value>>, PersistenceError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Object(modules)) => Ok(Some(modules)),
            Ok(_) => Err(PersistenceError::Corrupt("top level is not an object".to_string())),
            Err(e) => Err(PersistenceError::Corrupt(e.to_string())),
        }
    }
}

impl Default for StateFile {
    fn default() -> Self {
        Self::new(DEFAULT_STATE_FILE)
    }
}
