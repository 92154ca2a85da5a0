//! Storage Layer
//!
//! Persists per-module state in a single shared JSON file. Absence and
//! corruption both resolve to "no prior state".

mod state_file;

pub use state_file::{StateFile, DEFAULT_STATE_FILE};

use thiserror::Error;

/// Persistence errors
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Corrupt state file: {0}")]
    Corrupt(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Lock error: {0}")]
    Lock(String),
}
