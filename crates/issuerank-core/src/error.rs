//! Core error types for issuerank-core.
//!
//! Errors are split by collaborator: the document store, the notification
//! dispatcher and the on-disk configuration. Missing referents and duplicate
//! votes are not errors; handlers report them as `Reaction` outcomes.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for issuerank-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Document store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Notification delivery errors
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Document store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open database connection
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Migration failed
    #[error("Store migration failed: {0}")]
    MigrationFailed(String),

    /// Database is locked by another writer
    #[error("Store is locked")]
    Locked,

    /// A write targeted a document that does not exist
    #[error("No document '{id}' in collection '{collection}'")]
    NotFound { collection: &'static str, id: String },

    /// A guarded write found the document changed underneath it
    #[error("Document '{id}' changed concurrently: expected vote count {expected}, found {actual}")]
    Conflict { id: String, expected: u32, actual: u32 },

    /// A stored value could not be decoded
    #[error("Corrupt stored value: {0}")]
    Corrupt(String),

    /// The connection mutex was poisoned by a panicking writer
    #[error("Store connection poisoned")]
    Poisoned,
}

/// Notification delivery errors.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// Dispatcher is missing its endpoint or credentials
    #[error("Notification dispatcher not configured: {0}")]
    NotConfigured(String),

    /// Transport-level failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The delivery service answered but refused the message
    #[error("Delivery rejected (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    /// The delivery service answered with something we cannot read
    #[error("Invalid delivery response: {0}")]
    InvalidResponse(String),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Data directory could not be resolved or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(e, _msg) => {
                if e.code == rusqlite::ErrorCode::DatabaseBusy
                    || e.code == rusqlite::ErrorCode::DatabaseLocked
                {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            rusqlite::Error::FromSqlConversionFailure(..) => StoreError::Corrupt(err.to_string()),
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
