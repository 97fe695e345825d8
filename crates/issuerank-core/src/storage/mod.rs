mod config;
pub mod database;
pub mod document;
pub mod migrations;

pub use config::{Config, DecayConfig, LoggingConfig, NotificationsConfig, StoreConfig};
pub use database::SqliteStore;
pub use document::{DocumentStore, Modification, ProblemUpdate, VoteTally, WriteBatch, WriteTime};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/issuerank[-dev]/` based on ISSUERANK_ENV.
///
/// Set ISSUERANK_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("ISSUERANK_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("issuerank-dev")
    } else {
        base_dir.join("issuerank")
    };

    std::fs::create_dir_all(&dir).map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
