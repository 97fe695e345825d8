pub mod config;
pub mod decay;
pub mod problem;
pub mod score;
pub mod user;
pub mod vote;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use issuerank_core::notify::dispatcher_from_config;
use issuerank_core::{Config, ProblemMutationReactor, Reaction, SqliteStore, StatusNotice};

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Resolved configuration shared by every command.
pub struct Context {
    pub config: Config,
    pub config_path: PathBuf,
    db_override: Option<PathBuf>,
}

impl Context {
    pub fn load(
        config_path: Option<PathBuf>,
        db_override: Option<PathBuf>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let config_path = match config_path {
            Some(path) => path,
            None => Config::path()?,
        };
        let config = Config::load_from(&config_path)?;
        Ok(Self {
            config,
            config_path,
            db_override,
        })
    }

    pub fn open_store(&self) -> Result<Arc<SqliteStore>, Box<dyn std::error::Error>> {
        let path = match &self.db_override {
            Some(path) => path.clone(),
            None => self.config.database_path()?,
        };
        tracing::debug!(path = %path.display(), "opening store");
        Ok(Arc::new(SqliteStore::open_at(path)?))
    }

    /// Reactor wired to the configured notification dispatcher.
    pub fn reactor(
        &self,
        store: Arc<SqliteStore>,
    ) -> Result<ProblemMutationReactor, Box<dyn std::error::Error>> {
        let dispatcher = dispatcher_from_config(&self.config.notifications)?;
        Ok(ProblemMutationReactor::new(store, Arc::from(dispatcher))
            .with_notice(StatusNotice::from_config(&self.config.notifications)))
    }
}

pub fn print_reaction(reaction: &Reaction) -> CommandResult {
    println!("{}", serde_json::to_string_pretty(reaction)?);
    Ok(())
}

pub fn parse_time(value: &str) -> Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| format!("invalid RFC 3339 timestamp '{value}': {e}"))
}
