//! Application-wide error types.

use fair_draw::{ConfigError, DrawError, StateViolation};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Draw refused: {0}")]
    Draw(#[from] DrawError),

    #[error("Stored state is inconsistent: {0}")]
    InvalidState(#[from] StateViolation),

    #[error("No saved data to back up")]
    NothingToBackup,

    #[error("Backup not found: {0}")]
    BackupNotFound(String),
}

impl From<ConfigError> for ServerError {
    fn from(e: ConfigError) -> Self {
        ServerError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
