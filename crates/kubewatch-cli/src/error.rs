//! CLI error types.

use kubewatch_config::ConfigError;
use kubewatch_notify::NotifyError;
use thiserror::Error;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// The config file could not be loaded or saved.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Notification setup failed.
    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// A watch record on stdin could not be decoded.
    #[error("invalid watch record: {0}")]
    Input(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;
