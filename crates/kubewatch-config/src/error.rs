//! Error types for the kubewatch-config crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or saving the configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read, created or written.
    #[error("config file {}: {source}", path.display())]
    Io {
        /// The path that was being accessed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration file content is malformed, or serialization failed.
    #[error("malformed config: {0}")]
    Format(String),
}

impl ConfigError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Format(err.to_string())
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_io() {
        let err = ConfigError::io(
            "/tmp/.kubewatch.yaml",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.to_string(), "config file /tmp/.kubewatch.yaml: denied");
    }

    #[test]
    fn error_display_format() {
        let err = ConfigError::Format("bad indent".to_string());
        assert_eq!(err.to_string(), "malformed config: bad indent");
    }

    #[test]
    fn error_from_serde_yaml() {
        let yaml_err = serde_yaml::from_str::<Vec<String>>("{ not: a list");
        assert!(yaml_err.is_err());
        let err: ConfigError = yaml_err.unwrap_err().into();
        assert!(matches!(err, ConfigError::Format(_)));
    }

    #[test]
    fn io_error_keeps_source() {
        use std::error::Error as _;

        let err = ConfigError::io(
            "x",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(err.source().is_some());
    }
}
