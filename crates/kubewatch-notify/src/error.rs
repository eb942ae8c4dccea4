//! Error types for the kubewatch-notify crate.

use std::fmt;

use thiserror::Error;

use crate::credentials::CredentialField;

/// Errors that can occur while normalizing events, initializing handlers or
/// delivering notifications.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// A resource object lacks the identity fields an event needs.
    #[error("malformed {kind} resource: {reason}")]
    MalformedResource {
        /// The resource kind.
        kind: String,
        /// What is missing or wrong.
        reason: String,
    },

    /// A resource object of a kind kubewatch does not report on.
    #[error("unsupported resource kind: {0}")]
    UnsupportedKind(String),

    /// A handler could not initialize because required credentials resolved
    /// to empty values.
    #[error("{channel}: missing {}", FieldList(.fields))]
    MissingCredential {
        /// The channel that failed to initialize.
        channel: String,
        /// Every required field that resolved empty.
        fields: Vec<CredentialField>,
    },

    /// A channel name that no handler implements.
    #[error("unknown channel: {0}")]
    UnknownChannel(String),

    /// A command-line override that could not be parsed.
    #[error("invalid override '{input}': {reason}")]
    InvalidOverride {
        /// The raw override text.
        input: String,
        /// The reason it was rejected.
        reason: String,
    },

    /// The transport failed to deliver a message.
    #[error("transport error: {0}")]
    Transport(String),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl NotifyError {
    /// Returns true for errors raised while a handler initializes.
    #[must_use]
    pub const fn is_init_error(&self) -> bool {
        matches!(
            self,
            Self::MissingCredential { .. } | Self::UnknownChannel(_) | Self::InvalidOverride { .. }
        )
    }
}

impl From<serde_json::Error> for NotifyError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

struct FieldList<'a>(&'a [CredentialField]);

impl fmt::Display for FieldList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(field.as_str())?;
        }
        Ok(())
    }
}

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_malformed_resource() {
        let err = NotifyError::MalformedResource {
            kind: "Pod".to_string(),
            reason: "missing name".to_string(),
        };
        assert_eq!(err.to_string(), "malformed Pod resource: missing name");
    }

    #[test]
    fn error_display_missing_single_credential() {
        let err = NotifyError::MissingCredential {
            channel: "slack".to_string(),
            fields: vec![CredentialField::Token],
        };
        assert_eq!(err.to_string(), "slack: missing token");
    }

    #[test]
    fn error_display_missing_several_credentials() {
        let err = NotifyError::MissingCredential {
            channel: "hipchat".to_string(),
            fields: vec![CredentialField::Token, CredentialField::Destination],
        };
        assert_eq!(err.to_string(), "hipchat: missing token, destination");
    }

    #[test]
    fn error_display_invalid_override() {
        let err = NotifyError::InvalidOverride {
            input: "slack".to_string(),
            reason: "expected <channel>.<field>=<value>".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid override 'slack': expected <channel>.<field>=<value>"
        );
    }

    #[test]
    fn error_display_transport() {
        let err = NotifyError::Transport("connection refused".to_string());
        assert_eq!(err.to_string(), "transport error: connection refused");
    }

    #[test]
    fn init_errors_are_classified() {
        assert!(NotifyError::UnknownChannel("irc".to_string()).is_init_error());
        assert!(!NotifyError::Transport("x".to_string()).is_init_error());
        assert!(!NotifyError::UnsupportedKind("Job".to_string()).is_init_error());
    }

    #[test]
    fn error_from_serde_json() {
        let json_err = serde_json::from_str::<String>("invalid json");
        assert!(json_err.is_err());
        let err: NotifyError = json_err.unwrap_err().into();
        assert!(matches!(err, NotifyError::Serialization(_)));
    }
}
