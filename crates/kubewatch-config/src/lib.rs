//! Configuration store for kubewatch.
//!
//! The configuration lives in a single YAML file, `~/.kubewatch.yaml`, read
//! once at startup. It holds:
//!
//! - per-channel credential blocks under `handler`
//! - the resource interest matrix under `resource`
//! - reason filters under `reason`
//!
//! An absent file is created empty on first load and an empty file yields
//! [`Config::default`]. There is no locking: one process, one writer.

#![forbid(unsafe_code)]

pub mod error;
pub mod resource;

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

pub use error::{ConfigError, Result};
pub use resource::{ResourceInterest, ResourceKind, UnknownKind};

/// File name of the configuration file inside the home directory.
pub const CONFIG_FILE_NAME: &str = ".kubewatch.yaml";

/// Credentials for one notification channel as stored on disk.
///
/// Every field is optional in the file; which ones are required depends on
/// the channel and is checked when its handler initializes.
///
/// The destination may be written as `channel:` or `room:`, but not both: a
/// block carrying both keys fails to load with `ConfigError::Format`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelCredentials {
    /// API token, bot token or routing key.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token: String,
    /// Destination: chat channel or room. Read from either `channel` or `room`.
    #[serde(alias = "room", skip_serializing_if = "String::is_empty")]
    pub channel: String,
    /// Base URL of the service, or the full webhook URL.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub url: String,
}

impl ChannelCredentials {
    /// Returns true if no field is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.token.is_empty() && self.channel.is_empty() && self.url.is_empty()
    }
}

/// The kubewatch configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Credential blocks keyed by channel name (`slack`, `hipchat`, ...).
    pub handler: BTreeMap<String, ChannelCredentials>,
    /// Substrings of event reasons that should not be notified.
    pub reason: Vec<String>,
    /// Resource kinds to notify about.
    pub resource: ResourceInterest,
}

impl Config {
    /// Returns the default config file path, `<home>/.kubewatch.yaml`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the home directory cannot be determined.
    pub fn default_path() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(CONFIG_FILE_NAME))
            .ok_or_else(|| {
                ConfigError::io(
                    CONFIG_FILE_NAME,
                    std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        "home directory could not be determined",
                    ),
                )
            })
    }

    /// Loads the config from the default path, creating an empty file if
    /// none exists.
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path()?)
    }

    /// Loads the config from `path`, creating an empty file if none exists.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be created or read and
    /// `ConfigError::Format` if its content is not a valid config.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        create_if_absent(path)?;

        let content = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
        if content.trim().is_empty() {
            debug!(path = %path.display(), "config file is empty, using defaults");
            return Ok(Self::default());
        }

        let config: Self = serde_yaml::from_str(&content)?;
        debug!(
            path = %path.display(),
            handlers = config.handler.len(),
            reasons = config.reason.len(),
            "loaded config"
        );
        Ok(config)
    }

    /// Writes the config to the default path, replacing its content.
    pub fn save(&self) -> Result<()> {
        self.save_to(Self::default_path()?)
    }

    /// Writes the config to `path`, replacing its content.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Io` if the file cannot be written.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = self.to_yaml()?;
        fs::write(path, content).map_err(|e| ConfigError::io(path, e))?;
        debug!(path = %path.display(), "saved config");
        Ok(())
    }

    /// Serializes the config as YAML.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(ConfigError::from)
    }

    /// Returns the credential block for a channel, if the file has one.
    ///
    /// Block names match case-insensitively; an exact match wins.
    #[must_use]
    pub fn channel(&self, name: &str) -> Option<&ChannelCredentials> {
        self.handler.get(name).or_else(|| {
            self.handler
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, creds)| creds)
        })
    }

    /// Returns true if `reason` contains any configured reason filter.
    #[must_use]
    pub fn is_reason_suppressed(&self, reason: &str) -> bool {
        reason_suppressed(&self.reason, reason)
    }
}

/// Returns true if `reason` contains any non-empty entry of `filters`.
#[must_use]
pub fn reason_suppressed(filters: &[String], reason: &str) -> bool {
    filters
        .iter()
        .filter(|filter| !filter.is_empty())
        .any(|filter| reason.contains(filter.as_str()))
}

fn create_if_absent(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| ConfigError::io(path, e))?;
    debug!(path = %path.display(), "created empty config file");
    Ok(())
}
