//! Per-channel credential resolution.
//!
//! Every handler resolves its credentials through [`InitContext::resolve`],
//! which applies one precedence law to every field:
//!
//! ```text
//! command-line flag  >  KW_<CHANNEL>_<FIELD> environment variable  >  config file
//! ```
//!
//! The first non-empty value wins.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use kubewatch_config::{ChannelCredentials, Config};
use serde::{Deserialize, Serialize};

use crate::error::{NotifyError, Result};
use crate::handlers::HandlerKind;

/// A credential field a channel may need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialField {
    /// API token, bot token or routing key.
    Token,
    /// Chat channel or room.
    Destination,
    /// Service base URL or webhook URL.
    Url,
}

impl CredentialField {
    /// All fields in resolution order.
    pub const ALL: [Self; 3] = [Self::Token, Self::Destination, Self::Url];

    /// Returns the field as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Token => "token",
            Self::Destination => "destination",
            Self::Url => "url",
        }
    }

    /// Parses a field name as written in overrides. `channel` and `room` both
    /// name the destination.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "token" => Some(Self::Token),
            "channel" | "room" | "destination" => Some(Self::Destination),
            "url" => Some(Self::Url),
            _ => None,
        }
    }

    fn read(self, creds: &ChannelCredentials) -> &str {
        match self {
            Self::Token => &creds.token,
            Self::Destination => &creds.channel,
            Self::Url => &creds.url,
        }
    }

    fn slot(self, creds: &mut ChannelCredentials) -> &mut String {
        match self {
            Self::Token => &mut creds.token,
            Self::Destination => &mut creds.channel,
            Self::Url => &mut creds.url,
        }
    }
}

impl fmt::Display for CredentialField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The resolved credentials a handler owns.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// API token, bot token or routing key.
    pub token: String,
    /// Chat channel or room.
    pub destination: String,
    /// Service base URL or webhook URL.
    pub url: String,
}

impl Credentials {
    /// Returns the value of a field.
    #[must_use]
    pub fn get(&self, field: CredentialField) -> &str {
        match field {
            CredentialField::Token => &self.token,
            CredentialField::Destination => &self.destination,
            CredentialField::Url => &self.url,
        }
    }

    fn set(&mut self, field: CredentialField, value: String) {
        match field {
            CredentialField::Token => self.token = value,
            CredentialField::Destination => self.destination = value,
            CredentialField::Url => self.url = value,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.token.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("Credentials")
            .field("token", &token)
            .field("destination", &self.destination)
            .field("url", &self.url)
            .finish()
    }
}

/// Source of environment variables.
pub trait Environment: Send + Sync {
    /// Returns the value of `key`, if set.
    fn var(&self, key: &str) -> Option<String>;
}

/// Reads the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnvironment;

impl Environment for ProcessEnvironment {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl Environment for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Credential values supplied on the command line, keyed by channel name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    channels: BTreeMap<String, ChannelCredentials>,
}

impl Overrides {
    /// Creates an empty set of overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one field for one channel.
    #[must_use]
    pub fn with(
        mut self,
        channel: impl Into<String>,
        field: CredentialField,
        value: impl Into<String>,
    ) -> Self {
        self.set(channel, field, value);
        self
    }

    /// Sets one field for one channel.
    pub fn set(
        &mut self,
        channel: impl Into<String>,
        field: CredentialField,
        value: impl Into<String>,
    ) {
        let creds = self.channels.entry(channel.into()).or_default();
        *field.slot(creds) = value.into();
    }

    /// Parses and applies a `<channel>.<field>=<value>` assignment.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::InvalidOverride` for malformed input or unknown
    /// fields, `NotifyError::UnknownChannel` for unknown channels.
    pub fn apply(&mut self, assignment: &str) -> Result<()> {
        let invalid = |reason: &str| NotifyError::InvalidOverride {
            input: assignment.to_string(),
            reason: reason.to_string(),
        };

        let (key, value) = assignment
            .split_once('=')
            .ok_or_else(|| invalid("expected <channel>.<field>=<value>"))?;
        let (channel, field) = key
            .split_once('.')
            .ok_or_else(|| invalid("expected <channel>.<field>=<value>"))?;

        let kind: HandlerKind = channel.trim().parse()?;
        let field = CredentialField::parse(field.trim())
            .ok_or_else(|| invalid("field must be token, channel, room or url"))?;

        self.set(kind.as_str(), field, value.trim());
        Ok(())
    }

    /// Returns the override for one field, if any.
    #[must_use]
    pub fn get(&self, channel: &str, field: CredentialField) -> Option<&str> {
        self.channels
            .get(channel)
            .map(|creds| field.read(creds))
            .filter(|value| !value.is_empty())
    }

    /// Returns the channel names that carry at least one override.
    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.channels
            .iter()
            .filter(|(_, creds)| !creds.is_empty())
            .map(|(name, _)| name.as_str())
    }
}

/// Applies the precedence law to one field.
///
/// Returns the first non-empty value among flag, environment and file.
#[must_use]
pub fn precedence(flag: Option<&str>, env: Option<&str>, file: Option<&str>) -> Option<String> {
    [flag, env, file]
        .into_iter()
        .flatten()
        .find(|value| !value.is_empty())
        .map(ToString::to_string)
}

/// Returns the environment variable that carries `field` for `kind`.
#[must_use]
pub fn env_var_name(kind: HandlerKind, field: CredentialField) -> String {
    let suffix = match field {
        CredentialField::Token => "TOKEN",
        CredentialField::Destination => kind.destination_env_suffix(),
        CredentialField::Url => "URL",
    };
    format!("KW_{}_{suffix}", kind.as_str().to_ascii_uppercase())
}

/// Everything a handler needs to initialize: the config file, command-line
/// overrides and the environment.
#[derive(Clone, Copy)]
pub struct InitContext<'a> {
    config: &'a Config,
    overrides: &'a Overrides,
    env: &'a dyn Environment,
}

impl<'a> InitContext<'a> {
    /// Creates a context over borrowed inputs.
    #[must_use]
    pub fn new(config: &'a Config, overrides: &'a Overrides, env: &'a dyn Environment) -> Self {
        Self {
            config,
            overrides,
            env,
        }
    }

    /// Returns the config file.
    #[must_use]
    pub const fn config(&self) -> &'a Config {
        self.config
    }

    /// Resolves one field for `kind`. Empty if no source supplies a value.
    #[must_use]
    pub fn resolve_field(&self, kind: HandlerKind, field: CredentialField) -> String {
        let flag = self.overrides.get(kind.as_str(), field);
        let env = self.env.var(&env_var_name(kind, field));
        let file = self
            .config
            .channel(kind.as_str())
            .map(|creds| field.read(creds));

        precedence(flag, env.as_deref(), file).unwrap_or_default()
    }

    /// Resolves every field for `kind` and checks the required ones.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::MissingCredential` naming every required field
    /// that resolved empty.
    pub fn resolve(&self, kind: HandlerKind) -> Result<Credentials> {
        let mut creds = Credentials::default();
        for field in CredentialField::ALL {
            creds.set(field, self.resolve_field(kind, field));
        }

        let missing: Vec<CredentialField> = kind
            .required_fields()
            .iter()
            .copied()
            .filter(|field| creds.get(*field).is_empty())
            .collect();

        if missing.is_empty() {
            Ok(creds)
        } else {
            Err(NotifyError::MissingCredential {
                channel: kind.as_str().to_string(),
                fields: missing,
            })
        }
    }

    /// Returns true if any source mentions `kind` at all.
    #[must_use]
    pub fn mentions(&self, kind: HandlerKind) -> bool {
        self.config.channel(kind.as_str()).is_some()
            || CredentialField::ALL
                .into_iter()
                .any(|field| !self.resolve_field(kind, field).is_empty())
    }
}

impl fmt::Debug for InitContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InitContext")
            .field("channels", &self.config.handler.keys().collect::<Vec<_>>())
            .field("overrides", &self.overrides.channels().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
