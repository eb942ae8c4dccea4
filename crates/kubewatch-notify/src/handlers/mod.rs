//! Notification handlers.
//!
//! This module provides the [`Handler`] trait and one implementation per
//! supported channel. A handler owns the credentials it resolved at
//! initialization and turns each [`Event`] into a request for the channel's
//! API.
//!
//! # Delivery policy
//!
//! Delivery is best-effort and at-most-once. A failed send is logged and
//! reported to the caller as an error; it is never retried. The
//! [`Dispatcher`](crate::Dispatcher) swallows those errors so that one
//! unreachable channel never blocks the others.

mod flock;
mod hipchat;
mod mattermost;
mod pagerduty;
mod slack;
mod webhook;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::credentials::{CredentialField, InitContext};
use crate::error::{NotifyError, Result};
use crate::event::Event;
use crate::transport::{OutboundRequest, Transport, TransportResponse};

pub use flock::FlockHandler;
pub use hipchat::HipchatHandler;
pub use mattermost::MattermostHandler;
pub use pagerduty::PagerDutyHandler;
pub use slack::SlackHandler;
pub use webhook::WebhookHandler;

/// Sender name shown on every notification.
pub const SENDER_NAME: &str = "kubewatch";

/// Future returned by the lifecycle methods of [`Handler`].
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// A notification channel.
///
/// Handlers only exist fully initialized: construction goes through
/// [`HandlerKind::init`] (or the variant's own `init`), which fails instead of
/// producing a handler with missing credentials.
pub trait Handler: Send + Sync + fmt::Debug {
    /// Returns the channel this handler serves.
    fn kind(&self) -> HandlerKind;

    /// Returns the channel name.
    fn name(&self) -> &str {
        self.kind().as_str()
    }

    /// Renders `event` and sends it.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Transport` if the channel rejects the message.
    fn notify<'a>(&'a self, event: &'a Event) -> HandlerFuture<'a>;

    /// Called for a created resource.
    fn on_created<'a>(&'a self, event: &'a Event) -> HandlerFuture<'a> {
        self.notify(event)
    }

    /// Called for an updated resource. Renders the new state.
    fn on_updated<'a>(&'a self, _old: &'a Event, new: &'a Event) -> HandlerFuture<'a> {
        self.notify(new)
    }

    /// Called for a deleted resource.
    fn on_deleted<'a>(&'a self, event: &'a Event) -> HandlerFuture<'a> {
        self.notify(event)
    }
}

/// The supported channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HandlerKind {
    /// Slack chat.
    Slack,
    /// Atlassian HipChat rooms.
    Hipchat,
    /// Mattermost incoming webhooks.
    Mattermost,
    /// Flock incoming webhooks.
    Flock,
    /// Generic JSON webhook.
    Webhook,
    /// PagerDuty Events API v2.
    PagerDuty,
}

impl HandlerKind {
    /// All channels.
    pub const ALL: [Self; 6] = [
        Self::Slack,
        Self::Hipchat,
        Self::Mattermost,
        Self::Flock,
        Self::Webhook,
        Self::PagerDuty,
    ];

    /// Returns the channel name used in config blocks, flags and env vars.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Slack => "slack",
            Self::Hipchat => "hipchat",
            Self::Mattermost => "mattermost",
            Self::Flock => "flock",
            Self::Webhook => "webhook",
            Self::PagerDuty => "pagerduty",
        }
    }

    /// Returns the fields that must resolve non-empty.
    #[must_use]
    pub const fn required_fields(&self) -> &'static [CredentialField] {
        match self {
            Self::Slack | Self::Hipchat => &[CredentialField::Token, CredentialField::Destination],
            Self::Mattermost => &[CredentialField::Destination, CredentialField::Url],
            Self::Flock | Self::Webhook => &[CredentialField::Url],
            Self::PagerDuty => &[CredentialField::Token],
        }
    }

    /// Returns the env var suffix naming the destination.
    #[must_use]
    pub const fn destination_env_suffix(&self) -> &'static str {
        match self {
            Self::Hipchat => "ROOM",
            _ => "CHANNEL",
        }
    }

    /// Initializes the handler for this channel.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::MissingCredential` if a required field is empty
    /// after precedence resolution, or `NotifyError::InvalidOverride` if a
    /// URL does not parse.
    pub fn init(
        &self,
        ctx: &InitContext<'_>,
        transport: Arc<dyn Transport>,
    ) -> Result<Arc<dyn Handler>> {
        let handler: Arc<dyn Handler> = match self {
            Self::Slack => Arc::new(SlackHandler::init(ctx, transport)?),
            Self::Hipchat => Arc::new(HipchatHandler::init(ctx, transport)?),
            Self::Mattermost => Arc::new(MattermostHandler::init(ctx, transport)?),
            Self::Flock => Arc::new(FlockHandler::init(ctx, transport)?),
            Self::Webhook => Arc::new(WebhookHandler::init(ctx, transport)?),
            Self::PagerDuty => Arc::new(PagerDutyHandler::init(ctx, transport)?),
        };
        Ok(handler)
    }
}

impl fmt::Display for HandlerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HandlerKind {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| NotifyError::UnknownChannel(s.to_string()))
    }
}

/// Renders the notification text for an event.
#[must_use]
pub fn render_message(event: &Event) -> String {
    format!(
        "A {} in namespace {} has been {}: {}",
        event.kind(),
        event.namespace(),
        event.reason(),
        event.name()
    )
}

/// Sends one request and logs the outcome.
pub(crate) async fn deliver(
    kind: HandlerKind,
    transport: &dyn Transport,
    request: OutboundRequest,
) -> Result<TransportResponse> {
    match transport.post(&request).await {
        Ok(response) => {
            debug!(
                channel = %kind,
                status = response.status,
                body = %response.body,
                "notification sent"
            );
            Ok(response)
        }
        Err(e) => {
            warn!(channel = %kind, url = %request.url, error = %e, "notification failed");
            Err(e)
        }
    }
}

/// Parses a URL resolved from credentials.
pub(crate) fn parse_url(kind: HandlerKind, raw: &str) -> Result<url::Url> {
    url::Url::parse(raw).map_err(|e| NotifyError::InvalidOverride {
        input: format!("{kind}.url={raw}"),
        reason: e.to_string(),
    })
}
