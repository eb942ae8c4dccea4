//! Slack handler, posting through `chat.postMessage`.

use std::sync::Arc;

use serde_json::json;

use super::{deliver, parse_url, render_message, Handler, HandlerFuture, HandlerKind, SENDER_NAME};
use crate::credentials::{Credentials, InitContext};
use crate::error::{NotifyError, Result};
use crate::event::{Event, Status};
use crate::transport::{OutboundRequest, Transport};

/// Posts notifications to a Slack channel.
#[derive(Debug, Clone)]
pub struct SlackHandler {
    credentials: Credentials,
    endpoint: String,
    transport: Arc<dyn Transport>,
}

impl SlackHandler {
    /// Default Web API base URL.
    pub const DEFAULT_API_URL: &'static str = "https://slack.com/api";

    /// Resolves credentials and builds the handler.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::MissingCredential` if the token or channel is
    /// missing.
    pub fn init(ctx: &InitContext<'_>, transport: Arc<dyn Transport>) -> Result<Self> {
        let credentials = ctx.resolve(HandlerKind::Slack)?;
        let base = if credentials.url.is_empty() {
            Self::DEFAULT_API_URL
        } else {
            credentials.url.as_str()
        };
        parse_url(HandlerKind::Slack, base)?;
        let endpoint = format!("{}/chat.postMessage", base.trim_end_matches('/'));

        Ok(Self {
            credentials,
            endpoint,
            transport,
        })
    }

    /// Maps a status to a Slack attachment color.
    #[must_use]
    pub const fn color(status: Status) -> &'static str {
        match status {
            Status::Normal => "good",
            Status::Warning => "warning",
            Status::Danger => "danger",
        }
    }

    /// Builds the request for `event`.
    #[must_use]
    pub fn build_request(&self, event: &Event) -> OutboundRequest {
        let body = json!({
            "channel": self.credentials.destination,
            "username": SENDER_NAME,
            "attachments": [{
                "title": SENDER_NAME,
                "text": render_message(event),
                "fallback": render_message(event),
                "color": Self::color(event.status()),
            }],
        });
        OutboundRequest::new(&self.endpoint, body).with_bearer_token(&self.credentials.token)
    }
}

impl Handler for SlackHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Slack
    }

    fn notify<'a>(&'a self, event: &'a Event) -> HandlerFuture<'a> {
        Box::pin(async move {
            let request = self.build_request(event);
            let response = deliver(self.kind(), self.transport.as_ref(), request).await?;

            // The Web API answers 200 with `ok: false` on logical errors.
            let reply: serde_json::Value =
                serde_json::from_str(&response.body).unwrap_or(serde_json::Value::Null);
            if reply.get("ok").and_then(serde_json::Value::as_bool) == Some(false) {
                let error = reply
                    .get("error")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("unknown error");
                tracing::warn!(channel = %self.kind(), error, "slack rejected message");
                return Err(NotifyError::Transport(format!("slack: {error}")));
            }
            Ok(())
        })
    }
}
