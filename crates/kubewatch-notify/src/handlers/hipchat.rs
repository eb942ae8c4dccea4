//! HipChat handler, using the v2 room notification API.

use std::sync::Arc;

use serde_json::json;

use super::{deliver, parse_url, render_message, Handler, HandlerFuture, HandlerKind, SENDER_NAME};
use crate::credentials::{Credentials, InitContext};
use crate::error::{NotifyError, Result};
use crate::event::{Event, Status};
use crate::transport::{OutboundRequest, Transport};

/// Sends room notifications to HipChat (cloud or self-hosted).
#[derive(Debug, Clone)]
pub struct HipchatHandler {
    credentials: Credentials,
    endpoint: String,
    transport: Arc<dyn Transport>,
}

impl HipchatHandler {
    /// Default server URL.
    pub const DEFAULT_SERVER_URL: &'static str = "https://api.hipchat.com";

    /// Resolves credentials and builds the handler.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::MissingCredential` if the token or room is
    /// missing, `NotifyError::InvalidOverride` if the server URL is invalid.
    pub fn init(ctx: &InitContext<'_>, transport: Arc<dyn Transport>) -> Result<Self> {
        let credentials = ctx.resolve(HandlerKind::Hipchat)?;
        let base = if credentials.url.is_empty() {
            Self::DEFAULT_SERVER_URL
        } else {
            credentials.url.as_str()
        };

        let mut endpoint = parse_url(HandlerKind::Hipchat, base)?;
        endpoint
            .path_segments_mut()
            .map_err(|()| NotifyError::InvalidOverride {
                input: format!("hipchat.url={base}"),
                reason: "URL cannot be a base".to_string(),
            })?
            .pop_if_empty()
            .extend(["v2", "room", credentials.destination.as_str(), "notification"]);

        Ok(Self {
            endpoint: endpoint.to_string(),
            credentials,
            transport,
        })
    }

    /// Maps a status to a HipChat message color.
    #[must_use]
    pub const fn color(status: Status) -> &'static str {
        match status {
            Status::Normal => "green",
            Status::Warning => "yellow",
            Status::Danger => "red",
        }
    }

    /// Builds the request for `event`.
    #[must_use]
    pub fn build_request(&self, event: &Event) -> OutboundRequest {
        let body = json!({
            "message": render_message(event),
            "message_format": "text",
            "color": Self::color(event.status()),
            "notify": true,
            "from": SENDER_NAME,
        });
        OutboundRequest::new(&self.endpoint, body).with_bearer_token(&self.credentials.token)
    }
}

impl Handler for HipchatHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Hipchat
    }

    fn notify<'a>(&'a self, event: &'a Event) -> HandlerFuture<'a> {
        Box::pin(async move {
            let request = self.build_request(event);
            deliver(self.kind(), self.transport.as_ref(), request).await?;
            Ok(())
        })
    }
}
