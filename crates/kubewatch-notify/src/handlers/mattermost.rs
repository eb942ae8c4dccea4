//! Mattermost handler, posting to an incoming webhook.

use std::sync::Arc;

use serde_json::json;

use super::{deliver, parse_url, render_message, Handler, HandlerFuture, HandlerKind, SENDER_NAME};
use crate::credentials::{Credentials, InitContext};
use crate::error::Result;
use crate::event::{Event, Status};
use crate::transport::{OutboundRequest, Transport};

/// Posts notifications to a Mattermost channel through an incoming webhook.
#[derive(Debug, Clone)]
pub struct MattermostHandler {
    credentials: Credentials,
    transport: Arc<dyn Transport>,
}

impl MattermostHandler {
    /// Resolves credentials and builds the handler.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::MissingCredential` if the webhook URL or channel
    /// is missing, `NotifyError::InvalidOverride` if the URL is invalid.
    pub fn init(ctx: &InitContext<'_>, transport: Arc<dyn Transport>) -> Result<Self> {
        let credentials = ctx.resolve(HandlerKind::Mattermost)?;
        parse_url(HandlerKind::Mattermost, &credentials.url)?;
        Ok(Self {
            credentials,
            transport,
        })
    }

    /// Maps a status to an attachment color.
    #[must_use]
    pub const fn color(status: Status) -> &'static str {
        match status {
            Status::Normal => "#2eb886",
            Status::Warning => "#daa038",
            Status::Danger => "#a30200",
        }
    }

    /// Builds the request for `event`.
    #[must_use]
    pub fn build_request(&self, event: &Event) -> OutboundRequest {
        let text = render_message(event);
        let body = json!({
            "channel": self.credentials.destination,
            "username": SENDER_NAME,
            "attachments": [{
                "fallback": text,
                "color": Self::color(event.status()),
                "title": format!("{} {}", event.kind(), event.reason()),
                "text": text,
            }],
        });
        OutboundRequest::new(&self.credentials.url, body).with_bearer_token(&self.credentials.token)
    }
}

impl Handler for MattermostHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Mattermost
    }

    fn notify<'a>(&'a self, event: &'a Event) -> HandlerFuture<'a> {
        Box::pin(async move {
            let request = self.build_request(event);
            deliver(self.kind(), self.transport.as_ref(), request).await?;
            Ok(())
        })
    }
}
