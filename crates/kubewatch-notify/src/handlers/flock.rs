//! Flock handler, posting to an incoming webhook.

use std::sync::Arc;

use serde_json::json;

use super::{deliver, parse_url, render_message, Handler, HandlerFuture, HandlerKind, SENDER_NAME};
use crate::credentials::{Credentials, InitContext};
use crate::error::Result;
use crate::event::{Event, Status};
use crate::transport::{OutboundRequest, Transport};

/// Posts notifications to a Flock incoming webhook.
#[derive(Debug, Clone)]
pub struct FlockHandler {
    credentials: Credentials,
    transport: Arc<dyn Transport>,
}

impl FlockHandler {
    /// Resolves credentials and builds the handler.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::MissingCredential` if the webhook URL is missing.
    pub fn init(ctx: &InitContext<'_>, transport: Arc<dyn Transport>) -> Result<Self> {
        let credentials = ctx.resolve(HandlerKind::Flock)?;
        parse_url(HandlerKind::Flock, &credentials.url)?;
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
            "notification": format!("{SENDER_NAME}: {} {}", event.kind(), event.reason()),
            "text": text,
            "attachments": [{
                "title": format!("{}/{}", event.namespace(), event.name()),
                "description": text,
                "color": Self::color(event.status()),
            }],
        });
        OutboundRequest::new(&self.credentials.url, body)
    }
}

impl Handler for FlockHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Flock
    }

    fn notify<'a>(&'a self, event: &'a Event) -> HandlerFuture<'a> {
        Box::pin(async move {
            let request = self.build_request(event);
            deliver(self.kind(), self.transport.as_ref(), request).await?;
            Ok(())
        })
    }
}
