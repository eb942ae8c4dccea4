//! PagerDuty handler, using the Events API v2.

use std::sync::Arc;

use serde_json::json;

use super::{deliver, parse_url, render_message, Handler, HandlerFuture, HandlerKind, SENDER_NAME};
use crate::credentials::{Credentials, InitContext};
use crate::error::Result;
use crate::event::{Event, Status};
use crate::transport::{OutboundRequest, Transport};

/// Triggers PagerDuty events. The token is the integration routing key.
#[derive(Debug, Clone)]
pub struct PagerDutyHandler {
    credentials: Credentials,
    endpoint: String,
    transport: Arc<dyn Transport>,
}

impl PagerDutyHandler {
    /// Default enqueue endpoint.
    pub const DEFAULT_EVENTS_URL: &'static str = "https://events.pagerduty.com/v2/enqueue";

    /// Resolves credentials and builds the handler.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::MissingCredential` if the routing key is missing.
    pub fn init(ctx: &InitContext<'_>, transport: Arc<dyn Transport>) -> Result<Self> {
        let credentials = ctx.resolve(HandlerKind::PagerDuty)?;
        let endpoint = if credentials.url.is_empty() {
            Self::DEFAULT_EVENTS_URL.to_string()
        } else {
            parse_url(HandlerKind::PagerDuty, &credentials.url)?;
            credentials.url.clone()
        };

        Ok(Self {
            credentials,
            endpoint,
            transport,
        })
    }

    /// Maps a status to a PagerDuty severity.
    #[must_use]
    pub const fn severity(status: Status) -> &'static str {
        match status {
            Status::Normal => "info",
            Status::Warning => "warning",
            Status::Danger => "critical",
        }
    }

    /// Builds the request for `event`.
    #[must_use]
    pub fn build_request(&self, event: &Event) -> OutboundRequest {
        let body = json!({
            "routing_key": self.credentials.token,
            "event_action": "trigger",
            "payload": {
                "summary": render_message(event),
                "source": SENDER_NAME,
                "severity": Self::severity(event.status()),
                "component": event.kind(),
                "group": event.namespace(),
            },
        });
        OutboundRequest::new(&self.endpoint, body)
    }
}

impl Handler for PagerDutyHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::PagerDuty
    }

    fn notify<'a>(&'a self, event: &'a Event) -> HandlerFuture<'a> {
        Box::pin(async move {
            let request = self.build_request(event);
            deliver(self.kind(), self.transport.as_ref(), request).await?;
            Ok(())
        })
    }
}
