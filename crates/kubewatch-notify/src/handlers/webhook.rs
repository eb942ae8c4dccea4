//! Generic JSON webhook handler.

use std::sync::Arc;

use serde_json::json;

use super::{deliver, parse_url, render_message, Handler, HandlerFuture, HandlerKind, SENDER_NAME};
use crate::credentials::{Credentials, InitContext};
use crate::error::Result;
use crate::event::Event;
use crate::transport::{OutboundRequest, Transport};

/// Posts a structured JSON document to an arbitrary URL.
///
/// The body carries the rendered text plus the event fields, so receivers
/// can either display or route it:
///
/// ```json
/// {
///   "text": "A Pod in namespace default has been Create: nginx-1",
///   "severity": "info",
///   "sender": "kubewatch",
///   "event": { "kind": "Pod", "namespace": "default", "name": "nginx-1",
///              "reason": "Create", "status": "Normal" }
/// }
/// ```
///
/// A configured token is sent as a bearer token.
#[derive(Debug, Clone)]
pub struct WebhookHandler {
    credentials: Credentials,
    transport: Arc<dyn Transport>,
}

impl WebhookHandler {
    /// Resolves credentials and builds the handler.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::MissingCredential` if the URL is missing,
    /// `NotifyError::InvalidOverride` if it does not parse.
    pub fn init(ctx: &InitContext<'_>, transport: Arc<dyn Transport>) -> Result<Self> {
        let credentials = ctx.resolve(HandlerKind::Webhook)?;
        parse_url(HandlerKind::Webhook, &credentials.url)?;
        Ok(Self {
            credentials,
            transport,
        })
    }

    /// Builds the request for `event`.
    #[must_use]
    pub fn build_request(&self, event: &Event) -> OutboundRequest {
        let body = json!({
            "text": render_message(event),
            "severity": event.status().indicator(),
            "sender": SENDER_NAME,
            "event": {
                "kind": event.kind(),
                "namespace": event.namespace(),
                "name": event.name(),
                "reason": event.reason(),
                "status": event.status().as_str(),
            },
        });
        OutboundRequest::new(&self.credentials.url, body).with_bearer_token(&self.credentials.token)
    }
}

impl Handler for WebhookHandler {
    fn kind(&self) -> HandlerKind {
        HandlerKind::Webhook
    }

    fn notify<'a>(&'a self, event: &'a Event) -> HandlerFuture<'a> {
        Box::pin(async move {
            let request = self.build_request(event);
            deliver(self.kind(), self.transport.as_ref(), request).await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Status;
    use crate::handlers::test_support::{config, pod_event, with_ctx};
    use crate::transport::MemoryTransport;

    const URL: &str = "https://hooks.example.com/kubewatch";

    fn handler(token: &str) -> WebhookHandler {
        let config = config("webhook", token, "", URL);
        with_ctx(&config, |ctx| {
            WebhookHandler::init(ctx, Arc::new(MemoryTransport::new()))
        })
        .unwrap()
    }

    #[test]
    fn payload_carries_event_fields() {
        let request = handler("").build_request(&pod_event(Status::Warning));

        assert_eq!(request.url, URL);
        assert_eq!(request.body["severity"], "warning");
        assert_eq!(request.body["sender"], "kubewatch");
        assert_eq!(request.body["event"]["kind"], "Pod");
        assert_eq!(request.body["event"]["namespace"], "default");
        assert_eq!(request.body["event"]["name"], "nginx-1");
        assert_eq!(request.body["event"]["reason"], "Create");
        assert_eq!(request.body["event"]["status"], "Warning");
    }

    #[test]
    fn token_becomes_bearer() {
        assert!(handler("").build_request(&pod_event(Status::Normal)).bearer_token.is_none());
        assert_eq!(
            handler("s3cret")
                .build_request(&pod_event(Status::Normal))
                .bearer_token
                .as_deref(),
            Some("s3cret")
        );
    }

    #[tokio::test]
    async fn update_renders_new_state() {
        let transport = Arc::new(MemoryTransport::new());
        let config = config("webhook", "", "", URL);
        let handler = with_ctx(&config, |ctx| {
            WebhookHandler::init(ctx, Arc::clone(&transport) as Arc<dyn Transport>)
        })
        .unwrap();

        let old = Event::new("Pod", "default", "nginx-1", "Create", Status::Normal);
        let new = Event::new("Pod", "default", "nginx-1", "Update", Status::Normal);
        handler.on_updated(&old, &new).await.unwrap();

        let sent = transport.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body["event"]["reason"], "Update");
    }
}
