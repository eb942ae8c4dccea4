//! Outbound transport.
//!
//! Handlers build an [`OutboundRequest`] and hand it to a [`Transport`]. The
//! transport is the only place that talks to the network, so tests and dry
//! runs swap it out without touching any handler.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{NotifyError, Result};

/// A JSON POST to an external service.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundRequest {
    /// Target URL.
    pub url: String,
    /// Bearer token for the `Authorization` header.
    pub bearer_token: Option<String>,
    /// JSON body.
    pub body: serde_json::Value,
}

impl OutboundRequest {
    /// Creates a request without authentication.
    #[must_use]
    pub fn new(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            bearer_token: None,
            body,
        }
    }

    /// Sets the bearer token. Empty tokens are ignored.
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.bearer_token = (!token.is_empty()).then_some(token);
        self
    }
}

impl fmt::Debug for OutboundRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OutboundRequest")
            .field("url", &self.url)
            .field("authenticated", &self.bearer_token.is_some())
            .field("body", &self.body)
            .finish()
    }
}

/// The response of a successful delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl TransportResponse {
    /// Creates a response.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Future returned by [`Transport::post`].
pub type TransportFuture<'a> = Pin<Box<dyn Future<Output = Result<TransportResponse>> + Send + 'a>>;

/// Delivers requests to external services.
///
/// A non-success response is an error. Implementations never retry.
pub trait Transport: Send + Sync + fmt::Debug {
    /// Sends one request.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Transport` if the request cannot be delivered or
    /// the service answers with a non-success status.
    fn post<'a>(&'a self, request: &'a OutboundRequest) -> TransportFuture<'a>;
}

/// Sends requests over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::Transport` if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("kubewatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn post<'a>(&'a self, request: &'a OutboundRequest) -> TransportFuture<'a> {
        Box::pin(async move {
            let mut builder = self.client.post(&request.url).json(&request.body);
            if let Some(token) = &request.bearer_token {
                builder = builder.bearer_auth(token);
            }

            let response = builder.send().await?;
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(url = %request.url, status = status.as_u16(), "transport response");

            if status.is_success() {
                Ok(TransportResponse::new(status.as_u16(), body))
            } else {
                Err(NotifyError::Transport(format!("HTTP {status}: {body}")))
            }
        })
    }
}

/// Logs requests instead of sending them.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTransport;

impl Transport for LogTransport {
    fn post<'a>(&'a self, request: &'a OutboundRequest) -> TransportFuture<'a> {
        Box::pin(async move {
            info!(url = %request.url, body = %request.body, "dry run, not sending");
            Ok(TransportResponse::new(200, "{\"ok\":true}"))
        })
    }
}

/// Records requests in memory; optionally fails every request.
#[derive(Debug, Default)]
pub struct MemoryTransport {
    requests: Mutex<Vec<OutboundRequest>>,
    failure: Option<String>,
    response_body: Option<String>,
}

impl MemoryTransport {
    /// Creates a transport that accepts every request.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport that rejects every request with `reason`.
    #[must_use]
    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    /// Sets the body returned for accepted requests.
    #[must_use]
    pub fn with_response_body(mut self, body: impl Into<String>) -> Self {
        self.response_body = Some(body.into());
        self
    }

    /// Returns every request seen so far, including rejected ones.
    #[must_use]
    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.requests.lock().clone()
    }

    /// Returns the number of requests seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requests.lock().len()
    }

    /// Returns true if no request was seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requests.lock().is_empty()
    }
}

impl Transport for MemoryTransport {
    fn post<'a>(&'a self, request: &'a OutboundRequest) -> TransportFuture<'a> {
        Box::pin(async move {
            self.requests.lock().push(request.clone());
            match &self.failure {
                Some(reason) => Err(NotifyError::Transport(reason.clone())),
                None => Ok(TransportResponse::new(
                    200,
                    self.response_body.clone().unwrap_or_default(),
                )),
            }
        })
    }
}
