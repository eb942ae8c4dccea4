//! Notification pipeline for kubewatch.
//!
//! `kubewatch-notify` turns Kubernetes resource changes into notifications
//! and fans them out to every configured channel.
//!
//! # Pipeline
//!
//! - **Event model**: [`Event::normalize`] reduces a resource object plus an
//!   [`Action`] to a flat [`Event`] (kind, namespace, name, reason, status)
//! - **Filtering**: [`EventFilter`] applies the resource interest matrix and
//!   reason filters from the config file
//! - **Handlers**: one [`Handler`] per channel (Slack, HipChat, Mattermost,
//!   Flock, generic webhook, PagerDuty), each initialized from credentials
//!   resolved with flag > environment > file precedence
//! - **Dispatch**: [`Dispatcher::broadcast`] delivers a [`ResourceChange`] to
//!   every handler concurrently with per-call timeouts
//!
//! All network access goes through a [`Transport`], so tests and dry runs
//! use [`MemoryTransport`] or [`LogTransport`] in place of [`HttpTransport`].
//!
//! # Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::Arc;
//!
//! use kubewatch_config::Config;
//! use kubewatch_notify::{CredentialField, Dispatcher, MemoryTransport, Overrides};
//!
//! let config = Config::default();
//! let overrides = Overrides::new().with(
//!     "webhook",
//!     CredentialField::Url,
//!     "https://hooks.example.com/k8s",
//! );
//! let env: HashMap<String, String> = HashMap::new();
//!
//! let transport = Arc::new(MemoryTransport::new());
//! let (dispatcher, errors) = Dispatcher::from_config(&config, &overrides, &env, transport);
//!
//! assert!(errors.is_empty());
//! assert_eq!(dispatcher.handler_names(), ["webhook"]);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod credentials;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod filter;
pub mod handlers;
pub mod transport;

pub use credentials::{
    env_var_name, precedence, CredentialField, Credentials, Environment, InitContext, Overrides,
    ProcessEnvironment,
};
pub use dispatcher::{
    BroadcastReport, DeliveryFailure, Dispatcher, ResourceChange, DEFAULT_SEND_TIMEOUT,
};
pub use error::{NotifyError, Result};
pub use event::{Action, Event, ResourceObject, Status};
pub use filter::EventFilter;
pub use handlers::{
    render_message, FlockHandler, Handler, HandlerFuture, HandlerKind, HipchatHandler,
    MattermostHandler, PagerDutyHandler, SlackHandler, WebhookHandler, SENDER_NAME,
};
pub use transport::{
    HttpTransport, LogTransport, MemoryTransport, OutboundRequest, Transport, TransportFuture,
    TransportResponse,
};
