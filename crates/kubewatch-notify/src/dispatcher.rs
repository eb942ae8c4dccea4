//! Fan-out of resource changes to every active handler.
//!
//! The [`Dispatcher`] owns the set of initialized handlers. Each
//! [`broadcast`](Dispatcher::broadcast) spawns one task per handler, bounds
//! it with a timeout and catches panics, so a slow, failing or crashing
//! channel never keeps the event from reaching the others. Delivery is
//! fire-and-forget: failures are logged and reported, never retried.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use kubewatch_config::Config;
use parking_lot::RwLock;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::credentials::{Environment, InitContext, Overrides};
use crate::error::{NotifyError, Result};
use crate::event::{Action, Event};
use crate::handlers::{Handler, HandlerFuture, HandlerKind};
use crate::transport::Transport;

/// Default upper bound for one handler call.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(5);

/// A resource lifecycle change, as delivered to handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceChange {
    /// A resource appeared.
    Created(Event),
    /// A resource changed.
    Updated {
        /// State before the change.
        old: Event,
        /// State after the change.
        new: Event,
    },
    /// A resource disappeared.
    Deleted(Event),
}

impl ResourceChange {
    /// Returns the lifecycle action.
    #[must_use]
    pub const fn action(&self) -> Action {
        match self {
            Self::Created(_) => Action::Created,
            Self::Updated { .. } => Action::Updated,
            Self::Deleted(_) => Action::Deleted,
        }
    }

    /// Returns the event handlers render. For updates this is the new state.
    #[must_use]
    pub const fn event(&self) -> &Event {
        match self {
            Self::Created(event) | Self::Deleted(event) | Self::Updated { new: event, .. } => event,
        }
    }

    fn deliver<'a>(&'a self, handler: &'a dyn Handler) -> HandlerFuture<'a> {
        match self {
            Self::Created(event) => handler.on_created(event),
            Self::Updated { old, new } => handler.on_updated(old, new),
            Self::Deleted(event) => handler.on_deleted(event),
        }
    }
}

/// Why a handler did not deliver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryFailure {
    /// The handler returned an error.
    Failed(String),
    /// The handler did not finish in time.
    TimedOut(Duration),
    /// The handler panicked.
    Panicked(String),
}

impl fmt::Display for DeliveryFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::TimedOut(limit) => write!(f, "timed out after {}ms", limit.as_millis()),
            Self::Panicked(message) => write!(f, "panicked: {message}"),
        }
    }
}

/// Outcome of one broadcast.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Handlers that delivered, by name.
    pub delivered: Vec<String>,
    /// Handlers that did not, by name.
    pub failed: Vec<(String, DeliveryFailure)>,
}

impl BroadcastReport {
    /// Returns the number of handlers the change was offered to.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.delivered.len() + self.failed.len()
    }

    /// Returns true if every handler delivered.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    /// Returns the failure for `name`, if that handler failed.
    #[must_use]
    pub fn failure(&self, name: &str) -> Option<&DeliveryFailure> {
        self.failed
            .iter()
            .find(|(handler, _)| handler == name)
            .map(|(_, failure)| failure)
    }
}

/// Holds the active handlers and fans changes out to them.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    handlers: Arc<RwLock<Vec<Arc<dyn Handler>>>>,
    timeout: Duration,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Creates a dispatcher with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(Vec::new())),
            timeout: DEFAULT_SEND_TIMEOUT,
        }
    }

    /// Sets the per-handler timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Initializes every channel that the config file, an override or the
    /// environment mentions.
    ///
    /// Channels that fail to initialize are skipped; their errors are
    /// returned alongside the dispatcher. Config blocks naming an unknown
    /// channel are reported as `NotifyError::UnknownChannel`.
    #[must_use]
    pub fn from_config(
        config: &Config,
        overrides: &Overrides,
        env: &dyn Environment,
        transport: Arc<dyn Transport>,
    ) -> (Self, Vec<NotifyError>) {
        let dispatcher = Self::new();
        let ctx = InitContext::new(config, overrides, env);
        let mut errors = Vec::new();

        for name in config.handler.keys() {
            if let Err(e) = name.parse::<HandlerKind>() {
                warn!(channel = %name, "ignoring config block for unknown channel");
                errors.push(e);
            }
        }

        for kind in HandlerKind::ALL {
            if !ctx.mentions(kind) {
                continue;
            }
            if let Err(e) = dispatcher.register_kind(kind, &ctx, Arc::clone(&transport)) {
                errors.push(e);
            }
        }

        if dispatcher.handler_count() == 0 {
            warn!(
                failed = errors.len(),
                "no notification handler initialized; events will not be delivered"
            );
        } else {
            info!(handlers = ?dispatcher.handler_names(), "notification handlers ready");
        }

        (dispatcher, errors)
    }

    /// Adds an initialized handler.
    pub fn register(&self, handler: Arc<dyn Handler>) {
        debug!(channel = %handler.name(), "handler registered");
        self.handlers.write().push(handler);
    }

    /// Initializes the handler for `kind` and adds it on success.
    ///
    /// # Errors
    ///
    /// Returns the initialization error; nothing is registered in that case.
    pub fn register_kind(
        &self,
        kind: HandlerKind,
        ctx: &InitContext<'_>,
        transport: Arc<dyn Transport>,
    ) -> Result<()> {
        match kind.init(ctx, transport) {
            Ok(handler) => {
                self.register(handler);
                Ok(())
            }
            Err(e) => {
                warn!(channel = %kind, error = %e, "handler failed to initialize");
                Err(e)
            }
        }
    }

    /// Returns the number of active handlers.
    #[must_use]
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Returns the names of the active handlers, in registration order.
    #[must_use]
    pub fn handler_names(&self) -> Vec<String> {
        self.handlers
            .read()
            .iter()
            .map(|handler| handler.name().to_string())
            .collect()
    }

    /// Returns the per-handler timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Delivers `change` to every handler concurrently.
    ///
    /// Each handler gets its own copy of the change and its own task. Errors,
    /// timeouts and panics are logged and collected in the report; none of
    /// them reaches the caller or the other handlers.
    pub async fn broadcast(&self, change: &ResourceChange) -> BroadcastReport {
        let handlers: Vec<Arc<dyn Handler>> = self.handlers.read().clone();
        let mut report = BroadcastReport::default();

        if handlers.is_empty() {
            debug!(action = %change.action(), "no handlers, dropping event");
            return report;
        }

        let limit = self.timeout;
        let mut tasks = JoinSet::new();
        let mut names = HashMap::new();

        for handler in handlers {
            let name = handler.name().to_string();
            let change = change.clone();
            let task = tasks.spawn(async move {
                let send = AssertUnwindSafe(change.deliver(handler.as_ref())).catch_unwind();
                match tokio::time::timeout(limit, send).await {
                    Ok(Ok(Ok(()))) => Ok(()),
                    Ok(Ok(Err(e))) => Err(DeliveryFailure::Failed(e.to_string())),
                    Ok(Err(payload)) => Err(DeliveryFailure::Panicked(panic_message(payload.as_ref()))),
                    Err(_) => Err(DeliveryFailure::TimedOut(limit)),
                }
            });
            names.insert(task.id(), name);
        }

        while let Some(joined) = tasks.join_next_with_id().await {
            let (id, outcome) = match joined {
                Ok((id, outcome)) => (id, outcome),
                Err(e) => (e.id(), Err(DeliveryFailure::Panicked(e.to_string()))),
            };
            let name = names.remove(&id).unwrap_or_default();

            match outcome {
                Ok(()) => report.delivered.push(name),
                Err(failure) => {
                    warn!(
                        channel = %name,
                        kind = %change.event().kind(),
                        namespace = %change.event().namespace(),
                        name = %change.event().name(),
                        error = %failure,
                        "notification not delivered"
                    );
                    report.failed.push((name, failure));
                }
            }
        }

        report.delivered.sort();
        report.failed.sort_by(|a, b| a.0.cmp(&b.0));

        debug!(
            action = %change.action(),
            delivered = report.delivered.len(),
            failed = report.failed.len(),
            "broadcast complete"
        );
        report
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::CredentialField;
    use crate::event::Status;
    use crate::handlers::test_support::pod_event;
    use crate::handlers::WebhookHandler;
    use crate::transport::MemoryTransport;
    use kubewatch_config::ChannelCredentials;

    fn explode() -> Result<()> {
        panic!("handler blew up")
    }

    #[derive(Debug)]
    struct PanickingHandler;

    impl Handler for PanickingHandler {
        fn kind(&self) -> HandlerKind {
            HandlerKind::Flock
        }

        fn name(&self) -> &str {
            "panicky"
        }

        fn notify<'a>(&'a self, _event: &'a Event) -> HandlerFuture<'a> {
            Box::pin(async move { explode() })
        }
    }

    #[derive(Debug)]
    struct HangingHandler;

    impl Handler for HangingHandler {
        fn kind(&self) -> HandlerKind {
            HandlerKind::Webhook
        }

        fn name(&self) -> &str {
            "hanging"
        }

        fn notify<'a>(&'a self, _event: &'a Event) -> HandlerFuture<'a> {
            Box::pin(async move {
                futures::future::pending::<()>().await;
                Ok(())
            })
        }
    }

    /// Records which lifecycle method ran.
    #[derive(Debug, Default)]
    struct RecordingHandler {
        seen: parking_lot::Mutex<Vec<(Action, Event)>>,
    }

    impl Handler for RecordingHandler {
        fn kind(&self) -> HandlerKind {
            HandlerKind::Webhook
        }

        fn name(&self) -> &str {
            "recording"
        }

        fn notify<'a>(&'a self, _event: &'a Event) -> HandlerFuture<'a> {
            Box::pin(async move { Ok(()) })
        }

        fn on_created<'a>(&'a self, event: &'a Event) -> HandlerFuture<'a> {
            self.seen.lock().push((Action::Created, event.clone()));
            self.notify(event)
        }

        fn on_updated<'a>(&'a self, _old: &'a Event, new: &'a Event) -> HandlerFuture<'a> {
            self.seen.lock().push((Action::Updated, new.clone()));
            self.notify(new)
        }

        fn on_deleted<'a>(&'a self, event: &'a Event) -> HandlerFuture<'a> {
            self.seen.lock().push((Action::Deleted, event.clone()));
            self.notify(event)
        }
    }

    fn webhook(url: &str, transport: Arc<dyn Transport>) -> Arc<dyn Handler> {
        let overrides = Overrides::new().with("webhook", CredentialField::Url, url);
        let config = Config::default();
        let env: HashMap<String, String> = HashMap::new();
        let ctx = InitContext::new(&config, &overrides, &env);
        Arc::new(WebhookHandler::init(&ctx, transport).unwrap())
    }

    fn created() -> ResourceChange {
        ResourceChange::Created(pod_event(Status::Normal))
    }

    mod change_tests {
        use super::*;

        #[test]
        fn update_exposes_new_state() {
            let old = Event::new("Pod", "default", "web", "Create", Status::Normal);
            let new = Event::new("Pod", "default", "web", "Update", Status::Normal);
            let change = ResourceChange::Updated {
                old,
                new: new.clone(),
            };

            assert_eq!(change.action(), Action::Updated);
            assert_eq!(change.event(), &new);
        }

        #[test]
        fn failure_display() {
            assert_eq!(
                DeliveryFailure::TimedOut(Duration::from_millis(50)).to_string(),
                "timed out after 50ms"
            );
            assert_eq!(
                DeliveryFailure::Failed("HTTP 500".into()).to_string(),
                "failed: HTTP 500"
            );
        }
    }

    mod broadcast_tests {
        use super::*;

        #[tokio::test]
        async fn empty_dispatcher_is_noop() {
            let report = Dispatcher::new().broadcast(&created()).await;
            assert_eq!(report.attempted(), 0);
            assert!(report.is_complete());
        }

        #[tokio::test]
        async fn one_failing_transport_does_not_block_others() {
            let ok_a = Arc::new(MemoryTransport::new());
            let ok_b = Arc::new(MemoryTransport::new());
            let down = Arc::new(MemoryTransport::failing("connection refused"));

            let dispatcher = Dispatcher::new();
            dispatcher.register(webhook("https://a.example.com", ok_a.clone()));
            dispatcher.register(webhook("https://b.example.com", down.clone()));
            dispatcher.register(webhook("https://c.example.com", ok_b.clone()));

            let report = dispatcher.broadcast(&created()).await;

            assert_eq!(report.delivered.len(), 2);
            assert_eq!(report.failed.len(), 1);
            assert!(matches!(report.failed[0].1, DeliveryFailure::Failed(_)));
            assert_eq!(ok_a.len(), 1);
            assert_eq!(ok_b.len(), 1);
            assert_eq!(down.len(), 1);
        }

        #[tokio::test]
        async fn panic_is_isolated() {
            let transport = Arc::new(MemoryTransport::new());
            let dispatcher = Dispatcher::new();
            dispatcher.register(Arc::new(PanickingHandler));
            dispatcher.register(webhook("https://a.example.com", transport.clone()));

            let report = dispatcher.broadcast(&created()).await;

            assert_eq!(report.delivered, vec!["webhook".to_string()]);
            assert_eq!(
                report.failure("panicky"),
                Some(&DeliveryFailure::Panicked("handler blew up".to_string()))
            );
            assert_eq!(transport.len(), 1);
        }

        #[tokio::test]
        async fn hanging_handler_times_out() {
            let transport = Arc::new(MemoryTransport::new());
            let dispatcher = Dispatcher::new().with_timeout(Duration::from_millis(50));
            dispatcher.register(Arc::new(HangingHandler));
            dispatcher.register(webhook("https://a.example.com", transport.clone()));

            let report = dispatcher.broadcast(&created()).await;

            assert_eq!(report.delivered, vec!["webhook".to_string()]);
            assert_eq!(
                report.failure("hanging"),
                Some(&DeliveryFailure::TimedOut(Duration::from_millis(50)))
            );
            assert_eq!(transport.len(), 1);
        }

        #[tokio::test]
        async fn every_handler_sees_identical_event() {
            let a = Arc::new(MemoryTransport::new());
            let b = Arc::new(MemoryTransport::new());
            let dispatcher = Dispatcher::new();
            dispatcher.register(webhook("https://a.example.com", a.clone()));
            dispatcher.register(webhook("https://b.example.com", b.clone()));

            dispatcher.broadcast(&created()).await;

            assert_eq!(a.requests()[0].body, b.requests()[0].body);
        }

        #[tokio::test]
        async fn lifecycle_method_matches_change() {
            let recorder = Arc::new(RecordingHandler::default());
            let dispatcher = Dispatcher::new();
            dispatcher.register(recorder.clone());

            let old = Event::new("Service", "prod", "api", "Create", Status::Normal);
            let new = Event::new("Service", "prod", "api", "Update", Status::Normal);
            let deleted = Event::new("Service", "prod", "api", "Delete", Status::Warning);

            dispatcher.broadcast(&ResourceChange::Created(old.clone())).await;
            dispatcher
                .broadcast(&ResourceChange::Updated {
                    old,
                    new: new.clone(),
                })
                .await;
            dispatcher.broadcast(&ResourceChange::Deleted(deleted.clone())).await;

            let seen = recorder.seen.lock();
            assert_eq!(seen.len(), 3);
            assert_eq!(seen[0].0, Action::Created);
            assert_eq!(seen[1], (Action::Updated, new));
            assert_eq!(seen[2], (Action::Deleted, deleted));
        }
    }

    mod from_config_tests {
        use super::*;

        fn channel(token: &str, destination: &str) -> ChannelCredentials {
            ChannelCredentials {
                token: token.to_string(),
                channel: destination.to_string(),
                url: String::new(),
            }
        }

        #[test]
        fn one_channel_missing_token_registers_the_other() {
            let mut config = Config::default();
            config.handler.insert("slack".into(), channel("xoxb-1", "#ops"));
            config.handler.insert("hipchat".into(), channel("", "ops"));
            let env: HashMap<String, String> = HashMap::new();

            let (dispatcher, errors) = Dispatcher::from_config(
                &config,
                &Overrides::new(),
                &env,
                Arc::new(MemoryTransport::new()),
            );

            assert_eq!(dispatcher.handler_names(), vec!["slack".to_string()]);
            assert_eq!(errors.len(), 1);
            assert!(matches!(
                &errors[0],
                NotifyError::MissingCredential { channel, .. } if channel == "hipchat"
            ));
            assert!(errors[0].to_string().contains("token"));
        }

        #[test]
        fn env_and_override_enable_channels_without_config_block() {
            let config = Config::default();
            let overrides = Overrides::new().with("webhook", CredentialField::Url, "https://hooks.example.com");
            let env: HashMap<String, String> =
                [("KW_PAGERDUTY_TOKEN".to_string(), "routing".to_string())].into();

            let (dispatcher, errors) = Dispatcher::from_config(
                &config,
                &overrides,
                &env,
                Arc::new(MemoryTransport::new()),
            );

            assert!(errors.is_empty());
            assert_eq!(
                dispatcher.handler_names(),
                vec!["webhook".to_string(), "pagerduty".to_string()]
            );
        }

        #[test]
        fn unknown_config_block_is_reported() {
            let mut config = Config::default();
            config.handler.insert("irc".into(), channel("t", "#k8s"));
            let env: HashMap<String, String> = HashMap::new();

            let (dispatcher, errors) = Dispatcher::from_config(
                &config,
                &Overrides::new(),
                &env,
                Arc::new(MemoryTransport::new()),
            );

            assert_eq!(dispatcher.handler_count(), 0);
            assert!(matches!(&errors[0], NotifyError::UnknownChannel(c) if c == "irc"));
        }

        #[test]
        fn mixed_case_block_name_registers_handler() {
            let mut config = Config::default();
            config.handler.insert("Slack".into(), channel("xoxb-1", "#ops"));
            let env: HashMap<String, String> = HashMap::new();

            let (dispatcher, errors) = Dispatcher::from_config(
                &config,
                &Overrides::new(),
                &env,
                Arc::new(MemoryTransport::new()),
            );

            assert!(errors.is_empty(), "{errors:?}");
            assert_eq!(dispatcher.handler_names(), vec!["slack".to_string()]);
        }

        #[test]
        fn empty_config_yields_no_handlers() {
            let env: HashMap<String, String> = HashMap::new();
            let (dispatcher, errors) = Dispatcher::from_config(
                &Config::default(),
                &Overrides::new(),
                &env,
                Arc::new(MemoryTransport::new()),
            );
            assert_eq!(dispatcher.handler_count(), 0);
            assert!(errors.is_empty());
            assert_eq!(dispatcher.timeout(), DEFAULT_SEND_TIMEOUT);
        }
    }
}
