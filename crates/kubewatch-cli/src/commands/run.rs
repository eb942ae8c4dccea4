//! The notification loop.
//!
//! Loads the config, initializes one handler per configured channel, then
//! reads watch records until the input ends. Bad records are logged and
//! skipped; delivery failures are logged by the dispatcher.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info, warn};

use kubewatch_config::Config;
use kubewatch_notify::{
    Dispatcher, Environment, EventFilter, HttpTransport, LogTransport, Overrides,
    ProcessEnvironment, Transport,
};

use crate::cli::RunArgs;
use crate::error::Result;
use crate::source::parse_line;

/// Counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Records that normalized into an event.
    pub received: usize,
    /// Events dropped by the interest matrix or reason filters.
    pub filtered: usize,
    /// Lines that could not be parsed or normalized.
    pub skipped: usize,
    /// Successful handler deliveries.
    pub delivered: usize,
    /// Failed handler deliveries.
    pub failed: usize,
}

/// Run command executor.
pub struct RunCommand {
    config_path: Option<PathBuf>,
    args: RunArgs,
    env: Box<dyn Environment>,
    transport: Option<Arc<dyn Transport>>,
}

impl RunCommand {
    /// Creates a run command reading the process environment.
    #[must_use]
    pub fn new(config_path: Option<PathBuf>, args: RunArgs) -> Self {
        Self {
            config_path,
            args,
            env: Box::new(ProcessEnvironment),
            transport: None,
        }
    }

    /// Replaces the environment credentials are read from.
    #[must_use]
    pub fn with_environment(mut self, env: impl Environment + 'static) -> Self {
        self.env = Box::new(env);
        self
    }

    /// Replaces the transport chosen from `--dry-run`.
    #[must_use]
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the dispatcher and event filter.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be loaded, an override is
    /// malformed or the HTTP client cannot be built. Channels that fail to
    /// initialize are logged and skipped.
    pub fn prepare(&self) -> Result<(Dispatcher, EventFilter)> {
        let config = match &self.config_path {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };

        let mut overrides = Overrides::new();
        for assignment in &self.args.set {
            overrides.apply(assignment)?;
        }

        let timeout = Duration::from_secs(self.args.timeout_secs);
        let transport: Arc<dyn Transport> = match &self.transport {
            Some(transport) => Arc::clone(transport),
            None if self.args.dry_run => Arc::new(LogTransport),
            None => Arc::new(HttpTransport::new(timeout)?),
        };

        let (dispatcher, errors) =
            Dispatcher::from_config(&config, &overrides, self.env.as_ref(), transport);
        if !errors.is_empty() {
            warn!(count = errors.len(), "some channels are disabled");
        }

        Ok((dispatcher.with_timeout(timeout), EventFilter::from_config(&config)))
    }

    /// Reads watch records from `input` until it ends, delivering each
    /// accepted change.
    ///
    /// # Errors
    ///
    /// Returns an error if setup fails or `input` cannot be read.
    pub async fn execute<R>(&self, input: R) -> Result<RunSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        let (dispatcher, filter) = self.prepare()?;
        info!(
            handlers = dispatcher.handler_count(),
            dry_run = self.args.dry_run,
            "watching for resource changes"
        );

        let mut summary = RunSummary::default();
        let mut lines = input.lines();
        let mut line_no = 0_usize;

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            let change = match parse_line(&line) {
                Ok(Some(change)) => change,
                Ok(None) => continue,
                Err(e) => {
                    warn!(line = line_no, error = %e, "skipping watch record");
                    summary.skipped += 1;
                    continue;
                }
            };
            summary.received += 1;

            if !filter.allows(change.event()) {
                debug!(
                    kind = %change.event().kind(),
                    reason = %change.event().reason(),
                    "event filtered"
                );
                summary.filtered += 1;
                continue;
            }

            let report = dispatcher.broadcast(&change).await;
            summary.delivered += report.delivered.len();
            summary.failed += report.failed.len();
        }

        info!(
            received = summary.received,
            filtered = summary.filtered,
            skipped = summary.skipped,
            delivered = summary.delivered,
            failed = summary.failed,
            "input closed"
        );
        Ok(summary)
    }
}
