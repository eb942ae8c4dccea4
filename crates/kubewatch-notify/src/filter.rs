//! Event filtering by resource interest and reason.

use kubewatch_config::{Config, ResourceInterest, ResourceKind, reason_suppressed};
use tracing::trace;

use crate::event::Event;

/// Decides which events reach the dispatcher.
///
/// An event passes if its kind is watched and its reason is not suppressed.
/// An interest matrix with nothing enabled watches every kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    interest: ResourceInterest,
    reasons: Vec<String>,
}

impl EventFilter {
    /// Builds a filter from the `resource` and `reason` sections of `config`.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self {
            interest: config.resource,
            reasons: config.reason.clone(),
        }
    }

    /// Returns true if `event` should be delivered.
    #[must_use]
    pub fn allows(&self, event: &Event) -> bool {
        if !self.watches(event.kind()) {
            trace!(kind = %event.kind(), "kind not watched");
            return false;
        }

        let suppressed = reason_suppressed(&self.reasons, event.reason());
        if suppressed {
            trace!(kind = %event.kind(), reason = %event.reason(), "reason suppressed");
        }
        !suppressed
    }

    fn watches(&self, kind: &str) -> bool {
        if self.interest.is_empty() {
            return true;
        }
        kind.parse::<ResourceKind>()
            .is_ok_and(|kind| self.interest.watches(kind))
    }
}
