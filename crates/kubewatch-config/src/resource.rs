//! Resource kinds and the resource interest matrix.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A resource kind kubewatch knows how to report on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResourceKind {
    /// `apps/v1` Deployment.
    Deployment,
    /// `v1` ReplicationController.
    ReplicationController,
    /// `apps/v1` ReplicaSet.
    ReplicaSet,
    /// `apps/v1` DaemonSet.
    DaemonSet,
    /// `v1` Service.
    Service,
    /// `v1` Pod.
    Pod,
}

impl ResourceKind {
    /// All supported kinds, in config-file order.
    pub const ALL: [Self; 6] = [
        Self::Deployment,
        Self::ReplicationController,
        Self::ReplicaSet,
        Self::DaemonSet,
        Self::Service,
        Self::Pod,
    ];

    /// Returns the Kubernetes `kind` string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Deployment => "Deployment",
            Self::ReplicationController => "ReplicationController",
            Self::ReplicaSet => "ReplicaSet",
            Self::DaemonSet => "DaemonSet",
            Self::Service => "Service",
            Self::Pod => "Pod",
        }
    }

    /// Returns the short key used in the `resource` block of the config file.
    #[must_use]
    pub const fn config_key(&self) -> &'static str {
        match self {
            Self::Deployment => "deployment",
            Self::ReplicationController => "rc",
            Self::ReplicaSet => "rs",
            Self::DaemonSet => "ds",
            Self::Service => "svc",
            Self::Pod => "po",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no supported resource kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownKind(pub String);

impl fmt::Display for UnknownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown resource kind: {}", self.0)
    }
}

impl std::error::Error for UnknownKind {}

impl FromStr for ResourceKind {
    type Err = UnknownKind;

    /// Accepts the Kubernetes kind (`Pod`) or the config key (`po`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s || kind.config_key() == s)
            .ok_or_else(|| UnknownKind(s.to_string()))
    }
}

/// Which resource kinds the operator wants notifications for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceInterest {
    /// Watch deployments.
    pub deployment: bool,
    /// Watch replication controllers.
    #[serde(rename = "rc")]
    pub replication_controller: bool,
    /// Watch replica sets.
    #[serde(rename = "rs")]
    pub replica_set: bool,
    /// Watch daemon sets.
    #[serde(rename = "ds")]
    pub daemon_set: bool,
    /// Watch services.
    #[serde(rename = "svc")]
    pub services: bool,
    /// Watch pods.
    #[serde(rename = "po")]
    pub pod: bool,
}

impl ResourceInterest {
    /// Returns true if the given kind is switched on.
    #[must_use]
    pub const fn watches(&self, kind: ResourceKind) -> bool {
        match kind {
            ResourceKind::Deployment => self.deployment,
            ResourceKind::ReplicationController => self.replication_controller,
            ResourceKind::ReplicaSet => self.replica_set,
            ResourceKind::DaemonSet => self.daemon_set,
            ResourceKind::Service => self.services,
            ResourceKind::Pod => self.pod,
        }
    }

    /// Switches a kind on or off.
    pub fn set(&mut self, kind: ResourceKind, enabled: bool) {
        let slot = match kind {
            ResourceKind::Deployment => &mut self.deployment,
            ResourceKind::ReplicationController => &mut self.replication_controller,
            ResourceKind::ReplicaSet => &mut self.replica_set,
            ResourceKind::DaemonSet => &mut self.daemon_set,
            ResourceKind::Service => &mut self.services,
            ResourceKind::Pod => &mut self.pod,
        };
        *slot = enabled;
    }

    /// Returns the enabled kinds in config-file order.
    #[must_use]
    pub fn enabled_kinds(&self) -> Vec<ResourceKind> {
        ResourceKind::ALL
            .into_iter()
            .filter(|kind| self.watches(*kind))
            .collect()
    }

    /// Returns true if no kind is switched on.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.enabled_kinds().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("Deployment", ResourceKind::Deployment ; "deployment kind")]
    #[test_case("rc", ResourceKind::ReplicationController ; "rc key")]
    #[test_case("ReplicaSet", ResourceKind::ReplicaSet ; "replica set kind")]
    #[test_case("ds", ResourceKind::DaemonSet ; "ds key")]
    #[test_case("svc", ResourceKind::Service ; "svc key")]
    #[test_case("Pod", ResourceKind::Pod ; "pod kind")]
    fn parse_kind(input: &str, expected: ResourceKind) {
        assert_eq!(input.parse::<ResourceKind>(), Ok(expected));
    }

    #[test]
    fn parse_unknown_kind() {
        let err = "CronJob".parse::<ResourceKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown resource kind: CronJob");
    }

    #[test]
    fn default_interest_is_empty() {
        let interest = ResourceInterest::default();
        assert!(interest.is_empty());
        assert!(ResourceKind::ALL.iter().all(|k| !interest.watches(*k)));
    }

    #[test]
    fn set_and_query() {
        let mut interest = ResourceInterest::default();
        interest.set(ResourceKind::Pod, true);
        interest.set(ResourceKind::Service, true);

        assert!(interest.watches(ResourceKind::Pod));
        assert!(!interest.watches(ResourceKind::Deployment));
        assert_eq!(
            interest.enabled_kinds(),
            vec![ResourceKind::Service, ResourceKind::Pod]
        );

        interest.set(ResourceKind::Pod, false);
        assert_eq!(interest.enabled_kinds(), vec![ResourceKind::Service]);
    }

    #[test]
    fn interest_uses_short_keys() {
        let interest: ResourceInterest =
            serde_yaml::from_str("deployment: true\npo: true\n").unwrap();
        assert!(interest.deployment);
        assert!(interest.pod);
        assert!(!interest.services);
    }
}
