//! Event model.
//!
//! This module turns a raw resource lifecycle occurrence into a
//! channel-agnostic [`Event`]:
//! - [`Action`]: what happened to the resource
//! - [`Status`]: how alarming it is
//! - [`ResourceObject`]: a raw object of one of the supported kinds
//! - [`Event`]: the normalized record handed to every handler

use std::fmt;
use std::str::FromStr;

use k8s_openapi::api::apps::v1::{DaemonSet, Deployment, ReplicaSet};
use k8s_openapi::api::core::v1::{Pod, ReplicationController, Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kubewatch_config::ResourceKind;
use serde::{Deserialize, Serialize};

use crate::error::{NotifyError, Result};

/// A lifecycle action reported by the resource watcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    /// The resource was created.
    Created,
    /// The resource was updated.
    Updated,
    /// The resource was deleted.
    Deleted,
}

impl Action {
    /// Returns the action as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Updated => "updated",
            Self::Deleted => "deleted",
        }
    }

    /// Returns the human-readable reason recorded for this action.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::Created => "Create",
            Self::Updated => "Update",
            Self::Deleted => "Delete",
        }
    }

    /// Returns the status recorded for this action.
    #[must_use]
    pub const fn status(&self) -> Status {
        match self {
            Self::Created | Self::Updated => Status::Normal,
            Self::Deleted => Status::Warning,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = NotifyError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "deleted" => Ok(Self::Deleted),
            other => Err(NotifyError::Serialization(format!("unknown action: {other}"))),
        }
    }
}

/// How alarming an event is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    /// Routine change.
    #[default]
    Normal,
    /// Something an operator may want to look at.
    Warning,
    /// Something is broken.
    Danger,
}

impl Status {
    /// Returns the status as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Warning => "Warning",
            Self::Danger => "Danger",
        }
    }

    /// Returns the channel-neutral severity indicator.
    #[must_use]
    pub const fn indicator(&self) -> &'static str {
        match self {
            Self::Normal => "info",
            Self::Warning => "warning",
            Self::Danger => "danger",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A raw resource object of one of the supported kinds.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceObject {
    /// A deployment.
    Deployment(Deployment),
    /// A replication controller.
    ReplicationController(ReplicationController),
    /// A replica set.
    ReplicaSet(ReplicaSet),
    /// A daemon set.
    DaemonSet(DaemonSet),
    /// A service.
    Service(Service),
    /// A pod.
    Pod(Pod),
}

impl ResourceObject {
    /// Returns the kind of this object.
    #[must_use]
    pub const fn kind(&self) -> ResourceKind {
        match self {
            Self::Deployment(_) => ResourceKind::Deployment,
            Self::ReplicationController(_) => ResourceKind::ReplicationController,
            Self::ReplicaSet(_) => ResourceKind::ReplicaSet,
            Self::DaemonSet(_) => ResourceKind::DaemonSet,
            Self::Service(_) => ResourceKind::Service,
            Self::Pod(_) => ResourceKind::Pod,
        }
    }

    /// Returns the object's metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ObjectMeta {
        match self {
            Self::Deployment(o) => &o.metadata,
            Self::ReplicationController(o) => &o.metadata,
            Self::ReplicaSet(o) => &o.metadata,
            Self::DaemonSet(o) => &o.metadata,
            Self::Service(o) => &o.metadata,
            Self::Pod(o) => &o.metadata,
        }
    }

    /// Decodes a JSON object, choosing the variant from its `kind` field.
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::UnsupportedKind` for kinds outside the supported
    /// set and `NotifyError::Serialization` for undecodable objects.
    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        let kind = value
            .get("kind")
            .and_then(serde_json::Value::as_str)
            .ok_or_else(|| NotifyError::Serialization("object has no kind".to_string()))?;

        let kind: ResourceKind = kind
            .parse()
            .map_err(|_| NotifyError::UnsupportedKind(kind.to_string()))?;

        let object = match kind {
            ResourceKind::Deployment => Self::Deployment(serde_json::from_value(value)?),
            ResourceKind::ReplicationController => {
                Self::ReplicationController(serde_json::from_value(value)?)
            }
            ResourceKind::ReplicaSet => Self::ReplicaSet(serde_json::from_value(value)?),
            ResourceKind::DaemonSet => Self::DaemonSet(serde_json::from_value(value)?),
            ResourceKind::Service => Self::Service(serde_json::from_value(value)?),
            ResourceKind::Pod => Self::Pod(serde_json::from_value(value)?),
        };
        Ok(object)
    }
}

macro_rules! impl_from_resource {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for ResourceObject {
                fn from(object: $variant) -> Self {
                    Self::$variant(object)
                }
            }
        )*
    };
}

impl_from_resource!(
    Deployment,
    ReplicationController,
    ReplicaSet,
    DaemonSet,
    Service,
    Pod,
);

/// A normalized resource lifecycle event.
///
/// Events are immutable once built; handlers only read them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    kind: String,
    namespace: String,
    name: String,
    reason: String,
    status: Status,
}

impl Event {
    /// Builds an event from explicit parts.
    #[must_use]
    pub fn new(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
        reason: impl Into<String>,
        status: Status,
    ) -> Self {
        Self {
            kind: kind.into(),
            namespace: namespace.into(),
            name: name.into(),
            reason: reason.into(),
            status,
        }
    }

    /// Normalizes any typed Kubernetes object whose metadata is an
    /// [`ObjectMeta`].
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::MalformedResource` if the namespace or name is
    /// missing.
    pub fn normalize<K>(object: &K, action: Action) -> Result<Self>
    where
        K: k8s_openapi::Resource + k8s_openapi::Metadata<Ty = ObjectMeta>,
    {
        Self::from_metadata(K::KIND, object.metadata(), action)
    }

    /// Normalizes a [`ResourceObject`].
    ///
    /// # Errors
    ///
    /// Returns `NotifyError::MalformedResource` if the namespace or name is
    /// missing.
    pub fn from_object(object: &ResourceObject, action: Action) -> Result<Self> {
        Self::from_metadata(object.kind().as_str(), object.metadata(), action)
    }

    fn from_metadata(kind: &str, metadata: &ObjectMeta, action: Action) -> Result<Self> {
        let field = |value: &Option<String>, what: &str| {
            value
                .as_deref()
                .filter(|v| !v.is_empty())
                .map(ToString::to_string)
                .ok_or_else(|| NotifyError::MalformedResource {
                    kind: kind.to_string(),
                    reason: format!("missing {what}"),
                })
        };

        Ok(Self {
            kind: kind.to_string(),
            namespace: field(&metadata.namespace, "namespace")?,
            name: field(&metadata.name, "name")?,
            reason: action.reason().to_string(),
            status: action.status(),
        })
    }

    /// Returns the resource kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the resource namespace.
    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Returns the resource name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the human-readable cause.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }

    /// Returns the status.
    #[must_use]
    pub const fn status(&self) -> Status {
        self.status
    }
}
