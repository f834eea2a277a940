//! Domain types for the workload watch.
//!
//! Objects are decoded once at the watch boundary into [`ReplicaSetObject`];
//! nothing downstream touches the Kubernetes API types.

use std::collections::BTreeMap;

/// The controlling owner reference of an object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OwnerReference {
    /// Owner name, e.g. `web`.
    pub name: String,
    /// Owner kind, e.g. `Deployment`.
    pub kind: String,
    /// Owner API version, e.g. `apps/v1`.
    pub api_version: String,
}

/// A replica object as seen by the watch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaSetObject {
    /// Namespace.
    pub namespace: String,
    /// Object name.
    pub name: String,
    /// Opaque version string; equal versions mean an unchanged object.
    pub resource_version: String,
    /// Controller owner reference, if any.
    pub owner: Option<OwnerReference>,
    /// Object labels.
    pub labels: BTreeMap<String, String>,
}

impl ReplicaSetObject {
    /// Cache key `namespace/name`.
    pub fn key(&self) -> String {
        cache_key(&self.namespace, &self.name)
    }
}

/// Builds the `namespace/name` cache key.
pub fn cache_key(namespace: &str, name: &str) -> String {
    format!("{namespace}/{name}")
}

/// The workload controlling a replica object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Controller {
    /// Controller name.
    pub name: String,
    /// Controller kind.
    pub kind: String,
    /// Controller API version.
    pub api_version: String,
}

/// What the cache stores per replica object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkloadIdentity {
    /// The owning controller.
    pub controller: Controller,
    /// Labels of the replica object.
    pub labels: BTreeMap<String, String>,
}

impl WorkloadIdentity {
    /// Derives the identity from an object, or `None` if it has no controller.
    pub fn from_object(object: &ReplicaSetObject) -> Option<Self> {
        let owner = object.owner.as_ref()?;
        Some(Self {
            controller: Controller {
                name: owner.name.clone(),
                kind: owner.kind.clone(),
                api_version: owner.api_version.clone(),
            },
            labels: object.labels.clone(),
        })
    }
}

/// A typed change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    /// Object created or first seen.
    Added(ReplicaSetObject),
    /// Object changed.
    Updated {
        /// Previous state.
        old: ReplicaSetObject,
        /// New state.
        new: ReplicaSetObject,
    },
    /// Object removed.
    Deleted(ReplicaSetObject),
}

impl WatchEvent {
    /// Metric label for the variant.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Added(_) => "add",
            Self::Updated { .. } => "update",
            Self::Deleted(_) => "delete",
        }
    }
}

/// What a [`WatchSource`](crate::watch::WatchSource) yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchNotification {
    /// A change to apply.
    Event(WatchEvent),
    /// The initial listing has been fully delivered.
    Synced,
}
