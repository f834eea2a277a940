//! Workload metadata for enrichment.
//!
//! A [`WorkloadCache`] maps replica objects to the workload that controls
//! them. A [`WorkloadWatcher`] keeps it current from a [`WatchSource`]; in
//! production that is [`KubeReplicaSetSource`].
//!
//! ```text
//! kube watcher -> ReplicaSetTracker -> WorkloadWatcher -> WorkloadCache <- enrichment
//! ```

pub mod cache;
pub mod error;
pub mod k8s;
pub mod types;
pub mod watch;

pub use cache::WorkloadCache;
pub use error::MetadataError;
pub use k8s::{KubeReplicaSetSource, ReplicaSetTracker};
pub use types::{
    Controller, OwnerReference, ReplicaSetObject, WatchEvent, WatchNotification, WorkloadIdentity,
};
pub use watch::{WatchHandle, WatchSource, WorkloadWatcher};
