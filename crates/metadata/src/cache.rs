//! Workload metadata cache.
//!
//! Maps `namespace/name` of a replica object to the workload that controls
//! it. The watch consumer is the only writer; enrichment stages read it
//! concurrently.
//!
//! # Locking
//! Two locks, always taken in this order:
//! 1. `update_token`: serializes notification handlers against each other
//! 2. `entries`: the map itself, held only for a single get/insert/remove
//!
//! An update is a remove followed by an insert, each under its own map
//! write lock. A reader racing an update can therefore see the key absent
//! for the duration of one update; it never sees a partially written record,
//! since records are swapped whole behind an `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use lumen_core::metrics as m;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};

use crate::types::{ReplicaSetObject, WatchEvent, WorkloadIdentity, cache_key};

/// Concurrent `namespace/name` → [`WorkloadIdentity`] map.
#[derive(Debug, Default)]
pub struct WorkloadCache {
    entries: RwLock<HashMap<String, Arc<WorkloadIdentity>>>,
    update_token: Mutex<()>,
}

impl WorkloadCache {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the workload controlling `namespace/name`.
    ///
    /// `None` means no known owner; it is not an error.
    pub fn lookup(&self, namespace: &str, name: &str) -> Option<Arc<WorkloadIdentity>> {
        self.entries.read().get(&cache_key(namespace, name)).cloned()
    }

    /// Handles an added object. Objects without a controller are ignored.
    pub fn on_add(&self, object: &ReplicaSetObject) {
        let _token = self.update_token.lock();
        self.put(object);
        self.record_size();
    }

    /// Handles a changed object.
    ///
    /// Equal resource versions are a no-op. Otherwise the old key is removed
    /// and the new object added, as one serialized step.
    pub fn on_update(&self, old: &ReplicaSetObject, new: &ReplicaSetObject) {
        if old.resource_version == new.resource_version {
            trace!(key = %new.key(), "resource version unchanged, skipping update");
            return;
        }
        let _token = self.update_token.lock();
        self.remove(old);
        self.put(new);
        self.record_size();
    }

    /// Handles a removed object. Absent keys are a no-op.
    pub fn on_delete(&self, object: &ReplicaSetObject) {
        let _token = self.update_token.lock();
        self.remove(object);
        self.record_size();
    }

    /// Dispatches a typed notification to its handler.
    pub fn apply(&self, event: &WatchEvent) {
        match event {
            WatchEvent::Added(object) => self.on_add(object),
            WatchEvent::Updated { old, new } => self.on_update(old, new),
            WatchEvent::Deleted(object) => self.on_delete(object),
        }
        metrics::counter!(m::METADATA_NOTIFICATIONS_TOTAL, m::LABEL_KIND => event.kind())
            .increment(1);
    }

    /// Number of cached workloads.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    // Callers hold `update_token`.
    fn put(&self, object: &ReplicaSetObject) {
        let Some(identity) = WorkloadIdentity::from_object(object) else {
            debug!(key = %object.key(), "no controller owner, not cached");
            return;
        };
        self.entries
            .write()
            .insert(object.key(), Arc::new(identity));
    }

    // Callers hold `update_token`.
    fn remove(&self, object: &ReplicaSetObject) {
        self.entries.write().remove(&object.key());
    }

    fn record_size(&self) {
        metrics::gauge!(m::METADATA_CACHE_ENTRIES).set(self.len() as f64);
    }
}
