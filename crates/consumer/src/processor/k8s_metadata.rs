//! Workload enrichment.
//!
//! Resolves the `namespace` and `replicaset` labels of each group against the
//! shared [`WorkloadCache`] and attaches the controlling workload:
//!
//! | Label | Source |
//! |-------|--------|
//! | `workload_name` | controller name |
//! | `workload_kind` | controller kind |
//! | `workload_api_version` | controller API version |
//! | `label_<key>` | replica object labels, when `with_labels` is set |
//!
//! Groups without a cached workload are forwarded untouched. A lookup only
//! ever holds the cache's read lock.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use lumen_core::error::CollectorError;
use lumen_core::event::{MetricGroup, labels};
use lumen_core::metrics as m;
use lumen_core::pipeline::Consumer;
use lumen_metadata::WorkloadCache;
use serde::Deserialize;
use tracing::trace;

/// Registry identifier.
pub const K8S_METADATA_PROCESSOR: &str = "k8smetadata";

/// `[processors.k8smetadata]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct K8sMetadataConfig {
    /// When false, groups pass through unchanged.
    pub enabled: bool,
    /// Copy the replica object's labels as `label_<key>`.
    pub with_labels: bool,
}

impl Default for K8sMetadataConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            with_labels: true,
        }
    }
}

/// Enriches groups with their owning workload.
///
/// One instance per pipeline branch; every instance reads the same cache.
pub struct K8sMetadataProcessor {
    config: K8sMetadataConfig,
    cache: Arc<WorkloadCache>,
    next: Arc<dyn Consumer>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl K8sMetadataProcessor {
    /// Creates a processor reading `cache` and forwarding to `next`.
    pub fn new(config: K8sMetadataConfig, cache: Arc<WorkloadCache>, next: Arc<dyn Consumer>) -> Self {
        Self {
            config,
            cache,
            next,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Groups resolved to a workload by this instance.
    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    /// Groups this instance could not resolve.
    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    fn enrich(&self, group: &mut MetricGroup) {
        let (Some(namespace), Some(replica_set)) = (
            group.label(labels::NAMESPACE),
            group.label(labels::REPLICA_SET),
        ) else {
            self.record_miss();
            return;
        };

        let Some(identity) = self.cache.lookup(namespace, replica_set) else {
            trace!(namespace, replica_set, "no workload cached");
            self.record_miss();
            return;
        };

        group.set_label(labels::WORKLOAD_NAME, identity.controller.name.as_str());
        group.set_label(labels::WORKLOAD_KIND, identity.controller.kind.as_str());
        group.set_label(
            labels::WORKLOAD_API_VERSION,
            identity.controller.api_version.as_str(),
        );
        if self.config.with_labels {
            for (key, value) in &identity.labels {
                group.set_label(
                    format!("{}{key}", labels::WORKLOAD_LABEL_PREFIX),
                    value.as_str(),
                );
            }
        }

        self.hits.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::ENRICHMENT_HITS_TOTAL).increment(1);
    }

    fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(m::ENRICHMENT_MISSES_TOTAL).increment(1);
    }
}

impl Consumer for K8sMetadataProcessor {
    fn consume(&self, mut group: MetricGroup) -> Result<(), CollectorError> {
        if self.config.enabled {
            self.enrich(&mut group);
        }
        self.next.consume(group)
    }
}
