//! Event types flowing through the pipeline.
//!
//! ```text
//! Receiver --RawEvent--> AnalyzerManager --RawEvent--> Analyzer
//!                                                        |
//!                                                   MetricGroup
//!                                                        v
//!                                      Processor -> ... -> Exporter
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Well-known label keys.
pub mod labels {
    /// Namespace of the workload the event belongs to.
    pub const NAMESPACE: &str = "namespace";
    /// Name of the replica object (e.g. ReplicaSet) the event belongs to.
    pub const REPLICA_SET: &str = "replicaset";
    /// Node the event was captured on.
    pub const NODE: &str = "node";

    /// Resolved controller name, attached by enrichment.
    pub const WORKLOAD_NAME: &str = "workload_name";
    /// Resolved controller kind, attached by enrichment.
    pub const WORKLOAD_KIND: &str = "workload_kind";
    /// Resolved controller API version, attached by enrichment.
    pub const WORKLOAD_API_VERSION: &str = "workload_api_version";
    /// Prefix for workload labels copied by enrichment.
    pub const WORKLOAD_LABEL_PREFIX: &str = "label_";
}

/// A low-level event as delivered by an ingestion source.
///
/// Receivers decode one of these per message; analyzers decide what it means.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    /// Event type, used by the analyzer manager for routing (e.g. `net_request`).
    pub name: String,
    /// Capture time in nanoseconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: u64,
    /// String attributes.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    /// Numeric attributes.
    #[serde(default)]
    pub metrics: BTreeMap<String, i64>,
}

impl RawEvent {
    /// Creates an event with no attributes.
    pub fn new(name: impl Into<String>, timestamp: u64) -> Self {
        Self {
            name: name.into(),
            timestamp,
            ..Self::default()
        }
    }

    /// Adds a string attribute.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Adds a numeric attribute.
    pub fn with_metric(mut self, key: impl Into<String>, value: i64) -> Self {
        self.metrics.insert(key.into(), value);
        self
    }

    /// Looks up a string attribute.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Looks up a numeric attribute.
    pub fn metric(&self, key: &str) -> Option<i64> {
        self.metrics.get(key).copied()
    }
}

/// A set of values sharing one label set, produced by analyzers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricGroup {
    /// Group name, e.g. `net_request_metric`.
    pub name: String,
    /// Timestamp in nanoseconds since the Unix epoch.
    pub timestamp: u64,
    /// Metric values keyed by metric name.
    pub values: BTreeMap<String, i64>,
    /// Labels describing the values.
    pub labels: BTreeMap<String, String>,
}

impl MetricGroup {
    /// Creates an empty group.
    pub fn new(name: impl Into<String>, timestamp: u64) -> Self {
        Self {
            name: name.into(),
            timestamp,
            ..Self::default()
        }
    }

    /// Sets a label, replacing any previous value.
    pub fn set_label(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.labels.insert(key.into(), value.into());
    }

    /// Looks up a label.
    pub fn label(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    /// Sets a value, replacing any previous value.
    pub fn set_value(&mut self, key: impl Into<String>, value: i64) {
        self.values.insert(key.into(), value);
    }
}
