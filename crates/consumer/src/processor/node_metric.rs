//! Node-level aggregation branch.
//!
//! Forwards every group unchanged, then a derived `<name>_node` group that
//! keeps the same values but only the node labels, so a backend can sum
//! per node without per-workload cardinality. Groups without any node label
//! produce no derived group.

use std::sync::Arc;

use lumen_core::error::CollectorError;
use lumen_core::event::{MetricGroup, labels};
use lumen_core::pipeline::Consumer;
use serde::Deserialize;

/// Registry identifier.
pub const NODE_METRIC_PROCESSOR: &str = "nodemetric";

/// `[processors.nodemetric]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NodeMetricConfig {
    /// Labels kept on the derived group.
    pub node_label_keys: Vec<String>,
}

impl Default for NodeMetricConfig {
    fn default() -> Self {
        Self {
            node_label_keys: vec![labels::NODE.to_owned()],
        }
    }
}

/// Emits a node-scoped copy of each group.
pub struct NodeMetricProcessor {
    config: NodeMetricConfig,
    next: Arc<dyn Consumer>,
}

impl NodeMetricProcessor {
    /// Creates a processor forwarding to `next`.
    pub fn new(config: NodeMetricConfig, next: Arc<dyn Consumer>) -> Self {
        Self { config, next }
    }

    fn derive(&self, group: &MetricGroup) -> Option<MetricGroup> {
        let mut node = MetricGroup::new(format!("{}_node", group.name), group.timestamp);
        for key in &self.config.node_label_keys {
            if let Some(value) = group.label(key) {
                node.set_label(key.as_str(), value);
            }
        }
        if node.labels.is_empty() {
            return None;
        }
        node.values = group.values.clone();
        Some(node)
    }
}

impl Consumer for NodeMetricProcessor {
    fn consume(&self, group: MetricGroup) -> Result<(), CollectorError> {
        let derived = self.derive(&group);
        self.next.consume(group)?;
        match derived {
            Some(node) => self.next.consume(node),
            None => Ok(()),
        }
    }
}
