//! Name prefixing and label dropping ahead of export.

use std::sync::Arc;

use lumen_core::error::CollectorError;
use lumen_core::event::MetricGroup;
use lumen_core::pipeline::Consumer;
use serde::Deserialize;

/// Registry identifier.
pub const RELABEL_PROCESSOR: &str = "relabel";

/// `[processors.relabel]`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RelabelConfig {
    /// Prepended to group names that do not already carry it.
    pub prefix: String,
    /// Labels removed from every group.
    pub drop_labels: Vec<String>,
}

/// Renames groups and strips unwanted labels.
pub struct RelabelProcessor {
    config: RelabelConfig,
    next: Arc<dyn Consumer>,
}

impl RelabelProcessor {
    /// Creates a processor forwarding to `next`.
    pub fn new(config: RelabelConfig, next: Arc<dyn Consumer>) -> Self {
        Self { config, next }
    }
}

impl Consumer for RelabelProcessor {
    fn consume(&self, mut group: MetricGroup) -> Result<(), CollectorError> {
        if !self.config.prefix.is_empty() && !group.name.starts_with(&self.config.prefix) {
            group.name = format!("{}{}", self.config.prefix, group.name);
        }
        for label in &self.config.drop_labels {
            group.labels.remove(label);
        }
        self.next.consume(group)
    }
}
