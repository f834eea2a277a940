//! Processors: consumers that transform a group and pass it on.
//!
//! - [`K8sMetadataProcessor`]: workload enrichment from the metadata cache
//! - [`RelabelProcessor`]: name prefix and label drop list
//! - [`NodeMetricProcessor`]: derived node-level groups

pub mod k8s_metadata;
pub mod node_metric;
pub mod relabel;

pub use k8s_metadata::{K8S_METADATA_PROCESSOR, K8sMetadataConfig, K8sMetadataProcessor};
pub use node_metric::{NODE_METRIC_PROCESSOR, NodeMetricConfig, NodeMetricProcessor};
pub use relabel::{RELABEL_PROCESSOR, RelabelConfig, RelabelProcessor};
