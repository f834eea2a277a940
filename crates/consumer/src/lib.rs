//! Consumers of analyzer output.
//!
//! - [`processor`]: enrichment and reshaping stages, each wrapping its
//!   downstream consumer
//! - [`exporter`]: terminal sinks
//!
//! ```text
//! analyzer -> K8sMetadataProcessor -> RelabelProcessor -> StdoutExporter
//!                                 \-> NodeMetricProcessor -/
//! ```

pub mod exporter;
pub mod processor;

pub use exporter::{ExportFormat, StdoutExporter, StdoutExporterConfig};
pub use processor::{
    K8sMetadataConfig, K8sMetadataProcessor, NodeMetricConfig, NodeMetricProcessor,
    RelabelConfig, RelabelProcessor,
};
