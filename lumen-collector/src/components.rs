//! Built-in component registration.
//!
//! Constructors are closures over whatever shared state a component needs;
//! the enrichment processor captures the workload cache here, so every
//! instance built from the registry reads the same cache.

use std::sync::Arc;

use lumen_analyzer::{
    NETWORK_ANALYZER, NetworkAnalyzer, NetworkAnalyzerConfig, TCP_METRIC_ANALYZER,
    TcpMetricAnalyzer, TcpMetricAnalyzerConfig, UPROBE_ANALYZER, UprobeAnalyzer,
    UprobeAnalyzerConfig,
};
use lumen_consumer::exporter::STDOUT_EXPORTER;
use lumen_consumer::processor::{K8S_METADATA_PROCESSOR, NODE_METRIC_PROCESSOR, RELABEL_PROCESSOR};
use lumen_consumer::{
    K8sMetadataConfig, K8sMetadataProcessor, NodeMetricConfig, NodeMetricProcessor,
    RelabelConfig, RelabelProcessor, StdoutExporter, StdoutExporterConfig,
};
use lumen_core::error::RegistryError;
use lumen_core::pipeline::{Consumer, DynAnalyzer, DynReceiver};
use lumen_core::registry::ComponentRegistry;
use lumen_metadata::WorkloadCache;
use lumen_receiver::{UDS_RECEIVER, UdsReceiver, UdsReceiverConfig};

/// Registers every built-in receiver, analyzer, processor and exporter.
pub fn register_builtins(
    registry: &mut ComponentRegistry,
    cache: &Arc<WorkloadCache>,
) -> Result<(), RegistryError> {
    registry.register_receiver(
        UDS_RECEIVER,
        |config: &UdsReceiverConfig, sink| {
            Ok(Arc::new(UdsReceiver::new(config.clone(), sink)?) as Arc<dyn DynReceiver>)
        },
        UdsReceiverConfig::default(),
    )?;

    registry.register_analyzer(
        NETWORK_ANALYZER,
        |config: &NetworkAnalyzerConfig, consumers| {
            Ok(Arc::new(NetworkAnalyzer::new(config.clone(), consumers)) as Arc<dyn DynAnalyzer>)
        },
        NetworkAnalyzerConfig::default(),
    )?;
    registry.register_analyzer(
        TCP_METRIC_ANALYZER,
        |config: &TcpMetricAnalyzerConfig, consumers| {
            Ok(Arc::new(TcpMetricAnalyzer::new(config.clone(), consumers)) as Arc<dyn DynAnalyzer>)
        },
        TcpMetricAnalyzerConfig::default(),
    )?;
    registry.register_analyzer(
        UPROBE_ANALYZER,
        |config: &UprobeAnalyzerConfig, consumers| {
            Ok(Arc::new(UprobeAnalyzer::new(config.clone(), consumers)) as Arc<dyn DynAnalyzer>)
        },
        UprobeAnalyzerConfig::default(),
    )?;

    let shared = Arc::clone(cache);
    registry.register_processor(
        K8S_METADATA_PROCESSOR,
        move |config: &K8sMetadataConfig, next| {
            Ok(Arc::new(K8sMetadataProcessor::new(
                config.clone(),
                Arc::clone(&shared),
                next,
            )) as Arc<dyn Consumer>)
        },
        K8sMetadataConfig::default(),
    )?;
    registry.register_processor(
        RELABEL_PROCESSOR,
        |config: &RelabelConfig, next| {
            Ok(Arc::new(RelabelProcessor::new(config.clone(), next)) as Arc<dyn Consumer>)
        },
        RelabelConfig::default(),
    )?;
    registry.register_processor(
        NODE_METRIC_PROCESSOR,
        |config: &NodeMetricConfig, next| {
            Ok(Arc::new(NodeMetricProcessor::new(config.clone(), next)) as Arc<dyn Consumer>)
        },
        NodeMetricConfig::default(),
    )?;

    registry.register_exporter(
        STDOUT_EXPORTER,
        |config: &StdoutExporterConfig| {
            Ok(Arc::new(StdoutExporter::new(config.clone())) as Arc<dyn Consumer>)
        },
        StdoutExporterConfig::default(),
    )?;

    Ok(())
}
