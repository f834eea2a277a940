//! Pipeline assembly: the fixed topology, built leaves first.
//!
//! ```text
//! uds ─> AnalyzerManager ─┬─> network ─┬─┬─> k8smetadata ─> relabel ─────┐
//!                         ├─> uprobe ──┘ └─> k8smetadata ─> nodemetric ─┼─> stdout
//!                         └─> tcpmetric ───> k8smetadata ───────────────┘
//! ```
//!
//! `network` and `uprobe` push into the same two enrichment chains. Every
//! `k8smetadata` box is its own instance with its own counters; all of them
//! read the one cache captured at registration. The exporter instance is
//! shared by the three chains.

use std::sync::Arc;

use lumen_analyzer::{AnalyzerManager, NETWORK_ANALYZER, TCP_METRIC_ANALYZER, UPROBE_ANALYZER};
use lumen_consumer::exporter::STDOUT_EXPORTER;
use lumen_consumer::processor::{K8S_METADATA_PROCESSOR, NODE_METRIC_PROCESSOR, RELABEL_PROCESSOR};
use lumen_core::error::CollectorError;
use lumen_core::pipeline::{DynReceiver, EventSink};
use lumen_core::registry::ComponentRegistry;
use lumen_receiver::UDS_RECEIVER;
use tracing::{debug, info};

/// The assembled stages the application drives.
pub struct Pipeline {
    /// Lifecycle coordinator and event sink for the receiver.
    pub manager: Arc<AnalyzerManager>,
    /// Ingestion source.
    pub receiver: Arc<dyn DynReceiver>,
}

impl Pipeline {
    /// Constructs every stage from a registry whose configurations are bound.
    ///
    /// Fails before anything is started: a construction error or a duplicate
    /// analyzer name leaves no running component behind.
    pub fn build(registry: &ComponentRegistry) -> Result<Self, CollectorError> {
        let exporter = registry.build_exporter(STDOUT_EXPORTER)?;

        let relabel = registry.build_processor(RELABEL_PROCESSOR, Arc::clone(&exporter))?;
        let main_branch = registry.build_processor(K8S_METADATA_PROCESSOR, relabel)?;

        let node = registry.build_processor(NODE_METRIC_PROCESSOR, Arc::clone(&exporter))?;
        let node_branch = registry.build_processor(K8S_METADATA_PROCESSOR, node)?;

        let tcp_branch = registry.build_processor(K8S_METADATA_PROCESSOR, exporter)?;
        debug!("processor chains built");

        let network = registry.build_analyzer(
            NETWORK_ANALYZER,
            vec![Arc::clone(&main_branch), Arc::clone(&node_branch)],
        )?;
        let tcp = registry.build_analyzer(TCP_METRIC_ANALYZER, vec![tcp_branch])?;
        let uprobe = registry.build_analyzer(UPROBE_ANALYZER, vec![main_branch, node_branch])?;

        let manager = Arc::new(AnalyzerManager::new(vec![network, tcp, uprobe])?);
        let sink: Arc<dyn EventSink> = Arc::clone(&manager) as Arc<dyn EventSink>;
        let receiver = registry.build_receiver(UDS_RECEIVER, sink)?;

        info!(
            analyzers = manager.len(),
            receiver = receiver.name(),
            "pipeline built"
        );
        Ok(Self { manager, receiver })
    }
}
