//! gRPC request analyzer for uprobe-captured calls.
//!
//! Each `grpc_uprobe` event becomes a `grpc_request_metric` group. The
//! event must carry a `grpc_status` attribute; a non-zero status sets the
//! `is_error` label.

use std::sync::Arc;

use lumen_core::error::{CollectorError, PipelineError};
use lumen_core::event::{MetricGroup, RawEvent};
use lumen_core::pipeline::{Analyzer, ComponentState, Consumer};
use serde::Deserialize;
use tracing::debug;

use crate::lifecycle::{StateCell, fan_out, require_events};

/// Registry identifier and analyzer name.
pub const UPROBE_ANALYZER: &str = "uprobe";

/// Attribute holding the gRPC status code.
pub const GRPC_STATUS: &str = "grpc_status";

/// `[analyzers.uprobe]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UprobeAnalyzerConfig {
    /// Event names routed to this analyzer.
    pub consumable_events: Vec<String>,
}

impl Default for UprobeAnalyzerConfig {
    fn default() -> Self {
        Self {
            consumable_events: vec!["grpc_uprobe".to_owned()],
        }
    }
}

/// gRPC call analyzer.
pub struct UprobeAnalyzer {
    config: UprobeAnalyzerConfig,
    consumers: Vec<Arc<dyn Consumer>>,
    state: StateCell,
}

impl UprobeAnalyzer {
    /// Creates an analyzer pushing to `consumers`.
    pub fn new(config: UprobeAnalyzerConfig, consumers: Vec<Arc<dyn Consumer>>) -> Self {
        Self {
            config,
            consumers,
            state: StateCell::new(),
        }
    }

    fn analyze(&self, event: &RawEvent) -> Result<MetricGroup, CollectorError> {
        let Some(status) = event.metric(GRPC_STATUS) else {
            return Err(PipelineError::ConsumeFailed {
                stage: UPROBE_ANALYZER.to_owned(),
                reason: format!("{} event without {GRPC_STATUS}", event.name),
            }
            .into());
        };

        let mut group = MetricGroup::new("grpc_request_metric", event.timestamp);
        group.labels = event.labels.clone();
        group.values = event.metrics.clone();
        group.set_value("request_count", 1);
        group.set_label("is_error", (status != 0).to_string());
        Ok(group)
    }
}

impl Analyzer for UprobeAnalyzer {
    fn name(&self) -> &str {
        UPROBE_ANALYZER
    }

    fn consumable_events(&self) -> &[String] {
        &self.config.consumable_events
    }

    fn state(&self) -> ComponentState {
        self.state.get()
    }

    async fn start(&self) -> Result<(), CollectorError> {
        self.state
            .start_with(|| require_events(UPROBE_ANALYZER, &self.config.consumable_events))?;
        debug!(events = ?self.config.consumable_events, "uprobe analyzer running");
        Ok(())
    }

    fn consume_event(&self, event: &RawEvent) -> Result<(), CollectorError> {
        self.state.ensure_running(UPROBE_ANALYZER)?;
        let group = self.analyze(event)?;
        fan_out(UPROBE_ANALYZER, &self.consumers, group)
    }

    async fn shutdown(&self) -> Result<(), CollectorError> {
        if self.state.stop() {
            debug!("uprobe analyzer stopped");
        }
        Ok(())
    }
}
