//! TCP connection analyzer.
//!
//! | Event | Group | Required attribute |
//! |-------|-------|--------------------|
//! | `tcp_retransmit` | `tcp_retransmit_metric` | none (`count` defaults to 1) |
//! | `tcp_drop` | `tcp_drop_metric` | none (`count` defaults to 1) |
//! | `tcp_rtt` | `tcp_rtt_metric` | `rtt_us` |

use std::sync::Arc;

use lumen_core::error::{CollectorError, PipelineError};
use lumen_core::event::{MetricGroup, RawEvent};
use lumen_core::pipeline::{Analyzer, ComponentState, Consumer};
use serde::Deserialize;
use tracing::debug;

use crate::lifecycle::{StateCell, fan_out, require_events};

/// Registry identifier and analyzer name.
pub const TCP_METRIC_ANALYZER: &str = "tcpmetric";

/// Attribute holding a round-trip time sample.
pub const RTT_US: &str = "rtt_us";

/// `[analyzers.tcpmetric]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TcpMetricAnalyzerConfig {
    /// Event names routed to this analyzer.
    pub consumable_events: Vec<String>,
}

impl Default for TcpMetricAnalyzerConfig {
    fn default() -> Self {
        Self {
            consumable_events: vec![
                "tcp_retransmit".to_owned(),
                "tcp_drop".to_owned(),
                "tcp_rtt".to_owned(),
            ],
        }
    }
}

/// Connection-level analyzer.
pub struct TcpMetricAnalyzer {
    config: TcpMetricAnalyzerConfig,
    consumers: Vec<Arc<dyn Consumer>>,
    state: StateCell,
}

impl TcpMetricAnalyzer {
    /// Creates an analyzer pushing to `consumers`.
    pub fn new(config: TcpMetricAnalyzerConfig, consumers: Vec<Arc<dyn Consumer>>) -> Self {
        Self {
            config,
            consumers,
            state: StateCell::new(),
        }
    }

    fn analyze(&self, event: &RawEvent) -> Result<MetricGroup, CollectorError> {
        let mut group = MetricGroup::new(format!("{}_metric", event.name), event.timestamp);
        group.labels = event.labels.clone();
        group.values = event.metrics.clone();

        if event.name == "tcp_rtt" {
            if event.metric(RTT_US).is_none() {
                return Err(PipelineError::ConsumeFailed {
                    stage: TCP_METRIC_ANALYZER.to_owned(),
                    reason: format!("{} event without {RTT_US}", event.name),
                }
                .into());
            }
        } else {
            group.values.entry("count".to_owned()).or_insert(1);
        }
        Ok(group)
    }
}

impl Analyzer for TcpMetricAnalyzer {
    fn name(&self) -> &str {
        TCP_METRIC_ANALYZER
    }

    fn consumable_events(&self) -> &[String] {
        &self.config.consumable_events
    }

    fn state(&self) -> ComponentState {
        self.state.get()
    }

    async fn start(&self) -> Result<(), CollectorError> {
        self.state
            .start_with(|| require_events(TCP_METRIC_ANALYZER, &self.config.consumable_events))?;
        debug!(events = ?self.config.consumable_events, "tcp metric analyzer running");
        Ok(())
    }

    fn consume_event(&self, event: &RawEvent) -> Result<(), CollectorError> {
        self.state.ensure_running(TCP_METRIC_ANALYZER)?;
        let group = self.analyze(event)?;
        fan_out(TCP_METRIC_ANALYZER, &self.consumers, group)
    }

    async fn shutdown(&self) -> Result<(), CollectorError> {
        if self.state.stop() {
            debug!("tcp metric analyzer stopped");
        }
        Ok(())
    }
}
