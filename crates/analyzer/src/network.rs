//! Network request analyzer.
//!
//! Turns each request event into a `<event>_metric` group carrying the
//! event's labels and numeric attributes, a `request_count` of one and an
//! `is_slow` label derived from `latency_ms`.

use std::sync::Arc;

use lumen_core::error::{CollectorError, PipelineError};
use lumen_core::event::{MetricGroup, RawEvent};
use lumen_core::pipeline::{Analyzer, ComponentState, Consumer};
use serde::Deserialize;
use tracing::debug;

use crate::lifecycle::{StateCell, fan_out, require_events};

/// Registry identifier and analyzer name.
pub const NETWORK_ANALYZER: &str = "network";

/// Attribute holding the request latency.
pub const LATENCY_MS: &str = "latency_ms";

/// `[analyzers.network]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkAnalyzerConfig {
    /// Event names routed to this analyzer.
    pub consumable_events: Vec<String>,
    /// Requests at or above this latency are labelled slow.
    pub slow_threshold_ms: i64,
}

impl Default for NetworkAnalyzerConfig {
    fn default() -> Self {
        Self {
            consumable_events: vec!["net_request".to_owned()],
            slow_threshold_ms: 500,
        }
    }
}

/// Request-level analyzer.
pub struct NetworkAnalyzer {
    config: NetworkAnalyzerConfig,
    consumers: Vec<Arc<dyn Consumer>>,
    state: StateCell,
}

impl NetworkAnalyzer {
    /// Creates an analyzer pushing to `consumers`.
    pub fn new(config: NetworkAnalyzerConfig, consumers: Vec<Arc<dyn Consumer>>) -> Self {
        Self {
            config,
            consumers,
            state: StateCell::new(),
        }
    }

    fn check(&self) -> Result<(), CollectorError> {
        require_events(NETWORK_ANALYZER, &self.config.consumable_events)?;
        if self.config.slow_threshold_ms <= 0 {
            return Err(PipelineError::InitFailed(format!(
                "{NETWORK_ANALYZER}: slow_threshold_ms must be positive, got {}",
                self.config.slow_threshold_ms
            ))
            .into());
        }
        Ok(())
    }

    fn analyze(&self, event: &RawEvent) -> MetricGroup {
        let mut group = MetricGroup::new(format!("{}_metric", event.name), event.timestamp);
        group.labels = event.labels.clone();
        group.values = event.metrics.clone();
        group.set_value("request_count", 1);

        let slow = event
            .metric(LATENCY_MS)
            .is_some_and(|latency| latency >= self.config.slow_threshold_ms);
        group.set_label("is_slow", slow.to_string());
        group
    }
}

impl Analyzer for NetworkAnalyzer {
    fn name(&self) -> &str {
        NETWORK_ANALYZER
    }

    fn consumable_events(&self) -> &[String] {
        &self.config.consumable_events
    }

    fn state(&self) -> ComponentState {
        self.state.get()
    }

    async fn start(&self) -> Result<(), CollectorError> {
        self.state.start_with(|| self.check())?;
        debug!(
            events = ?self.config.consumable_events,
            slow_threshold_ms = self.config.slow_threshold_ms,
            consumers = self.consumers.len(),
            "network analyzer running"
        );
        Ok(())
    }

    fn consume_event(&self, event: &RawEvent) -> Result<(), CollectorError> {
        self.state.ensure_running(NETWORK_ANALYZER)?;
        fan_out(NETWORK_ANALYZER, &self.consumers, self.analyze(event))
    }

    async fn shutdown(&self) -> Result<(), CollectorError> {
        if self.state.stop() {
            debug!("network analyzer stopped");
        }
        Ok(())
    }
}
