//! Analyzer manager: lifecycle coordinator and event router.
//!
//! Owns every analyzer in the pipeline. Receivers hand events to it through
//! [`EventSink::dispatch`], which routes each event to the analyzers that
//! declared its name.
//!
//! # Lifecycle
//! - [`start_all`](AnalyzerManager::start_all) attempts every analyzer and
//!   reports all failures at once
//! - [`shutdown_all`](AnalyzerManager::shutdown_all) stops every analyzer
//!   regardless of how start went, and is safe to call repeatedly

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use lumen_core::error::{CollectorError, PipelineError, RegistryError};
use lumen_core::event::RawEvent;
use lumen_core::metrics as m;
use lumen_core::pipeline::{ComponentState, DynAnalyzer, EventSink, HealthStatus};
use tracing::{debug, error, info, trace, warn};

/// Coordinates a fixed set of analyzers.
pub struct AnalyzerManager {
    analyzers: Vec<Arc<dyn DynAnalyzer>>,
    routes: HashMap<String, Vec<Arc<dyn DynAnalyzer>>>,
}

impl AnalyzerManager {
    /// Creates a manager and its routing table.
    ///
    /// # Errors
    /// [`RegistryError::DuplicateAnalyzer`] if two analyzers share a name.
    pub fn new(analyzers: Vec<Arc<dyn DynAnalyzer>>) -> Result<Self, RegistryError> {
        let mut names = HashSet::with_capacity(analyzers.len());
        let mut routes: HashMap<String, Vec<Arc<dyn DynAnalyzer>>> = HashMap::new();

        for analyzer in &analyzers {
            if !names.insert(analyzer.name()) {
                return Err(RegistryError::DuplicateAnalyzer {
                    name: analyzer.name().to_owned(),
                });
            }
            for event in analyzer.consumable_events() {
                routes
                    .entry(event.clone())
                    .or_default()
                    .push(Arc::clone(analyzer));
            }
        }

        debug!(
            analyzers = analyzers.len(),
            routes = routes.len(),
            "analyzer manager created"
        );
        Ok(Self { analyzers, routes })
    }

    /// Starts every analyzer.
    ///
    /// A failure does not stop the remaining analyzers from starting. All
    /// failures are returned together as [`PipelineError::StartFailed`].
    pub async fn start_all(&self) -> Result<(), CollectorError> {
        let mut errors = Vec::new();
        for analyzer in &self.analyzers {
            match analyzer.start().await {
                Ok(()) => info!(analyzer = analyzer.name(), "analyzer started"),
                Err(e) => {
                    error!(analyzer = analyzer.name(), error = %e, "analyzer failed to start");
                    errors.push(format!("{}: {}", analyzer.name(), e));
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::StartFailed(errors.join("; ")).into())
        }
    }

    /// Shuts down every analyzer.
    ///
    /// Never-started and already-stopped analyzers are no-ops, so calling
    /// this twice is safe. Failures are collected into
    /// [`PipelineError::ShutdownFailed`].
    pub async fn shutdown_all(&self) -> Result<(), CollectorError> {
        let mut errors = Vec::new();
        for analyzer in &self.analyzers {
            let was_running = analyzer.state() == ComponentState::Running;
            match analyzer.shutdown().await {
                Ok(()) if was_running => info!(analyzer = analyzer.name(), "analyzer stopped"),
                Ok(()) => {}
                Err(e) => {
                    error!(analyzer = analyzer.name(), error = %e, "analyzer failed to stop");
                    errors.push(format!("{}: {}", analyzer.name(), e));
                }
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::ShutdownFailed(errors.join("; ")).into())
        }
    }

    /// Looks up an analyzer by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn DynAnalyzer>> {
        self.analyzers
            .iter()
            .find(|a| a.name() == name)
            .map(Arc::clone)
    }

    /// Analyzer names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    /// Number of managed analyzers.
    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    /// Returns `true` if no analyzers are managed.
    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    /// State and health of every analyzer.
    pub fn health_statuses(&self) -> Vec<(String, ComponentState, HealthStatus)> {
        self.analyzers
            .iter()
            .map(|a| (a.name().to_owned(), a.state(), a.health()))
            .collect()
    }
}

impl EventSink for AnalyzerManager {
    /// Delivers the event to every subscribed analyzer.
    ///
    /// Events nobody subscribed to are counted and dropped. One analyzer
    /// failing does not keep the event from its siblings.
    fn dispatch(&self, event: RawEvent) -> Result<(), CollectorError> {
        let Some(targets) = self.routes.get(&event.name) else {
            trace!(event = %event.name, "no analyzer for event");
            metrics::counter!(m::ANALYZER_EVENTS_UNROUTED_TOTAL, m::LABEL_EVENT => event.name.clone())
                .increment(1);
            return Ok(());
        };

        for analyzer in targets {
            metrics::counter!(m::ANALYZER_EVENTS_DISPATCHED_TOTAL, m::LABEL_COMPONENT => analyzer.name().to_owned())
                .increment(1);
            if let Err(e) = analyzer.consume_event(&event) {
                warn!(analyzer = analyzer.name(), event = %event.name, error = %e, "analyzer failed to consume event");
                metrics::counter!(m::ANALYZER_ERRORS_TOTAL, m::LABEL_COMPONENT => analyzer.name().to_owned())
                    .increment(1);
            }
        }
        Ok(())
    }
}
