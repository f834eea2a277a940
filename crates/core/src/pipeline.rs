//! Pipeline stage traits: the extension points every component implements.
//!
//! [`Analyzer`] and [`Receiver`] use RPITIT for their async lifecycle methods,
//! which makes them not dyn-compatible. [`DynAnalyzer`] and [`DynReceiver`]
//! return [`BoxFuture`] instead and are implemented automatically, so the
//! builder can hold `Arc<dyn DynAnalyzer>`.
//!
//! # Lifecycle
//! ```text
//! Created -> start() -> Running -> shutdown() -> Stopped
//!               \-> Failed
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::CollectorError;
use crate::event::{MetricGroup, RawEvent};

/// Boxed, sendable future used by the dyn-compatible traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ─── HealthStatus ────────────────────────────────────────────────────

/// Health of a single component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// Operating normally.
    Healthy,
    /// Operating with reduced functionality.
    Degraded(String),
    /// Not operating.
    Unhealthy(String),
}

impl HealthStatus {
    /// Returns `true` for [`HealthStatus::Healthy`].
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// Returns `true` for [`HealthStatus::Unhealthy`].
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Healthy => write!(f, "healthy"),
            Self::Degraded(reason) => write!(f, "degraded: {reason}"),
            Self::Unhealthy(reason) => write!(f, "unhealthy: {reason}"),
        }
    }
}

// ─── ComponentState ──────────────────────────────────────────────────

/// Lifecycle state of a startable component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentState {
    /// Constructed, never started.
    Created,
    /// Started and accepting events.
    Running,
    /// Shut down.
    Stopped,
    /// Start failed.
    Failed,
}

impl ComponentState {
    /// Health implied by the state alone.
    pub fn health(self) -> HealthStatus {
        match self {
            Self::Running => HealthStatus::Healthy,
            Self::Created => HealthStatus::Unhealthy("not started".to_owned()),
            Self::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
            Self::Failed => HealthStatus::Unhealthy("failed to start".to_owned()),
        }
    }
}

impl fmt::Display for ComponentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Stopped => write!(f, "stopped"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

// ─── Consumer ────────────────────────────────────────────────────────

/// A stage that accepts metric groups: processors and exporters.
///
/// `consume` runs synchronously on the caller's task. A consumer owns its
/// downstream consumers and never knows its upstream.
pub trait Consumer: Send + Sync {
    /// Processes one group and forwards whatever it produces downstream.
    fn consume(&self, group: MetricGroup) -> Result<(), CollectorError>;
}

// ─── EventSink ───────────────────────────────────────────────────────

/// Where an ingestion source delivers decoded events.
pub trait EventSink: Send + Sync {
    /// Hands one event to the analysis layer.
    fn dispatch(&self, event: RawEvent) -> Result<(), CollectorError>;
}

// ─── Analyzer ────────────────────────────────────────────────────────

/// An analysis stage: turns raw events into metric groups for its consumers.
///
/// Analyzers are shared between the manager and the receiver's dispatch path,
/// so every method takes `&self`.
pub trait Analyzer: Send + Sync {
    /// Unique analyzer name.
    fn name(&self) -> &str;

    /// Event names this analyzer wants to receive.
    fn consumable_events(&self) -> &[String];

    /// Current lifecycle state.
    fn state(&self) -> ComponentState;

    /// Starts the analyzer.
    fn start(&self) -> impl Future<Output = Result<(), CollectorError>> + Send;

    /// Analyzes one event and pushes the result to every consumer.
    fn consume_event(&self, event: &RawEvent) -> Result<(), CollectorError>;

    /// Shuts the analyzer down. Must be a no-op when not running.
    fn shutdown(&self) -> impl Future<Output = Result<(), CollectorError>> + Send;

    /// Current health.
    fn health(&self) -> HealthStatus {
        self.state().health()
    }
}

/// dyn-compatible [`Analyzer`].
pub trait DynAnalyzer: Send + Sync {
    /// Unique analyzer name.
    fn name(&self) -> &str;

    /// Event names this analyzer wants to receive.
    fn consumable_events(&self) -> &[String];

    /// Current lifecycle state.
    fn state(&self) -> ComponentState;

    /// Starts the analyzer.
    fn start(&self) -> BoxFuture<'_, Result<(), CollectorError>>;

    /// Analyzes one event.
    fn consume_event(&self, event: &RawEvent) -> Result<(), CollectorError>;

    /// Shuts the analyzer down.
    fn shutdown(&self) -> BoxFuture<'_, Result<(), CollectorError>>;

    /// Current health.
    fn health(&self) -> HealthStatus;
}

impl<T: Analyzer> DynAnalyzer for T {
    fn name(&self) -> &str {
        Analyzer::name(self)
    }

    fn consumable_events(&self) -> &[String] {
        Analyzer::consumable_events(self)
    }

    fn state(&self) -> ComponentState {
        Analyzer::state(self)
    }

    fn start(&self) -> BoxFuture<'_, Result<(), CollectorError>> {
        Box::pin(Analyzer::start(self))
    }

    fn consume_event(&self, event: &RawEvent) -> Result<(), CollectorError> {
        Analyzer::consume_event(self, event)
    }

    fn shutdown(&self) -> BoxFuture<'_, Result<(), CollectorError>> {
        Box::pin(Analyzer::shutdown(self))
    }

    fn health(&self) -> HealthStatus {
        Analyzer::health(self)
    }
}

// ─── Receiver ────────────────────────────────────────────────────────

/// An ingestion source.
pub trait Receiver: Send + Sync {
    /// Receiver name.
    fn name(&self) -> &str;

    /// Runs the receive loop. Resolves only after `shutdown` or on a fatal
    /// transport error.
    fn start(&self) -> impl Future<Output = Result<(), CollectorError>> + Send;

    /// Signals the receive loop to exit and releases transport resources.
    fn shutdown(&self) -> impl Future<Output = Result<(), CollectorError>> + Send;
}

/// dyn-compatible [`Receiver`].
pub trait DynReceiver: Send + Sync {
    /// Receiver name.
    fn name(&self) -> &str;

    /// Runs the receive loop.
    fn start(&self) -> BoxFuture<'_, Result<(), CollectorError>>;

    /// Signals the receive loop to exit.
    fn shutdown(&self) -> BoxFuture<'_, Result<(), CollectorError>>;
}

impl<T: Receiver> DynReceiver for T {
    fn name(&self) -> &str {
        Receiver::name(self)
    }

    fn start(&self) -> BoxFuture<'_, Result<(), CollectorError>> {
        Box::pin(Receiver::start(self))
    }

    fn shutdown(&self) -> BoxFuture<'_, Result<(), CollectorError>> {
        Box::pin(Receiver::shutdown(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use parking_lot::Mutex;

    struct MockAnalyzer {
        events: Vec<String>,
        state: Mutex<ComponentState>,
        seen: Mutex<Vec<String>>,
    }

    impl MockAnalyzer {
        fn new() -> Self {
            Self {
                events: vec!["net_request".to_owned()],
                state: Mutex::new(ComponentState::Created),
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Analyzer for MockAnalyzer {
        fn name(&self) -> &str {
            "mock"
        }

        fn consumable_events(&self) -> &[String] {
            &self.events
        }

        fn state(&self) -> ComponentState {
            *self.state.lock()
        }

        async fn start(&self) -> Result<(), CollectorError> {
            *self.state.lock() = ComponentState::Running;
            Ok(())
        }

        fn consume_event(&self, event: &RawEvent) -> Result<(), CollectorError> {
            self.seen.lock().push(event.name.clone());
            Ok(())
        }

        async fn shutdown(&self) -> Result<(), CollectorError> {
            *self.state.lock() = ComponentState::Stopped;
            Ok(())
        }
    }

    #[test]
    fn health_status_predicates() {
        assert!(HealthStatus::Healthy.is_healthy());
        assert!(!HealthStatus::Degraded("x".to_owned()).is_healthy());
        assert!(HealthStatus::Unhealthy("x".to_owned()).is_unhealthy());
        assert!(!HealthStatus::Degraded("x".to_owned()).is_unhealthy());
    }

    #[test]
    fn component_state_display_and_health() {
        assert_eq!(ComponentState::Running.to_string(), "running");
        assert!(ComponentState::Running.health().is_healthy());
        assert!(ComponentState::Created.health().is_unhealthy());
        assert!(ComponentState::Failed.health().is_unhealthy());
    }

    #[tokio::test]
    async fn analyzer_is_usable_as_dyn() {
        let concrete = Arc::new(MockAnalyzer::new());
        let analyzer: Arc<dyn DynAnalyzer> = concrete.clone();

        assert_eq!(analyzer.name(), "mock");
        assert_eq!(analyzer.state(), ComponentState::Created);
        assert!(!analyzer.health().is_healthy());

        analyzer.start().await.unwrap();
        assert_eq!(analyzer.state(), ComponentState::Running);
        assert!(analyzer.health().is_healthy());

        analyzer
            .consume_event(&RawEvent::new("net_request", 1))
            .unwrap();
        assert_eq!(*concrete.seen.lock(), vec!["net_request".to_owned()]);

        analyzer.shutdown().await.unwrap();
        assert_eq!(analyzer.state(), ComponentState::Stopped);
    }
}
