//! Analyzer manager lifecycle and routing tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use lumen_analyzer::{AnalyzerManager, NetworkAnalyzer, NetworkAnalyzerConfig};
use lumen_core::error::{CollectorError, PipelineError};
use lumen_core::event::{MetricGroup, RawEvent};
use lumen_core::pipeline::{
    Analyzer, ComponentState, Consumer, DynAnalyzer, EventSink, HealthStatus,
};
use parking_lot::Mutex;

/// Test analyzer with scripted start/shutdown outcomes.
struct Scripted {
    name: String,
    events: Vec<String>,
    fail_start: bool,
    fail_consume: bool,
    state: Mutex<ComponentState>,
    consumed: AtomicUsize,
    released: AtomicUsize,
}

impl Scripted {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            events: vec!["net_request".to_owned()],
            fail_start: false,
            fail_consume: false,
            state: Mutex::new(ComponentState::Created),
            consumed: AtomicUsize::new(0),
            released: AtomicUsize::new(0),
        }
    }

    fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    fn failing_consume(mut self) -> Self {
        self.fail_consume = true;
        self
    }

    fn events(mut self, events: &[&str]) -> Self {
        self.events = events.iter().map(|e| (*e).to_owned()).collect();
        self
    }
}

impl Analyzer for Scripted {
    fn name(&self) -> &str {
        &self.name
    }

    fn consumable_events(&self) -> &[String] {
        &self.events
    }

    fn state(&self) -> ComponentState {
        *self.state.lock()
    }

    async fn start(&self) -> Result<(), CollectorError> {
        if self.fail_start {
            *self.state.lock() = ComponentState::Failed;
            return Err(PipelineError::InitFailed(format!("{} cannot attach probe", self.name)).into());
        }
        *self.state.lock() = ComponentState::Running;
        Ok(())
    }

    fn consume_event(&self, _event: &RawEvent) -> Result<(), CollectorError> {
        self.consumed.fetch_add(1, Ordering::SeqCst);
        if self.fail_consume {
            return Err(PipelineError::ConsumeFailed {
                stage: self.name.clone(),
                reason: "bad payload".to_owned(),
            }
            .into());
        }
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), CollectorError> {
        let mut state = self.state.lock();
        if *state == ComponentState::Running {
            // resources are released exactly once
            self.released.fetch_add(1, Ordering::SeqCst);
        }
        *state = ComponentState::Stopped;
        Ok(())
    }
}

fn manager_of(analyzers: Vec<Arc<Scripted>>) -> AnalyzerManager {
    let dyns: Vec<Arc<dyn DynAnalyzer>> = analyzers
        .into_iter()
        .map(|a| a as Arc<dyn DynAnalyzer>)
        .collect();
    AnalyzerManager::new(dyns).expect("unique names")
}

// =============================================================================
// start_all
// =============================================================================

#[tokio::test]
async fn start_all_is_best_effort() {
    let a = Arc::new(Scripted::new("a"));
    let b = Arc::new(Scripted::new("b").failing_start());
    let c = Arc::new(Scripted::new("c"));
    let d = Arc::new(Scripted::new("d"));
    let manager = manager_of(vec![a.clone(), b.clone(), c.clone(), d.clone()]);

    let err = manager.start_all().await.unwrap_err();

    let message = err.to_string();
    assert!(matches!(
        err,
        CollectorError::Pipeline(PipelineError::StartFailed(_))
    ));
    assert!(message.contains("b: "), "{message}");
    assert!(message.contains("cannot attach probe"), "{message}");
    assert!(!message.contains("a: "), "{message}");

    for started in [&a, &c, &d] {
        assert_eq!(Analyzer::state(&**started), ComponentState::Running);
    }
    assert_eq!(Analyzer::state(&*b), ComponentState::Failed);
}

#[tokio::test]
async fn start_all_reports_every_failure() {
    let manager = manager_of(vec![
        Arc::new(Scripted::new("x").failing_start()),
        Arc::new(Scripted::new("y")),
        Arc::new(Scripted::new("z").failing_start()),
    ]);

    let message = manager.start_all().await.unwrap_err().to_string();
    assert!(message.contains("x: "));
    assert!(message.contains("z: "));
    assert!(!message.contains("y: "));
}

#[tokio::test]
async fn start_all_with_no_analyzers_succeeds() {
    let manager = AnalyzerManager::new(Vec::new()).unwrap();
    manager.start_all().await.unwrap();
    manager.shutdown_all().await.unwrap();
}

#[tokio::test]
async fn misconfigured_builtin_reports_failed_to_start() {
    let network = Arc::new(NetworkAnalyzer::new(
        NetworkAnalyzerConfig {
            slow_threshold_ms: -1,
            ..Default::default()
        },
        Vec::new(),
    ));
    let manager = AnalyzerManager::new(vec![network as Arc<dyn DynAnalyzer>]).unwrap();

    let err = manager.start_all().await.unwrap_err();
    assert!(err.to_string().contains("network: "), "{err}");

    let (name, state, health) = &manager.health_statuses()[0];
    assert_eq!(name, "network");
    assert_eq!(*state, ComponentState::Failed);
    assert_eq!(*health, HealthStatus::Unhealthy("failed to start".to_owned()));

    manager.shutdown_all().await.unwrap();
    assert_eq!(manager.health_statuses()[0].1, ComponentState::Failed);
}

// =============================================================================
// shutdown_all
// =============================================================================

#[tokio::test]
async fn shutdown_all_twice_is_safe() {
    let a = Arc::new(Scripted::new("a"));
    let b = Arc::new(Scripted::new("b"));
    let manager = manager_of(vec![a.clone(), b.clone()]);
    manager.start_all().await.unwrap();

    manager.shutdown_all().await.unwrap();
    manager.shutdown_all().await.unwrap();

    assert_eq!(a.released.load(Ordering::SeqCst), 1);
    assert_eq!(b.released.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn shutdown_all_after_partial_start() {
    let a = Arc::new(Scripted::new("a"));
    let b = Arc::new(Scripted::new("b").failing_start());
    let manager = manager_of(vec![a.clone(), b.clone()]);
    let _ = manager.start_all().await;

    manager.shutdown_all().await.unwrap();

    assert_eq!(Analyzer::state(&*a), ComponentState::Stopped);
    assert_eq!(a.released.load(Ordering::SeqCst), 1);
    assert_eq!(b.released.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn shutdown_all_without_start() {
    let a = Arc::new(Scripted::new("a"));
    let manager = manager_of(vec![a.clone()]);
    manager.shutdown_all().await.unwrap();
    assert_eq!(a.released.load(Ordering::SeqCst), 0);
}

// =============================================================================
// dispatch
// =============================================================================

#[tokio::test]
async fn dispatch_routes_by_event_name() {
    let net = Arc::new(Scripted::new("net").events(&["net_request"]));
    let tcp = Arc::new(Scripted::new("tcp").events(&["tcp_drop", "tcp_rtt"]));
    let manager = manager_of(vec![net.clone(), tcp.clone()]);

    manager.dispatch(RawEvent::new("net_request", 1)).unwrap();
    manager.dispatch(RawEvent::new("tcp_rtt", 2)).unwrap();
    manager.dispatch(RawEvent::new("tcp_drop", 3)).unwrap();

    assert_eq!(net.consumed.load(Ordering::SeqCst), 1);
    assert_eq!(tcp.consumed.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn unrouted_events_are_dropped() {
    let net = Arc::new(Scripted::new("net"));
    let manager = manager_of(vec![net.clone()]);

    manager.dispatch(RawEvent::new("dns_query", 1)).unwrap();
    assert_eq!(net.consumed.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn failing_analyzer_does_not_block_siblings() {
    let bad = Arc::new(Scripted::new("bad").failing_consume());
    let good = Arc::new(Scripted::new("good"));
    let manager = manager_of(vec![bad.clone(), good.clone()]);

    manager.dispatch(RawEvent::new("net_request", 1)).unwrap();

    assert_eq!(bad.consumed.load(Ordering::SeqCst), 1);
    assert_eq!(good.consumed.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Built-in analyzer through the manager
// =============================================================================

#[derive(Default)]
struct Collect(Mutex<Vec<MetricGroup>>);

impl Consumer for Collect {
    fn consume(&self, group: MetricGroup) -> Result<(), CollectorError> {
        self.0.lock().push(group);
        Ok(())
    }
}

#[tokio::test]
async fn network_analyzer_fans_out_to_every_branch() {
    let left = Arc::new(Collect::default());
    let right = Arc::new(Collect::default());
    let network = NetworkAnalyzer::new(
        NetworkAnalyzerConfig::default(),
        vec![left.clone() as Arc<dyn Consumer>, right.clone()],
    );
    let analyzers: Vec<Arc<dyn DynAnalyzer>> = vec![Arc::new(network)];
    let manager = AnalyzerManager::new(analyzers).unwrap();
    manager.start_all().await.unwrap();

    manager
        .dispatch(RawEvent::new("net_request", 5).with_metric("latency_ms", 900))
        .unwrap();

    assert_eq!(left.0.lock().len(), 1);
    assert_eq!(right.0.lock().len(), 1);
    assert_eq!(left.0.lock()[0].label("is_slow"), Some("true"));
    assert!(manager.get("network").unwrap().health().is_healthy());

    manager.shutdown_all().await.unwrap();
    assert_eq!(
        manager.get("network").unwrap().state(),
        ComponentState::Stopped
    );
}
