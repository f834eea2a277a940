//! Application sequencing -- assembly, startup ordering and shutdown.
//!
//! The [`Application`] is the central coordinator of `lumen-collector`. It
//! registers the built-in components, binds their configuration sections,
//! builds the pipeline and drives its lifecycle.
//!
//! # Startup Order
//!
//! 1. Metadata watch (blocks until the initial listing is in the cache)
//! 2. Analyzers (`start_all`; any failure is fatal and started analyzers
//!    are shut down again)
//! 3. Receiver (events start flowing)
//!
//! # Shutdown Order (producers first)
//!
//! 1. Receiver (stop accepting events)
//! 2. Analyzers
//! 3. Metadata watch

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Result;
use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use lumen_analyzer::AnalyzerManager;
use lumen_core::config::CollectorConfig;
use lumen_core::error::{CollectorError, PipelineError};
use lumen_core::metrics as m;
use lumen_core::pipeline::{EventSink, HealthStatus};
use lumen_core::registry::ComponentRegistry;
use lumen_metadata::{
    KubeReplicaSetSource, MetadataError, WatchHandle, WatchSource, WorkloadCache, WorkloadWatcher,
};

use crate::components::register_builtins;
use crate::health::{CollectorHealth, ComponentHealth, METADATA_WATCH, aggregate_status};
use crate::metrics_server;
use crate::pipeline::Pipeline;

type ReceiverTask = JoinHandle<Result<(), CollectorError>>;

/// The assembled collector.
pub struct Application {
    /// Loaded and validated configuration.
    config: CollectorConfig,
    /// Registry the pipeline was built from, kept for introspection.
    registry: ComponentRegistry,
    /// Workload cache shared by every enrichment stage.
    cache: Arc<WorkloadCache>,
    pipeline: Pipeline,
    /// Running metadata watch, once synced.
    watch: Option<WatchHandle>,
    /// Running receive loop.
    receiver_task: Option<ReceiverTask>,
    /// Stops background tasks owned by the application.
    cancel: CancellationToken,
    start_time: Instant,
}

impl Application {
    /// Load configuration and build the application.
    ///
    /// Loads `lumen.toml`, applies environment overrides, validates, then
    /// continues as [`Application::build_from_config`].
    pub async fn build(config_path: &Path) -> Result<Self> {
        let config = CollectorConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config)
    }

    /// Build from an already-loaded configuration.
    ///
    /// Registers the built-in components, binds their sections and builds
    /// the pipeline. Nothing is started.
    ///
    /// # Errors
    ///
    /// - Configuration validation fails
    /// - A component section is missing or does not decode
    /// - A component fails to construct
    pub fn build_from_config(config: CollectorConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        if config.metrics.enabled {
            metrics_server::install_metrics_recorder(&config.metrics)?;
            tracing::info!(port = config.metrics.port, "metrics endpoint enabled");
        }

        let cache = Arc::new(WorkloadCache::new());
        let registry = bind_registry(&config, &cache)?;
        let pipeline = Pipeline::build(&registry)
            .map_err(|e| anyhow::anyhow!("failed to build pipeline: {}", e))?;

        tracing::info!(components = registry.count(), "collector initialized");
        if config.metrics.enabled {
            record_collector_metrics(registry.count());
        }

        Ok(Self {
            config,
            registry,
            cache,
            pipeline,
            watch: None,
            receiver_task: None,
            cancel: CancellationToken::new(),
            start_time: Instant::now(),
        })
    }

    /// Start the metadata watch on `source` and wait for its initial sync.
    ///
    /// Bounded by `metadata.sync_timeout_secs`. A timeout or a stream that
    /// ends before the initial listing completes is fatal.
    pub async fn start_metadata_watch<S: WatchSource>(&mut self, source: S) -> Result<()> {
        if self.start_metadata_watch_until(source, std::future::pending()).await? {
            Ok(())
        } else {
            Err(anyhow::anyhow!("metadata watch interrupted"))
        }
    }

    /// Like [`start_metadata_watch`](Self::start_metadata_watch), but stops
    /// waiting when `interrupt` resolves first.
    ///
    /// Returns `Ok(false)` when interrupted; the watch loop has been stopped
    /// and nothing else was started.
    pub async fn start_metadata_watch_until<S, F>(&mut self, source: S, interrupt: F) -> Result<bool>
    where
        S: WatchSource,
        F: Future<Output = ()>,
    {
        if self.watch.is_some() {
            return Err(anyhow::anyhow!("metadata watch already running"));
        }

        let watcher = WorkloadWatcher::new(
            Arc::clone(&self.cache),
            Duration::from_secs(self.config.metadata.sync_timeout_secs),
        );
        tracing::info!("waiting for initial metadata sync");
        match watcher.start_until(source, interrupt).await {
            Ok(handle) => {
                self.watch = Some(handle);
                Ok(true)
            }
            Err(MetadataError::Interrupted) => {
                tracing::info!("metadata sync abandoned, nothing started");
                Ok(false)
            }
            Err(e) => Err(anyhow::anyhow!(
                "metadata watch failed: {}",
                CollectorError::from(e)
            )),
        }
    }

    /// Start the analyzers, then the receive loop.
    ///
    /// If any analyzer fails to start, every analyzer is shut down again and
    /// the aggregated start error is returned. The receiver is not started
    /// in that case.
    pub async fn start(&mut self) -> Result<()> {
        if self.receiver_task.is_some() {
            return Err(PipelineError::AlreadyRunning.into());
        }

        tracing::info!("starting all analyzers");
        if let Err(e) = self.pipeline.manager.start_all().await {
            tracing::warn!("startup failed, shutting down analyzers");
            if let Err(stop_err) = self.pipeline.manager.shutdown_all().await {
                tracing::error!(
                    startup_error = %e,
                    rollback_error = %stop_err,
                    "rollback also failed during startup failure cleanup"
                );
            }
            return Err(anyhow::anyhow!("failed to start analyzers: {}", e));
        }

        let receiver = Arc::clone(&self.pipeline.receiver);
        tracing::info!(receiver = receiver.name(), "starting receiver");
        self.receiver_task = Some(tokio::spawn(async move { receiver.start().await }));
        Ok(())
    }

    /// Run the collector until SIGTERM/SIGINT or until the receiver exits.
    ///
    /// Starts the cluster metadata watch first when `metadata.enabled`. The
    /// signal handlers are installed before anything else, so a signal
    /// during the initial sync ends the run cleanly.
    pub async fn run(&mut self) -> Result<()> {
        let mut signals = ShutdownSignals::install()?;

        if self.config.metadata.enabled {
            let source = KubeReplicaSetSource::try_default(
                &self.config.metadata.namespace,
                &self.config.metadata.label_selector,
            )
            .await
            .map_err(|e| anyhow::anyhow!("failed to create cluster client: {}", e))?;
            if !self
                .start_metadata_watch_until(source, signals.wait())
                .await?
            {
                return Ok(());
            }
        } else {
            tracing::info!("metadata watch disabled, groups are exported without workload labels");
        }

        self.serve(signals.wait()).await
    }

    /// Start, run until `shutdown` resolves or the receiver exits, then shut
    /// down.
    ///
    /// A metadata watch started beforehand is stopped on every path. Errors
    /// during shutdown are logged and never returned; a receiver that exits
    /// with an error is.
    pub async fn serve<F>(&mut self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        if let Err(e) = self.start().await {
            self.stop_watch().await;
            return Err(e);
        }

        let uptime_task = self
            .config
            .metrics
            .enabled
            .then(|| spawn_uptime_updater(self.start_time, self.cancel.child_token()));

        let Some(mut task) = self.receiver_task.take() else {
            return Err(anyhow::anyhow!("receiver task missing after start"));
        };

        tracing::info!("collector running");
        let receiver_exit = tokio::select! {
            () = shutdown => None,
            joined = &mut task => Some(joined),
        };

        let outcome = match receiver_exit {
            None => {
                self.receiver_task = Some(task);
                Ok(())
            }
            Some(Ok(Ok(()))) => {
                tracing::warn!("receiver stopped");
                Ok(())
            }
            Some(Ok(Err(e))) => {
                tracing::error!(error = %e, "receiver failed");
                Err(anyhow::anyhow!("receiver failed: {}", e))
            }
            Some(Err(e)) => Err(anyhow::anyhow!("receiver task aborted: {}", e)),
        };

        self.cancel.cancel();
        if let Some(task) = uptime_task {
            let _ = task.await;
        }

        if let Err(e) = self.shutdown().await {
            tracing::error!(error = %e, "shutdown completed with errors");
        }
        outcome
    }

    /// Stop the receiver, then the analyzers, then the metadata watch.
    ///
    /// Every step runs even if an earlier one fails; failures are combined
    /// into one [`PipelineError::ShutdownFailed`]. Safe to call repeatedly.
    pub async fn shutdown(&mut self) -> Result<(), CollectorError> {
        let mut failures = Vec::new();
        let receiver = Arc::clone(&self.pipeline.receiver);

        tracing::info!("stopping receiver");
        if let Err(e) = receiver.shutdown().await {
            failures.push(format!("{}: {}", receiver.name(), e));
        }
        if let Some(task) = self.receiver_task.take() {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => failures.push(format!("{}: {}", receiver.name(), e)),
                Err(e) => failures.push(format!("{}: task aborted: {}", receiver.name(), e)),
            }
        }

        tracing::info!("stopping all analyzers");
        if let Err(e) = self.pipeline.manager.shutdown_all().await {
            failures.push(e.to_string());
        }

        self.stop_watch().await;

        if failures.is_empty() {
            tracing::info!("collector stopped");
            Ok(())
        } else {
            Err(PipelineError::ShutdownFailed(failures.join("; ")).into())
        }
    }

    async fn stop_watch(&mut self) {
        if let Some(watch) = self.watch.take() {
            tracing::info!("stopping metadata watch");
            watch.stop().await;
        }
    }

    /// Get the current aggregated health status.
    pub fn health(&self) -> CollectorHealth {
        let mut components: Vec<ComponentHealth> = self
            .pipeline
            .manager
            .health_statuses()
            .into_iter()
            .map(|(name, _state, status)| ComponentHealth::enabled(name, status))
            .collect();

        let receiver_status = match &self.receiver_task {
            None => HealthStatus::Unhealthy("not running".to_owned()),
            Some(task) if task.is_finished() => {
                HealthStatus::Unhealthy("receive loop exited".to_owned())
            }
            Some(_) => HealthStatus::Healthy,
        };
        components.push(ComponentHealth::enabled(
            self.pipeline.receiver.name(),
            receiver_status,
        ));

        if self.config.metadata.enabled {
            let watch_status = match &self.watch {
                None => HealthStatus::Unhealthy("not synced".to_owned()),
                Some(watch) if watch.is_finished() => {
                    HealthStatus::Unhealthy("watch stopped".to_owned())
                }
                Some(_) => HealthStatus::Healthy,
            };
            components.push(ComponentHealth::enabled(METADATA_WATCH, watch_status));
        } else {
            components.push(ComponentHealth::disabled(METADATA_WATCH));
        }

        let uptime_secs = self.start_time.elapsed().as_secs();
        if self.config.metrics.enabled {
            #[allow(clippy::cast_precision_loss)]
            metrics::gauge!(m::COLLECTOR_UPTIME_SECONDS).set(uptime_secs as f64);
        }

        CollectorHealth {
            status: aggregate_status(&components),
            uptime_secs,
            components,
        }
    }

    /// The event sink receivers deliver into.
    pub fn event_sink(&self) -> Arc<dyn EventSink> {
        Arc::clone(&self.pipeline.manager) as Arc<dyn EventSink>
    }

    /// The analyzer manager.
    pub fn manager(&self) -> &Arc<AnalyzerManager> {
        &self.pipeline.manager
    }

    /// The shared workload cache.
    pub fn cache(&self) -> &Arc<WorkloadCache> {
        &self.cache
    }

    /// The registry the pipeline was built from.
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// The loaded configuration.
    pub fn config(&self) -> &CollectorConfig {
        &self.config
    }
}

/// Check a configuration without building or starting anything.
///
/// Validates the collector's own sections and binds every built-in
/// component's section, as startup would.
pub fn check_config(config: &CollectorConfig) -> Result<()> {
    config
        .validate()
        .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;
    bind_registry(config, &Arc::new(WorkloadCache::new()))?;
    Ok(())
}

fn bind_registry(config: &CollectorConfig, cache: &Arc<WorkloadCache>) -> Result<ComponentRegistry> {
    let mut registry = ComponentRegistry::new();
    register_builtins(&mut registry, cache)
        .map_err(|e| anyhow::anyhow!("failed to register components: {}", e))?;
    registry
        .bind_configurations(config)
        .map_err(|e| anyhow::anyhow!("failed to bind component configuration: {}", e))?;
    Ok(registry)
}

/// SIGTERM and SIGINT listeners, installed once for the whole run.
struct ShutdownSignals {
    sigterm: Signal,
    sigint: Signal,
}

impl ShutdownSignals {
    fn install() -> Result<Self> {
        let sigterm = signal(SignalKind::terminate())
            .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
        let sigint = signal(SignalKind::interrupt())
            .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;
        Ok(Self { sigterm, sigint })
    }

    /// Resolves on the next SIGTERM or SIGINT.
    async fn wait(&mut self) {
        let signal = tokio::select! {
            _ = self.sigterm.recv() => "SIGTERM",
            _ = self.sigint.recv() => "SIGINT",
        };
        tracing::info!(signal, "shutdown signal received");
    }
}

/// Record collector-level metrics (build info, registered components).
fn record_collector_metrics(component_count: usize) {
    metrics::gauge!(m::COLLECTOR_BUILD_INFO, "version" => env!("CARGO_PKG_VERSION")).set(1.0);

    #[allow(clippy::cast_precision_loss)]
    metrics::gauge!(m::COLLECTOR_COMPONENTS_REGISTERED).set(component_count as f64);

    tracing::debug!(
        component_count,
        version = env!("CARGO_PKG_VERSION"),
        "collector metrics recorded"
    );
}

/// Spawn a background task that refreshes the uptime gauge every 10 seconds.
fn spawn_uptime_updater(start_time: Instant, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(10));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    #[allow(clippy::cast_precision_loss)]
                    metrics::gauge!(m::COLLECTOR_UPTIME_SECONDS)
                        .set(start_time.elapsed().as_secs() as f64);
                }
                _ = cancel.cancelled() => {
                    tracing::debug!("uptime updater shutting down");
                    break;
                }
            }
        }
    })
}
