//! Aggregated health reporting.
//!
//! Collects the health of every analyzer, the receiver and the metadata
//! watch into one [`CollectorHealth`] report. The overall status is the
//! worst status among enabled components.
//!
//! # Aggregation Rule
//!
//! - All Healthy -> Healthy
//! - Any Degraded, none Unhealthy -> Degraded(reason)
//! - Any Unhealthy -> Unhealthy(reason)

use serde::Serialize;

use lumen_core::pipeline::HealthStatus;

/// Name under which the metadata watch reports.
pub const METADATA_WATCH: &str = "metadata-watch";

/// Aggregated health report for the whole collector.
#[derive(Debug, Clone, Serialize)]
pub struct CollectorHealth {
    /// Overall status (worst of all enabled components).
    pub status: HealthStatus,
    /// Seconds since the collector was built.
    pub uptime_secs: u64,
    /// Per-component reports.
    pub components: Vec<ComponentHealth>,
}

/// Health of a single component.
#[derive(Debug, Clone, Serialize)]
pub struct ComponentHealth {
    /// Component name (e.g. `network`, `uds`, `metadata-watch`).
    pub name: String,
    /// Whether the component is enabled in configuration.
    pub enabled: bool,
    /// Current status.
    pub status: HealthStatus,
}

impl ComponentHealth {
    /// An enabled component with the given status.
    pub fn enabled(name: impl Into<String>, status: HealthStatus) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            status,
        }
    }

    /// A disabled component. Never affects the overall status.
    pub fn disabled(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: false,
            status: HealthStatus::Healthy,
        }
    }
}

/// Aggregate component statuses into a single status.
///
/// Returns the worst status found: Unhealthy > Degraded > Healthy. Reasons
/// of every non-healthy component at the worst level are joined with `"; "`.
pub fn aggregate_status(components: &[ComponentHealth]) -> HealthStatus {
    let mut worst = HealthStatus::Healthy;
    let mut reasons = Vec::new();

    for component in components.iter().filter(|c| c.enabled) {
        match &component.status {
            HealthStatus::Healthy => {}
            HealthStatus::Degraded(reason) => {
                if !worst.is_unhealthy() {
                    reasons.push(format!("{}: {}", component.name, reason));
                    worst = HealthStatus::Degraded(String::new());
                }
            }
            HealthStatus::Unhealthy(reason) => {
                if !worst.is_unhealthy() {
                    reasons.clear();
                }
                reasons.push(format!("{}: {}", component.name, reason));
                worst = HealthStatus::Unhealthy(String::new());
            }
        }
    }

    match worst {
        HealthStatus::Healthy => HealthStatus::Healthy,
        HealthStatus::Degraded(_) => HealthStatus::Degraded(reasons.join("; ")),
        HealthStatus::Unhealthy(_) => HealthStatus::Unhealthy(reasons.join("; ")),
    }
}
