//! Prometheus scrape endpoint.
//!
//! `metrics-exporter-prometheus` serves the endpoint from its own listener;
//! this module resolves where it listens and installs the global recorder.
//! Every series carries a `service="lumen-collector"` label.

use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use lumen_core::config::MetricsConfig;
use metrics_exporter_prometheus::PrometheusBuilder;

/// The only path the exporter's listener serves.
pub const SCRAPE_PATH: &str = "/metrics";

const SERVICE_LABEL: (&str, &str) = ("service", "lumen-collector");

/// Installs the global recorder and starts the listener.
///
/// Once per process; a second call fails. Returns the bound address.
pub fn install_metrics_recorder(config: &MetricsConfig) -> Result<SocketAddr> {
    let addr = listen_addr(config)?;
    if addr.ip().is_unspecified() {
        tracing::warn!(listen_addr = %addr, "scrape endpoint reachable on every interface");
    }

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .add_global_label(SERVICE_LABEL.0, SERVICE_LABEL.1)
        .install()
        .map_err(|e| anyhow::anyhow!("failed to install metrics recorder on {}: {}", addr, e))?;
    lumen_core::metrics::describe_all();

    tracing::info!(listen_addr = %addr, path = SCRAPE_PATH, "scrape endpoint active");
    Ok(addr)
}

/// Resolves `[metrics]` to a socket address.
///
/// `listen_addr` is a bare IPv4 or IPv6 address; the port comes from `port`.
pub fn listen_addr(config: &MetricsConfig) -> Result<SocketAddr> {
    if config.endpoint != SCRAPE_PATH {
        return Err(anyhow::anyhow!(
            "unsupported metrics endpoint '{}': only '{}' is served",
            config.endpoint,
            SCRAPE_PATH
        ));
    }
    let ip: IpAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("invalid metrics listen address '{}'", config.listen_addr))?;
    Ok(SocketAddr::new(ip, config.port))
}
