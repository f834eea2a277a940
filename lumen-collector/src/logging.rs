//! Tracing setup for the collector process.
//!
//! Output format and level come from `[general]`. `RUST_LOG` replaces the
//! configured level entirely; otherwise the cluster client's own targets are
//! held at `warn`.

use std::str::FromStr;

use anyhow::{Context, Result};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry, fmt};

use lumen_core::config::GeneralConfig;

/// Targets capped at `warn` unless `RUST_LOG` says otherwise.
const QUIET_TARGETS: &[&str] = &["kube_client", "kube_runtime", "hyper_util", "tower"];

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// One flattened JSON object per line.
    Json,
    /// Multi-line, human-readable.
    Pretty,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "pretty" => Ok(Self::Pretty),
            other => Err(anyhow::anyhow!(
                "unknown log format '{}', expected 'json' or 'pretty'",
                other
            )),
        }
    }
}

/// Installs the global subscriber. Call once, before anything logs.
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let format: LogFormat = config.log_format.parse()?;
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(rust_log.as_deref(), &config.log_level)?;

    let output: Box<dyn Layer<Registry> + Send + Sync> = match format {
        LogFormat::Json => fmt::layer().json().flatten_event(true).boxed(),
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
    };

    tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize {:?} tracing subscriber: {}", format, e))
}

/// Builds the level filter. A non-empty `rust_log` wins over `level`.
fn build_filter(rust_log: Option<&str>, level: &str) -> Result<EnvFilter> {
    if let Some(directives) = rust_log.filter(|d| !d.trim().is_empty()) {
        return EnvFilter::try_new(directives)
            .with_context(|| format!("invalid {} '{}'", EnvFilter::DEFAULT_ENV, directives));
    }

    let mut filter =
        EnvFilter::try_new(level).with_context(|| format!("invalid log level '{}'", level))?;
    for target in QUIET_TARGETS {
        let directive: Directive = format!("{target}=warn")
            .parse()
            .with_context(|| format!("invalid quiet target '{}'", target))?;
        filter = filter.add_directive(directive);
    }
    Ok(filter)
}
