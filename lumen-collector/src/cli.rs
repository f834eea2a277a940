//! CLI argument definitions for lumen-collector.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;
use lumen_core::config::CollectorConfig;

/// Lumen telemetry collector.
///
/// Receives low-level events, analyzes them, enriches the results with
/// cluster workload metadata and exports them.
#[derive(Parser, Debug)]
#[command(name = "lumen-collector")]
#[command(version, about, long_about = None)]
pub struct CollectorCli {
    /// Path to the lumen.toml configuration file.
    #[arg(short, long, default_value = "/etc/lumen/lumen.toml")]
    pub config: PathBuf,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate the configuration file and exit without starting.
    #[arg(long)]
    pub validate: bool,
}

impl CollectorCli {
    /// Applies the flag overrides on top of a loaded configuration.
    pub fn apply_overrides(&self, config: &mut CollectorConfig) {
        if let Some(level) = &self.log_level {
            config.general.log_level.clone_from(level);
        }
        if let Some(format) = &self.log_format {
            config.general.log_format.clone_from(format);
        }
    }
}
