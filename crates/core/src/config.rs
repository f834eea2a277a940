//! Configuration: `lumen.toml` parsing and runtime settings.
//!
//! [`CollectorConfig`] holds the sections the collector itself reads
//! (`[general]`, `[metrics]`, `[metadata]`) plus the raw component groups
//! (`[receivers.*]`, `[analyzers.*]`, `[processors.*]`, `[exporters.*]`).
//! Component sections stay untyped here; the
//! [`ComponentRegistry`](crate::registry::ComponentRegistry) decodes each one
//! into the configuration type its component registered.
//!
//! # Precedence
//! 1. CLI flags
//! 2. Environment variables (`LUMEN_METADATA_NAMESPACE=prod`)
//! 3. Config file
//! 4. `Default` impls
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), lumen_core::error::CollectorError> {
//! use lumen_core::config::CollectorConfig;
//!
//! let config = CollectorConfig::load("lumen.toml").await?;
//! let config = CollectorConfig::parse("[general]\nlog_level = \"debug\"")?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{CollectorError, ConfigError};
use crate::registry::ComponentKind;

/// Whole configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollectorConfig {
    /// Logging settings.
    #[serde(default)]
    pub general: GeneralConfig,
    /// Prometheus endpoint settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
    /// Cluster metadata watch settings.
    #[serde(default)]
    pub metadata: MetadataConfig,
    /// `[receivers.<id>]` sections.
    #[serde(default)]
    pub receivers: toml::Table,
    /// `[analyzers.<id>]` sections.
    #[serde(default)]
    pub analyzers: toml::Table,
    /// `[processors.<id>]` sections.
    #[serde(default)]
    pub processors: toml::Table,
    /// `[exporters.<id>]` sections.
    #[serde(default)]
    pub exporters: toml::Table,
}

impl CollectorConfig {
    /// Loads a file, applies environment overrides and validates.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, CollectorError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Loads a file without environment overrides.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, CollectorError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CollectorError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                CollectorError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// Parses a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, CollectorError> {
        toml::from_str(toml_str).map_err(|e| {
            CollectorError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Component sections of one kind.
    pub fn component_sections(&self, kind: ComponentKind) -> &toml::Table {
        match kind {
            ComponentKind::Receiver => &self.receivers,
            ComponentKind::Analyzer => &self.analyzers,
            ComponentKind::Processor => &self.processors,
            ComponentKind::Exporter => &self.exporters,
        }
    }

    /// Overrides settings from environment variables.
    ///
    /// Naming: `LUMEN_{SECTION}_{FIELD}`, e.g. `LUMEN_GENERAL_LOG_LEVEL=debug`.
    /// Component sections are not overridable.
    pub fn apply_env_overrides(&mut self) {
        override_string(&mut self.general.log_level, "LUMEN_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "LUMEN_GENERAL_LOG_FORMAT");

        override_bool(&mut self.metrics.enabled, "LUMEN_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "LUMEN_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "LUMEN_METRICS_PORT");

        override_bool(&mut self.metadata.enabled, "LUMEN_METADATA_ENABLED");
        override_string(&mut self.metadata.namespace, "LUMEN_METADATA_NAMESPACE");
        override_string(
            &mut self.metadata.label_selector,
            "LUMEN_METADATA_LABEL_SELECTOR",
        );
        override_u64(
            &mut self.metadata.sync_timeout_secs,
            "LUMEN_METADATA_SYNC_TIMEOUT_SECS",
        );
    }

    /// Validates the collector's own sections.
    ///
    /// Component sections are checked when they are bound.
    pub fn validate(&self) -> Result<(), CollectorError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            }
            .into());
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            }
            .into());
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "metrics.port".to_owned(),
                reason: "port must be non-zero when metrics are enabled".to_owned(),
            }
            .into());
        }

        if self.metadata.enabled && self.metadata.sync_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "metadata.sync_timeout_secs".to_owned(),
                reason: "sync timeout must be at least one second".to_owned(),
            }
            .into());
        }

        Ok(())
    }
}

/// `[general]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// trace, debug, info, warn, error
    pub log_level: String,
    /// json, pretty
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// `[metrics]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Expose the Prometheus endpoint.
    pub enabled: bool,
    /// Listen address.
    pub listen_addr: String,
    /// Listen port.
    pub port: u16,
    /// Scrape path. Only `/metrics` is served.
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9500,
            endpoint: "/metrics".to_owned(),
        }
    }
}

/// `[metadata]`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataConfig {
    /// Watch the cluster for workload ownership.
    pub enabled: bool,
    /// Namespace to watch. Empty means all namespaces.
    pub namespace: String,
    /// Label selector for watched replica objects. Empty means all.
    pub label_selector: String,
    /// Upper bound on the initial listing before startup fails.
    pub sync_timeout_secs: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            namespace: String::new(),
            label_selector: String::new(),
            sync_timeout_secs: 60,
        }
    }
}

// --- environment override helpers ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_sane_values() {
        let config = CollectorConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.general.log_format, "json");
        assert!(!config.metrics.enabled);
        assert!(config.metadata.enabled);
        assert_eq!(config.metadata.sync_timeout_secs, 60);
        assert!(config.analyzers.is_empty());
    }

    #[test]
    fn default_config_passes_validation() {
        CollectorConfig::default().validate().unwrap();
    }

    #[test]
    fn parse_empty_toml_uses_defaults() {
        let config = CollectorConfig::parse("").unwrap();
        assert_eq!(config.general.log_level, "info");
        assert!(config.receivers.is_empty());
    }

    #[test]
    fn parse_keeps_component_sections_untyped() {
        let toml = r#"
[general]
log_level = "debug"

[metadata]
enabled = false

[analyzers.network]
slow_threshold_ms = 250

[analyzers.tcpmetric]

[exporters.stdout]
format = "text"
"#;
        let config = CollectorConfig::parse(toml).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.log_format, "json");
        assert!(!config.metadata.enabled);

        let analyzers = config.component_sections(ComponentKind::Analyzer);
        assert_eq!(analyzers.len(), 2);
        assert_eq!(
            analyzers["network"]["slow_threshold_ms"].as_integer(),
            Some(250)
        );
        assert!(analyzers["tcpmetric"].as_table().unwrap().is_empty());
        assert_eq!(
            config.component_sections(ComponentKind::Exporter)["stdout"]["format"].as_str(),
            Some("text")
        );
        assert!(config.component_sections(ComponentKind::Processor).is_empty());
    }

    #[test]
    fn parse_invalid_toml_returns_error() {
        let err = CollectorConfig::parse("invalid = [[[toml").unwrap_err();
        assert!(matches!(
            err,
            CollectorError::Config(ConfigError::ParseFailed { .. })
        ));
    }

    #[test]
    fn validate_rejects_invalid_log_level() {
        let mut config = CollectorConfig::default();
        config.general.log_level = "verbose".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_level"));
    }

    #[test]
    fn validate_rejects_invalid_log_format() {
        let mut config = CollectorConfig::default();
        config.general.log_format = "xml".to_owned();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log_format"));
    }

    #[test]
    fn validate_rejects_zero_sync_timeout_when_enabled() {
        let mut config = CollectorConfig::default();
        config.metadata.sync_timeout_secs = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sync_timeout_secs"));

        config.metadata.enabled = false;
        config.validate().unwrap();
    }

    #[test]
    fn validate_rejects_zero_metrics_port_when_enabled() {
        let mut config = CollectorConfig::default();
        config.metrics.enabled = true;
        config.metrics.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn env_override_string() {
        let mut val = "original".to_owned();
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("TEST_LUMEN_STR", "overridden") };
        override_string(&mut val, "TEST_LUMEN_STR");
        assert_eq!(val, "overridden");
        unsafe { std::env::remove_var("TEST_LUMEN_STR") };
    }

    #[test]
    fn env_override_bool_invalid_keeps_original() {
        let mut val = false;
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("TEST_LUMEN_BOOL_BAD", "not-a-bool") };
        override_bool(&mut val, "TEST_LUMEN_BOOL_BAD");
        assert!(!val);
        unsafe { std::env::remove_var("TEST_LUMEN_BOOL_BAD") };
    }

    #[test]
    fn env_override_u64_valid() {
        let mut val = 60;
        // SAFETY: the variable name is unique to this test.
        unsafe { std::env::set_var("TEST_LUMEN_U64", "5") };
        override_u64(&mut val, "TEST_LUMEN_U64");
        assert_eq!(val, 5);
        unsafe { std::env::remove_var("TEST_LUMEN_U64") };
    }

    #[test]
    fn env_override_missing_var_keeps_original() {
        let mut val = 9500u16;
        override_u16(&mut val, "TEST_LUMEN_NONEXISTENT_12345");
        assert_eq!(val, 9500);
    }

    #[test]
    fn config_serialize_roundtrip() {
        let mut config = CollectorConfig::default();
        config.metadata.namespace = "prod".to_owned();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed = CollectorConfig::parse(&toml_str).unwrap();
        assert_eq!(parsed.metadata.namespace, "prod");
        assert_eq!(parsed.metrics.port, config.metrics.port);
    }

    #[tokio::test]
    async fn from_file_not_found() {
        let err = CollectorConfig::from_file("/nonexistent/path/lumen.toml")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            CollectorError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[tokio::test]
    async fn from_file_reads_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lumen.toml");
        std::fs::write(&path, "[metadata]\nnamespace = \"ns1\"\n").unwrap();

        let config = CollectorConfig::from_file(&path).await.unwrap();
        assert_eq!(config.metadata.namespace, "ns1");
    }
}
