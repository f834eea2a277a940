//! `lumen.toml` integration tests
//!
//! - the shipped example parses and validates
//! - partial documents fall back to defaults
//! - component sections bind through the registry
//! - environment overrides and error cases

use std::sync::Arc;

use lumen_core::config::CollectorConfig;
use lumen_core::error::{CollectorError, ConfigError};
use lumen_core::event::MetricGroup;
use lumen_core::pipeline::Consumer;
use lumen_core::registry::{ComponentKind, ComponentRegistry};
use serde::Deserialize;

const EXAMPLE: &str = include_str!("../../../lumen.toml.example");

// =============================================================================
// lumen.toml.example
// =============================================================================

#[test]
fn example_config_parses_successfully() {
    let config = CollectorConfig::parse(EXAMPLE).expect("example config should parse");

    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.general.log_format, "json");
    assert!(!config.metrics.enabled);
    assert!(config.metadata.enabled);
    assert_eq!(config.metadata.sync_timeout_secs, 60);
}

#[test]
fn example_config_passes_validation() {
    let config = CollectorConfig::parse(EXAMPLE).expect("should parse");
    config
        .validate()
        .expect("example config should pass validation");
}

#[test]
fn example_config_has_every_builtin_section() {
    let config = CollectorConfig::parse(EXAMPLE).expect("should parse");

    let ids = |kind| {
        config
            .component_sections(kind)
            .keys()
            .cloned()
            .collect::<Vec<_>>()
    };
    assert_eq!(ids(ComponentKind::Receiver), vec!["uds"]);
    assert_eq!(ids(ComponentKind::Analyzer), vec!["network", "tcpmetric", "uprobe"]);
    assert_eq!(
        ids(ComponentKind::Processor),
        vec!["k8smetadata", "nodemetric", "relabel"]
    );
    assert_eq!(ids(ComponentKind::Exporter), vec!["stdout"]);
}

// =============================================================================
// Partial documents
// =============================================================================

#[test]
fn empty_document_uses_defaults() {
    let config = CollectorConfig::parse("").expect("empty document should parse");
    assert_eq!(config.general.log_level, "info");
    assert_eq!(config.metrics.port, 9500);
    assert!(config.receivers.is_empty());
    config.validate().expect("defaults should validate");
}

#[test]
fn only_metadata_section() {
    let config = CollectorConfig::parse(
        r#"
[metadata]
namespace = "prod"
"#,
    )
    .expect("should parse");
    assert_eq!(config.metadata.namespace, "prod");
    assert!(config.metadata.enabled);
    assert_eq!(config.general.log_format, "json");
}

// =============================================================================
// Registry binding
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RelabelConfig {
    prefix: String,
    drop_labels: Vec<String>,
}

struct Noop;

impl Consumer for Noop {
    fn consume(&self, _group: MetricGroup) -> Result<(), CollectorError> {
        Ok(())
    }
}

#[test]
fn example_section_binds_into_registered_config() {
    let config = CollectorConfig::parse(EXAMPLE).expect("should parse");
    let mut registry = ComponentRegistry::new();
    registry
        .register_processor(
            "relabel",
            |_: &RelabelConfig, next: Arc<dyn Consumer>| Ok(next),
            RelabelConfig::default(),
        )
        .expect("register");

    registry.bind_configurations(&config).expect("bind");

    let bound = registry
        .config::<RelabelConfig>(ComponentKind::Processor, "relabel")
        .expect("bound config");
    assert_eq!(bound.prefix, "lumen_");
    assert!(bound.drop_labels.is_empty());

    let built = registry
        .build_processor("relabel", Arc::new(Noop))
        .expect("build");
    built.consume(MetricGroup::new("g", 0)).expect("consume");
}

#[test]
fn registered_component_without_section_fails_binding() {
    let config = CollectorConfig::parse("[processors.other]\n").expect("should parse");
    let mut registry = ComponentRegistry::new();
    registry
        .register_processor(
            "relabel",
            |_: &RelabelConfig, next: Arc<dyn Consumer>| Ok(next),
            RelabelConfig::default(),
        )
        .expect("register");

    let err = registry.bind_configurations(&config).unwrap_err();
    match err {
        ConfigError::MissingSection { section } => assert_eq!(section, "processors.relabel"),
        other => panic!("expected MissingSection, got {other}"),
    }
}

// =============================================================================
// Errors
// =============================================================================

#[test]
fn invalid_toml_is_parse_error() {
    let err = CollectorConfig::parse("[general\nlog_level = ").unwrap_err();
    assert!(matches!(
        err,
        CollectorError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn invalid_log_format_fails_validation() {
    let config = CollectorConfig::parse("[general]\nlog_format = \"xml\"\n").expect("should parse");
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("general.log_format"));
}

#[tokio::test]
async fn load_reads_file_from_disk() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("lumen.toml");
    std::fs::write(&path, EXAMPLE).expect("write");

    let config = CollectorConfig::from_file(&path).await.expect("load");
    assert_eq!(config.component_sections(ComponentKind::Analyzer).len(), 2);
}

#[tokio::test]
async fn load_missing_file_is_not_found() {
    let err = CollectorConfig::from_file("/nonexistent/lumen.toml")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        CollectorError::Config(ConfigError::FileNotFound { .. })
    ));
}
