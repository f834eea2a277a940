//! Shared foundation of the lumen collector.
//!
//! - [`event`]: raw events and metric groups
//! - [`pipeline`]: stage traits every component implements
//! - [`registry`]: component registration, config binding and construction
//! - [`config`]: the TOML configuration document
//! - [`error`]: per-domain error enums
//! - [`metrics`]: metric names

pub mod config;
pub mod error;
pub mod event;
pub mod metrics;
pub mod pipeline;
pub mod registry;

// Errors
pub use error::{ClusterError, CollectorError, ConfigError, PipelineError, RegistryError};

// Configuration
pub use config::{CollectorConfig, GeneralConfig, MetadataConfig, MetricsConfig};

// Events
pub use event::{MetricGroup, RawEvent};

// Stage traits
pub use pipeline::{
    Analyzer, BoxFuture, ComponentState, Consumer, DynAnalyzer, DynReceiver, EventSink,
    HealthStatus, Receiver,
};

// Registry
pub use registry::{ComponentConfig, ComponentKind, ComponentRegistry};
