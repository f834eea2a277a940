//! Component registry: construction functions and bound configurations.
//!
//! The application registers every component it knows about once at startup.
//! [`ComponentRegistry::bind_configurations`] then decodes each component's
//! `[<group>.<id>]` section into the configuration value registered with it,
//! and the pipeline builder asks the registry to construct instances.
//!
//! # Lifecycle
//! ```text
//! register_*() -> bind_configurations() -> build_*()
//! ```
//!
//! Constructors are closures, so shared resources such as the metadata cache
//! are captured at registration time instead of living in a global.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::config::CollectorConfig;
use crate::error::{CollectorError, ConfigError, RegistryError};
use crate::pipeline::{Consumer, DynAnalyzer, DynReceiver, EventSink};

// ─── ComponentKind ───────────────────────────────────────────────────

/// The four component kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Ingestion source.
    Receiver,
    /// Analysis stage.
    Analyzer,
    /// Enrichment/processing stage.
    Processor,
    /// Export sink.
    Exporter,
}

impl ComponentKind {
    /// Name of the configuration group holding this kind's sections.
    pub fn section_group(self) -> &'static str {
        match self {
            Self::Receiver => "receivers",
            Self::Analyzer => "analyzers",
            Self::Processor => "processors",
            Self::Exporter => "exporters",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Receiver => write!(f, "receiver"),
            Self::Analyzer => write!(f, "analyzer"),
            Self::Processor => write!(f, "processor"),
            Self::Exporter => write!(f, "exporter"),
        }
    }
}

// ─── ComponentConfig ─────────────────────────────────────────────────

/// A configuration value that can be decoded in place from a TOML section.
///
/// Implemented for every `DeserializeOwned + Debug + Send + Sync + 'static`
/// type, so component configs only need `#[derive(Deserialize)]`.
pub trait ComponentConfig: Any + Send + Sync + fmt::Debug {
    /// Replaces `self` with the decoded section.
    fn bind(&mut self, section: toml::Value) -> Result<(), String>;

    /// Upcast for downcasting to the concrete type.
    fn as_any(&self) -> &dyn Any;
}

impl<T> ComponentConfig for T
where
    T: DeserializeOwned + Any + Send + Sync + fmt::Debug,
{
    fn bind(&mut self, section: toml::Value) -> Result<(), String> {
        *self = T::deserialize(section).map_err(|e| e.to_string())?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ─── Constructor signatures ──────────────────────────────────────────

type ReceiverFn = dyn Fn(&dyn ComponentConfig, Arc<dyn EventSink>) -> Result<Arc<dyn DynReceiver>, CollectorError>
    + Send
    + Sync;

type AnalyzerFn = dyn Fn(&dyn ComponentConfig, Vec<Arc<dyn Consumer>>) -> Result<Arc<dyn DynAnalyzer>, CollectorError>
    + Send
    + Sync;

type ProcessorFn = dyn Fn(&dyn ComponentConfig, Arc<dyn Consumer>) -> Result<Arc<dyn Consumer>, CollectorError>
    + Send
    + Sync;

type ExporterFn =
    dyn Fn(&dyn ComponentConfig) -> Result<Arc<dyn Consumer>, CollectorError> + Send + Sync;

/// One registered component: its configuration and how to build it.
struct Descriptor<F: ?Sized> {
    config: Box<dyn ComponentConfig>,
    new_fn: Box<F>,
}

/// Downcasts a stored configuration to the type its constructor expects.
fn typed_config<'a, C: ComponentConfig>(
    config: &'a dyn ComponentConfig,
    kind: ComponentKind,
    id: &str,
) -> Result<&'a C, RegistryError> {
    config
        .as_any()
        .downcast_ref::<C>()
        .ok_or_else(|| RegistryError::ConfigType {
            kind: kind.to_string(),
            id: id.to_owned(),
        })
}

// ─── ComponentRegistry ───────────────────────────────────────────────

/// Per-kind mapping from identifier to construction function and config.
///
/// Identifiers are unique within a kind; registering a duplicate is an
/// error rather than an overwrite.
///
/// # Example
/// ```ignore
/// let mut registry = ComponentRegistry::new();
/// registry.register_exporter("stdout", |cfg: &StdoutConfig| {
///     Ok(Arc::new(StdoutExporter::new(cfg.clone())) as Arc<dyn Consumer>)
/// }, StdoutConfig::default())?;
///
/// registry.bind_configurations(&config)?;
/// let exporter = registry.build_exporter("stdout")?;
/// ```
#[derive(Default)]
pub struct ComponentRegistry {
    receivers: BTreeMap<String, Descriptor<ReceiverFn>>,
    analyzers: BTreeMap<String, Descriptor<AnalyzerFn>>,
    processors: BTreeMap<String, Descriptor<ProcessorFn>>,
    exporters: BTreeMap<String, Descriptor<ExporterFn>>,
}

impl ComponentRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an ingestion source.
    pub fn register_receiver<C, F>(
        &mut self,
        id: &str,
        new_fn: F,
        default_config: C,
    ) -> Result<(), RegistryError>
    where
        C: ComponentConfig,
        F: Fn(&C, Arc<dyn EventSink>) -> Result<Arc<dyn DynReceiver>, CollectorError>
            + Send
            + Sync
            + 'static,
    {
        let kind = ComponentKind::Receiver;
        ensure_vacant(&self.receivers, kind, id)?;
        let owned_id = id.to_owned();
        let ctor = move |config: &dyn ComponentConfig,
                         sink: Arc<dyn EventSink>|
              -> Result<Arc<dyn DynReceiver>, CollectorError> {
            new_fn(typed_config::<C>(config, kind, &owned_id)?, sink)
        };
        self.receivers.insert(
            id.to_owned(),
            Descriptor {
                config: Box::new(default_config),
                new_fn: Box::new(ctor),
            },
        );
        debug!(kind = %kind, id, "component registered");
        Ok(())
    }

    /// Registers an analyzer.
    pub fn register_analyzer<C, F>(
        &mut self,
        id: &str,
        new_fn: F,
        default_config: C,
    ) -> Result<(), RegistryError>
    where
        C: ComponentConfig,
        F: Fn(&C, Vec<Arc<dyn Consumer>>) -> Result<Arc<dyn DynAnalyzer>, CollectorError>
            + Send
            + Sync
            + 'static,
    {
        let kind = ComponentKind::Analyzer;
        ensure_vacant(&self.analyzers, kind, id)?;
        let owned_id = id.to_owned();
        let ctor = move |config: &dyn ComponentConfig,
                         consumers: Vec<Arc<dyn Consumer>>|
              -> Result<Arc<dyn DynAnalyzer>, CollectorError> {
            new_fn(typed_config::<C>(config, kind, &owned_id)?, consumers)
        };
        self.analyzers.insert(
            id.to_owned(),
            Descriptor {
                config: Box::new(default_config),
                new_fn: Box::new(ctor),
            },
        );
        debug!(kind = %kind, id, "component registered");
        Ok(())
    }

    /// Registers a processing stage.
    pub fn register_processor<C, F>(
        &mut self,
        id: &str,
        new_fn: F,
        default_config: C,
    ) -> Result<(), RegistryError>
    where
        C: ComponentConfig,
        F: Fn(&C, Arc<dyn Consumer>) -> Result<Arc<dyn Consumer>, CollectorError>
            + Send
            + Sync
            + 'static,
    {
        let kind = ComponentKind::Processor;
        ensure_vacant(&self.processors, kind, id)?;
        let owned_id = id.to_owned();
        let ctor = move |config: &dyn ComponentConfig,
                         next: Arc<dyn Consumer>|
              -> Result<Arc<dyn Consumer>, CollectorError> {
            new_fn(typed_config::<C>(config, kind, &owned_id)?, next)
        };
        self.processors.insert(
            id.to_owned(),
            Descriptor {
                config: Box::new(default_config),
                new_fn: Box::new(ctor),
            },
        );
        debug!(kind = %kind, id, "component registered");
        Ok(())
    }

    /// Registers an exporter.
    pub fn register_exporter<C, F>(
        &mut self,
        id: &str,
        new_fn: F,
        default_config: C,
    ) -> Result<(), RegistryError>
    where
        C: ComponentConfig,
        F: Fn(&C) -> Result<Arc<dyn Consumer>, CollectorError> + Send + Sync + 'static,
    {
        let kind = ComponentKind::Exporter;
        ensure_vacant(&self.exporters, kind, id)?;
        let owned_id = id.to_owned();
        let ctor = move |config: &dyn ComponentConfig| -> Result<Arc<dyn Consumer>, CollectorError> {
            new_fn(typed_config::<C>(config, kind, &owned_id)?)
        };
        self.exporters.insert(
            id.to_owned(),
            Descriptor {
                config: Box::new(default_config),
                new_fn: Box::new(ctor),
            },
        );
        debug!(kind = %kind, id, "component registered");
        Ok(())
    }

    /// Decodes each registered component's section into its configuration.
    ///
    /// Every registered component must have a `[<group>.<id>]` section; an
    /// empty table keeps the registered defaults for fields it omits. Nothing
    /// is constructed here.
    pub fn bind_configurations(&mut self, source: &CollectorConfig) -> Result<(), ConfigError> {
        bind_kind(&mut self.receivers, ComponentKind::Receiver, source)?;
        bind_kind(&mut self.analyzers, ComponentKind::Analyzer, source)?;
        bind_kind(&mut self.processors, ComponentKind::Processor, source)?;
        bind_kind(&mut self.exporters, ComponentKind::Exporter, source)?;
        Ok(())
    }

    /// Constructs a receiver delivering into `sink`.
    pub fn build_receiver(
        &self,
        id: &str,
        sink: Arc<dyn EventSink>,
    ) -> Result<Arc<dyn DynReceiver>, CollectorError> {
        let descriptor = lookup(&self.receivers, ComponentKind::Receiver, id)?;
        (descriptor.new_fn)(descriptor.config.as_ref(), sink)
    }

    /// Constructs an analyzer pushing to `consumers`.
    pub fn build_analyzer(
        &self,
        id: &str,
        consumers: Vec<Arc<dyn Consumer>>,
    ) -> Result<Arc<dyn DynAnalyzer>, CollectorError> {
        let descriptor = lookup(&self.analyzers, ComponentKind::Analyzer, id)?;
        (descriptor.new_fn)(descriptor.config.as_ref(), consumers)
    }

    /// Constructs a processor wrapping `next`.
    pub fn build_processor(
        &self,
        id: &str,
        next: Arc<dyn Consumer>,
    ) -> Result<Arc<dyn Consumer>, CollectorError> {
        let descriptor = lookup(&self.processors, ComponentKind::Processor, id)?;
        (descriptor.new_fn)(descriptor.config.as_ref(), next)
    }

    /// Constructs an exporter.
    pub fn build_exporter(&self, id: &str) -> Result<Arc<dyn Consumer>, CollectorError> {
        let descriptor = lookup(&self.exporters, ComponentKind::Exporter, id)?;
        (descriptor.new_fn)(descriptor.config.as_ref())
    }

    /// Registered identifiers of one kind, sorted.
    pub fn ids(&self, kind: ComponentKind) -> Vec<&str> {
        match kind {
            ComponentKind::Receiver => self.receivers.keys().map(String::as_str).collect(),
            ComponentKind::Analyzer => self.analyzers.keys().map(String::as_str).collect(),
            ComponentKind::Processor => self.processors.keys().map(String::as_str).collect(),
            ComponentKind::Exporter => self.exporters.keys().map(String::as_str).collect(),
        }
    }

    /// The bound configuration of a component, downcast to `C`.
    pub fn config<C: ComponentConfig>(&self, kind: ComponentKind, id: &str) -> Option<&C> {
        let config = match kind {
            ComponentKind::Receiver => self.receivers.get(id).map(|d| d.config.as_ref()),
            ComponentKind::Analyzer => self.analyzers.get(id).map(|d| d.config.as_ref()),
            ComponentKind::Processor => self.processors.get(id).map(|d| d.config.as_ref()),
            ComponentKind::Exporter => self.exporters.get(id).map(|d| d.config.as_ref()),
        }?;
        config.as_any().downcast_ref::<C>()
    }

    /// Total number of registered components.
    pub fn count(&self) -> usize {
        self.receivers.len() + self.analyzers.len() + self.processors.len() + self.exporters.len()
    }
}

fn ensure_vacant<F: ?Sized>(
    map: &BTreeMap<String, Descriptor<F>>,
    kind: ComponentKind,
    id: &str,
) -> Result<(), RegistryError> {
    if map.contains_key(id) {
        return Err(RegistryError::AlreadyRegistered {
            kind: kind.to_string(),
            id: id.to_owned(),
        });
    }
    Ok(())
}

fn lookup<'a, F: ?Sized>(
    map: &'a BTreeMap<String, Descriptor<F>>,
    kind: ComponentKind,
    id: &str,
) -> Result<&'a Descriptor<F>, RegistryError> {
    map.get(id).ok_or_else(|| RegistryError::NotFound {
        kind: kind.to_string(),
        id: id.to_owned(),
    })
}

fn bind_kind<F: ?Sized>(
    map: &mut BTreeMap<String, Descriptor<F>>,
    kind: ComponentKind,
    source: &CollectorConfig,
) -> Result<(), ConfigError> {
    let sections = source.component_sections(kind);
    for (id, descriptor) in map.iter_mut() {
        let section_name = format!("{}.{}", kind.section_group(), id);
        let section = sections
            .get(id)
            .ok_or_else(|| ConfigError::MissingSection {
                section: section_name.clone(),
            })?;
        if !section.is_table() {
            return Err(ConfigError::MalformedSection {
                section: section_name,
                reason: "expected a table".to_owned(),
            });
        }
        descriptor
            .config
            .bind(section.clone())
            .map_err(|reason| ConfigError::MalformedSection {
                section: section_name.clone(),
                reason,
            })?;
        debug!(section = %section_name, "component config bound");
    }
    Ok(())
}
