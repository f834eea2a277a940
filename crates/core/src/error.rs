//! Error types, one enum per failure domain.
//!
//! Every crate in the workspace converts its own error into [`CollectorError`]
//! so the application layer can propagate with `?`.

/// Top-level collector error.
#[derive(Debug, thiserror::Error)]
pub enum CollectorError {
    /// Configuration loading or binding failed.
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// Component registration or construction failed.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),

    /// A pipeline stage failed to start, stop or process an event.
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// The cluster metadata watch failed.
    #[error("cluster error: {0}")]
    Cluster(#[from] ClusterError),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors. Always fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file does not exist.
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// The document is not valid TOML.
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// A field holds a value outside its allowed set.
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// A registered component has no configuration section.
    #[error("missing config section: [{section}]")]
    MissingSection { section: String },

    /// A component section exists but cannot be decoded.
    #[error("malformed config section [{section}]: {reason}")]
    MalformedSection { section: String, reason: String },
}

/// Component registry errors. Always fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    /// Identifier already registered for this kind.
    #[error("{kind} already registered: {id}")]
    AlreadyRegistered { kind: String, id: String },

    /// No component with this identifier was registered for this kind.
    #[error("{kind} not registered: {id}")]
    NotFound { kind: String, id: String },

    /// The stored configuration is not the type the constructor expects.
    #[error("{kind} '{id}' holds a configuration of an unexpected type")]
    ConfigType { kind: String, id: String },

    /// Two analyzers share a name inside one manager.
    #[error("duplicate analyzer: {name}")]
    DuplicateAnalyzer { name: String },
}

/// Pipeline stage errors.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// One or more components failed to start. Lists every failure.
    #[error("start failed: {0}")]
    StartFailed(String),

    /// One or more components failed to shut down. Lists every failure.
    #[error("shutdown failed: {0}")]
    ShutdownFailed(String),

    /// A stage rejected or failed to forward an event.
    #[error("{stage} failed to consume event: {reason}")]
    ConsumeFailed { stage: String, reason: String },

    /// Component construction failed.
    #[error("init failed: {0}")]
    InitFailed(String),

    /// The ingestion source failed.
    #[error("receiver error: {0}")]
    Receiver(String),

    /// `start` called on a running component.
    #[error("already running")]
    AlreadyRunning,
}

/// Cluster metadata watch errors.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// The cluster API client could not be created.
    #[error("client error: {0}")]
    Client(String),

    /// The initial listing did not complete in time.
    #[error("timed out after {secs}s waiting for initial sync")]
    SyncTimeout { secs: u64 },

    /// The notification stream ended before the initial sync.
    #[error("watch stream closed before initial sync")]
    StreamClosed,

    /// Shutdown was requested while waiting for the initial sync.
    #[error("interrupted before initial sync")]
    Interrupted,

    /// A single notification could not be delivered or decoded.
    #[error("watch error: {0}")]
    Watch(String),
}
