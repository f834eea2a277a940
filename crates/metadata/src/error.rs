//! Metadata watch error types.
//!
//! `From<MetadataError> for CollectorError` lets the application propagate
//! with `?`.

use lumen_core::error::{ClusterError, CollectorError};

/// Errors raised by the workload watch.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The cluster client could not be created.
    #[error("cluster client error: {0}")]
    Client(String),

    /// The initial listing did not finish within the timeout.
    #[error("initial sync timed out after {secs}s")]
    SyncTimeout {
        /// Configured timeout.
        secs: u64,
    },

    /// The notification stream ended before the initial sync.
    #[error("watch stream closed before initial sync")]
    StreamClosed,

    /// The wait for the initial sync was interrupted.
    #[error("interrupted before initial sync")]
    Interrupted,

    /// A single notification failed.
    #[error("watch error: {0}")]
    Watch(String),

    /// An object is missing a field needed to key it.
    #[error("malformed object: {0}")]
    MalformedObject(String),
}

impl From<MetadataError> for CollectorError {
    fn from(err: MetadataError) -> Self {
        let cluster = match err {
            MetadataError::Client(msg) => ClusterError::Client(msg),
            MetadataError::SyncTimeout { secs } => ClusterError::SyncTimeout { secs },
            MetadataError::StreamClosed => ClusterError::StreamClosed,
            MetadataError::Interrupted => ClusterError::Interrupted,
            MetadataError::Watch(msg) => ClusterError::Watch(msg),
            MetadataError::MalformedObject(msg) => ClusterError::Watch(msg),
        };
        CollectorError::Cluster(cluster)
    }
}
