//! Watch consumer: drives the cache from a notification stream.
//!
//! ```text
//! WatchSource --stream--> notification loop --apply--> WorkloadCache
//!                               |
//!                           Synced ──> start() returns
//! ```
//!
//! [`WorkloadWatcher::start`] is the startup sync barrier: it returns only
//! after the source has delivered its initial listing, so enrichment never
//! runs against a cold cache.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use futures::stream::BoxStream;
use lumen_core::metrics as m;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::WorkloadCache;
use crate::error::MetadataError;
use crate::types::WatchNotification;

/// A stream of cache notifications.
///
/// The initial listing comes first and is terminated by
/// [`WatchNotification::Synced`]; everything after it is incremental.
/// Errors are per-notification and do not end the stream.
pub trait WatchSource: Send + 'static {
    /// Consumes the source and opens the stream.
    fn watch(self) -> BoxStream<'static, Result<WatchNotification, MetadataError>>;
}

/// Starts notification loops feeding one shared cache.
pub struct WorkloadWatcher {
    cache: Arc<WorkloadCache>,
    sync_timeout: Duration,
}

impl WorkloadWatcher {
    /// Creates a watcher feeding `cache`.
    pub fn new(cache: Arc<WorkloadCache>, sync_timeout: Duration) -> Self {
        Self {
            cache,
            sync_timeout,
        }
    }

    /// Spawns the notification loop and waits for the initial sync.
    ///
    /// # Errors
    /// - [`MetadataError::SyncTimeout`] if `Synced` does not arrive in time
    /// - [`MetadataError::StreamClosed`] if the stream ends before `Synced`
    ///
    /// On error the loop has already been stopped.
    pub async fn start<S: WatchSource>(&self, source: S) -> Result<WatchHandle, MetadataError> {
        self.start_until(source, std::future::pending()).await
    }

    /// Like [`start`](Self::start), but gives up waiting when `interrupt`
    /// resolves first.
    ///
    /// # Errors
    /// As [`start`](Self::start), plus [`MetadataError::Interrupted`] when
    /// `interrupt` wins. The loop has been stopped and the source dropped
    /// by the time this returns.
    pub async fn start_until<S, F>(
        &self,
        source: S,
        interrupt: F,
    ) -> Result<WatchHandle, MetadataError>
    where
        S: WatchSource,
        F: Future<Output = ()>,
    {
        let cancel = CancellationToken::new();
        let (synced_tx, synced_rx) = oneshot::channel();

        let task = tokio::spawn(notification_loop(
            source.watch(),
            Arc::clone(&self.cache),
            cancel.clone(),
            synced_tx,
        ));

        let synced = tokio::select! {
            synced = tokio::time::timeout(self.sync_timeout, synced_rx) => synced,
            () = interrupt => {
                info!("initial workload sync interrupted");
                cancel.cancel();
                let _ = task.await;
                return Err(MetadataError::Interrupted);
            }
        };

        match synced {
            Ok(Ok(())) => {
                info!(entries = self.cache.len(), "workload cache synced");
                Ok(WatchHandle { cancel, task })
            }
            Ok(Err(_)) => {
                // the loop dropped the sender without signalling
                let _ = task.await;
                Err(MetadataError::StreamClosed)
            }
            Err(_) => {
                cancel.cancel();
                let _ = task.await;
                Err(MetadataError::SyncTimeout {
                    secs: self.sync_timeout.as_secs(),
                })
            }
        }
    }
}

/// Handle to a running notification loop.
pub struct WatchHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl WatchHandle {
    /// Returns `true` once the loop has exited, by cancellation or because
    /// the stream ended.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the loop and waits for it to exit.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.task.await {
            warn!(error = %e, "workload watch task ended abnormally");
        }
    }
}

async fn notification_loop(
    mut stream: BoxStream<'static, Result<WatchNotification, MetadataError>>,
    cache: Arc<WorkloadCache>,
    cancel: CancellationToken,
    synced_tx: oneshot::Sender<()>,
) {
    let mut synced_tx = Some(synced_tx);

    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("workload watch cancelled");
                break;
            }
            next = stream.next() => next,
        };

        match next {
            Some(Ok(WatchNotification::Event(event))) => cache.apply(&event),
            Some(Ok(WatchNotification::Synced)) => {
                // relists after a reconnect also end with Synced
                if let Some(tx) = synced_tx.take() {
                    let _ = tx.send(());
                }
            }
            Some(Err(e)) => {
                warn!(error = %e, "workload watch notification failed");
                metrics::counter!(m::METADATA_WATCH_ERRORS_TOTAL).increment(1);
            }
            None => {
                if synced_tx.is_some() {
                    warn!("workload watch stream closed before initial sync");
                } else {
                    warn!("workload watch stream ended");
                }
                break;
            }
        }
    }
}
