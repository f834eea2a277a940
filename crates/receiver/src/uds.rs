//! Unix domain socket receiver.
//!
//! Accepts stream connections on a local socket. Each line is one JSON
//! encoded [`RawEvent`]; decoded events are handed to the [`EventSink`].
//! Each connection runs in its own task.

use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use lumen_core::error::{CollectorError, PipelineError};
use lumen_core::event::RawEvent;
use lumen_core::metrics as m;
use lumen_core::pipeline::{EventSink, Receiver};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::Semaphore;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Registry identifier and receiver name.
pub const UDS_RECEIVER: &str = "uds";

/// `[receivers.uds]`
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UdsReceiverConfig {
    /// Socket path. A stale file at this path is removed on start.
    pub socket_path: String,
    /// Longest accepted line in bytes, newline included. Longer lines close
    /// the connection.
    pub max_message_size: usize,
    /// Concurrent connections; extra connections are refused.
    pub max_connections: usize,
    /// Idle time after which a connection is closed (seconds).
    pub connection_timeout_secs: u64,
}

impl Default for UdsReceiverConfig {
    fn default() -> Self {
        Self {
            socket_path: "/run/lumen/events.sock".to_owned(),
            max_message_size: 64 * 1024,
            max_connections: 64,
            connection_timeout_secs: 300,
        }
    }
}

/// Event ingestion over a Unix domain socket.
pub struct UdsReceiver {
    config: UdsReceiverConfig,
    sink: Arc<dyn EventSink>,
    cancel: CancellationToken,
    running: AtomicBool,
    listening: AtomicBool,
}

impl UdsReceiver {
    /// Creates a receiver delivering into `sink`.
    ///
    /// # Errors
    /// [`PipelineError::InitFailed`] if `max_connections` or
    /// `max_message_size` is zero; either would refuse every event.
    pub fn new(config: UdsReceiverConfig, sink: Arc<dyn EventSink>) -> Result<Self, CollectorError> {
        if config.max_connections == 0 {
            return Err(PipelineError::InitFailed(format!(
                "{UDS_RECEIVER}: max_connections must be at least 1"
            ))
            .into());
        }
        if config.max_message_size == 0 {
            return Err(PipelineError::InitFailed(format!(
                "{UDS_RECEIVER}: max_message_size must be at least 1"
            ))
            .into());
        }
        Ok(Self {
            config,
            sink,
            cancel: CancellationToken::new(),
            running: AtomicBool::new(false),
            listening: AtomicBool::new(false),
        })
    }

    /// Socket path.
    pub fn socket_path(&self) -> &str {
        &self.config.socket_path
    }

    /// Returns `true` while the socket is bound and accepting.
    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire)
    }

    fn bind(&self) -> Result<UnixListener, CollectorError> {
        let path = Path::new(&self.config.socket_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    receiver_error(format!("failed to create {}: {e}", parent.display()))
                })?;
            }
        }
        match std::fs::remove_file(path) {
            Ok(()) => debug!(path = %path.display(), "removed stale socket"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(receiver_error(format!(
                    "failed to remove stale socket {}: {e}",
                    path.display()
                )));
            }
        }
        UnixListener::bind(path)
            .map_err(|e| receiver_error(format!("failed to bind {}: {e}", path.display())))
    }

    async fn accept_loop(&self, listener: UnixListener) -> Result<(), CollectorError> {
        let semaphore = Arc::new(Semaphore::new(self.config.max_connections));

        loop {
            tokio::select! {
                result = listener.accept() => {
                    let (stream, _addr) = match result {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            error!(error = %e, "uds accept failed");
                            return Err(receiver_error(format!("accept error: {e}")));
                        }
                    };

                    let Ok(permit) = Arc::clone(&semaphore).try_acquire_owned() else {
                        warn!(
                            max_connections = self.config.max_connections,
                            "max connections reached, refusing connection"
                        );
                        continue;
                    };

                    let connection = Connection {
                        sink: Arc::clone(&self.sink),
                        max_message_size: self.config.max_message_size,
                        idle_timeout: Duration::from_secs(self.config.connection_timeout_secs),
                        cancel: self.cancel.clone(),
                    };
                    tokio::spawn(async move {
                        metrics::gauge!(m::RECEIVER_CONNECTIONS, m::LABEL_COMPONENT => UDS_RECEIVER).increment(1.0);
                        connection.serve(stream).await;
                        metrics::gauge!(m::RECEIVER_CONNECTIONS, m::LABEL_COMPONENT => UDS_RECEIVER).decrement(1.0);
                        drop(permit);
                    });
                }
                _ = self.cancel.cancelled() => {
                    info!("uds receiver received shutdown signal");
                    return Ok(());
                }
            }
        }
    }
}

impl Receiver for UdsReceiver {
    fn name(&self) -> &str {
        UDS_RECEIVER
    }

    async fn start(&self) -> Result<(), CollectorError> {
        if self.running.swap(true, Ordering::AcqRel) {
            return Err(PipelineError::AlreadyRunning.into());
        }

        let listener = match self.bind() {
            Ok(listener) => listener,
            Err(e) => {
                self.running.store(false, Ordering::Release);
                return Err(e);
            }
        };
        self.listening.store(true, Ordering::Release);
        info!(path = %self.config.socket_path, "uds receiver listening");

        let result = self.accept_loop(listener).await;

        self.listening.store(false, Ordering::Release);
        if let Err(e) = std::fs::remove_file(&self.config.socket_path) {
            if e.kind() != ErrorKind::NotFound {
                warn!(path = %self.config.socket_path, error = %e, "failed to remove socket");
            }
        }
        self.running.store(false, Ordering::Release);
        result
    }

    async fn shutdown(&self) -> Result<(), CollectorError> {
        self.cancel.cancel();
        Ok(())
    }
}

fn receiver_error(reason: String) -> CollectorError {
    PipelineError::Receiver(reason).into()
}

/// State a connection task needs.
struct Connection {
    sink: Arc<dyn EventSink>,
    max_message_size: usize,
    idle_timeout: Duration,
    cancel: CancellationToken,
}

impl Connection {
    async fn serve(self, stream: UnixStream) {
        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        // one extra byte distinguishes "exactly max" from "too long"
        let limit = self.max_message_size as u64 + 1;

        loop {
            line.clear();
            let mut limited = (&mut reader).take(limit);
            let read = tokio::select! {
                result = timeout(self.idle_timeout, limited.read_line(&mut line)) => result,
                _ = self.cancel.cancelled() => {
                    debug!("uds connection closing on shutdown");
                    return;
                }
            };

            match read {
                Ok(Ok(0)) => {
                    debug!("uds connection closed by peer");
                    return;
                }
                Ok(Ok(_)) => {
                    if line.len() > self.max_message_size {
                        warn!(
                            max_message_size = self.max_message_size,
                            "message exceeds max size, closing connection"
                        );
                        metrics::counter!(m::RECEIVER_DECODE_ERRORS_TOTAL, m::LABEL_COMPONENT => UDS_RECEIVER).increment(1);
                        return;
                    }
                    self.handle_line(line.trim_end());
                }
                Ok(Err(e)) => {
                    warn!(error = %e, "uds read failed");
                    return;
                }
                Err(_) => {
                    debug!("uds connection idle timeout");
                    return;
                }
            }
        }
    }

    fn handle_line(&self, line: &str) {
        if line.trim().is_empty() {
            return;
        }
        let event: RawEvent = match serde_json::from_str(line) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "undecodable event line");
                metrics::counter!(m::RECEIVER_DECODE_ERRORS_TOTAL, m::LABEL_COMPONENT => UDS_RECEIVER).increment(1);
                return;
            }
        };

        metrics::counter!(m::RECEIVER_EVENTS_TOTAL, m::LABEL_COMPONENT => UDS_RECEIVER).increment(1);
        if let Err(e) = self.sink.dispatch(event) {
            warn!(error = %e, "event dispatch failed");
        }
    }
}
