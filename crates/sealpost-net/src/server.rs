//! Blob listener: accept loop and per-connection exchange
//!
//! Connection state machine:
//! ```text
//! AwaitType ─┬─ Request  → read id → Response(blob | empty) ─┐
//!            ├─ Transfer → read id, data → put → Ack ─────────┼─ Closed
//!            └─ anything else → abort, no reply ──────────────┘
//! ```
//! The whole exchange runs under one deadline. On any error the socket is
//! dropped and nothing partially read is stored.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sealpost_core::config::SealpostConfig;
use sealpost_core::frame::{
    read_body, read_message_type, Frame, FrameError, FrameLimits, MessageType,
};
use sealpost_core::{SealpostError, SealpostResult};
use sealpost_store::{BlobStore, SizeDelta};
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::metrics::ListenerMetrics;

#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Deadline for one whole exchange (default: 1 minute)
    pub connection_timeout: Duration,
    /// Concurrent connection cap (0 = unlimited)
    pub max_connections: usize,
    pub limits: FrameLimits,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            connection_timeout: Duration::from_secs(60),
            max_connections: 0,
            limits: FrameLimits::default(),
        }
    }
}

impl From<&SealpostConfig> for ListenerConfig {
    fn from(config: &SealpostConfig) -> Self {
        Self {
            connection_timeout: config.daemon.connection_timeout(),
            max_connections: config.daemon.max_connections,
            limits: config.wire.limits(),
        }
    }
}

/// Accept loop over a bound TCP socket. Owns its handle to the store.
pub struct Listener {
    listener: TcpListener,
    store: BlobStore,
    config: ListenerConfig,
    metrics: ListenerMetrics,
}

impl Listener {
    pub async fn bind(
        addr: &str,
        store: BlobStore,
        config: ListenerConfig,
    ) -> SealpostResult<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            store,
            config,
            metrics: ListenerMetrics::default(),
        })
    }

    pub fn with_metrics(mut self, metrics: ListenerMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn local_addr(&self) -> SealpostResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until `shutdown` fires. Each connection runs in
    /// its own task; in-flight connections are left to finish under their
    /// own deadline.
    pub async fn run(self, shutdown: CancellationToken) -> SealpostResult<()> {
        let permits = (self.config.max_connections > 0)
            .then(|| Arc::new(Semaphore::new(self.config.max_connections)));

        info!(
            addr = %self.local_addr()?,
            timeout_secs = self.config.connection_timeout.as_secs(),
            max_connections = self.config.max_connections,
            "blob listener ready"
        );

        loop {
            let permit = match &permits {
                Some(sem) => tokio::select! {
                    _ = shutdown.cancelled() => break,
                    permit = sem.clone().acquire_owned() => Some(
                        permit.map_err(|e| anyhow::anyhow!("connection permits closed: {e}"))?,
                    ),
                },
                None => None,
            };

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_connection(stream, peer, permit),
                    Err(e) => warn!("failed to accept connection: {e}"),
                },
            }
        }

        info!("blob listener stopped");
        Ok(())
    }

    fn spawn_connection(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        permit: Option<OwnedSemaphorePermit>,
    ) {
        let store = self.store.clone();
        let metrics = self.metrics.clone();
        let limits = self.config.limits;
        let deadline = self.config.connection_timeout;

        tokio::spawn(async move {
            let _permit = permit; // released when the connection closes
            debug!(peer = %peer, "connection accepted");
            metrics.connection_opened();

            match serve_connection(stream, &store, &limits, deadline).await {
                Ok(served) => {
                    metrics.record_frame(served.message_type.name());
                    metrics.record_store_change(served.delta);
                }
                Err(e) => {
                    metrics.record_error(e.kind());
                    warn!(peer = %peer, error = %e, "connection aborted");
                }
            }

            metrics.connection_closed();
        });
    }
}

/// Outcome of one completed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Served {
    pub message_type: MessageType,
    /// Store size change; zero for requests
    pub delta: SizeDelta,
}

/// Serve one exchange on `stream` under `deadline`.
pub async fn serve_connection<S>(
    stream: S,
    store: &BlobStore,
    limits: &FrameLimits,
    deadline: Duration,
) -> SealpostResult<Served>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    tokio::time::timeout(deadline, exchange(stream, store, limits))
        .await
        .map_err(|_| SealpostError::Timeout(deadline))?
}

async fn exchange<S>(stream: S, store: &BlobStore, limits: &FrameLimits) -> SealpostResult<Served>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (read_half, mut writer) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);

    // Reply-side types are refused before any body is read
    let message_type = read_message_type(&mut reader).await?;
    if !matches!(message_type, MessageType::Request | MessageType::Transfer) {
        return Err(unexpected(message_type).into());
    }

    let mut delta = SizeDelta::default();
    match read_body(&mut reader, message_type, limits).await? {
        Frame::Request { id } => {
            let data = match store.get(&id).await {
                Ok(data) => data,
                Err(SealpostError::NotFound(_)) => {
                    debug!(id = %id, "requested blob not found, replying empty");
                    Vec::new()
                }
                Err(e) => return Err(e),
            };
            let bytes = data.len();
            Frame::Response { data }.write_to(&mut writer).await?;
            info!(id = %id, bytes, "served blob request");
        }
        Frame::Transfer { id, data } => {
            let bytes = data.len();
            delta = store.put(id.clone(), data).await;
            Frame::Ack.write_to(&mut writer).await?;
            info!(id = %id, bytes, "received and stored blob");
        }
        other => return Err(unexpected(other.message_type()).into()),
    }

    Ok(Served {
        message_type,
        delta,
    })
}

fn unexpected(message_type: MessageType) -> FrameError {
    FrameError::UnexpectedType {
        expected: "request or transfer",
        got: message_type.as_u8(),
    }
}
