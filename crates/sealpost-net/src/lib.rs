//! sealpost-net: TCP transport for sealpost blobs
//!
//! One listener task accepts connections and spawns a task per socket; each
//! connection carries exactly one exchange (Request→Response or
//! Transfer→Ack) under a fixed deadline. The client dials a fresh
//! connection per call.

pub mod client;
pub mod metrics;
pub mod server;

use sealpost_core::SealpostResult;

pub use client::BlobClient;
pub use metrics::ListenerMetrics;
pub use server::{serve_connection, Listener, ListenerConfig, Served};

/// Store `data` under `id` on the listener at `addr` with default client settings.
pub async fn store_blob(addr: &str, id: &str, data: Vec<u8>) -> SealpostResult<()> {
    BlobClient::default().transfer(addr, id, data).await
}

/// Fetch the blob under `id` from the listener at `addr` with default client settings.
pub async fn fetch_blob(addr: &str, id: &str) -> SealpostResult<Vec<u8>> {
    BlobClient::default().request(addr, id).await
}
