//! Blob client: one fresh connection per call, no retries

use std::time::Duration;

use sealpost_core::config::{ClientConfig, WireConfig};
use sealpost_core::frame::{
    read_data, read_frame, read_message_type, Frame, FrameError, FrameLimits, MessageType,
};
use sealpost_core::{SealpostError, SealpostResult};
use tokio::io::BufReader;
use tokio::net::TcpStream;
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct BlobClient {
    /// Deadline covering dial and the whole exchange
    timeout: Duration,
    limits: FrameLimits,
}

impl Default for BlobClient {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            limits: FrameLimits::default(),
        }
    }
}

impl BlobClient {
    pub fn new(timeout: Duration, limits: FrameLimits) -> Self {
        Self { timeout, limits }
    }

    pub fn from_config(client: &ClientConfig, wire: &WireConfig) -> Self {
        Self::new(client.timeout(), wire.limits())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Store `data` under `id` on the listener at `addr` and wait for its Ack.
    pub async fn transfer(&self, addr: &str, id: &str, data: Vec<u8>) -> SealpostResult<()> {
        let bytes = data.len();
        let frame = Frame::Transfer {
            id: id.to_string(),
            data,
        };
        frame.check(&self.limits)?;

        self.with_deadline(async {
            let stream = TcpStream::connect(addr).await?;
            let (read_half, mut writer) = stream.into_split();
            let mut reader = BufReader::new(read_half);

            debug!(addr, id, bytes, "sending transfer frame");
            frame.write_to(&mut writer).await?;

            match read_frame(&mut reader, &self.limits).await? {
                Frame::Ack => Ok(()),
                other => Err(FrameError::UnexpectedType {
                    expected: "ack",
                    got: other.message_type().as_u8(),
                }
                .into()),
            }
        })
        .await?;

        info!(addr, id, bytes, "blob transferred");
        Ok(())
    }

    /// Fetch the blob under `id` from the listener at `addr`.
    ///
    /// A zero-length Response means the listener has no such blob and maps to
    /// `NotFound`. A declared length over the cap is rejected before any
    /// payload is read.
    pub async fn request(&self, addr: &str, id: &str) -> SealpostResult<Vec<u8>> {
        let frame = Frame::Request { id: id.to_string() };
        frame.check(&self.limits)?;

        let data = self
            .with_deadline(async {
                let stream = TcpStream::connect(addr).await?;
                let (read_half, mut writer) = stream.into_split();
                let mut reader = BufReader::new(read_half);

                debug!(addr, id, "sending request frame");
                frame.write_to(&mut writer).await?;

                let reply = read_message_type(&mut reader).await?;
                if reply != MessageType::Response {
                    return Err(FrameError::UnexpectedType {
                        expected: "response",
                        got: reply.as_u8(),
                    }
                    .into());
                }
                read_data(&mut reader, &self.limits).await
            })
            .await?;

        if data.is_empty() {
            return Err(SealpostError::NotFound(id.to_string()));
        }

        info!(addr, id, bytes = data.len(), "blob received");
        Ok(data)
    }

    async fn with_deadline<T>(
        &self,
        fut: impl std::future::Future<Output = SealpostResult<T>>,
    ) -> SealpostResult<T> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| SealpostError::Timeout(self.timeout))?
    }
}
