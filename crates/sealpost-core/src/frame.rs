//! sealpost wire protocol
//!
//! Frame layout (all lengths big-endian u32):
//! ```text
//! Request  = [0x01][idLen][id]
//! Response = [0x02][dataLen][data]          dataLen = 0 means "not found"
//! Transfer = [0x03][idLen][id][dataLen][data]
//! Ack      = [0x04]
//! ```
//!
//! Every declared length is checked against [`FrameLimits`] before any
//! buffer of that size is allocated.

use bytes::{BufMut, Bytes, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::SealpostResult;

/// Hard cap on a blob payload (100 MiB)
pub const MAX_PAYLOAD_LEN: u32 = 100 * 1024 * 1024;

/// Hard cap on a blob ID (64 KiB)
pub const MAX_ID_LEN: u32 = 64 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    Request = 1,
    Response = 2,
    Transfer = 3,
    Ack = 4,
}

impl MessageType {
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::Response => "response",
            Self::Transfer => "transfer",
            Self::Ack => "ack",
        }
    }
}

impl TryFrom<u8> for MessageType {
    type Error = FrameError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        match tag {
            1 => Ok(Self::Request),
            2 => Ok(Self::Response),
            3 => Ok(Self::Transfer),
            4 => Ok(Self::Ack),
            other => Err(FrameError::UnknownType(other)),
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("connection closed mid-frame")]
    ShortRead,

    #[error("unknown message type {0}")]
    UnknownType(u8),

    #[error("expected {expected} frame, got type {got}")]
    UnexpectedType { expected: &'static str, got: u8 },

    #[error("{field} length {declared} exceeds cap {cap}")]
    LengthExceedsCap {
        field: &'static str,
        declared: u32,
        cap: u32,
    },

    #[error("{field} of {len} bytes does not fit a u32 length prefix")]
    FieldTooLong { field: &'static str, len: usize },

    #[error("blob ID is not valid UTF-8")]
    InvalidId,
}

/// Per-field size caps enforced while reading frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameLimits {
    pub max_payload: u32,
    pub max_id: u32,
}

impl Default for FrameLimits {
    fn default() -> Self {
        Self {
            max_payload: MAX_PAYLOAD_LEN,
            max_id: MAX_ID_LEN,
        }
    }
}

/// A complete protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Request { id: String },
    Response { data: Vec<u8> },
    Transfer { id: String, data: Vec<u8> },
    Ack,
}

impl Frame {
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Request { .. } => MessageType::Request,
            Self::Response { .. } => MessageType::Response,
            Self::Transfer { .. } => MessageType::Transfer,
            Self::Ack => MessageType::Ack,
        }
    }

    /// Serialize to wire bytes.
    pub fn encode(&self) -> Result<Bytes, FrameError> {
        let mut buf = BytesMut::new();
        buf.put_u8(self.message_type().as_u8());
        match self {
            Self::Request { id } => put_field(&mut buf, "id", id.as_bytes())?,
            Self::Response { data } => put_field(&mut buf, "data", data)?,
            Self::Transfer { id, data } => {
                put_field(&mut buf, "id", id.as_bytes())?;
                put_field(&mut buf, "data", data)?;
            }
            Self::Ack => {}
        }
        Ok(buf.freeze())
    }

    /// Check outgoing fields against the caps the peer will enforce.
    pub fn check(&self, limits: &FrameLimits) -> Result<(), FrameError> {
        let (id, data) = match self {
            Self::Request { id } => (Some(id.len()), None),
            Self::Response { data } => (None, Some(data.len())),
            Self::Transfer { id, data } => (Some(id.len()), Some(data.len())),
            Self::Ack => (None, None),
        };
        if let Some(len) = id {
            check_len("id", len, limits.max_id)?;
        }
        if let Some(len) = data {
            check_len("data", len, limits.max_payload)?;
        }
        Ok(())
    }

    /// Write the whole frame and flush.
    pub async fn write_to<W: AsyncWrite + Unpin>(&self, writer: &mut W) -> SealpostResult<()> {
        writer.write_all(&self.encode()?).await?;
        writer.flush().await?;
        Ok(())
    }
}

fn put_field(buf: &mut BytesMut, field: &'static str, bytes: &[u8]) -> Result<(), FrameError> {
    let len = u32::try_from(bytes.len()).map_err(|_| FrameError::FieldTooLong {
        field,
        len: bytes.len(),
    })?;
    buf.reserve(4 + bytes.len());
    buf.put_u32(len);
    buf.put_slice(bytes);
    Ok(())
}

fn check_len(field: &'static str, len: usize, cap: u32) -> Result<(), FrameError> {
    match u32::try_from(len) {
        Ok(declared) if declared <= cap => Ok(()),
        Ok(declared) => Err(FrameError::LengthExceedsCap {
            field,
            declared,
            cap,
        }),
        Err(_) => Err(FrameError::FieldTooLong { field, len }),
    }
}

/// Read the 1-byte type tag.
pub async fn read_message_type<R: AsyncRead + Unpin>(
    reader: &mut R,
) -> SealpostResult<MessageType> {
    let tag = reader.read_u8().await?;
    Ok(MessageType::try_from(tag)?)
}

/// Read a 4-byte length and check it against `cap`.
pub async fn read_length<R: AsyncRead + Unpin>(
    reader: &mut R,
    field: &'static str,
    cap: u32,
) -> SealpostResult<u32> {
    let declared = reader.read_u32().await?;
    if declared > cap {
        return Err(FrameError::LengthExceedsCap {
            field,
            declared,
            cap,
        }
        .into());
    }
    Ok(declared)
}

/// Read a length-prefixed UTF-8 blob ID.
pub async fn read_id<R: AsyncRead + Unpin>(
    reader: &mut R,
    limits: &FrameLimits,
) -> SealpostResult<String> {
    let len = read_length(reader, "id", limits.max_id).await?;
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    String::from_utf8(buf).map_err(|_| FrameError::InvalidId.into())
}

/// Read a length-prefixed payload. A zero length yields an empty vector.
pub async fn read_data<R: AsyncRead + Unpin>(
    reader: &mut R,
    limits: &FrameLimits,
) -> SealpostResult<Vec<u8>> {
    let len = read_length(reader, "data", limits.max_payload).await?;
    let mut buf = vec![0u8; len as usize];
    reader.read_exact(&mut buf).await?;
    Ok(buf)
}

/// Read the body of a frame whose type tag has already been consumed.
pub async fn read_body<R: AsyncRead + Unpin>(
    reader: &mut R,
    message_type: MessageType,
    limits: &FrameLimits,
) -> SealpostResult<Frame> {
    match message_type {
        MessageType::Request => Ok(Frame::Request {
            id: read_id(reader, limits).await?,
        }),
        MessageType::Response => Ok(Frame::Response {
            data: read_data(reader, limits).await?,
        }),
        MessageType::Transfer => {
            let id = read_id(reader, limits).await?;
            let data = read_data(reader, limits).await?;
            Ok(Frame::Transfer { id, data })
        }
        MessageType::Ack => Ok(Frame::Ack),
    }
}

/// Read one complete frame of any type.
pub async fn read_frame<R: AsyncRead + Unpin>(
    reader: &mut R,
    limits: &FrameLimits,
) -> SealpostResult<Frame> {
    let message_type = read_message_type(reader).await?;
    read_body(reader, message_type, limits).await
}
