use std::time::Duration;

use thiserror::Error;

use crate::frame::FrameError;

pub type SealpostResult<T> = Result<T, SealpostError>;

#[derive(Debug, Error)]
pub enum SealpostError {
    #[error("transport error: {0}")]
    Transport(std::io::Error),

    #[error("deadline exceeded after {0:?}")]
    Timeout(Duration),

    #[error("framing error: {0}")]
    Framing(#[from] FrameError),

    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A peer that hangs up mid-frame is a framing failure, not a transport one.
impl From<std::io::Error> for SealpostError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            SealpostError::Framing(FrameError::ShortRead)
        } else {
            SealpostError::Transport(e)
        }
    }
}

impl SealpostError {
    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Timeout(_) => "timeout",
            Self::Framing(_) => "framing",
            Self::NotFound(_) => "not_found",
            Self::Config(_) => "config",
            Self::Other(_) => "other",
        }
    }
}
