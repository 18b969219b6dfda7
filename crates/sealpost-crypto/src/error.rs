use thiserror::Error;

use crate::NONCE_SIZE;

pub type CryptoResult<T> = Result<T, CryptoError>;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("envelope too short: {len} bytes (minimum {min})")]
    InputTooShort { len: usize, min: usize },

    /// Tag mismatch. Deliberately does not say whether the key was wrong or
    /// the data was corrupted.
    #[error("envelope authentication failed")]
    Authentication,

    #[error("base64 decode: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("cipher error: {0}")]
    Cipher(String),
}

impl CryptoError {
    pub(crate) fn too_short(len: usize) -> Self {
        Self::InputTooShort {
            len,
            min: NONCE_SIZE,
        }
    }

    pub fn is_authentication(&self) -> bool {
        matches!(self, Self::Authentication)
    }
}
