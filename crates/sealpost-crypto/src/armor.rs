//! Base64 armor for envelopes crossing text-only boundaries (JSON bodies)

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use secrecy::SecretString;

use crate::error::CryptoResult;

/// Encode an envelope as standard, padded base64.
pub fn to_text(envelope: &[u8]) -> String {
    STANDARD.encode(envelope)
}

/// Decode standard, padded base64. Independent of authentication: a
/// successful decode says nothing about whether the bytes are an envelope.
pub fn from_text(text: &str) -> CryptoResult<Vec<u8>> {
    Ok(STANDARD.decode(text)?)
}

/// Encrypt and armor in one step.
pub fn encrypt_to_text(plaintext: &[u8], password: &SecretString) -> CryptoResult<String> {
    crate::envelope::encrypt(plaintext, password).map(|envelope| to_text(&envelope))
}

/// Decode raw bytes as base64 text, if they are valid UTF-8.
pub(crate) fn from_text_bytes(bytes: &[u8]) -> Option<Vec<u8>> {
    let text = std::str::from_utf8(bytes).ok()?;
    from_text(text).ok()
}
