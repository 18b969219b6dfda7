//! sealpost-crypto: password-based envelope encryption for sealpost blobs
//!
//! Envelope format (binary):
//! ```text
//! [12 bytes: random nonce][N bytes: ciphertext][16 bytes: GCM tag]
//! key = SHA-256(password), cipher = AES-256-GCM, no AAD
//! ```
//!
//! The canonical path is `encrypt` / `envelope::decrypt`. `decrypt` at the
//! crate root runs the compatibility reconciler, which also accepts
//! base64-armored envelopes and keys produced by older, inconsistent
//! derivations (see [`reconcile`]).

pub mod armor;
pub mod envelope;
pub mod error;
pub mod kdf;
pub mod reconcile;
pub mod sniff;

use secrecy::SecretString;

pub use armor::{encrypt_to_text, from_text, to_text};
pub use envelope::{decrypt_with_key, encrypt, encrypt_with_key};
pub use error::{CryptoError, CryptoResult};
pub use kdf::{derive_key, Key};
pub use reconcile::{reconcile, KeyVariant, Recovered};
pub use sniff::{sniff, ImageFormat};

/// Size of a derived key in bytes (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of an AES-GCM nonce (96-bit)
pub const NONCE_SIZE: usize = 12;

/// Size of a GCM authentication tag
pub const TAG_SIZE: usize = 16;

/// Recover plaintext from an envelope or a base64-armored envelope.
///
/// This is the decrypt entry point for callers that may receive blobs from
/// older producers. It runs the full reconciler and drops the diagnostics.
pub fn decrypt(envelope_or_text: &[u8], password: &SecretString) -> CryptoResult<Vec<u8>> {
    reconcile(envelope_or_text, password).map(|recovered| recovered.plaintext)
}
