//! Key derivation: password → SHA-256 → 256-bit envelope key

use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::KEY_SIZE;

/// A 256-bit envelope key.
///
/// Zeroized on drop to prevent secrets lingering in memory.
#[derive(Clone)]
pub struct Key {
    bytes: [u8; KEY_SIZE],
}

impl Key {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    /// Use a byte slice directly as key material. Returns `None` unless the
    /// slice is exactly `KEY_SIZE` bytes.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let bytes: [u8; KEY_SIZE] = bytes.try_into().ok()?;
        Some(Self { bytes })
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for Key {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for Key {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Key").field("bytes", &"[REDACTED]").finish()
    }
}

/// Derive the envelope key for `password`.
///
/// This is the only derivation used on the encrypt path. It accepts any
/// string, including the empty one, and never fails.
pub fn derive_key(password: &SecretString) -> Key {
    derive_from_bytes(password.expose_secret().as_bytes())
}

/// SHA-256 of `material`, hashed straight into the key buffer so no
/// unzeroized copy of the digest is left behind.
pub(crate) fn derive_from_bytes(material: &[u8]) -> Key {
    let mut key = Key::from_bytes([0u8; KEY_SIZE]);
    Sha256::new_with_prefix(material).finalize_into((&mut key.bytes).into());
    key
}
