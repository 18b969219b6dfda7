//! Compatibility reconciler for envelopes from inconsistent producers
//!
//! Historically, producers disagreed on how a password becomes a key and on
//! whether the envelope travels raw or base64-armored. The reconciler tries
//! a fixed, ordered list of key variants; for each variant it attempts the
//! raw bytes first and then the base64-decoded bytes. The first success wins.
//!
//! Only [`KeyVariant::Canonical`] is ever used to encrypt. The other variants
//! are a decrypt-only shim: they widen the accepted key space with ad hoc,
//! non-uniform derivations and should be retired once old producers are gone.

use secrecy::{ExposeSecret, SecretString};
use tracing::debug;
use zeroize::Zeroizing;

use crate::armor::from_text_bytes;
use crate::envelope::decrypt_with_key;
use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{derive_from_bytes, derive_key, Key};
use crate::sniff::sniff;

/// A way of turning a password into a key, in reconciler order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyVariant {
    /// SHA-256 of the password. The only variant used for encryption.
    Canonical,
    /// Password bytes used directly as the AES-256 key (32-byte passwords only).
    RawPassword,
    /// SHA-256 of the canonical digest bytes.
    DigestRehash,
    /// SHA-256 of the lowercase hex rendering of the canonical digest.
    HexDigest,
}

impl KeyVariant {
    pub const ORDER: [KeyVariant; 4] = [
        KeyVariant::Canonical,
        KeyVariant::RawPassword,
        KeyVariant::DigestRehash,
        KeyVariant::HexDigest,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Canonical => "canonical",
            Self::RawPassword => "raw-password",
            Self::DigestRehash => "digest-rehash",
            Self::HexDigest => "hex-digest",
        }
    }

    /// Key for this variant, or `None` when the variant cannot apply to
    /// `password` (a raw password that is not exactly 32 bytes).
    pub fn key_for(&self, password: &SecretString) -> Option<Key> {
        match self {
            Self::Canonical => Some(derive_key(password)),
            Self::RawPassword => Key::from_slice(password.expose_secret().as_bytes()),
            Self::DigestRehash => Some(derive_from_bytes(derive_key(password).as_bytes())),
            Self::HexDigest => {
                let rendered = Zeroizing::new(hex::encode(derive_key(password).as_bytes()));
                Some(derive_from_bytes(rendered.as_bytes()))
            }
        }
    }
}

impl std::fmt::Display for KeyVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Plaintext recovered by the reconciler, with diagnostics.
#[derive(Debug, Clone)]
pub struct Recovered {
    pub plaintext: Vec<u8>,
    /// Key variant that authenticated the envelope
    pub variant: KeyVariant,
    /// The input was base64 text around the envelope
    pub input_unwrapped: bool,
    /// The plaintext was base64 text around an image and was decoded once
    pub output_unwrapped: bool,
}

/// Recover plaintext from `raw` using every known key variant.
///
/// On total failure the error from the canonical variant's attempt on the
/// raw bytes is returned, so the failure reason does not depend on which
/// compatibility variants happened to apply.
pub fn reconcile(raw: &[u8], password: &SecretString) -> CryptoResult<Recovered> {
    let decoded = from_text_bytes(raw);
    let mut canonical_err: Option<CryptoError> = None;

    for variant in KeyVariant::ORDER {
        let Some(key) = variant.key_for(password) else {
            debug!(variant = %variant, "key variant not applicable, skipping");
            continue;
        };

        match decrypt_with_key(&key, raw) {
            Ok(plaintext) => return Ok(finish(plaintext, variant, false)),
            Err(e) => {
                debug!(variant = %variant, error = %e, "raw envelope attempt failed");
                if variant == KeyVariant::Canonical {
                    canonical_err = Some(e);
                }
            }
        }

        if let Some(decoded) = decoded.as_deref() {
            match decrypt_with_key(&key, decoded) {
                Ok(plaintext) => return Ok(finish(plaintext, variant, true)),
                Err(e) => debug!(variant = %variant, error = %e, "base64 envelope attempt failed"),
            }
        }
    }

    debug!(bytes = raw.len(), "all key variants failed");
    Err(canonical_err.unwrap_or(CryptoError::Authentication))
}

fn finish(plaintext: Vec<u8>, variant: KeyVariant, input_unwrapped: bool) -> Recovered {
    if variant != KeyVariant::Canonical {
        tracing::warn!(variant = %variant, "envelope decrypted with a legacy key variant");
    }
    let (plaintext, output_unwrapped) = unwrap_encoded_image(plaintext);
    debug!(
        variant = %variant,
        input_unwrapped,
        output_unwrapped,
        bytes = plaintext.len(),
        "envelope recovered"
    );
    Recovered {
        plaintext,
        variant,
        input_unwrapped,
        output_unwrapped,
    }
}

/// Decode one accidental base64 layer around an image. Never recurses.
fn unwrap_encoded_image(plaintext: Vec<u8>) -> (Vec<u8>, bool) {
    if plaintext.is_empty() || sniff(&plaintext).is_some() {
        return (plaintext, false);
    }
    match from_text_bytes(&plaintext) {
        Some(inner) if sniff(&inner).is_some() => (inner, true),
        _ => (plaintext, false),
    }
}
