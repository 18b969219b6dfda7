//! AES-256-GCM envelope encryption/decryption
//!
//! Envelope format (binary):
//! ```text
//! [12 bytes: random nonce][N bytes: ciphertext][16 bytes: GCM tag]
//! ```
//!
//! No associated data is bound. A fresh nonce is drawn for every call to
//! `encrypt`; a key must never seal two messages under the same nonce.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use rand::RngCore;
use secrecy::SecretString;

use crate::error::{CryptoError, CryptoResult};
use crate::kdf::{derive_key, Key};
use crate::NONCE_SIZE;

/// Encrypt `plaintext` under the key derived from `password`.
///
/// Returns: `[12-byte nonce][ciphertext][16-byte tag]`
pub fn encrypt(plaintext: &[u8], password: &SecretString) -> CryptoResult<Vec<u8>> {
    encrypt_with_key(&derive_key(password), plaintext)
}

/// Decrypt an envelope produced by [`encrypt`] with the same password.
///
/// Fails with `InputTooShort` when the nonce is missing and with
/// `Authentication` on any tag mismatch.
pub fn decrypt(envelope: &[u8], password: &SecretString) -> CryptoResult<Vec<u8>> {
    decrypt_with_key(&derive_key(password), envelope)
}

/// Encrypt with an explicit key.
pub fn encrypt_with_key(key: &Key, plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| CryptoError::Cipher(format!("envelope encryption failed: {e}")))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);
    Ok(result)
}

/// Decrypt with an explicit key.
///
/// Input: `[12-byte nonce][ciphertext][16-byte tag]` (output of `encrypt_with_key`)
pub fn decrypt_with_key(key: &Key, envelope: &[u8]) -> CryptoResult<Vec<u8>> {
    if envelope.len() < NONCE_SIZE {
        return Err(CryptoError::too_short(envelope.len()));
    }

    let (nonce_bytes, ciphertext) = envelope.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);
    let cipher = Aes256Gcm::new(key.as_bytes().into());

    // A ciphertext shorter than the tag is a truncation and fails the same way
    cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| CryptoError::Authentication)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TAG_SIZE;
    use proptest::prelude::*;

    fn password(s: &str) -> SecretString {
        SecretString::from(s)
    }

    #[test]
    fn test_encrypt_decrypt_roundtrip() {
        let envelope = encrypt(b"hello world", &password("secret")).unwrap();
        let decrypted = decrypt(&envelope, &password("secret")).unwrap();

        assert_eq!(decrypted, b"hello world");
    }

    #[test]
    fn test_envelope_size() {
        let envelope = encrypt(b"hello world", &password("secret")).unwrap();

        // nonce (12) + plaintext (11) + tag (16) = 39
        assert_eq!(envelope.len(), 39);
        assert_eq!(envelope.len(), NONCE_SIZE + 11 + TAG_SIZE);
    }

    #[test]
    fn test_encrypt_decrypt_empty() {
        let envelope = encrypt(b"", &password("secret")).unwrap();
        assert_eq!(envelope.len(), NONCE_SIZE + TAG_SIZE);

        let decrypted = decrypt(&envelope, &password("secret")).unwrap();
        assert!(decrypted.is_empty());
    }

    #[test]
    fn test_decrypt_wrong_password() {
        let envelope = encrypt(b"secret data", &password("right")).unwrap();
        let result = decrypt(&envelope, &password("wrong"));

        assert!(matches!(result, Err(CryptoError::Authentication)));
    }

    #[test]
    fn test_corrupt_last_byte() {
        let mut envelope = encrypt(b"hello world", &password("secret")).unwrap();
        let last = envelope.len() - 1;
        envelope[last] ^= 0x01;

        let result = decrypt(&envelope, &password("secret"));
        assert!(matches!(result, Err(CryptoError::Authentication)));
    }

    #[test]
    fn test_input_too_short() {
        let result = decrypt(&[0u8; NONCE_SIZE - 1], &password("secret"));
        assert!(matches!(
            result,
            Err(CryptoError::InputTooShort { len: 11, min: 12 })
        ));
    }

    #[test]
    fn test_nonce_only_fails_authentication() {
        // Nonce present but no tag: passes the length check, fails closed
        let result = decrypt(&[0u8; NONCE_SIZE], &password("secret"));
        assert!(matches!(result, Err(CryptoError::Authentication)));
    }

    #[test]
    fn test_truncated_envelope() {
        let envelope = encrypt(b"hello world", &password("secret")).unwrap();
        let result = decrypt(&envelope[..envelope.len() - 1], &password("secret"));

        assert!(matches!(result, Err(CryptoError::Authentication)));
    }

    #[test]
    fn test_nonce_freshness() {
        let a = encrypt(b"same message", &password("secret")).unwrap();
        let b = encrypt(b"same message", &password("secret")).unwrap();

        assert_ne!(&a[..NONCE_SIZE], &b[..NONCE_SIZE], "nonce must be fresh per call");
        assert_ne!(a, b);
    }

    #[test]
    fn test_every_bit_flip_detected() {
        let envelope = encrypt(b"hello world", &password("secret")).unwrap();

        for byte in 0..envelope.len() {
            for bit in 0..8 {
                let mut tampered = envelope.clone();
                tampered[byte] ^= 1 << bit;
                let result = decrypt(&tampered, &password("secret"));
                assert!(
                    matches!(result, Err(CryptoError::Authentication)),
                    "flip at byte {byte} bit {bit} must fail authentication"
                );
            }
        }
    }

    proptest! {
        #[test]
        fn prop_roundtrip(
            data in proptest::collection::vec(any::<u8>(), 0..2048),
            pw in ".{0,40}",
        ) {
            let pw = password(&pw);
            let envelope = encrypt(&data, &pw).unwrap();
            prop_assert_eq!(decrypt(&envelope, &pw).unwrap(), data);
        }

        #[test]
        fn prop_single_bit_tamper(
            data in proptest::collection::vec(any::<u8>(), 0..256),
            pos in any::<prop::sample::Index>(),
            bit in 0u8..8,
        ) {
            let pw = password("tamper");
            let mut envelope = encrypt(&data, &pw).unwrap();
            let idx = pos.index(envelope.len());
            envelope[idx] ^= 1 << bit;
            prop_assert!(decrypt(&envelope, &pw).unwrap_err().is_authentication());
        }
    }
}
