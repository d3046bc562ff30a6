//! Content encryption gateway
//!
//! Sensitive item content is sealed with XChaCha20-Poly1305 before it
//! reaches the database and unsealed on every read. Ciphertext is armored
//! into a printable string so it can live in the same TEXT column as
//! plaintext content: a fixed prefix, then base64 of nonce ‖ AEAD output.
//!
//! The prefix doubles as the [`ContentCipher::is_encrypted`] marker. Update
//! paths MUST consult it before sealing: encrypting a value that is already
//! ciphertext produces valid-looking output whose single decryption no
//! longer yields the original plaintext.

use crate::error::{Error, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::rngs::OsRng;
use rand::RngCore;
use std::fs;
use std::path::Path;

/// Length of the symmetric key in bytes
pub const KEY_LEN: usize = 32;

/// XChaCha20 extended nonce length
const NONCE_LEN: usize = 24;

/// Marker prepended to every armored ciphertext
const CIPHERTEXT_PREFIX: &str = "senc1:";

/// Seals and unseals sensitive item content with a process-wide key
pub struct ContentCipher {
    cipher: XChaCha20Poly1305,
}

impl std::fmt::Debug for ContentCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentCipher").finish_non_exhaustive()
    }
}

impl ContentCipher {
    /// Create a cipher from raw key material
    #[must_use]
    pub fn new(key: &[u8; KEY_LEN]) -> Self {
        Self {
            cipher: XChaCha20Poly1305::new(Key::from_slice(key)),
        }
    }

    /// Load the key file at `path`, generating and persisting a fresh random
    /// key on first use
    pub fn load_or_generate(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let raw = fs::read(path)?;
            let key: [u8; KEY_LEN] = raw.try_into().map_err(|_| {
                Error::InvalidInput(format!(
                    "key file {} is not {KEY_LEN} bytes",
                    path.display()
                ))
            })?;
            Ok(Self::new(&key))
        } else {
            let mut key = [0u8; KEY_LEN];
            OsRng.fill_bytes(&mut key);
            fs::write(path, key)?;
            tracing::info!("Generated content key at {}", path.display());
            Ok(Self::new(&key))
        }
    }

    /// Whether `value` carries the ciphertext marker
    #[must_use]
    pub fn is_encrypted(value: &str) -> bool {
        value.starts_with(CIPHERTEXT_PREFIX)
    }

    /// Seal `plaintext` under a fresh random nonce
    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = XNonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| Error::Encryption)?;

        let mut sealed = nonce_bytes.to_vec();
        sealed.extend(ciphertext);
        Ok(format!("{CIPHERTEXT_PREFIX}{}", BASE64.encode(sealed)))
    }

    /// Unseal an armored value produced by [`encrypt`](Self::encrypt)
    pub fn decrypt(&self, value: &str) -> Result<String> {
        let armored = value
            .strip_prefix(CIPHERTEXT_PREFIX)
            .ok_or_else(|| Error::Decryption("missing ciphertext marker".into()))?;

        let raw = BASE64
            .decode(armored)
            .map_err(|e| Error::Decryption(format!("bad base64: {e}")))?;

        if raw.len() < NONCE_LEN {
            return Err(Error::Decryption("ciphertext too short".into()));
        }
        let (nonce_bytes, ciphertext) = raw.split_at(NONCE_LEN);

        let plaintext = self
            .cipher
            .decrypt(XNonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| Error::Decryption("authentication failed".into()))?;

        String::from_utf8(plaintext).map_err(|_| Error::Decryption("plaintext is not UTF-8".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cipher() -> ContentCipher {
        ContentCipher::new(&[7u8; KEY_LEN])
    }

    #[test]
    fn test_round_trip() {
        let c = cipher();
        let sealed = c.encrypt("hunter2").unwrap();
        assert_eq!(c.decrypt(&sealed).unwrap(), "hunter2");
    }

    #[test]
    fn test_round_trip_empty_and_unicode() {
        let c = cipher();
        for plaintext in ["", "contraseña: ñandú", "line\nbreak\ttab"] {
            let sealed = c.encrypt(plaintext).unwrap();
            assert_eq!(c.decrypt(&sealed).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_nonces_are_fresh() {
        let c = cipher();
        let a = c.encrypt("same input").unwrap();
        let b = c.encrypt("same input").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_is_encrypted_detects_sealed_values() {
        let c = cipher();
        let sealed = c.encrypt("secret").unwrap();
        assert!(ContentCipher::is_encrypted(&sealed));
        assert!(!ContentCipher::is_encrypted("secret"));
        assert!(!ContentCipher::is_encrypted(""));
    }

    #[test]
    fn test_decrypt_rejects_plaintext() {
        let err = cipher().decrypt("just some text").unwrap_err();
        assert!(matches!(err, Error::Decryption(_)));
    }

    #[test]
    fn test_decrypt_rejects_tampered_ciphertext() {
        let c = cipher();
        let sealed = c.encrypt("secret").unwrap();
        let mut tampered = sealed.into_bytes();
        let last = tampered.len() - 1;
        tampered[last] = if tampered[last] == b'A' { b'B' } else { b'A' };
        let tampered = String::from_utf8(tampered).unwrap();
        assert!(matches!(c.decrypt(&tampered), Err(Error::Decryption(_))));
    }

    #[test]
    fn test_decrypt_rejects_foreign_key() {
        let sealed = cipher().encrypt("secret").unwrap();
        let other = ContentCipher::new(&[8u8; KEY_LEN]);
        assert!(matches!(other.decrypt(&sealed), Err(Error::Decryption(_))));
    }

    /// Double encryption is valid-looking but destructive: one decryption
    /// returns the inner armored blob, not the original plaintext. This is
    /// why every update path guards with `is_encrypted` first.
    #[test]
    fn test_double_encrypt_is_not_idempotent() {
        let c = cipher();
        let once = c.encrypt("secret").unwrap();
        let twice = c.encrypt(&once).unwrap();
        assert_ne!(c.decrypt(&twice).unwrap(), "secret");
        assert_eq!(c.decrypt(&twice).unwrap(), once);
    }

    #[test]
    fn test_load_or_generate_persists_key() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("content.key");

        let first = ContentCipher::load_or_generate(&key_path).unwrap();
        let sealed = first.encrypt("stable across loads").unwrap();

        let second = ContentCipher::load_or_generate(&key_path).unwrap();
        assert_eq!(second.decrypt(&sealed).unwrap(), "stable across loads");
    }

    #[test]
    fn test_load_or_generate_rejects_short_key_file() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("content.key");
        std::fs::write(&key_path, b"short").unwrap();

        let err = ContentCipher::load_or_generate(&key_path).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }
}
