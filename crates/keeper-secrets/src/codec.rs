//! Payload codec: AES-256-GCM with HKDF-SHA256 key derivation.
//!
//! Every payload gets a fresh random salt and nonce; the master key is never
//! used directly as a cipher key. The sealed blob is self-describing so the
//! receiving side needs nothing but the master key:
//!
//! ```text
//! version (1) || salt (32) || nonce (12) || ciphertext || tag (16)
//! ```
//!
//! The same codec runs on every client. The server only ever moves the
//! sealed bytes around.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::error::{Result, SecretError};

const FORMAT_VERSION: u8 = 1;
const NONCE_SIZE: usize = 12;
const SALT_SIZE: usize = 32;
const TAG_SIZE: usize = 16;
pub(crate) const KEY_SIZE: usize = 32;
const HEADER_SIZE: usize = 1 + SALT_SIZE + NONCE_SIZE;

/// HKDF info string used to domain-separate derived keys.
const HKDF_INFO: &[u8] = b"secretkeeper-payload-v1";

/// Symmetric encode/decode of opaque secret payloads.
///
/// `decode(encode(x)) == x` for every input; `decode` of anything else
/// fails with [`SecretError::Decode`] rather than yielding wrong plaintext.
pub trait PayloadCodec: Send + Sync {
    /// Seal `plaintext`.
    fn encode(&self, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Open a blob produced by [`PayloadCodec::encode`] under the same key.
    fn decode(&self, ciphertext: &[u8]) -> Result<Vec<u8>>;
}

/// The AES-256-GCM payload codec.
pub struct AesGcmCodec {
    master_key: Zeroizing<Vec<u8>>,
}

impl AesGcmCodec {
    /// Create a codec from a 32-byte master key.
    pub fn new(master_key: impl Into<Vec<u8>>) -> Result<Self> {
        let master_key = Zeroizing::new(master_key.into());
        if master_key.len() != KEY_SIZE {
            return Err(SecretError::KeyResolution(format!(
                "master key must be {KEY_SIZE} bytes, got {}",
                master_key.len()
            )));
        }
        Ok(Self { master_key })
    }

    fn cipher(&self, salt: &[u8]) -> Result<Aes256Gcm> {
        let key = derive_key(&self.master_key, salt)?;
        Aes256Gcm::new_from_slice(key.as_slice()).map_err(|e| SecretError::Encode(e.to_string()))
    }
}

impl std::fmt::Debug for AesGcmCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AesGcmCodec").finish_non_exhaustive()
    }
}

impl PayloadCodec for AesGcmCodec {
    fn encode(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut salt = [0u8; SALT_SIZE];
        rand::thread_rng().fill_bytes(&mut salt);

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let ciphertext = self
            .cipher(&salt)?
            .encrypt(Nonce::from_slice(&nonce_bytes), plaintext)
            .map_err(|e| SecretError::Encode(e.to_string()))?;

        let mut sealed = Vec::with_capacity(HEADER_SIZE + ciphertext.len());
        sealed.push(FORMAT_VERSION);
        sealed.extend_from_slice(&salt);
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn decode(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < HEADER_SIZE + TAG_SIZE {
            return Err(SecretError::Decode(format!(
                "payload too short ({} bytes)",
                sealed.len()
            )));
        }

        let (version, rest) = sealed.split_at(1);
        if version[0] != FORMAT_VERSION {
            return Err(SecretError::Decode(format!(
                "unsupported payload version {}",
                version[0]
            )));
        }

        let (salt, rest) = rest.split_at(SALT_SIZE);
        let (nonce_bytes, ciphertext) = rest.split_at(NONCE_SIZE);

        self.cipher(salt)
            .map_err(|e| SecretError::Decode(e.to_string()))?
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            // aead::Error carries no detail; authentication failed
            .map_err(|_| SecretError::Decode("authentication failed".to_string()))
    }
}

/// Derive a 256-bit cipher key from `master_key` and `salt` via HKDF-SHA256.
fn derive_key(master_key: &[u8], salt: &[u8]) -> Result<Zeroizing<[u8; KEY_SIZE]>> {
    let hk = Hkdf::<Sha256>::new(Some(salt), master_key);
    let mut okm = Zeroizing::new([0u8; KEY_SIZE]);
    hk.expand(HKDF_INFO, okm.as_mut())
        .map_err(|e| SecretError::Encode(format!("key derivation failed: {e}")))?;
    Ok(okm)
}

/// Generate a new random 256-bit master key.
pub fn generate_master_key() -> Vec<u8> {
    let mut key = vec![0u8; KEY_SIZE];
    rand::thread_rng().fill_bytes(&mut key);
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> AesGcmCodec {
        AesGcmCodec::new(generate_master_key()).unwrap()
    }

    #[test]
    fn test_round_trip() {
        let codec = codec();
        let plaintext = br#"{"login":"alice","password":"hunter2"}"#;

        let sealed = codec.encode(plaintext).unwrap();
        assert_eq!(codec.decode(&sealed).unwrap(), plaintext);
    }

    #[test]
    fn test_round_trip_empty_and_binary() {
        let codec = codec();
        for plaintext in [Vec::new(), (0u8..=255).collect::<Vec<_>>()] {
            let sealed = codec.encode(&plaintext).unwrap();
            assert_eq!(codec.decode(&sealed).unwrap(), plaintext);
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = codec().encode(b"card 4111").unwrap();
        let result = codec().decode(&sealed);
        assert!(matches!(result, Err(SecretError::Decode(_))));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let codec = codec();
        let mut sealed = codec.encode(b"important secret").unwrap();

        let idx = HEADER_SIZE + 1;
        sealed[idx] ^= 0xff;

        assert!(matches!(codec.decode(&sealed), Err(SecretError::Decode(_))));
    }

    #[test]
    fn test_tampered_salt_fails() {
        let codec = codec();
        let mut sealed = codec.encode(b"important secret").unwrap();
        sealed[1] ^= 0x01;

        assert!(matches!(codec.decode(&sealed), Err(SecretError::Decode(_))));
    }

    #[test]
    fn test_truncated_payload_fails() {
        let codec = codec();
        let sealed = codec.encode(b"important secret").unwrap();

        for len in [0, 1, HEADER_SIZE, sealed.len() - 1] {
            assert!(
                matches!(codec.decode(&sealed[..len]), Err(SecretError::Decode(_))),
                "truncation to {len} bytes should fail"
            );
        }
    }

    #[test]
    fn test_unknown_version_fails() {
        let codec = codec();
        let mut sealed = codec.encode(b"x").unwrap();
        sealed[0] = 9;
        assert!(matches!(codec.decode(&sealed), Err(SecretError::Decode(_))));
    }

    #[test]
    fn test_same_plaintext_seals_differently() {
        let codec = codec();
        let a = codec.encode(b"same plaintext").unwrap();
        let b = codec.encode(b"same plaintext").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_rejects_short_master_key() {
        assert!(matches!(
            AesGcmCodec::new(vec![0u8; 16]),
            Err(SecretError::KeyResolution(_))
        ));
    }
}
