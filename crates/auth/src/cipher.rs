//! Symmetric encryption for stored credentials.
//!
//! AES-256-GCM with a random 96-bit nonce per encryption; ciphertext is
//! stored as `base64(nonce || ct)`. The 32-byte key arrives base64-encoded
//! from deployment configuration.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use thiserror::Error;

const NONCE_LEN: usize = 12;

#[derive(Debug, Error)]
pub enum CipherError {
    #[error("encryption key must be 32 bytes of base64")]
    InvalidKey,

    #[error("ciphertext is malformed")]
    Malformed,

    #[error("encryption failed")]
    Encrypt,

    /// Wrong key or tampered ciphertext; GCM cannot tell which.
    #[error("decryption failed")]
    Decrypt,
}

/// Process-wide cipher over the deployment key.
#[derive(Clone)]
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl SecretCipher {
    pub fn new(key: &[u8; 32]) -> Self {
        Self {
            cipher: Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key)),
        }
    }

    /// Accepts standard or url-safe base64 (deployment keys circulate in
    /// both shapes).
    pub fn from_key_b64(encoded: &str) -> Result<Self, CipherError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .or_else(|_| URL_SAFE.decode(encoded.trim()))
            .map_err(|_| CipherError::InvalidKey)?;
        let key: [u8; 32] = bytes.try_into().map_err(|_| CipherError::InvalidKey)?;
        Ok(Self::new(&key))
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, CipherError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ct = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CipherError::Encrypt)?;

        let mut blob = Vec::with_capacity(NONCE_LEN + ct.len());
        blob.extend_from_slice(&nonce);
        blob.extend_from_slice(&ct);
        Ok(STANDARD.encode(blob))
    }

    pub fn decrypt(&self, ciphertext: &str) -> Result<String, CipherError> {
        let blob = STANDARD
            .decode(ciphertext.trim())
            .map_err(|_| CipherError::Malformed)?;
        if blob.len() <= NONCE_LEN {
            return Err(CipherError::Malformed);
        }
        let (nonce, ct) = blob.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ct)
            .map_err(|_| CipherError::Decrypt)?;
        String::from_utf8(plain).map_err(|_| CipherError::Malformed)
    }
}

impl core::fmt::Debug for SecretCipher {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        // Never expose key material through Debug.
        f.write_str("SecretCipher")
    }
}
