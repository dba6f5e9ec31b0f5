//! Salt-derived AEAD for setup frames.
//!
//! The raw PAKE secret never encrypts anything directly: each connection
//! contributes a random 32-byte salt, and HKDF-SHA256 stretches the pair
//! into the ChaCha20-Poly1305 key that seals the rest of the handshake.
//! Sealed frames are `nonce || ciphertext` with a fresh random nonce each.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use hkdf::Hkdf;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::crypto::pake::SharedSecret;
use crate::error::{RelayError, Result};

/// Salt length on the wire.
pub const SALT_LEN: usize = 32;

/// Nonce prefix length of a sealed frame.
pub const NONCE_LEN: usize = 12;

const KEY_INFO: &[u8] = b"staple setup key v1";

/// Sealing key for one connection's setup exchange.
pub struct SealKey {
    cipher: ChaCha20Poly1305,
}

impl SealKey {
    /// Derives the sealing key from a completed PAKE and the peer's salt.
    pub fn derive(secret: &SharedSecret, salt: &[u8]) -> Result<Self> {
        if salt.len() != SALT_LEN {
            return Err(RelayError::protocol(format!(
                "salt must be {SALT_LEN} bytes, got {}",
                salt.len()
            )));
        }
        let hk = Hkdf::<Sha256>::new(Some(salt), secret.as_bytes());
        let mut okm = Zeroizing::new([0u8; 32]);
        hk.expand(KEY_INFO, &mut *okm)
            .map_err(RelayError::internal)?;
        Ok(Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&*okm)),
        })
    }

    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|_| RelayError::Internal("AEAD seal failed".into()))?;
        let mut out = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(out)
    }

    pub fn open(&self, sealed: &[u8]) -> Result<Vec<u8>> {
        if sealed.len() < NONCE_LEN {
            return Err(RelayError::protocol("sealed frame shorter than a nonce"));
        }
        let (nonce, ciphertext) = sealed.split_at(NONCE_LEN);
        self.cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| RelayError::protocol("sealed frame failed to open"))
    }
}

/// Fresh random salt for a new connection.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}
