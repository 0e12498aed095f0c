//! Encryption of OAuth tokens at rest.
//!
//! Ciphertext layout: base64(nonce || ChaCha20-Poly1305 ciphertext).

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use expense_ledger_core::{Error, Result};
use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;

const NONCE_SIZE: usize = 12;
const KEY_INFO: &[u8] = b"expense-ledger/oauth-token/v1";

pub struct TokenCipher {
    cipher: ChaCha20Poly1305,
}

impl TokenCipher {
    /// Derives the data key from the configured `ENCRYPTION_KEY` with HKDF-SHA256.
    pub fn from_secret(secret: &str) -> Result<Self> {
        if secret.is_empty() {
            return Err(Error::configuration("ENCRYPTION_KEY not set"));
        }
        let hk = Hkdf::<Sha256>::new(None, secret.as_bytes());
        let mut key = [0u8; 32];
        hk.expand(KEY_INFO, &mut key)
            .map_err(|_| Error::Secret("key derivation failed".to_string()))?;
        Ok(Self {
            cipher: ChaCha20Poly1305::new(Key::from_slice(&key)),
        })
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String> {
        let mut nonce = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| Error::Secret("token encryption failed".to_string()))?;

        let mut out = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(out))
    }

    pub fn decrypt(&self, encoded: &str) -> Result<String> {
        let bytes = STANDARD
            .decode(encoded)
            .map_err(|_| Error::Secret("stored token is not valid base64".to_string()))?;
        if bytes.len() <= NONCE_SIZE {
            return Err(Error::Secret("stored token is truncated".to_string()));
        }
        let (nonce, ciphertext) = bytes.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| {
                Error::Secret("stored token cannot be decrypted with ENCRYPTION_KEY".to_string())
            })?;
        String::from_utf8(plaintext)
            .map_err(|_| Error::Secret("stored token is not UTF-8".to_string()))
    }
}
