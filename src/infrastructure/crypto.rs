// Symmetric encryption of stored connection passwords
use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fs;
use std::path::Path;

use crate::error::{AppError, AppResult};

const NONCE_LEN: usize = 12;

/// AES-256-GCM; each value is stored as base64(nonce || ciphertext).
#[derive(Clone)]
pub struct CredentialCipher {
    cipher: Aes256Gcm,
}

impl CredentialCipher {
    pub fn new(key: [u8; 32]) -> AppResult<Self> {
        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|e| AppError::Crypto(e.to_string()))?;
        Ok(Self { cipher })
    }

    pub fn from_base64(encoded: &str) -> AppResult<Self> {
        Self::new(decode_key(encoded)?)
    }

    /// Load the key from `path`, generating and writing a new one when the
    /// file does not exist yet.
    pub fn load_or_create(path: &Path) -> AppResult<Self> {
        if path.exists() {
            let encoded = fs::read_to_string(path).map_err(|e| AppError::Crypto(e.to_string()))?;
            return Self::from_base64(encoded.trim());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| AppError::Crypto(e.to_string()))?;
        }
        let key: [u8; 32] = rand::random();
        fs::write(path, STANDARD.encode(key)).map_err(|e| AppError::Crypto(e.to_string()))?;
        tracing::info!(path = %path.display(), "generated new connection encryption key");
        Self::new(key)
    }

    pub fn encrypt(&self, plaintext: &str) -> AppResult<String> {
        let nonce_bytes: [u8; NONCE_LEN] = rand::random();
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| AppError::Crypto(e.to_string()))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(payload))
    }

    pub fn decrypt(&self, encoded: &str) -> AppResult<String> {
        let payload = STANDARD
            .decode(encoded)
            .map_err(|e| AppError::Crypto(e.to_string()))?;
        if payload.len() <= NONCE_LEN {
            return Err(AppError::Crypto("ciphertext too short".to_string()));
        }
        let (nonce_bytes, ciphertext) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| AppError::Crypto("stored password could not be decrypted".to_string()))?;
        String::from_utf8(plaintext).map_err(|e| AppError::Crypto(e.to_string()))
    }
}

fn decode_key(encoded: &str) -> AppResult<[u8; 32]> {
    let decoded = STANDARD
        .decode(encoded)
        .map_err(|e| AppError::Crypto(e.to_string()))?;
    decoded
        .try_into()
        .map_err(|bytes: Vec<u8>| AppError::Crypto(format!("encryption key must be 32 bytes, got {}", bytes.len())))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let cipher = CredentialCipher::new([7u8; 32]).unwrap();
        let stored = cipher.encrypt("hunter2").unwrap();
        assert!(!stored.contains("hunter2"));
        assert_ne!(stored, cipher.encrypt("hunter2").unwrap());
        assert_eq!(cipher.decrypt(&stored).unwrap(), "hunter2");
    }

    #[test]
    fn test_wrong_key_fails() {
        let stored = CredentialCipher::new([1u8; 32]).unwrap().encrypt("secret").unwrap();
        let other = CredentialCipher::new([2u8; 32]).unwrap();
        assert!(matches!(other.decrypt(&stored), Err(AppError::Crypto(_))));
    }

    #[test]
    fn test_key_file_is_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keys/connection.key");
        let stored = CredentialCipher::load_or_create(&path).unwrap().encrypt("pw").unwrap();
        let reloaded = CredentialCipher::load_or_create(&path).unwrap();
        assert_eq!(reloaded.decrypt(&stored).unwrap(), "pw");
    }

    #[test]
    fn test_short_key_rejected() {
        assert!(CredentialCipher::from_base64(&STANDARD.encode([0u8; 16])).is_err());
    }
}
