//! Transport cipher for secrets sent by clients (login passwords).
//! Uses AES-256-GCM; the wire form is base64(`nonce || ciphertext`).

use crate::AppError;
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose, Engine as _};

const NONCE_LEN: usize = 12;

#[derive(Clone)]
pub struct TransportCipher {
    cipher: Aes256Gcm,
}

impl TransportCipher {
    /// Create a cipher from a raw 32-byte key.
    pub fn from_key_bytes(key_bytes: &[u8]) -> Result<Self, AppError> {
        if key_bytes.len() != 32 {
            return Err(AppError::Internal(
                "Transport key must be 32 bytes (256 bits)".to_string(),
            ));
        }
        let key = Key::<Aes256Gcm>::from_slice(key_bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Create a cipher from a base64-encoded 32-byte key.
    pub fn from_base64(key: &str) -> Result<Self, AppError> {
        let key_bytes = general_purpose::STANDARD
            .decode(key.trim())
            .map_err(|e| AppError::Internal(format!("Failed to decode transport key: {}", e)))?;
        Self::from_key_bytes(&key_bytes)
    }

    /// Encrypt a plaintext string. Clients do the same with the shared key.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, AppError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|e| AppError::Internal(format!("Encryption failed: {}", e)))?;

        let mut combined = nonce.to_vec();
        combined.extend_from_slice(&ciphertext);
        Ok(general_purpose::STANDARD.encode(&combined))
    }

    pub fn decrypt(&self, encrypted: &str) -> Result<String, AppError> {
        let combined = general_purpose::STANDARD
            .decode(encrypted)
            .map_err(|e| AppError::DecryptionFailure(format!("invalid base64: {}", e)))?;

        if combined.len() <= NONCE_LEN {
            return Err(AppError::DecryptionFailure(
                "encrypted data too short".to_string(),
            ));
        }

        let nonce = Nonce::from_slice(&combined[..NONCE_LEN]);
        let plaintext = self
            .cipher
            .decrypt(nonce, &combined[NONCE_LEN..])
            .map_err(|_| AppError::DecryptionFailure("authentication tag mismatch".to_string()))?;

        String::from_utf8(plaintext)
            .map_err(|e| AppError::DecryptionFailure(format!("invalid UTF-8: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_cipher() -> TransportCipher {
        TransportCipher::from_key_bytes(b"01234567890123456789012345678901").unwrap()
    }

    #[test]
    fn test_encryption_decryption() {
        let cipher = test_cipher();
        let encrypted = cipher.encrypt("s3cret-password").unwrap();
        assert_ne!(encrypted, "s3cret-password");
        assert_eq!(cipher.decrypt(&encrypted).unwrap(), "s3cret-password");
    }

    #[test]
    fn test_nonce_makes_ciphertext_vary() {
        let cipher = test_cipher();
        assert_ne!(cipher.encrypt("same").unwrap(), cipher.encrypt("same").unwrap());
    }

    #[test]
    fn test_foreign_key_fails() {
        let other = TransportCipher::from_key_bytes(b"abcdefghijabcdefghijabcdefghijab").unwrap();
        let encrypted = other.encrypt("password").unwrap();
        assert!(matches!(
            test_cipher().decrypt(&encrypted),
            Err(AppError::DecryptionFailure(_))
        ));
    }

    #[test]
    fn test_garbage_fails() {
        assert!(matches!(
            test_cipher().decrypt("not base64!"),
            Err(AppError::DecryptionFailure(_))
        ));
        assert!(matches!(
            test_cipher().decrypt("AAAA"),
            Err(AppError::DecryptionFailure(_))
        ));
    }

    #[test]
    fn test_wrong_key_length_rejected() {
        assert!(TransportCipher::from_key_bytes(b"short").is_err());
    }
}
