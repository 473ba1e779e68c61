//! Searchable deterministic encryption for short identifiers (phone numbers).
//!
//! The plaintext is cut into overlapping 3-character windows, one per offset.
//! Each window is PKCS7-padded to a single AES-256 block and encrypted on its
//! own with no IV, so a given window always yields the same block wherever it
//! sits in the string. Blocks are base64-encoded and joined with `,`.
//!
//! Two consequences callers rely on:
//! - equal plaintexts produce equal ciphertexts, so equality lookups work on
//!   the stored column directly;
//! - the ciphertext of any fragment of three or more characters is a
//!   substring of the ciphertext of every value containing that fragment, so
//!   `LIKE '%fragment%'` works without decrypting.

use crate::AppError;
use aes_gcm::aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes_gcm::aes::{Aes256, Block};
use base64::{engine::general_purpose, Engine as _};

/// Longest plaintext accepted by [`FieldCipher::encrypt`].
pub const MAX_PLAIN_LEN: usize = 11;
const WINDOW: usize = 3;
const BLOCK: usize = 16;
const DELIMITER: &str = ",";
const MASK: &str = "****";

#[derive(Clone)]
pub struct FieldCipher {
    cipher: Aes256,
}

impl FieldCipher {
    pub fn from_key_bytes(key_bytes: &[u8]) -> Result<Self, AppError> {
        let cipher = Aes256::new_from_slice(key_bytes).map_err(|_| {
            AppError::Internal("Field encryption key must be 32 bytes (256 bits)".to_string())
        })?;
        Ok(Self { cipher })
    }

    pub fn from_base64(key: &str) -> Result<Self, AppError> {
        let key_bytes = general_purpose::STANDARD
            .decode(key.trim())
            .map_err(|e| AppError::Internal(format!("Failed to decode field key: {}", e)))?;
        Self::from_key_bytes(&key_bytes)
    }

    pub fn encrypt(&self, plain: &str) -> Result<String, AppError> {
        let chars: Vec<char> = plain.chars().collect();
        if chars.len() > MAX_PLAIN_LEN {
            return Err(AppError::InvalidInput(format!(
                "value exceeds {} characters",
                MAX_PLAIN_LEN
            )));
        }

        let last_offset = chars.len().saturating_sub(WINDOW);
        let blocks: Vec<String> = (0..=last_offset)
            .map(|i| {
                let end = (i + WINDOW).min(chars.len());
                let window: String = chars[i..end].iter().collect();
                self.encrypt_window(&window)
            })
            .collect();

        Ok(blocks.join(DELIMITER))
    }

    /// Decrypt a stored value. With `mask`, only the first 3 and last 4
    /// characters survive.
    pub fn decrypt(&self, ciphertext: &str, mask: bool) -> Result<String, AppError> {
        let windows = ciphertext
            .split(DELIMITER)
            .map(|block| self.decrypt_window(block))
            .collect::<Result<Vec<String>, AppError>>()?;

        let plain = match windows.split_last() {
            Some((last, leading)) => {
                let mut plain: String = leading.iter().filter_map(|w| w.chars().next()).collect();
                plain.push_str(last);
                plain
            }
            None => String::new(),
        };

        Ok(if mask { mask_value(&plain) } else { plain })
    }

    /// Ciphertext fragment to use in a contains-search against the stored column.
    pub fn search_fragment(&self, needle: &str) -> Result<String, AppError> {
        if needle.chars().count() < WINDOW {
            return Err(AppError::InvalidInput(format!(
                "search fragment must have at least {} characters",
                WINDOW
            )));
        }
        self.encrypt(needle)
    }

    fn encrypt_window(&self, window: &str) -> String {
        let bytes = window.as_bytes();
        let pad = (BLOCK - bytes.len()) as u8;
        let mut buf = [pad; BLOCK];
        buf[..bytes.len()].copy_from_slice(bytes);

        let mut block = Block::clone_from_slice(&buf);
        self.cipher.encrypt_block(&mut block);
        general_purpose::STANDARD.encode(block.as_slice())
    }

    fn decrypt_window(&self, encoded: &str) -> Result<String, AppError> {
        let bytes = general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| AppError::DecryptionFailure(format!("invalid base64 block: {}", e)))?;
        if bytes.len() != BLOCK {
            return Err(AppError::DecryptionFailure(format!(
                "block has {} bytes",
                bytes.len()
            )));
        }

        let mut block = Block::clone_from_slice(&bytes);
        self.cipher.decrypt_block(&mut block);

        let pad = block[BLOCK - 1] as usize;
        if pad == 0 || pad > BLOCK || block[BLOCK - pad..].iter().any(|b| *b as usize != pad) {
            return Err(AppError::DecryptionFailure("bad padding".to_string()));
        }

        String::from_utf8(block[..BLOCK - pad].to_vec())
            .map_err(|e| AppError::DecryptionFailure(format!("invalid UTF-8: {}", e)))
    }
}

/// Keep the first 3 and last 4 characters; values too short to have a
/// middle segment are masked entirely.
pub fn mask_value(plain: &str) -> String {
    let chars: Vec<char> = plain.chars().collect();
    if chars.len() < 8 {
        return MASK.to_string();
    }
    let head: String = chars[..3].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}{}{}", head, MASK, tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> FieldCipher {
        FieldCipher::from_key_bytes(&[42u8; 32]).unwrap()
    }

    #[test]
    fn test_round_trip_all_lengths() {
        let cipher = cipher();
        let digits = "18012345678";
        for len in 1..=MAX_PLAIN_LEN {
            let plain = &digits[..len];
            let encrypted = cipher.encrypt(plain).unwrap();
            assert_eq!(cipher.decrypt(&encrypted, false).unwrap(), plain, "len {}", len);
        }
    }

    #[test]
    fn test_round_trip_repeated_characters() {
        let cipher = cipher();
        for plain in ["000", "1111", "aaaaaaaaaaa", "12121212"] {
            let encrypted = cipher.encrypt(plain).unwrap();
            assert_eq!(cipher.decrypt(&encrypted, false).unwrap(), plain);
        }
    }

    #[test]
    fn test_deterministic() {
        let cipher = cipher();
        assert_eq!(
            cipher.encrypt("13800138000").unwrap(),
            cipher.encrypt("13800138000").unwrap()
        );
        assert_ne!(
            cipher.encrypt("13800138000").unwrap(),
            cipher.encrypt("13800138001").unwrap()
        );
    }

    #[test]
    fn test_block_count() {
        let cipher = cipher();
        let count = |s: &str| cipher.encrypt(s).unwrap().split(',').count();
        assert_eq!(count("1"), 1);
        assert_eq!(count("12"), 1);
        assert_eq!(count("123"), 1);
        assert_eq!(count("1234"), 2);
        assert_eq!(count("18012345678"), 9);
    }

    #[test]
    fn test_mask() {
        let cipher = cipher();
        let encrypted = cipher.encrypt("18012345678").unwrap();
        assert_eq!(cipher.decrypt(&encrypted, true).unwrap(), "180****5678");
    }

    #[test]
    fn test_mask_short_value() {
        assert_eq!(mask_value("1234567"), "****");
        assert_eq!(mask_value("12345678"), "123****5678");
    }

    #[test]
    fn test_oversize_rejected() {
        assert!(matches!(
            cipher().encrypt("123456789012"),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_fragment_is_substring_of_containing_value() {
        let cipher = cipher();
        let stored = cipher.encrypt("18012345678").unwrap();
        assert!(stored.contains(&cipher.search_fragment("234").unwrap()));
        assert!(stored.contains(&cipher.search_fragment("12345").unwrap()));
        assert!(stored.contains(&cipher.search_fragment("18012345678").unwrap()));
        assert!(!stored.contains(&cipher.search_fragment("999").unwrap()));
    }

    #[test]
    fn test_short_fragment_rejected() {
        assert!(matches!(
            cipher().search_fragment("12"),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_malformed_ciphertext() {
        let cipher = cipher();
        assert!(matches!(
            cipher.decrypt("not-base64!", false),
            Err(AppError::DecryptionFailure(_))
        ));
        assert!(matches!(
            cipher.decrypt("AAAA", false),
            Err(AppError::DecryptionFailure(_))
        ));
    }

    #[test]
    fn test_foreign_key_fails_padding() {
        let foreign = FieldCipher::from_key_bytes(&[7u8; 32]).unwrap();
        let encrypted = foreign.encrypt("18012345678").unwrap();
        assert!(cipher().decrypt(&encrypted, false).is_err());
    }

    #[test]
    fn test_wrong_key_length() {
        assert!(FieldCipher::from_key_bytes(&[1u8; 16]).is_err());
    }
}
