//! PIN/UV auth protocol `authenticate(key, message)` functions
//!
//! Both protocol versions compute HMAC-SHA-256 over the message with the
//! PIN/UV auth token as key. V1 keeps the first 16 bytes, V2 the full tag.

use crate::error::{CryptoError, Result};

use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

fn hmac_sha256(key: &[u8], message: &[u8]) -> Result<[u8; 32]> {
    if key.is_empty() {
        return Err(CryptoError::InvalidToken);
    }
    let mut mac = HmacSha256::new_from_slice(key).map_err(|_| CryptoError::InvalidToken)?;
    mac.update(message);
    let mut tag = [0u8; 32];
    tag.copy_from_slice(&mac.finalize().into_bytes());
    Ok(tag)
}

/// PIN/UV auth protocol one
pub mod v1 {
    use super::*;

    /// Length of a V1 authentication tag
    pub const TAG_LEN: usize = 16;

    /// `LEFT(HMAC-SHA-256(key, message), 16)`
    pub fn authenticate(key: &[u8], message: &[u8]) -> Result<[u8; TAG_LEN]> {
        let full = hmac_sha256(key, message)?;
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&full[..TAG_LEN]);
        Ok(tag)
    }
}

/// PIN/UV auth protocol two
pub mod v2 {
    use super::*;

    /// Length of a V2 authentication tag
    pub const TAG_LEN: usize = 32;

    /// Required token length
    pub const TOKEN_LEN: usize = 32;

    /// `HMAC-SHA-256(key, message)` with a 32-byte token
    pub fn authenticate(key: &[u8], message: &[u8]) -> Result<[u8; TAG_LEN]> {
        if key.len() != TOKEN_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: TOKEN_LEN,
                actual: key.len(),
            });
        }
        hmac_sha256(key, message)
    }
}
