//! Error types for cryptographic operations

use thiserror::Error;

/// Cryptographic operation errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CryptoError {
    /// The PIN/UV auth token is empty or otherwise unusable as an HMAC key
    #[error("Invalid PIN/UV auth token")]
    InvalidToken,

    /// Invalid key length
    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
}

/// Result type alias for cryptographic operations
pub type Result<T> = std::result::Result<T, CryptoError>;
