//! Error types for wire-level operations

use crate::version::Version;

use thiserror::Error;

/// Errors raised while framing, encoding or decoding CTAP data
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A transport response was too short to carry a status word
    #[error("Malformed response: {len} bytes, at least 2 required")]
    MalformedResponse { len: usize },

    /// CBOR could not be encoded or decoded
    #[error("Invalid CBOR: {0}")]
    InvalidCbor(String),

    /// A required map entry was absent
    #[error("Missing field 0x{0:02x}")]
    MissingField(i128),

    /// A map entry was present but held the wrong CBOR type
    #[error("Unexpected type for field 0x{key:02x}, expected {expected}")]
    UnexpectedType { key: i128, expected: &'static str },

    /// APDU body does not fit in an extended-length command
    #[error("APDU data too long: {0} bytes")]
    DataTooLong(usize),

    /// The connected firmware is older than an operation requires
    #[error("This action requires firmware {required} or later (found {actual})")]
    Unsupported { required: Version, actual: Version },
}

/// Result type alias for wire-level operations
pub type Result<T> = std::result::Result<T, Error>;
