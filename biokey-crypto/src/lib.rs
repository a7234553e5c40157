//! PIN/UV auth protocol primitives for FIDO2/CTAP clients
//!
//! Only the per-command signing step lives here; key agreement and token
//! acquisition happen before a token is handed to the client.
//!
//! - **PIN protocol V1**: HMAC-SHA-256 truncated to 16 bytes
//! - **PIN protocol V2**: full 32-byte HMAC-SHA-256
//!
//! Spec: <https://fidoalliance.org/specs/fido-v2.2-rd-20230321/fido-client-to-authenticator-protocol-v2.2-rd-20230321.html#pinProto1>

pub mod error;
pub mod pin_protocol;

// Re-export commonly used types
pub use error::{CryptoError, Result};
