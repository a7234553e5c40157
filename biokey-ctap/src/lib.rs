//! CTAP2 wire primitives shared by the biokey client
//!
//! This crate holds everything that touches bytes but never a device:
//!
//! - CBOR parameter maps and decoded response maps ([`cbor`])
//! - CTAP2 status codes reported by authenticators ([`status`])
//! - ISO 7816-4 APDU command encoding and response framing ([`apdu`])
//! - Firmware version triples and feature gating ([`version`])
//!
//! CTAP specification:
//! <https://fidoalliance.org/specs/fido-v2.2-rd-20230321/fido-client-to-authenticator-protocol-v2.2-rd-20230321.html>

pub mod apdu;
pub mod cbor;
pub mod error;
pub mod status;
pub mod version;

// Re-export commonly used types
pub use apdu::{ApduCommand, ApduResponse, SW};
pub use cbor::{ParameterMap, ResponseMap};
pub use error::{Error, Result};
pub use status::StatusCode;
pub use version::Version;
