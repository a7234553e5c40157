//! PIN/UV auth protocol support
//!
//! Commands that change authenticator state carry a `pinUvAuthParam`: a MAC
//! over the command transcript keyed with a PIN/UV auth token. The token is
//! obtained beforehand (getPinUvAuthTokenUsingPinWithPermissions with the
//! bio enrollment permission); this module only signs with it.

use crate::error::Result;

use biokey_crypto::pin_protocol;

use std::fmt;

/// Signs command transcripts with a PIN/UV auth token
pub trait PinUvAuthProtocol {
    /// Protocol identifier sent as `pinUvAuthProtocol` (1 or 2)
    fn version(&self) -> u8;

    /// Compute `pinUvAuthParam` over `message`
    fn authenticate(&self, token: &PinUvAuthToken, message: &[u8]) -> Result<Vec<u8>>;
}

impl<P: PinUvAuthProtocol + ?Sized> PinUvAuthProtocol for &P {
    fn version(&self) -> u8 {
        (**self).version()
    }

    fn authenticate(&self, token: &PinUvAuthToken, message: &[u8]) -> Result<Vec<u8>> {
        (**self).authenticate(token, message)
    }
}

/// PIN protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PinProtocol {
    /// PIN protocol version 1 (16-byte HMAC-SHA-256 tag)
    V1 = 1,
    /// PIN protocol version 2 (32-byte HMAC-SHA-256 tag)
    V2 = 2,
}

impl PinProtocol {
    /// Create from the protocol identifier
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            1 => Some(Self::V1),
            2 => Some(Self::V2),
            _ => None,
        }
    }
}

impl PinUvAuthProtocol for PinProtocol {
    fn version(&self) -> u8 {
        *self as u8
    }

    fn authenticate(&self, token: &PinUvAuthToken, message: &[u8]) -> Result<Vec<u8>> {
        let tag = match self {
            PinProtocol::V1 => pin_protocol::v1::authenticate(token.as_bytes(), message)?.to_vec(),
            PinProtocol::V2 => pin_protocol::v2::authenticate(token.as_bytes(), message)?.to_vec(),
        };
        Ok(tag)
    }
}

/// A PIN/UV auth token
///
/// The bytes are never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct PinUvAuthToken(Vec<u8>);

impl PinUvAuthToken {
    /// Wrap raw token bytes
    pub fn new(token: Vec<u8>) -> Self {
        Self(token)
    }

    /// Get the token bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for PinUvAuthToken {
    fn from(token: Vec<u8>) -> Self {
        Self::new(token)
    }
}

impl From<&[u8]> for PinUvAuthToken {
    fn from(token: &[u8]) -> Self {
        Self::new(token.to_vec())
    }
}

impl fmt::Debug for PinUvAuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PinUvAuthToken([REDACTED; {}])", self.0.len())
    }
}
