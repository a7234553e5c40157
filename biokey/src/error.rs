//! Errors returned by the biokey client
//!
//! Transport failures, device-reported CTAP errors, malformed responses and
//! capture feedback are distinct variants so callers can match on them. Only
//! [`Error::CaptureFailed`] is an expected, retryable outcome of normal use.

use crate::bio_enrollment::{EnrollmentState, SampleStatus};

use biokey_crypto::CryptoError;
use biokey_ctap::{StatusCode, Version};

use thiserror::Error;

/// Errors that can occur when talking to an authenticator
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The underlying byte exchange failed
    #[error("Transport error: {0}")]
    Transport(String),

    /// The authenticator rejected the command with a CTAP status code
    #[error("CTAP error: {0}")]
    Ctap(StatusCode),

    /// The smart-card layer answered with a non-success status word
    #[error("APDU error: SW=0x{sw:04x}")]
    Apdu { sw: u16 },

    /// A transport response was too short to frame
    #[error("Malformed response: {len} bytes, at least 2 required")]
    MalformedResponse { len: usize },

    /// A response lacked a required field or had the wrong shape
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// The sensor reported a bad sample; the capture may be retried
    #[error("Fingerprint capture error: {0}")]
    CaptureFailed(SampleStatus),

    /// The firmware is too old for the requested operation
    #[error("This action requires firmware {required} or later (found {actual})")]
    UnsupportedOnFirmware { required: Version, actual: Version },

    /// The enrollment context already reached a terminal state
    #[error("Enrollment is {0}, no further captures are possible")]
    InvalidState(EnrollmentState),

    /// A friendly name exceeds the configured limit
    #[error("Friendly name is {len} bytes, at most {max} allowed")]
    FriendlyNameTooLong { len: usize, max: usize },

    /// A request could not be encoded
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Computing the PIN/UV auth parameter failed
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}

impl Error {
    /// The CTAP status byte, if the device reported one
    pub fn ctap_code(&self) -> Option<u8> {
        match self {
            Error::Ctap(status) => Some(status.code()),
            _ => None,
        }
    }

    /// Check if this is retryable capture feedback
    pub fn is_capture_failure(&self) -> bool {
        matches!(self, Error::CaptureFailed(_))
    }
}

impl From<biokey_ctap::Error> for Error {
    fn from(err: biokey_ctap::Error) -> Self {
        use biokey_ctap::Error as Wire;

        match err {
            Wire::MalformedResponse { len } => Error::MalformedResponse { len },
            Wire::Unsupported { required, actual } => {
                Error::UnsupportedOnFirmware { required, actual }
            }
            Wire::DataTooLong(_) => Error::InvalidRequest(err.to_string()),
            Wire::InvalidCbor(_) | Wire::MissingField(_) | Wire::UnexpectedType { .. } => {
                Error::ProtocolViolation(err.to_string())
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Transport(err.to_string())
    }
}

/// Result type alias for biokey operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_errors_map_to_taxonomy() {
        assert_eq!(
            Error::from(biokey_ctap::Error::MalformedResponse { len: 1 }),
            Error::MalformedResponse { len: 1 }
        );
        assert!(matches!(
            Error::from(biokey_ctap::Error::MissingField(4)),
            Error::ProtocolViolation(_)
        ));
        assert_eq!(
            Error::from(biokey_ctap::Error::Unsupported {
                required: Version::new(5, 2, 0),
                actual: Version::new(4, 3, 1),
            }),
            Error::UnsupportedOnFirmware {
                required: Version::new(5, 2, 0),
                actual: Version::new(4, 3, 1),
            }
        );
    }

    #[test]
    fn test_ctap_code() {
        assert_eq!(Error::Ctap(StatusCode::InvalidOption).ctap_code(), Some(0x2C));
        assert_eq!(Error::Transport("gone".into()).ctap_code(), None);
    }

    #[test]
    fn test_capture_failure_display() {
        let err = Error::CaptureFailed(SampleStatus::TooFast);
        assert!(err.is_capture_failure());
        assert_eq!(err.to_string(), "Fingerprint capture error: too fast (0x05)");
    }

    #[test]
    fn test_io_error_is_transport() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "reader gone");
        assert_eq!(Error::from(io), Error::Transport("reader gone".into()));
    }
}
