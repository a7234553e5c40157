//! CTAP2 status codes
//!
//! The first byte of every CTAP2 response. `0x00` is success; everything else
//! is an error reported by the authenticator.
//!
//! Spec: <https://fidoalliance.org/specs/fido-v2.2-rd-20230321/fido-client-to-authenticator-protocol-v2.2-rd-20230321.html#error-responses>

use std::fmt;

/// CTAP2 status code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    Success,
    InvalidCommand,
    InvalidParameter,
    InvalidLength,
    InvalidSeq,
    Timeout,
    ChannelBusy,
    CborUnexpectedType,
    InvalidCbor,
    MissingParameter,
    LimitExceeded,
    OperationDenied,
    KeyStoreFull,
    UnsupportedOption,
    InvalidOption,
    KeepaliveCancel,
    NoCredentials,
    UserActionTimeout,
    NotAllowed,
    PinInvalid,
    PinBlocked,
    PinAuthInvalid,
    PinAuthBlocked,
    PinNotSet,
    PuatRequired,
    PinPolicyViolation,
    RequestTooLarge,
    ActionTimeout,
    UpRequired,
    UvBlocked,
    UnauthorizedPermission,
    UvInvalid,
    Other,
    /// Any code without a named variant
    Unknown(u8),
}

impl StatusCode {
    /// The raw status byte
    pub fn code(self) -> u8 {
        match self {
            Self::Success => 0x00,
            Self::InvalidCommand => 0x01,
            Self::InvalidParameter => 0x02,
            Self::InvalidLength => 0x03,
            Self::InvalidSeq => 0x04,
            Self::Timeout => 0x05,
            Self::ChannelBusy => 0x06,
            Self::CborUnexpectedType => 0x11,
            Self::InvalidCbor => 0x12,
            Self::MissingParameter => 0x14,
            Self::LimitExceeded => 0x15,
            Self::OperationDenied => 0x27,
            Self::KeyStoreFull => 0x28,
            Self::UnsupportedOption => 0x2B,
            Self::InvalidOption => 0x2C,
            Self::KeepaliveCancel => 0x2D,
            Self::NoCredentials => 0x2E,
            Self::UserActionTimeout => 0x2F,
            Self::NotAllowed => 0x30,
            Self::PinInvalid => 0x31,
            Self::PinBlocked => 0x32,
            Self::PinAuthInvalid => 0x33,
            Self::PinAuthBlocked => 0x34,
            Self::PinNotSet => 0x35,
            Self::PuatRequired => 0x36,
            Self::PinPolicyViolation => 0x37,
            Self::RequestTooLarge => 0x39,
            Self::ActionTimeout => 0x3A,
            Self::UpRequired => 0x3B,
            Self::UvBlocked => 0x3C,
            Self::UnauthorizedPermission => 0x40,
            Self::UvInvalid => 0x3F,
            Self::Other => 0x7F,
            Self::Unknown(code) => code,
        }
    }

    /// Check if this is the success code
    pub fn is_success(self) -> bool {
        self == Self::Success
    }
}

impl From<u8> for StatusCode {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::Success,
            0x01 => Self::InvalidCommand,
            0x02 => Self::InvalidParameter,
            0x03 => Self::InvalidLength,
            0x04 => Self::InvalidSeq,
            0x05 => Self::Timeout,
            0x06 => Self::ChannelBusy,
            0x11 => Self::CborUnexpectedType,
            0x12 => Self::InvalidCbor,
            0x14 => Self::MissingParameter,
            0x15 => Self::LimitExceeded,
            0x27 => Self::OperationDenied,
            0x28 => Self::KeyStoreFull,
            0x2B => Self::UnsupportedOption,
            0x2C => Self::InvalidOption,
            0x2D => Self::KeepaliveCancel,
            0x2E => Self::NoCredentials,
            0x2F => Self::UserActionTimeout,
            0x30 => Self::NotAllowed,
            0x31 => Self::PinInvalid,
            0x32 => Self::PinBlocked,
            0x33 => Self::PinAuthInvalid,
            0x34 => Self::PinAuthBlocked,
            0x35 => Self::PinNotSet,
            0x36 => Self::PuatRequired,
            0x37 => Self::PinPolicyViolation,
            0x39 => Self::RequestTooLarge,
            0x3A => Self::ActionTimeout,
            0x3B => Self::UpRequired,
            0x3C => Self::UvBlocked,
            0x3F => Self::UvInvalid,
            0x40 => Self::UnauthorizedPermission,
            0x7F => Self::Other,
            code => Self::Unknown(code),
        }
    }
}

impl From<StatusCode> for u8 {
    fn from(status: StatusCode) -> u8 {
        status.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "CTAP error 0x{:02x}", code),
            other => write!(f, "{:?}(0x{:02x})", other, other.code()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(StatusCode::from(0x2C), StatusCode::InvalidOption);
        assert_eq!(StatusCode::InvalidOption.code(), 0x2C);
        assert_eq!(StatusCode::from(0x00), StatusCode::Success);
        assert!(StatusCode::Success.is_success());
    }

    #[test]
    fn test_permission_and_timeout_codes() {
        assert_eq!(StatusCode::from(0x39), StatusCode::RequestTooLarge);
        assert_eq!(StatusCode::from(0x3A), StatusCode::ActionTimeout);
        assert_eq!(StatusCode::from(0x40), StatusCode::UnauthorizedPermission);
        assert_eq!(StatusCode::UnauthorizedPermission.code(), 0x40);
    }

    #[test]
    fn test_conversion_is_lossless() {
        for code in 0..=u8::MAX {
            assert_eq!(StatusCode::from(code).code(), code);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(StatusCode::InvalidOption.to_string(), "InvalidOption(0x2c)");
        assert_eq!(StatusCode::from(0xE5).to_string(), "CTAP error 0xe5");
    }
}
