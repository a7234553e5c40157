//! Biometric enrollment (authenticatorBioEnrollment)
//!
//! Enrolls, lists, renames and removes fingerprint templates on an
//! authenticator with a built-in sensor. Enrollment is interactive: the
//! device asks for several samples and reports feedback on each one.
//!
//! - [`FingerprintBioEnrollment`] issues the individual sub-commands.
//! - [`EnrollmentContext`] drives begin / capture-next until the template
//!   is complete.
//!
//! Spec: <https://fidoalliance.org/specs/fido-v2.2-rd-20230321/fido-client-to-authenticator-protocol-v2.2-rd-20230321.html#authenticatorBioEnrollment>

mod context;
mod fingerprint;

pub use context::{EnrollmentContext, EnrollmentState};
pub use fingerprint::{auth_transcript, FingerprintBioEnrollment};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use std::collections::BTreeMap;
use std::fmt;

/// subCommandParams keys
pub(crate) mod param {
    pub const TEMPLATE_ID: u8 = 0x01;
    pub const TEMPLATE_FRIENDLY_NAME: u8 = 0x02;
    pub const TIMEOUT_MS: u8 = 0x03;
}

/// Response map keys
pub(crate) mod result {
    pub const MODALITY: i128 = 0x01;
    pub const FINGERPRINT_KIND: i128 = 0x02;
    pub const MAX_CAPTURE_SAMPLES_REQUIRED: i128 = 0x03;
    pub const TEMPLATE_ID: i128 = 0x04;
    pub const LAST_ENROLL_SAMPLE_STATUS: i128 = 0x05;
    pub const REMAINING_SAMPLES: i128 = 0x06;
    pub const TEMPLATE_INFOS: i128 = 0x07;
    pub const MAX_TEMPLATE_FRIENDLY_NAME: i128 = 0x08;
}

/// templateInfo keys
pub(crate) mod template_info {
    pub const ID: i128 = 0x01;
    pub const NAME: i128 = 0x02;
}

/// Biometric modality multiplexed over the bio enrollment command
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Modality {
    Fingerprint,
    Other(u8),
}

impl Modality {
    /// The modality byte
    pub fn code(self) -> u8 {
        match self {
            Modality::Fingerprint => 0x01,
            Modality::Other(code) => code,
        }
    }
}

impl From<u8> for Modality {
    fn from(value: u8) -> Self {
        match value {
            0x01 => Modality::Fingerprint,
            other => Modality::Other(other),
        }
    }
}

/// Fingerprint enrollment sub-commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SubCommand {
    EnrollBegin = 0x01,
    EnrollCaptureNextSample = 0x02,
    CancelCurrentEnrollment = 0x03,
    EnumerateEnrollments = 0x04,
    SetFriendlyName = 0x05,
    RemoveEnrollment = 0x06,
    GetFingerprintSensorInfo = 0x07,
}

impl SubCommand {
    /// The sub-command byte
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SubCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(0x{:02x})", self, self.as_u8())
    }
}

/// Feedback about the last fingerprint sample
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleStatus {
    Good,
    TooHigh,
    TooLow,
    TooLeft,
    TooRight,
    TooFast,
    TooSlow,
    PoorQuality,
    TooSkewed,
    TooShort,
    MergeFailure,
    AlreadyExists,
    NoUserActivity,
    NoUserPresenceTransition,
    /// A code this client has no name for (including the unused 0x0C)
    Unknown(u8),
}

impl SampleStatus {
    /// The raw feedback code
    pub fn code(self) -> u8 {
        match self {
            Self::Good => 0x00,
            Self::TooHigh => 0x01,
            Self::TooLow => 0x02,
            Self::TooLeft => 0x03,
            Self::TooRight => 0x04,
            Self::TooFast => 0x05,
            Self::TooSlow => 0x06,
            Self::PoorQuality => 0x07,
            Self::TooSkewed => 0x08,
            Self::TooShort => 0x09,
            Self::MergeFailure => 0x0A,
            Self::AlreadyExists => 0x0B,
            Self::NoUserActivity => 0x0D,
            Self::NoUserPresenceTransition => 0x0E,
            Self::Unknown(code) => code,
        }
    }

    /// Check if the sample was accepted
    pub fn is_good(self) -> bool {
        self == Self::Good
    }

    fn description(self) -> &'static str {
        match self {
            Self::Good => "good",
            Self::TooHigh => "too high",
            Self::TooLow => "too low",
            Self::TooLeft => "too left",
            Self::TooRight => "too right",
            Self::TooFast => "too fast",
            Self::TooSlow => "too slow",
            Self::PoorQuality => "poor quality",
            Self::TooSkewed => "too skewed",
            Self::TooShort => "too short",
            Self::MergeFailure => "merge failure",
            Self::AlreadyExists => "already exists",
            Self::NoUserActivity => "no user activity",
            Self::NoUserPresenceTransition => "no user presence transition",
            Self::Unknown(_) => "unknown",
        }
    }
}

impl From<u8> for SampleStatus {
    fn from(value: u8) -> Self {
        match value {
            0x00 => Self::Good,
            0x01 => Self::TooHigh,
            0x02 => Self::TooLow,
            0x03 => Self::TooLeft,
            0x04 => Self::TooRight,
            0x05 => Self::TooFast,
            0x06 => Self::TooSlow,
            0x07 => Self::PoorQuality,
            0x08 => Self::TooSkewed,
            0x09 => Self::TooShort,
            0x0A => Self::MergeFailure,
            0x0B => Self::AlreadyExists,
            0x0D => Self::NoUserActivity,
            0x0E => Self::NoUserPresenceTransition,
            code => Self::Unknown(code),
        }
    }
}

impl fmt::Display for SampleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (0x{:02x})", self.description(), self.code())
    }
}

/// Identifier the authenticator assigned to an enrolled template
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TemplateId(Vec<u8>);

impl TemplateId {
    /// Wrap raw identifier bytes
    pub fn new(id: Vec<u8>) -> Self {
        Self(id)
    }

    /// Get the identifier bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consume into the identifier bytes
    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl From<Vec<u8>> for TemplateId {
    fn from(id: Vec<u8>) -> Self {
        Self::new(id)
    }
}

impl From<&[u8]> for TemplateId {
    fn from(id: &[u8]) -> Self {
        Self::new(id.to_vec())
    }
}

impl AsRef<[u8]> for TemplateId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// URL-safe base64 without padding
impl fmt::Display for TemplateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&URL_SAFE_NO_PAD.encode(&self.0))
    }
}

/// Result of one sample capture
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureStatus {
    pub sample_status: SampleStatus,
    pub remaining_samples: u32,
}

/// Result of starting an enrollment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrollBeginStatus {
    pub template_id: TemplateId,
    pub status: CaptureStatus,
}

/// How the sensor takes samples
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FingerprintKind {
    Touch,
    Swipe,
    Other(u8),
}

impl From<u8> for FingerprintKind {
    fn from(value: u8) -> Self {
        match value {
            1 => FingerprintKind::Touch,
            2 => FingerprintKind::Swipe,
            other => FingerprintKind::Other(other),
        }
    }
}

/// Fingerprint sensor properties; every field is optional on the wire
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SensorInfo {
    pub fingerprint_kind: Option<FingerprintKind>,
    pub max_capture_samples_required: Option<u32>,
    pub max_template_friendly_name: Option<u32>,
}

/// Enrolled templates and their friendly names
pub type EnrollmentInfo = BTreeMap<TemplateId, Option<String>>;
