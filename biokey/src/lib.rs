//! Authenticated fingerprint enrollment for FIDO2 security keys
//!
//! Drives the CTAP2 `authenticatorBioEnrollment` command from the client
//! side: sensor info, multi-sample enrollment, listing, renaming and removing
//! fingerprint templates. State-changing sub-commands are signed with a
//! PIN/UV auth token.
//!
//! The device is reached through a [`CommandSession`]. [`Ctap2Session`]
//! provides one over any [`SmartCardConnection`].

#![warn(unused_extern_crates)]

pub mod bio_enrollment;
pub mod config;
pub mod ctap_command;
pub mod error;
pub mod observer;
pub mod pin_uv;
pub mod session;

// Re-export main types at root level for convenience
pub use bio_enrollment::{
    auth_transcript, CaptureStatus, EnrollBeginStatus, EnrollmentContext, EnrollmentInfo,
    EnrollmentState, FingerprintBioEnrollment, FingerprintKind, Modality, SampleStatus,
    SensorInfo, SubCommand, TemplateId,
};
pub use config::{BioEnrollmentConfig, BioEnrollmentConfigBuilder};
pub use ctap_command::CtapCommand;
pub use error::{Error, Result};
pub use observer::{EnrollmentObserver, LogObserver};
pub use pin_uv::{PinProtocol, PinUvAuthProtocol, PinUvAuthToken};
pub use session::{BioEnrollmentRequest, CommandSession, Ctap2Session, SmartCardConnection};
