//! CTAP2 command codes used for bio enrollment
//!
//! CTAP 2.1 defines `authenticatorBioEnrollment` as 0x09. Authenticators that
//! shipped before the final 2.1 specification expose the same sub-command set
//! under the vendor prototype code 0x40 and advertise `userVerificationMgmtPreview`
//! instead of `bioEnroll` in getInfo.

/// Command code carrying bio enrollment requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum CtapCommand {
    /// authenticatorBioEnrollment (0x09)
    #[default]
    BioEnrollment = 0x09,
    /// Prototype bio enrollment (0x40) from CTAP 2.1-PRE
    BioEnrollmentPreview = 0x40,
}

impl CtapCommand {
    /// Get the command code as a byte value
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Create a CtapCommand from a byte value
    ///
    /// Returns `None` if the byte doesn't correspond to a bio enrollment command.
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x09 => Some(Self::BioEnrollment),
            0x40 => Some(Self::BioEnrollmentPreview),
            _ => None,
        }
    }
}

impl From<CtapCommand> for u8 {
    fn from(cmd: CtapCommand) -> Self {
        cmd.as_u8()
    }
}

impl std::fmt::Display for CtapCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BioEnrollment => write!(f, "BioEnrollment(0x09)"),
            Self::BioEnrollmentPreview => write!(f, "BioEnrollmentPreview(0x40)"),
        }
    }
}
