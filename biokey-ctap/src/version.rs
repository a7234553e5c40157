//! Firmware version triples
//!
//! Devices report their firmware either as three raw bytes or as a
//! human-readable string ending in `MAJOR.MINOR.MICRO`. Versions order
//! lexicographically over the three components.

use crate::error::{Error, Result};

use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// A `major.minor.micro` firmware version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    pub major: u8,
    pub minor: u8,
    pub micro: u8,
}

impl Version {
    /// Version reported when the device gave nothing usable
    pub const UNKNOWN: Version = Version::new(0, 0, 0);

    /// Create a new version
    pub const fn new(major: u8, minor: u8, micro: u8) -> Self {
        Self {
            major,
            minor,
            micro,
        }
    }

    /// Read the first three bytes verbatim
    ///
    /// Fewer than three bytes yields [`Version::UNKNOWN`].
    pub fn from_bytes(bytes: &[u8]) -> Self {
        match bytes {
            [major, minor, micro, ..] => Self::new(*major, *minor, *micro),
            _ => Self::UNKNOWN,
        }
    }

    /// Parse from a string like `"Firmware version 5.2.1"`
    ///
    /// Only the last whitespace-separated token is considered. It must have
    /// at least three dot-separated fields, otherwise the result is
    /// [`Version::UNKNOWN`]. A field that is not an integer reads as 0.
    ///
    /// # Example
    ///
    /// ```
    /// # use biokey_ctap::Version;
    /// assert_eq!(Version::parse_str("Firmware version 5.2.1"), Version::new(5, 2, 1));
    /// assert_eq!(Version::parse_str("Firmware 1.2"), Version::UNKNOWN);
    /// ```
    pub fn parse_str(name_and_version: &str) -> Self {
        let Some(token) = name_and_version.split_whitespace().last() else {
            return Self::UNKNOWN;
        };

        let mut parts: Vec<&str> = token.split('.').collect();
        while parts.last() == Some(&"") {
            parts.pop();
        }
        if parts.len() < 3 {
            return Self::UNKNOWN;
        }

        // Out-of-range numbers keep their low byte
        let field = |s: &str| s.parse::<i32>().map(|v| v as u8).unwrap_or(0);
        Self::new(field(parts[0]), field(parts[1]), field(parts[2]))
    }

    /// The three raw bytes
    pub fn to_bytes(self) -> [u8; 3] {
        [self.major, self.minor, self.micro]
    }

    /// Check if this version is at least `major.minor.micro`
    pub fn is_at_least(&self, major: u8, minor: u8, micro: u8) -> bool {
        *self >= Self::new(major, minor, micro)
    }

    /// Check if this version is strictly below `major.minor.micro`
    pub fn is_less_than(&self, major: u8, minor: u8, micro: u8) -> bool {
        *self < Self::new(major, minor, micro)
    }

    /// Gate a feature on a minimum version
    ///
    /// A `major` of 0 means the feature is unconstrained and never fails.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unsupported`] if this version is older than required.
    pub fn require_at_least(&self, major: u8, minor: u8, micro: u8) -> Result<()> {
        if major != 0 && self.is_less_than(major, minor, micro) {
            return Err(Error::Unsupported {
                required: Self::new(major, minor, micro),
                actual: *self,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)
    }
}

impl FromStr for Version {
    type Err = Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::parse_str(s))
    }
}

impl From<[u8; 3]> for Version {
    fn from(bytes: [u8; 3]) -> Self {
        Self::from_bytes(&bytes)
    }
}
