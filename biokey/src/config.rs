//! Configuration for fingerprint bio enrollment
//!
//! Everything here is optional. The defaults send exactly what the caller
//! asks for and leave all limits to the authenticator.

use biokey_ctap::Version;

/// Bio enrollment configuration
///
/// # Example
///
/// ```
/// use biokey::BioEnrollmentConfig;
/// use biokey_ctap::Version;
///
/// let config = BioEnrollmentConfig::builder()
///     .default_timeout_ms(10_000)
///     .max_friendly_name_length(15)
///     .required_version(Version::new(5, 2, 0))
///     .build();
/// assert_eq!(config.default_timeout_ms, Some(10_000));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BioEnrollmentConfig {
    /// Timeout used by [`enroll`](crate::FingerprintBioEnrollment::enroll) when the caller gives none
    pub default_timeout_ms: Option<u32>,

    /// Reject longer friendly names (in UTF-8 bytes) before contacting the device
    ///
    /// `None` lets the authenticator enforce its own limit.
    pub max_friendly_name_length: Option<usize>,

    /// Minimum firmware version, checked when the enrollment client is created
    pub required_version: Option<Version>,
}

impl BioEnrollmentConfig {
    /// Create a configuration with all defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new builder for constructing configuration
    pub fn builder() -> BioEnrollmentConfigBuilder {
        BioEnrollmentConfigBuilder::new()
    }
}

/// Builder for [`BioEnrollmentConfig`]
#[derive(Debug, Default)]
pub struct BioEnrollmentConfigBuilder {
    config: BioEnrollmentConfig,
}

impl BioEnrollmentConfigBuilder {
    /// Create a new builder with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the timeout applied to captures when none is passed explicitly
    pub fn default_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.config.default_timeout_ms = Some(timeout_ms);
        self
    }

    /// Validate friendly names client-side against this length
    ///
    /// Usually taken from [`SensorInfo::max_template_friendly_name`](crate::SensorInfo).
    pub fn max_friendly_name_length(mut self, max: usize) -> Self {
        self.config.max_friendly_name_length = Some(max);
        self
    }

    /// Require at least this firmware version
    pub fn required_version(mut self, version: Version) -> Self {
        self.config.required_version = Some(version);
        self
    }

    /// Build the final configuration
    pub fn build(self) -> BioEnrollmentConfig {
        self.config
    }
}
