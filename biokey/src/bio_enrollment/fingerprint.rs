use super::{
    param, result, template_info, CaptureStatus, EnrollBeginStatus, EnrollmentContext,
    EnrollmentInfo, FingerprintKind, Modality, SampleStatus, SensorInfo, SubCommand, TemplateId,
};
use crate::config::BioEnrollmentConfig;
use crate::error::{Error, Result};
use crate::observer::{EnrollmentObserver, LogObserver};
use crate::pin_uv::{PinUvAuthProtocol, PinUvAuthToken};
use crate::session::{BioEnrollmentRequest, CommandSession};

use biokey_ctap::{ParameterMap, ResponseMap, StatusCode};

/// Build the message signed for an authenticated sub-command
///
/// `modality || sub_command || cbor(params)`; the parameter encoding is
/// omitted when there are no parameters. An empty map still counts as
/// parameters and contributes `0xa0`.
///
/// # Example
///
/// ```
/// use biokey::auth_transcript;
/// use biokey_ctap::ParameterMap;
///
/// let params = ParameterMap::new().insert_bytes(0x01, &[0xaa, 0xbb]);
/// let message = auth_transcript(0x01, 0x06, Some(&params)).unwrap();
/// assert_eq!(message, [0x01, 0x06, 0xa1, 0x01, 0x42, 0xaa, 0xbb]);
/// ```
pub fn auth_transcript(modality: u8, sub_command: u8, params: Option<&ParameterMap>) -> Result<Vec<u8>> {
    let mut message = vec![modality, sub_command];
    if let Some(params) = params {
        message.extend_from_slice(&params.to_bytes()?);
    }
    Ok(message)
}

/// Fingerprint bio enrollment client
///
/// Borrows a [`CommandSession`] for its lifetime and signs state-changing
/// sub-commands with a PIN/UV auth token that carries the bio enrollment
/// permission. Sensor info, modality and cancel are sent unauthenticated.
///
/// # Example
///
/// ```no_run
/// use biokey::{
///     Ctap2Session, FingerprintBioEnrollment, PinProtocol, PinUvAuthToken, Result,
///     SmartCardConnection,
/// };
///
/// fn enroll_finger(reader: impl SmartCardConnection, token: Vec<u8>) -> Result<()> {
///     let mut session = Ctap2Session::new(reader);
///     let mut bio = FingerprintBioEnrollment::new(
///         &mut session,
///         PinProtocol::V2,
///         PinUvAuthToken::new(token),
///     );
///
///     let mut enrollment = bio.enroll(Some(10_000));
///     let template_id = loop {
///         match enrollment.capture(&mut bio) {
///             Ok(Some(template_id)) => break template_id,
///             Ok(None) => println!("{:?} samples left", enrollment.remaining()),
///             Err(e) if e.is_capture_failure() => println!("{}, try again", e),
///             Err(e) => return Err(e),
///         }
///     };
///
///     bio.set_name(&template_id, "Left index")?;
///     Ok(())
/// }
/// ```
pub struct FingerprintBioEnrollment<'a> {
    session: &'a mut dyn CommandSession,
    protocol: Box<dyn PinUvAuthProtocol + 'a>,
    token: PinUvAuthToken,
    observer: Box<dyn EnrollmentObserver + 'a>,
    config: BioEnrollmentConfig,
}

impl<'a> FingerprintBioEnrollment<'a> {
    /// Create a client with the default configuration
    pub fn new(
        session: &'a mut dyn CommandSession,
        protocol: impl PinUvAuthProtocol + 'a,
        token: PinUvAuthToken,
    ) -> Self {
        Self {
            session,
            protocol: Box::new(protocol),
            token,
            observer: Box::new(LogObserver),
            config: BioEnrollmentConfig::default(),
        }
    }

    /// Create a client with a custom configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedOnFirmware`] if
    /// [`required_version`](BioEnrollmentConfig::required_version) is set and
    /// the session reports an older firmware.
    pub fn with_config(
        session: &'a mut dyn CommandSession,
        protocol: impl PinUvAuthProtocol + 'a,
        token: PinUvAuthToken,
        config: BioEnrollmentConfig,
    ) -> Result<Self> {
        if let Some(required) = config.required_version {
            session
                .firmware_version()
                .require_at_least(required.major, required.minor, required.micro)?;
        }
        let mut bio = Self::new(session, protocol, token);
        bio.config = config;
        Ok(bio)
    }

    /// Replace the event observer (defaults to [`LogObserver`])
    pub fn with_observer(mut self, observer: impl EnrollmentObserver + 'a) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// The active configuration
    pub fn config(&self) -> &BioEnrollmentConfig {
        &self.config
    }

    pub(crate) fn observer(&self) -> &dyn EnrollmentObserver {
        self.observer.as_ref()
    }

    fn call(
        &mut self,
        sub_command: SubCommand,
        params: Option<ParameterMap>,
        authenticate: bool,
    ) -> Result<ResponseMap> {
        let modality = Modality::Fingerprint.code();
        let mut request = BioEnrollmentRequest::new(modality, sub_command.as_u8());

        if authenticate {
            let message = auth_transcript(modality, sub_command.as_u8(), params.as_ref())?;
            let param = self.protocol.authenticate(&self.token, &message)?;
            request = request.with_auth(self.protocol.version(), param);
        }
        request = request.with_params(params);

        self.dispatch(Some(sub_command), &request, authenticate)
    }

    fn dispatch(
        &mut self,
        sub_command: Option<SubCommand>,
        request: &BioEnrollmentRequest,
        authenticated: bool,
    ) -> Result<ResponseMap> {
        self.observer.request_sent(sub_command, authenticated);
        let response = self.session.bio_enrollment(request)?;
        self.observer.response_received(sub_command, &response);
        Ok(response)
    }

    /// Query the biometric modality the authenticator supports
    pub fn get_modality(&mut self) -> Result<Modality> {
        let response = self.dispatch(None, &BioEnrollmentRequest::get_modality(), false)?;
        let modality = response.get_uint(result::MODALITY)?;
        u8::try_from(modality)
            .map(Modality::from)
            .map_err(|_| Error::ProtocolViolation(format!("modality {} out of range", modality)))
    }

    /// Read the fingerprint sensor properties
    ///
    /// Fields the device leaves out stay `None`.
    pub fn get_sensor_info(&mut self) -> Result<SensorInfo> {
        let response = self.call(SubCommand::GetFingerprintSensorInfo, None, false)?;

        let fingerprint_kind = response
            .get_uint_opt(result::FINGERPRINT_KIND)?
            .map(|kind| to_u8(result::FINGERPRINT_KIND, kind).map(FingerprintKind::from))
            .transpose()?;
        let max_capture_samples_required = response
            .get_uint_opt(result::MAX_CAPTURE_SAMPLES_REQUIRED)?
            .map(|n| to_u32(result::MAX_CAPTURE_SAMPLES_REQUIRED, n))
            .transpose()?;
        let max_template_friendly_name = response
            .get_uint_opt(result::MAX_TEMPLATE_FRIENDLY_NAME)?
            .map(|n| to_u32(result::MAX_TEMPLATE_FRIENDLY_NAME, n))
            .transpose()?;

        Ok(SensorInfo {
            fingerprint_kind,
            max_capture_samples_required,
            max_template_friendly_name,
        })
    }

    /// Start enrolling a new fingerprint
    ///
    /// The returned status describes the first sample, which may itself have
    /// been rejected. `timeout_ms` is sent only when given.
    pub fn enroll_begin(&mut self, timeout_ms: Option<u32>) -> Result<EnrollBeginStatus> {
        let params = ParameterMap::new().insert_uint_opt(param::TIMEOUT_MS, timeout_ms.map(u64::from));
        let response = self.call(SubCommand::EnrollBegin, Some(params), true)?;

        let template_id = TemplateId::new(response.get_bytes(result::TEMPLATE_ID)?);
        let status = capture_status(&response)?;
        self.observer.sample_captured(&status);

        Ok(EnrollBeginStatus {
            template_id,
            status,
        })
    }

    /// Capture the next sample for an enrollment in progress
    pub fn enroll_capture_next(
        &mut self,
        template_id: &TemplateId,
        timeout_ms: Option<u32>,
    ) -> Result<CaptureStatus> {
        let params = ParameterMap::new()
            .insert_bytes(param::TEMPLATE_ID, template_id.as_bytes())
            .insert_uint_opt(param::TIMEOUT_MS, timeout_ms.map(u64::from));
        let response = self.call(SubCommand::EnrollCaptureNextSample, Some(params), true)?;

        let status = capture_status(&response)?;
        self.observer.sample_captured(&status);
        Ok(status)
    }

    /// Cancel the enrollment in progress
    ///
    /// Safe to send with nothing in progress.
    pub fn enroll_cancel(&mut self) -> Result<()> {
        self.call(SubCommand::CancelCurrentEnrollment, None, false)?;
        self.observer.enrollment_cancelled();
        Ok(())
    }

    /// List enrolled templates and their friendly names
    ///
    /// An authenticator with nothing enrolled answers `CTAP2_ERR_INVALID_OPTION`,
    /// which is reported as an empty map. Every other error is returned.
    pub fn enumerate_enrollments(&mut self) -> Result<EnrollmentInfo> {
        let response = match self.call(SubCommand::EnumerateEnrollments, None, true) {
            Ok(response) => response,
            Err(Error::Ctap(StatusCode::InvalidOption)) => {
                let enrollments = EnrollmentInfo::new();
                self.observer.enrollments_enumerated(&enrollments);
                return Ok(enrollments);
            }
            Err(e) => return Err(e),
        };

        let mut enrollments = EnrollmentInfo::new();
        for entry in response.get_array(result::TEMPLATE_INFOS)? {
            let info = ResponseMap::from_value(entry.clone())?;
            let template_id = TemplateId::new(info.get_bytes(template_info::ID)?);
            let name = info.get_text_opt(template_info::NAME)?;
            enrollments.insert(template_id, name);
        }

        self.observer.enrollments_enumerated(&enrollments);
        Ok(enrollments)
    }

    /// Set the friendly name of a template
    ///
    /// # Errors
    ///
    /// Returns [`Error::FriendlyNameTooLong`] without contacting the device
    /// when [`max_friendly_name_length`](BioEnrollmentConfig::max_friendly_name_length)
    /// is configured and `name` exceeds it.
    pub fn set_name(&mut self, template_id: &TemplateId, name: &str) -> Result<()> {
        if let Some(max) = self.config.max_friendly_name_length {
            if name.len() > max {
                return Err(Error::FriendlyNameTooLong {
                    len: name.len(),
                    max,
                });
            }
        }

        let params = ParameterMap::new()
            .insert_bytes(param::TEMPLATE_ID, template_id.as_bytes())
            .insert_text(param::TEMPLATE_FRIENDLY_NAME, name);
        self.call(SubCommand::SetFriendlyName, Some(params), true)?;

        self.observer.template_renamed(template_id, name);
        Ok(())
    }

    /// Delete an enrolled template
    pub fn remove_enrollment(&mut self, template_id: &TemplateId) -> Result<()> {
        let params = ParameterMap::new().insert_bytes(param::TEMPLATE_ID, template_id.as_bytes());
        self.call(SubCommand::RemoveEnrollment, Some(params), true)?;

        self.observer.template_removed(template_id);
        Ok(())
    }

    /// Start a multi-sample enrollment
    ///
    /// Nothing is sent until the first [`EnrollmentContext::capture`]. Without
    /// an explicit timeout the configured default is used.
    pub fn enroll(&self, timeout_ms: Option<u32>) -> EnrollmentContext {
        EnrollmentContext::new(timeout_ms.or(self.config.default_timeout_ms))
    }
}

fn capture_status(response: &ResponseMap) -> Result<CaptureStatus> {
    let status = response.get_uint(result::LAST_ENROLL_SAMPLE_STATUS)?;
    let remaining = response.get_uint(result::REMAINING_SAMPLES)?;
    Ok(CaptureStatus {
        sample_status: SampleStatus::from(to_u8(result::LAST_ENROLL_SAMPLE_STATUS, status)?),
        remaining_samples: to_u32(result::REMAINING_SAMPLES, remaining)?,
    })
}

fn to_u8(key: i128, value: u64) -> Result<u8> {
    u8::try_from(value)
        .map_err(|_| Error::ProtocolViolation(format!("value {} for key {} out of range", value, key)))
}

fn to_u32(key: i128, value: u64) -> Result<u32> {
    u32::try_from(value)
        .map_err(|_| Error::ProtocolViolation(format!("value {} for key {} out of range", value, key)))
}
