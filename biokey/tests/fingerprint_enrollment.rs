//! End-to-end fingerprint enrollment against a simulated authenticator
//!
//! The simulator sits behind a real `Ctap2Session`: it unwraps APDUs, decodes
//! the CBOR request, checks the pinUvAuthParam with its own HMAC and keeps a
//! template store. Long responses are chained with 61xx.

use biokey::{
    BioEnrollmentConfig, Ctap2Session, CtapCommand, EnrollmentObserver, EnrollmentState, Error,
    FingerprintBioEnrollment, FingerprintKind, PinProtocol, PinUvAuthToken, SampleStatus,
    SmartCardConnection, TemplateId,
};
use biokey_ctap::{ResponseMap, StatusCode, Version};

use assert_matches::assert_matches;
use ciborium::Value;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};

const TOKEN: [u8; 32] = [0x5C; 32];
const SAMPLES_REQUIRED: u64 = 3;
const MAX_CHUNK: usize = 24;

/// In-memory authenticator with a fingerprint sensor
struct SimulatedAuthenticator {
    command: u8,
    token: Vec<u8>,
    /// Feedback codes the "sensor" reports, one per begin / capture-next
    feedback: VecDeque<u8>,
    templates: BTreeMap<Vec<u8>, Option<String>>,
    enrolling: Option<(Vec<u8>, u64)>,
    next_id: u8,
    pending: Vec<u8>,
    /// (sub-command, authenticated) for every request seen
    log: Vec<(u8, bool)>,
    transcripts: Vec<Vec<u8>>,
}

impl SimulatedAuthenticator {
    fn new() -> Self {
        Self {
            command: 0x09,
            token: TOKEN.to_vec(),
            feedback: VecDeque::new(),
            templates: BTreeMap::new(),
            enrolling: None,
            next_id: 1,
            pending: Vec::new(),
            log: Vec::new(),
            transcripts: Vec::new(),
        }
    }

    fn with_feedback(mut self, feedback: &[u8]) -> Self {
        self.feedback.extend(feedback);
        self
    }

    fn handle_ctap(&mut self, message: &[u8]) -> Vec<u8> {
        match message.split_first() {
            Some((command, body)) if *command == self.command => match self.bio_enrollment(body) {
                Ok(response) => {
                    let mut out = vec![0x00];
                    out.extend(response.to_bytes().unwrap());
                    out
                }
                Err(status) => vec![status.code()],
            },
            _ => vec![StatusCode::InvalidCommand.code()],
        }
    }

    fn verify(&mut self, request: &ResponseMap, modality: u8, sub_command: u8) -> Result<(), StatusCode> {
        let Some(Value::Bytes(param)) = request.get(0x05) else {
            return Err(StatusCode::PuatRequired);
        };
        let protocol = request.get_uint(0x04).map_err(|_| StatusCode::MissingParameter)?;

        let mut message = vec![modality, sub_command];
        if let Some(params) = request.get(0x03) {
            ciborium::into_writer(params, &mut message).unwrap();
        }
        self.transcripts.push(message.clone());

        let mut mac = Hmac::<Sha256>::new_from_slice(&self.token).unwrap();
        mac.update(&message);
        let tag = mac.finalize().into_bytes();
        let expected = match protocol {
            1 => &tag[..16],
            2 => &tag[..],
            _ => return Err(StatusCode::InvalidParameter),
        };
        if param.as_slice() != expected {
            return Err(StatusCode::PinAuthInvalid);
        }
        Ok(())
    }

    fn sample(&mut self) -> u8 {
        self.feedback.pop_front().unwrap_or(0x00)
    }

    fn bio_enrollment(&mut self, body: &[u8]) -> Result<ResponseMap, StatusCode> {
        let request = ResponseMap::from_bytes(body).map_err(|_| StatusCode::InvalidCbor)?;

        if request.contains_key(0x06) {
            return Ok(ResponseMap::new().with(0x01, 1));
        }

        let modality = request.get_uint(0x01).map_err(|_| StatusCode::MissingParameter)? as u8;
        let sub_command = request.get_uint(0x02).map_err(|_| StatusCode::MissingParameter)? as u8;
        let authenticated = !matches!(sub_command, 0x03 | 0x07);
        self.log.push((sub_command, authenticated));
        if modality != 0x01 {
            return Err(StatusCode::InvalidParameter);
        }
        if authenticated {
            self.verify(&request, modality, sub_command)?;
        }
        let params = if request.contains_key(0x03) {
            request.get_map(0x03).map_err(|_| StatusCode::CborUnexpectedType)?
        } else {
            ResponseMap::new()
        };

        match sub_command {
            0x01 => {
                let id = vec![0xF0, self.next_id];
                self.next_id += 1;
                let status = self.sample();
                let remaining = if status == 0 { SAMPLES_REQUIRED - 1 } else { SAMPLES_REQUIRED };
                self.enrolling = Some((id.clone(), remaining));
                Ok(ResponseMap::new()
                    .with(0x04, Value::Bytes(id))
                    .with(0x05, status)
                    .with(0x06, remaining))
            }
            0x02 => {
                let id = params.get_bytes(0x01).map_err(|_| StatusCode::MissingParameter)?;
                let status = self.sample();
                let remaining = match &mut self.enrolling {
                    Some((current, remaining)) if *current == id => {
                        if status == 0 {
                            *remaining -= 1;
                        }
                        *remaining
                    }
                    _ => return Err(StatusCode::InvalidOption),
                };
                if remaining == 0 {
                    self.enrolling = None;
                    self.templates.insert(id, None);
                }
                Ok(ResponseMap::new().with(0x05, status).with(0x06, remaining))
            }
            0x03 => {
                self.enrolling = None;
                Ok(ResponseMap::new())
            }
            0x04 => {
                if self.templates.is_empty() {
                    return Err(StatusCode::InvalidOption);
                }
                let infos = self
                    .templates
                    .iter()
                    .map(|(id, name)| {
                        let mut entry = vec![(Value::Integer(1.into()), Value::Bytes(id.clone()))];
                        if let Some(name) = name {
                            entry.push((Value::Integer(2.into()), Value::Text(name.clone())));
                        }
                        Value::Map(entry)
                    })
                    .collect();
                Ok(ResponseMap::new().with(0x07, Value::Array(infos)))
            }
            0x05 => {
                let id = params.get_bytes(0x01).map_err(|_| StatusCode::MissingParameter)?;
                let name = params.get_text(0x02).map_err(|_| StatusCode::MissingParameter)?;
                if name.len() > 15 {
                    return Err(StatusCode::InvalidLength);
                }
                match self.templates.get_mut(&id) {
                    Some(slot) => {
                        *slot = Some(name);
                        Ok(ResponseMap::new())
                    }
                    None => Err(StatusCode::InvalidOption),
                }
            }
            0x06 => {
                let id = params.get_bytes(0x01).map_err(|_| StatusCode::MissingParameter)?;
                match self.templates.remove(&id) {
                    Some(_) => Ok(ResponseMap::new()),
                    None => Err(StatusCode::InvalidOption),
                }
            }
            0x07 => Ok(ResponseMap::new()
                .with(0x02, 1)
                .with(0x03, SAMPLES_REQUIRED)
                .with(0x08, 15)),
            _ => Err(StatusCode::InvalidParameter),
        }
    }

    /// Return at most `MAX_CHUNK` bytes, signalling the rest with 61xx
    fn respond(&mut self, mut payload: Vec<u8>) -> Vec<u8> {
        if payload.len() > MAX_CHUNK {
            self.pending = payload.split_off(MAX_CHUNK);
            let remaining = self.pending.len().min(0xFF) as u8;
            payload.extend([0x61, remaining]);
        } else {
            payload.extend([0x90, 0x00]);
        }
        payload
    }
}

impl SmartCardConnection for SimulatedAuthenticator {
    fn transmit(&mut self, apdu: &[u8]) -> std::io::Result<Vec<u8>> {
        match apdu {
            [0x00, 0xC0, ..] => {
                let rest = std::mem::take(&mut self.pending);
                Ok(self.respond(rest))
            }
            [0x80, 0x10, 0x00, 0x00, 0x00, hi, lo, rest @ ..] => {
                let len = u16::from_be_bytes([*hi, *lo]) as usize;
                let response = self.handle_ctap(&rest[..len]);
                Ok(self.respond(response))
            }
            [0x80, 0x10, 0x00, 0x00, lc, rest @ ..] => {
                let response = self.handle_ctap(&rest[..*lc as usize]);
                Ok(self.respond(response))
            }
            _ => Ok(vec![0x6D, 0x00]),
        }
    }
}

fn token() -> PinUvAuthToken {
    PinUvAuthToken::new(TOKEN.to_vec())
}

/// Records completion and rename events
#[derive(Default)]
struct EventLog {
    events: RefCell<Vec<String>>,
}

impl EnrollmentObserver for EventLog {
    fn enrollment_completed(&self, template_id: &TemplateId) {
        self.events.borrow_mut().push(format!("completed {}", template_id));
    }

    fn enrollment_cancelled(&self) {
        self.events.borrow_mut().push("cancelled".into());
    }

    fn template_renamed(&self, template_id: &TemplateId, name: &str) {
        self.events.borrow_mut().push(format!("renamed {} to {}", template_id, name));
    }
}

#[test]
fn test_enroll_name_list_and_remove() {
    let device = SimulatedAuthenticator::new().with_feedback(&[0x00, 0x05, 0x00, 0x00]);
    let mut session = Ctap2Session::new(device).with_version(Version::new(5, 2, 7));
    let events = EventLog::default();

    let mut bio = FingerprintBioEnrollment::new(&mut session, PinProtocol::V2, token()).with_observer(&events);

    let sensor = bio.get_sensor_info().unwrap();
    assert_eq!(sensor.fingerprint_kind, Some(FingerprintKind::Touch));
    assert_eq!(sensor.max_capture_samples_required, Some(3));

    let mut enrollment = bio.enroll(Some(10_000));
    assert_eq!(enrollment.capture(&mut bio), Ok(None));
    assert_eq!(enrollment.remaining(), Some(2));
    assert_eq!(
        enrollment.capture(&mut bio),
        Err(Error::CaptureFailed(SampleStatus::TooFast))
    );
    assert_eq!(enrollment.remaining(), Some(2));
    assert_eq!(enrollment.capture(&mut bio), Ok(None));

    let template_id = enrollment.capture(&mut bio).unwrap().unwrap();
    assert_eq!(template_id, TemplateId::new(vec![0xF0, 0x01]));
    assert_eq!(enrollment.state(), EnrollmentState::Complete);

    bio.set_name(&template_id, "Right thumb").unwrap();
    let enrollments = bio.enumerate_enrollments().unwrap();
    assert_eq!(enrollments.len(), 1);
    assert_eq!(enrollments[&template_id], Some("Right thumb".to_string()));

    bio.remove_enrollment(&template_id).unwrap();
    assert!(bio.enumerate_enrollments().unwrap().is_empty());
    drop(bio);

    assert_eq!(
        *events.events.borrow(),
        vec!["completed 8AE", "renamed 8AE to Right thumb"]
    );

    let device = session.into_inner();
    assert_eq!(
        device.log,
        vec![
            (0x07, false),
            (0x01, true),
            (0x02, true),
            (0x02, true),
            (0x02, true),
            (0x05, true),
            (0x04, true),
            (0x06, true),
            (0x04, true),
        ]
    );
    assert!(device.templates.is_empty());
}

#[test]
fn test_bad_first_sample_continues_same_template() {
    let device = SimulatedAuthenticator::new().with_feedback(&[0x0D, 0x00, 0x00, 0x00]);
    let mut session = Ctap2Session::new(device);
    let mut bio = FingerprintBioEnrollment::new(&mut session, PinProtocol::V2, token()).with_observer(());

    let mut enrollment = bio.enroll(None);
    assert_eq!(
        enrollment.capture(&mut bio),
        Err(Error::CaptureFailed(SampleStatus::NoUserActivity))
    );
    assert_eq!(enrollment.template_id(), Some(&TemplateId::new(vec![0xF0, 0x01])));
    assert_eq!(enrollment.state(), EnrollmentState::InProgress);

    assert_eq!(enrollment.capture(&mut bio), Ok(None));
    assert_eq!(enrollment.capture(&mut bio), Ok(None));
    assert_eq!(
        enrollment.capture(&mut bio),
        Ok(Some(TemplateId::new(vec![0xF0, 0x01])))
    );
    drop(bio);

    let device = session.into_inner();
    let sub_commands: Vec<u8> = device.log.iter().map(|(sub_command, _)| *sub_command).collect();
    assert_eq!(sub_commands, vec![0x01, 0x02, 0x02, 0x02]);
    assert_eq!(device.templates.len(), 1);
    assert!(device.enrolling.is_none());
}

#[test]
fn test_signed_transcripts() {
    let device = SimulatedAuthenticator::new();
    let mut session = Ctap2Session::new(device);
    let id = TemplateId::new(vec![0xAB]);

    let mut bio = FingerprintBioEnrollment::new(&mut session, PinProtocol::V1, token());
    // Unknown template: the device rejects after verifying the signature
    assert_eq!(bio.set_name(&id, "Thumb"), Err(Error::Ctap(StatusCode::InvalidOption)));
    assert_eq!(bio.remove_enrollment(&id), Err(Error::Ctap(StatusCode::InvalidOption)));
    drop(bio);

    let device = session.into_inner();
    assert_eq!(
        device.transcripts,
        vec![
            vec![0x01, 0x05, 0xA2, 0x01, 0x41, 0xAB, 0x02, 0x65, b'T', b'h', b'u', b'm', b'b'],
            vec![0x01, 0x06, 0xA1, 0x01, 0x41, 0xAB],
        ]
    );
}

#[test]
fn test_wrong_token_is_not_hidden_by_enumerate() {
    let mut session = Ctap2Session::new(SimulatedAuthenticator::new());
    let mut bio =
        FingerprintBioEnrollment::new(&mut session, PinProtocol::V1, PinUvAuthToken::new(vec![0x01; 32]));

    assert_eq!(
        bio.enumerate_enrollments(),
        Err(Error::Ctap(StatusCode::PinAuthInvalid))
    );
    assert_eq!(
        bio.enumerate_enrollments().unwrap_err().ctap_code(),
        Some(0x33)
    );
}

#[test]
fn test_cancel_mid_enrollment() {
    let mut session = Ctap2Session::new(SimulatedAuthenticator::new());
    let events = EventLog::default();
    let mut bio = FingerprintBioEnrollment::new(&mut session, PinProtocol::V2, token()).with_observer(&events);

    let mut enrollment = bio.enroll(None);
    enrollment.capture(&mut bio).unwrap();
    assert!(enrollment.template_id().is_some());

    enrollment.cancel(&mut bio).unwrap();
    enrollment.cancel(&mut bio).unwrap();
    assert_eq!(enrollment.state(), EnrollmentState::Cancelled);
    assert_eq!(enrollment.template_id(), None);
    assert_matches!(enrollment.capture(&mut bio), Err(Error::InvalidState(_)));
    drop(bio);

    assert_eq!(*events.events.borrow(), vec!["cancelled", "cancelled"]);
    let device = session.into_inner();
    assert!(device.enrolling.is_none());
    assert!(device.templates.is_empty());
}

#[test]
fn test_preview_command_and_modality() {
    let mut device = SimulatedAuthenticator::new();
    device.command = 0x40;
    let mut session = Ctap2Session::new(device).with_command(CtapCommand::BioEnrollmentPreview);

    let mut bio = FingerprintBioEnrollment::new(&mut session, PinProtocol::V2, token());
    assert_eq!(bio.get_modality().unwrap(), biokey::Modality::Fingerprint);
    drop(bio);

    let mut default_session = Ctap2Session::new(session.into_inner());
    let mut bio = FingerprintBioEnrollment::new(&mut default_session, PinProtocol::V2, token());
    assert_eq!(bio.get_modality(), Err(Error::Ctap(StatusCode::InvalidCommand)));
}

#[test]
fn test_firmware_gate_and_name_limit() {
    let mut session = Ctap2Session::new(SimulatedAuthenticator::new()).with_version(Version::new(5, 1, 2));

    let too_new = BioEnrollmentConfig::builder()
        .required_version(Version::new(5, 2, 0))
        .build();
    assert_matches!(
        FingerprintBioEnrollment::with_config(&mut session, PinProtocol::V2, token(), too_new).err(),
        Some(Error::UnsupportedOnFirmware { .. })
    );

    let config = BioEnrollmentConfig::builder()
        .required_version(Version::new(5, 1, 0))
        .max_friendly_name_length(15)
        .build();
    let mut bio = FingerprintBioEnrollment::with_config(&mut session, PinProtocol::V2, token(), config).unwrap();
    assert_eq!(
        bio.set_name(&TemplateId::new(vec![0x01]), "A very long finger name"),
        Err(Error::FriendlyNameTooLong { len: 23, max: 15 })
    );
    drop(bio);
    assert!(session.into_inner().log.is_empty());
}
