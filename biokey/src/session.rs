//! Command sessions
//!
//! [`CommandSession`] is the seam between enrollment logic and the device:
//! it takes a bio enrollment request and returns the decoded response map,
//! or the CTAP status the authenticator failed with.
//!
//! [`Ctap2Session`] implements it over any [`SmartCardConnection`] by
//! wrapping CTAP2 messages in ISO 7816-4 APDUs.

use crate::ctap_command::CtapCommand;
use crate::error::{Error, Result};

use biokey_ctap::{ApduCommand, ApduResponse, ParameterMap, ResponseMap, StatusCode, Version, SW};

use ciborium::Value;

/// authenticatorBioEnrollment request map keys
mod request {
    pub const MODALITY: u8 = 0x01;
    pub const SUB_COMMAND: u8 = 0x02;
    pub const SUB_COMMAND_PARAMS: u8 = 0x03;
    pub const PIN_UV_AUTH_PROTOCOL: u8 = 0x04;
    pub const PIN_UV_AUTH_PARAM: u8 = 0x05;
    pub const GET_MODALITY: u8 = 0x06;
}

/// APDU header for an encapsulated CTAP2 message
const CTAP_CLA: u8 = 0x80;
const CTAP_INS_MSG: u8 = 0x10;

/// GET RESPONSE header, sent while the card signals 61xx
const GET_RESPONSE_CLA: u8 = 0x00;
const GET_RESPONSE_INS: u8 = 0xC0;

/// GET RESPONSE rounds allowed for one command before giving up
const MAX_GET_RESPONSE_ROUNDS: usize = 64;

/// One authenticatorBioEnrollment request
///
/// Fields left `None` are omitted from the encoded map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BioEnrollmentRequest {
    pub modality: Option<u8>,
    pub sub_command: Option<u8>,
    pub sub_command_params: Option<ParameterMap>,
    pub pin_uv_auth_protocol: Option<u8>,
    pub pin_uv_auth_param: Option<Vec<u8>>,
    pub get_modality: bool,
}

impl BioEnrollmentRequest {
    /// Request for a sub-command of `modality`
    pub fn new(modality: u8, sub_command: u8) -> Self {
        Self {
            modality: Some(modality),
            sub_command: Some(sub_command),
            ..Self::default()
        }
    }

    /// Request asking only for the supported modality
    pub fn get_modality() -> Self {
        Self {
            get_modality: true,
            ..Self::default()
        }
    }

    /// Set the sub-command parameters
    pub fn with_params(mut self, params: Option<ParameterMap>) -> Self {
        self.sub_command_params = params;
        self
    }

    /// Attach the PIN/UV auth protocol and parameter
    pub fn with_auth(mut self, protocol: u8, param: Vec<u8>) -> Self {
        self.pin_uv_auth_protocol = Some(protocol);
        self.pin_uv_auth_param = Some(param);
        self
    }

    /// Build the CBOR request map
    pub fn to_parameter_map(&self) -> ParameterMap {
        let mut map = ParameterMap::new()
            .insert_uint_opt(request::MODALITY, self.modality.map(u64::from))
            .insert_uint_opt(request::SUB_COMMAND, self.sub_command.map(u64::from));
        if let Some(params) = &self.sub_command_params {
            map = map.insert_value(request::SUB_COMMAND_PARAMS, params.to_value());
        }
        map = map.insert_uint_opt(
            request::PIN_UV_AUTH_PROTOCOL,
            self.pin_uv_auth_protocol.map(u64::from),
        );
        if let Some(param) = &self.pin_uv_auth_param {
            map = map.insert_bytes(request::PIN_UV_AUTH_PARAM, param);
        }
        if self.get_modality {
            map = map.insert_value(request::GET_MODALITY, Value::Bool(true));
        }
        map
    }
}

/// Executes bio enrollment requests against an authenticator
pub trait CommandSession {
    /// Send one request and decode the response map
    ///
    /// # Errors
    ///
    /// [`Error::Ctap`] when the authenticator answers with a non-zero status,
    /// [`Error::Transport`] or [`Error::Apdu`] when the exchange itself fails.
    fn bio_enrollment(&mut self, request: &BioEnrollmentRequest) -> Result<ResponseMap>;

    /// Firmware version of the connected device
    fn firmware_version(&self) -> Version {
        Version::UNKNOWN
    }
}

impl<S: CommandSession + ?Sized> CommandSession for &mut S {
    fn bio_enrollment(&mut self, request: &BioEnrollmentRequest) -> Result<ResponseMap> {
        (**self).bio_enrollment(request)
    }

    fn firmware_version(&self) -> Version {
        (**self).firmware_version()
    }
}

/// Raw APDU exchange with a smart card (NFC or CCID reader)
pub trait SmartCardConnection {
    /// Send a command APDU and return the full response including SW1 SW2
    fn transmit(&mut self, apdu: &[u8]) -> std::io::Result<Vec<u8>>;
}

impl<C: SmartCardConnection + ?Sized> SmartCardConnection for &mut C {
    fn transmit(&mut self, apdu: &[u8]) -> std::io::Result<Vec<u8>> {
        (**self).transmit(apdu)
    }
}

/// CTAP2 session over a smart-card connection
///
/// # Example
///
/// ```
/// use biokey::{Ctap2Session, CtapCommand, SmartCardConnection};
/// use biokey_ctap::Version;
///
/// struct Reader;
///
/// impl SmartCardConnection for Reader {
///     fn transmit(&mut self, _apdu: &[u8]) -> std::io::Result<Vec<u8>> {
///         Ok(vec![0x00, 0x90, 0x00])
///     }
/// }
///
/// let session = Ctap2Session::new(Reader)
///     .with_version(Version::new(5, 2, 7))
///     .with_command(CtapCommand::BioEnrollmentPreview);
/// assert_eq!(session.command(), CtapCommand::BioEnrollmentPreview);
/// ```
#[derive(Debug)]
pub struct Ctap2Session<C> {
    connection: C,
    command: CtapCommand,
    version: Version,
}

impl<C: SmartCardConnection> Ctap2Session<C> {
    /// Create a session using authenticatorBioEnrollment (0x09)
    pub fn new(connection: C) -> Self {
        Self {
            connection,
            command: CtapCommand::default(),
            version: Version::UNKNOWN,
        }
    }

    /// Set the firmware version reported by the device
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }

    /// Use a different command code for bio enrollment
    pub fn with_command(mut self, command: CtapCommand) -> Self {
        self.command = command;
        self
    }

    /// The command code used for bio enrollment
    pub fn command(&self) -> CtapCommand {
        self.command
    }

    /// Borrow the underlying connection
    pub fn connection(&self) -> &C {
        &self.connection
    }

    /// Mutably borrow the underlying connection
    pub fn connection_mut(&mut self) -> &mut C {
        &mut self.connection
    }

    /// Consume the session, returning the connection
    pub fn into_inner(self) -> C {
        self.connection
    }

    /// Send a CTAP2 command and decode the response map
    ///
    /// # Errors
    ///
    /// A response without a status byte is [`Error::MalformedResponse`]; a
    /// non-zero status byte is [`Error::Ctap`].
    pub fn send_cbor(&mut self, command: u8, payload: &[u8]) -> Result<ResponseMap> {
        let mut message = Vec::with_capacity(payload.len() + 1);
        message.push(command);
        message.extend_from_slice(payload);

        log::trace!("CTAP command 0x{:02x}, {} byte payload", command, payload.len());
        let response = self.send_apdu(ApduCommand::new(CTAP_CLA, CTAP_INS_MSG, 0x00, 0x00, message))?;

        let (status, body) = match response.split_first() {
            Some((status, body)) => (StatusCode::from(*status), body),
            None => return Err(Error::MalformedResponse { len: 0 }),
        };
        if !status.is_success() {
            log::debug!("CTAP command 0x{:02x} failed: {}", command, status);
            return Err(Error::Ctap(status));
        }

        Ok(ResponseMap::from_bytes(body)?)
    }

    /// Send an APDU, following 61xx chaining, and return the payload
    fn send_apdu(&mut self, apdu: ApduCommand) -> Result<Vec<u8>> {
        let (mut sw, mut data) = self.transmit(&apdu)?.into_parts();

        let mut rounds = 0;
        while SW::is_more_data(sw) {
            if rounds == MAX_GET_RESPONSE_ROUNDS {
                log::debug!("Response still incomplete after {} GET RESPONSE rounds", rounds);
                return Err(Error::Apdu { sw });
            }
            rounds += 1;
            let get_response = ApduCommand::new(GET_RESPONSE_CLA, GET_RESPONSE_INS, 0x00, 0x00, Vec::new());
            let (next_sw, next_data) = self.transmit(&get_response)?.into_parts();
            data.extend_from_slice(&next_data);
            sw = next_sw;
        }

        if sw != SW::SUCCESS {
            log::debug!("APDU failed with SW=0x{:04x}", sw);
            return Err(Error::Apdu { sw });
        }
        Ok(data)
    }

    fn transmit(&mut self, apdu: &ApduCommand) -> Result<ApduResponse> {
        let bytes = apdu.to_bytes()?;
        let response = self.connection.transmit(&bytes)?;
        Ok(ApduResponse::parse(&response)?)
    }
}

impl<C: SmartCardConnection> CommandSession for Ctap2Session<C> {
    fn bio_enrollment(&mut self, request: &BioEnrollmentRequest) -> Result<ResponseMap> {
        let payload = request.to_parameter_map().to_bytes()?;
        self.send_cbor(self.command.as_u8(), &payload)
    }

    fn firmware_version(&self) -> Version {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use assert_matches::assert_matches;
    use hex_literal::hex;

    use std::collections::VecDeque;

    /// Replays canned responses and records what was sent
    #[derive(Default)]
    struct ScriptedCard {
        responses: VecDeque<Vec<u8>>,
        sent: Vec<Vec<u8>>,
    }

    impl ScriptedCard {
        fn new(responses: &[&[u8]]) -> Self {
            Self {
                responses: responses.iter().map(|r| r.to_vec()).collect(),
                sent: Vec::new(),
            }
        }
    }

    impl SmartCardConnection for ScriptedCard {
        fn transmit(&mut self, apdu: &[u8]) -> std::io::Result<Vec<u8>> {
            self.sent.push(apdu.to_vec());
            self.responses
                .pop_front()
                .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "no response"))
        }
    }

    #[test]
    fn test_request_map_encoding() {
        let params = ParameterMap::new().insert_uint(0x03, 10_000);
        let request = BioEnrollmentRequest::new(0x01, 0x01)
            .with_params(Some(params))
            .with_auth(2, vec![0xAA, 0xBB]);

        // {1: 1, 2: 1, 3: {3: 10000}, 4: 2, 5: h'AABB'}
        assert_eq!(
            request.to_parameter_map().to_bytes().unwrap(),
            hex!("a5 01 01 02 01 03 a1 03 19 2710 04 02 05 42 aabb")
        );
    }

    #[test]
    fn test_unauthenticated_request_omits_auth() {
        let request = BioEnrollmentRequest::new(0x01, 0x07);
        assert_eq!(request.to_parameter_map().to_bytes().unwrap(), hex!("a2 01 01 02 07"));
    }

    #[test]
    fn test_get_modality_request() {
        let request = BioEnrollmentRequest::get_modality();
        assert_eq!(request.to_parameter_map().to_bytes().unwrap(), hex!("a1 06 f5"));
    }

    #[test]
    fn test_bio_enrollment_apdu_and_response() {
        let mut card = ScriptedCard::new(&[&hex!("00 a1 01 01 9000")]);
        let mut session = Ctap2Session::new(&mut card);

        let response = session
            .bio_enrollment(&BioEnrollmentRequest::get_modality())
            .unwrap();
        assert_eq!(response.get_uint(0x01).unwrap(), 1);

        assert_eq!(card.sent, vec![hex!("80 10 00 00 04 09 a1 06 f5 00").to_vec()]);
    }

    #[test]
    fn test_preview_command_code() {
        let mut card = ScriptedCard::new(&[&hex!("00 9000")]);
        let mut session = Ctap2Session::new(&mut card).with_command(CtapCommand::BioEnrollmentPreview);

        let response = session
            .bio_enrollment(&BioEnrollmentRequest::new(0x01, 0x03))
            .unwrap();
        assert!(response.is_empty());
        assert_eq!(card.sent[0][5], 0x40);
    }

    #[test]
    fn test_response_chaining() {
        let mut card = ScriptedCard::new(&[&hex!("00 a1 6102"), &hex!("01 05 9000")]);
        let mut session = Ctap2Session::new(&mut card);

        let response = session.send_cbor(0x09, &[]).unwrap();
        assert_eq!(response.get_uint(0x01).unwrap(), 5);
        assert_eq!(card.sent[1], hex!("00 c0 00 00 00").to_vec());
    }

    #[test]
    fn test_endless_chaining_is_cut_off() {
        let chunk = hex!("00 61ff");
        let chunks = vec![&chunk[..]; MAX_GET_RESPONSE_ROUNDS + 2];
        let mut card = ScriptedCard::new(&chunks);
        let mut session = Ctap2Session::new(&mut card);

        assert_eq!(session.send_cbor(0x09, &[]), Err(Error::Apdu { sw: 0x61FF }));
        drop(session);
        // the command itself, then the allowed GET RESPONSE rounds
        assert_eq!(card.sent.len(), MAX_GET_RESPONSE_ROUNDS + 1);
        assert!(card.sent[1..].iter().all(|apdu| apdu[..2] == hex!("00 c0")));
    }

    #[test]
    fn test_ctap_error_status() {
        let mut card = ScriptedCard::new(&[&hex!("2c 9000")]);
        let mut session = Ctap2Session::new(&mut card);

        assert_eq!(
            session.send_cbor(0x09, &[0xa0]),
            Err(Error::Ctap(StatusCode::InvalidOption))
        );
    }

    #[test]
    fn test_apdu_errors() {
        let mut card = ScriptedCard::new(&[&hex!("6d00"), &hex!("90"), &hex!("9000")]);
        let mut session = Ctap2Session::new(&mut card);

        assert_eq!(session.send_cbor(0x09, &[]), Err(Error::Apdu { sw: 0x6D00 }));
        assert_eq!(
            session.send_cbor(0x09, &[]),
            Err(Error::MalformedResponse { len: 1 })
        );
        // Success SW but no CTAP status byte
        assert_eq!(
            session.send_cbor(0x09, &[]),
            Err(Error::MalformedResponse { len: 0 })
        );
        assert_matches!(session.send_cbor(0x09, &[]), Err(Error::Transport(_)));
    }

    #[test]
    fn test_invalid_cbor_is_protocol_violation() {
        let mut card = ScriptedCard::new(&[&hex!("00 ff 9000")]);
        let mut session = Ctap2Session::new(&mut card);

        assert_matches!(session.send_cbor(0x09, &[]), Err(Error::ProtocolViolation(_)));
    }

    #[test]
    fn test_firmware_version() {
        let card = ScriptedCard::default();
        let session = Ctap2Session::new(card).with_version(Version::new(5, 2, 7));
        assert_eq!(session.firmware_version(), Version::new(5, 2, 7));
        assert!(session.into_inner().sent.is_empty());
    }
}
