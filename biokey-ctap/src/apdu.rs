//! ISO 7816-4 APDU framing
//!
//! Smart-card transports (NFC, CCID) carry CTAP2 inside APDUs. A response is
//! laid out as `[data...][SW1][SW2]`; [`ApduResponse::parse`] splits it.

use crate::error::{Error, Result};

/// Status word constants
pub struct SW;

impl SW {
    pub const SUCCESS: u16 = 0x9000;
    pub const WRONG_LENGTH: u16 = 0x6700;
    pub const SECURITY_STATUS_NOT_SATISFIED: u16 = 0x6982;
    pub const CONDITIONS_NOT_SATISFIED: u16 = 0x6985;
    pub const WRONG_DATA: u16 = 0x6A80;
    pub const FILE_NOT_FOUND: u16 = 0x6A82;
    pub const INS_NOT_SUPPORTED: u16 = 0x6D00;
    pub const CLA_NOT_SUPPORTED: u16 = 0x6E00;

    /// Create a "more data available" status word (61xx)
    #[inline]
    pub fn bytes_remaining(remaining: u8) -> u16 {
        0x6100 | (remaining as u16)
    }

    /// Check if a status word indicates more data available (61xx)
    #[inline]
    pub fn is_more_data(sw: u16) -> bool {
        (sw & 0xFF00) == 0x6100
    }
}

/// A response split into payload and status word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduResponse {
    data: Vec<u8>,
    sw: u16,
}

impl ApduResponse {
    /// Frame a raw response buffer
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedResponse`] if the buffer is shorter than the
    /// two status bytes.
    ///
    /// # Example
    ///
    /// ```
    /// # use biokey_ctap::ApduResponse;
    /// let response = ApduResponse::parse(&[0x01, 0x02, 0x90, 0x00]).unwrap();
    /// assert_eq!(response.sw(), 0x9000);
    /// assert_eq!(response.data(), &[0x01, 0x02]);
    /// ```
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < 2 {
            return Err(Error::MalformedResponse { len: bytes.len() });
        }
        let (data, sw) = bytes.split_at(bytes.len() - 2);
        Ok(Self {
            data: data.to_vec(),
            sw: u16::from_be_bytes([sw[0], sw[1]]),
        })
    }

    /// Create a response from parts
    pub fn new(data: Vec<u8>, sw: u16) -> Self {
        Self { data, sw }
    }

    /// The status word
    pub fn sw(&self) -> u16 {
        self.sw
    }

    /// The payload without the status word
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Split into payload and status word
    pub fn into_parts(self) -> (u16, Vec<u8>) {
        (self.sw, self.data)
    }

    /// Check for 0x9000
    pub fn is_success(&self) -> bool {
        self.sw == SW::SUCCESS
    }

    /// Number of bytes still waiting on the card, if SW1 is 0x61
    pub fn bytes_remaining(&self) -> Option<u8> {
        if SW::is_more_data(self.sw) {
            Some(self.sw as u8)
        } else {
            None
        }
    }

    /// Reassemble the wire form (data + SW1 + SW2)
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(self.data.len() + 2);
        result.extend_from_slice(&self.data);
        result.extend_from_slice(&self.sw.to_be_bytes());
        result
    }
}

/// An outgoing command APDU
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApduCommand {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
}

impl ApduCommand {
    /// Create a new command
    pub fn new(cla: u8, ins: u8, p1: u8, p2: u8, data: Vec<u8>) -> Self {
        Self {
            cla,
            ins,
            p1,
            p2,
            data,
        }
    }

    /// Encode with a maximal Le
    ///
    /// Bodies up to 255 bytes use the short form `CLA INS P1 P2 Lc data 00`
    /// (or `CLA INS P1 P2 00` with no body); longer bodies use the extended
    /// form `CLA INS P1 P2 00 Lc1 Lc2 data 00 00`.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let len = self.data.len();
        let mut out = Vec::with_capacity(len + 9);
        out.extend_from_slice(&[self.cla, self.ins, self.p1, self.p2]);

        if len == 0 {
            out.push(0x00);
        } else if len <= 0xFF {
            out.push(len as u8);
            out.extend_from_slice(&self.data);
            out.push(0x00);
        } else if len <= 0xFFFF {
            out.push(0x00);
            out.extend_from_slice(&(len as u16).to_be_bytes());
            out.extend_from_slice(&self.data);
            out.extend_from_slice(&[0x00, 0x00]);
        } else {
            return Err(Error::DataTooLong(len));
        }

        Ok(out)
    }
}
