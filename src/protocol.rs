//! Binary wire protocol codec.
//!
//! Every exchange is one fixed 8-byte header followed by an optional payload:
//!
//! ```text
//! magic_number: u32 | payload_length: u16 | code: u16      (big-endian)
//! ```
//!
//! The `code` field is overloaded: requests carry a [`RequestKind`], responses
//! carry a [`StatusKind`]. The two are kept as separate enums so a status can
//! never be dispatched as if it were a request.
//!
//! Decoded data lives in host order inside [`Header`] / [`Message`]; bytes
//! ready for transmission live inside [`WireMessage`]. Only the latter is
//! accepted by the responder, so a host-order header can't leak onto the wire.

use thiserror::Error;

/// Protocol magic, `"STRY"` in ASCII.
pub const MAGIC_NUMBER: u32 = 0x5354_5259;

/// Size of the fixed header in bytes (u32 + u16 + u16).
pub const HEADER_SIZE: usize = 8;

/// Maximum payload a single message may carry.
pub const MAX_PAYLOAD: usize = 65536;

/// Maximum total message size (header + payload).
pub const MAX_MESSAGE: usize = HEADER_SIZE + MAX_PAYLOAD;

/// Size of the GET_STATS response payload: two u32 counters plus one ratio byte.
pub const STATS_PAYLOAD_SIZE: usize = 9;

/// Request kinds a client may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum RequestKind {
    Ping = 1,
    GetStats = 2,
    ResetStats = 3,
    Compress = 4,
}

impl RequestKind {
    /// Map a wire code to a request kind.
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            1 => Some(RequestKind::Ping),
            2 => Some(RequestKind::GetStats),
            3 => Some(RequestKind::ResetStats),
            4 => Some(RequestKind::Compress),
            _ => None,
        }
    }
}

/// Status kinds the server answers with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum StatusKind {
    Ok = 0,
    UnknownError = 1,
    TooLarge = 2,
    UnsupportedType = 3,
}

/// Header validation failure.
///
/// Each variant carries the status code the server must answer with before
/// closing the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("bad magic number {0:#010x}")]
    BadMagic(u32),
    #[error("unsupported request code {0}")]
    UnsupportedCode(u16),
    #[error("payload length {0} exceeds maximum {MAX_PAYLOAD}")]
    PayloadTooLarge(usize),
    #[error("request kind {0:?} must not carry a payload")]
    UnexpectedPayload(RequestKind),
}

impl ProtocolError {
    /// The status code to report back to the client.
    pub fn status(&self) -> StatusKind {
        match self {
            ProtocolError::BadMagic(_) => StatusKind::UnknownError,
            ProtocolError::UnsupportedCode(_) => StatusKind::UnsupportedType,
            ProtocolError::PayloadTooLarge(_) => StatusKind::TooLarge,
            ProtocolError::UnexpectedPayload(_) => StatusKind::UnsupportedType,
        }
    }
}

/// A validated request header in host order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub payload_length: u16,
    pub kind: RequestKind,
}

/// A decoded request: validated header plus exactly `payload_length` bytes.
#[derive(Debug)]
pub struct Message {
    pub header: Header,
    pub payload: Vec<u8>,
}

/// A response already serialized to network byte order.
///
/// Constructed only by [`encode_response`]; the responder accepts nothing
/// else, so host-order fields can't end up on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage {
    header: [u8; HEADER_SIZE],
    payload: Vec<u8>,
}

impl WireMessage {
    /// The serialized header bytes.
    pub fn header_bytes(&self) -> &[u8; HEADER_SIZE] {
        &self.header
    }

    /// The payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Decode and validate a raw header.
///
/// Validation order is fixed: magic first, then request code, then payload
/// length; the first failure determines the status code reported back.
pub fn decode_header(raw: &[u8; HEADER_SIZE]) -> Result<Header, ProtocolError> {
    let magic = u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]);
    let payload_length = u16::from_be_bytes([raw[4], raw[5]]);
    let code = u16::from_be_bytes([raw[6], raw[7]]);

    if magic != MAGIC_NUMBER {
        return Err(ProtocolError::BadMagic(magic));
    }

    let kind = RequestKind::from_code(code).ok_or(ProtocolError::UnsupportedCode(code))?;

    if payload_length as usize > MAX_PAYLOAD {
        return Err(ProtocolError::PayloadTooLarge(payload_length as usize));
    }

    Ok(Header {
        payload_length,
        kind,
    })
}

/// Enforce the payload rule: only COMPRESS may carry request bytes.
pub fn check_payload(header: &Header) -> Result<(), ProtocolError> {
    if header.payload_length > 0 && header.kind != RequestKind::Compress {
        return Err(ProtocolError::UnexpectedPayload(header.kind));
    }
    Ok(())
}

/// Serialize a response header and payload into wire order.
///
/// # Panics
/// Panics if `payload` exceeds [`MAX_PAYLOAD`]. Response payloads are either
/// fixed-size or bounded by the request payload, which was already validated.
pub fn encode_response(status: StatusKind, payload: Vec<u8>) -> WireMessage {
    assert!(payload.len() <= MAX_PAYLOAD, "response payload too large");

    let mut header = [0u8; HEADER_SIZE];
    header[0..4].copy_from_slice(&MAGIC_NUMBER.to_be_bytes());
    header[4..6].copy_from_slice(&(payload.len() as u16).to_be_bytes());
    header[6..8].copy_from_slice(&(status as u16).to_be_bytes());

    WireMessage { header, payload }
}

/// Encode the GET_STATS response payload.
///
/// Layout: `bytes_received: u32 BE, bytes_sent: u32 BE, compression_ratio: u8`.
pub fn encode_stats(bytes_received: u32, bytes_sent: u32, compression_ratio: u8) -> Vec<u8> {
    let mut payload = Vec::with_capacity(STATS_PAYLOAD_SIZE);
    payload.extend_from_slice(&bytes_received.to_be_bytes());
    payload.extend_from_slice(&bytes_sent.to_be_bytes());
    payload.push(compression_ratio);
    payload
}
