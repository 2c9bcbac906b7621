//! CoAP (RFC 7252) message codec for constrained nodes.
//!
//! Only the subset a node needs is modelled: the fixed header, a token,
//! the `Uri-Path` and `Content-Format` options and a payload. Any other
//! option is skipped while decoding.
//!
//! ```rust
//! use libiot_node::network::application::coap::{Code, Message, MessageType};
//!
//! let mut request = Message::new(MessageType::Confirmable, Code::POST, 7);
//! request.set_path("/keepalive").unwrap();
//! request.set_payload(br#"{"i":"f00d"}"#).unwrap();
//!
//! let bytes = request.encode().unwrap();
//! let decoded = Message::decode(&bytes).unwrap();
//! assert_eq!(decoded.path.as_str(), "keepalive");
//! ```

use crate::network::error::Error;
use heapless::{String, Vec};

/// CoAP request client.
pub mod client;

pub use client::Client;

/// Largest encoded message handled by the codec.
pub const MAX_MESSAGE_LEN: usize = 256;
/// Largest payload carried by a single message.
pub const MAX_PAYLOAD_LEN: usize = 128;
/// Largest joined `Uri-Path`.
pub const MAX_PATH_LEN: usize = 64;

/// `Content-Format` value for `application/json`.
pub const CONTENT_FORMAT_JSON: u16 = 50;

const VERSION: u8 = 1;
const PAYLOAD_MARKER: u8 = 0xFF;
const OPTION_URI_PATH: u16 = 11;
const OPTION_CONTENT_FORMAT: u16 = 12;

/// CoAP message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Requires an acknowledgement.
    Confirmable,
    /// Fire and forget.
    NonConfirmable,
    /// Acknowledges a confirmable message, may piggyback a response.
    Acknowledgement,
    /// Rejects a message that could not be processed.
    Reset,
}

impl MessageType {
    fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => MessageType::Confirmable,
            1 => MessageType::NonConfirmable,
            2 => MessageType::Acknowledgement,
            _ => MessageType::Reset,
        }
    }

    fn bits(self) -> u8 {
        match self {
            MessageType::Confirmable => 0,
            MessageType::NonConfirmable => 1,
            MessageType::Acknowledgement => 2,
            MessageType::Reset => 3,
        }
    }
}

/// Method or response code, `class.detail` packed as `ccc ddddd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Code(pub u8);

impl Code {
    /// 0.00, empty message.
    pub const EMPTY: Code = Code::new(0, 0);
    /// 0.01
    pub const GET: Code = Code::new(0, 1);
    /// 0.02
    pub const POST: Code = Code::new(0, 2);
    /// 0.03
    pub const PUT: Code = Code::new(0, 3);
    /// 2.01
    pub const CREATED: Code = Code::new(2, 1);
    /// 2.04
    pub const CHANGED: Code = Code::new(2, 4);
    /// 2.05
    pub const CONTENT: Code = Code::new(2, 5);
    /// 4.00
    pub const BAD_REQUEST: Code = Code::new(4, 0);
    /// 4.04
    pub const NOT_FOUND: Code = Code::new(4, 4);
    /// 4.05
    pub const METHOD_NOT_ALLOWED: Code = Code::new(4, 5);
    /// 4.06
    pub const NOT_ACCEPTABLE: Code = Code::new(4, 6);
    /// 5.00
    pub const INTERNAL_SERVER_ERROR: Code = Code::new(5, 0);

    /// Build a code from its class and detail.
    pub const fn new(class: u8, detail: u8) -> Self {
        Code((class << 5) | (detail & 0x1F))
    }

    /// The class digit (`2` in `2.05`).
    pub fn class(self) -> u8 {
        self.0 >> 5
    }

    /// The detail digits (`5` in `2.05`).
    pub fn detail(self) -> u8 {
        self.0 & 0x1F
    }

    /// Any 2.xx response.
    pub fn is_success(self) -> bool {
        self.class() == 2
    }

    /// Method codes live in class 0.
    pub fn is_request(self) -> bool {
        self.class() == 0 && self.0 != 0
    }
}

impl core::fmt::Display for Code {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{:02}", self.class(), self.detail())
    }
}

/// A decoded or to-be-encoded CoAP message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message type.
    pub kind: MessageType,
    /// Method or response code.
    pub code: Code,
    /// Message id used for deduplication and ACK matching.
    pub message_id: u16,
    /// Request/response matching token, up to 8 bytes.
    pub token: Vec<u8, 8>,
    /// `Uri-Path` segments joined with `/`, without a leading slash.
    pub path: String<MAX_PATH_LEN>,
    /// `Content-Format` option, when present.
    pub content_format: Option<u16>,
    /// Message payload.
    pub payload: Vec<u8, MAX_PAYLOAD_LEN>,
}

impl Message {
    /// An empty message with the given header fields.
    pub fn new(kind: MessageType, code: Code, message_id: u16) -> Self {
        Self {
            kind,
            code,
            message_id,
            token: Vec::new(),
            path: String::new(),
            content_format: None,
            payload: Vec::new(),
        }
    }

    /// Set the request path; leading and repeated slashes are ignored.
    pub fn set_path(&mut self, path: &str) -> Result<(), Error> {
        self.path.clear();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            if !self.path.is_empty() {
                self.path.push('/').map_err(|_| Error::BufferOverflow)?;
            }
            self.path
                .push_str(segment)
                .map_err(|_| Error::BufferOverflow)?;
        }
        Ok(())
    }

    /// Set the token.
    pub fn set_token(&mut self, token: &[u8]) -> Result<(), Error> {
        self.token = Vec::from_slice(token).map_err(|_| Error::BufferOverflow)?;
        Ok(())
    }

    /// Replace the payload.
    pub fn set_payload(&mut self, payload: &[u8]) -> Result<(), Error> {
        self.payload = Vec::from_slice(payload).map_err(|_| Error::BufferOverflow)?;
        Ok(())
    }

    /// Encode into wire format.
    pub fn encode(&self) -> Result<Vec<u8, MAX_MESSAGE_LEN>, Error> {
        let mut buf: Vec<u8, MAX_MESSAGE_LEN> = Vec::new();

        let header = (VERSION << 6) | (self.kind.bits() << 4) | self.token.len() as u8;
        push(&mut buf, &[header, self.code.0])?;
        push(&mut buf, &self.message_id.to_be_bytes())?;
        push(&mut buf, &self.token)?;

        // Options must be written in ascending option-number order.
        let mut last = 0u16;
        for segment in self.path.split('/').filter(|s| !s.is_empty()) {
            encode_option(&mut buf, OPTION_URI_PATH - last, segment.as_bytes())?;
            last = OPTION_URI_PATH;
        }
        if let Some(format) = self.content_format {
            let value = format.to_be_bytes();
            let value = match format {
                0 => &value[..0],
                1..=0xFF => &value[1..],
                _ => &value[..],
            };
            encode_option(&mut buf, OPTION_CONTENT_FORMAT - last, value)?;
        }

        if !self.payload.is_empty() {
            push(&mut buf, &[PAYLOAD_MARKER])?;
            push(&mut buf, &self.payload)?;
        }
        Ok(buf)
    }

    /// Decode from wire format.
    pub fn decode(data: &[u8]) -> Result<Self, Error> {
        if data.len() < 4 {
            return Err(Error::ProtocolError);
        }
        if data[0] >> 6 != VERSION {
            return Err(Error::ProtocolError);
        }
        let token_len = (data[0] & 0x0F) as usize;
        if token_len > 8 || data.len() < 4 + token_len {
            return Err(Error::ProtocolError);
        }

        let mut message = Message::new(
            MessageType::from_bits(data[0] >> 4),
            Code(data[1]),
            u16::from_be_bytes([data[2], data[3]]),
        );
        message.set_token(&data[4..4 + token_len])?;

        let mut pos = 4 + token_len;
        let mut number = 0u16;
        while pos < data.len() {
            if data[pos] == PAYLOAD_MARKER {
                if pos + 1 == data.len() {
                    // A marker followed by nothing is a format error.
                    return Err(Error::ProtocolError);
                }
                message.set_payload(&data[pos + 1..])?;
                break;
            }

            let (delta, length, consumed) = decode_option_header(&data[pos..])?;
            pos += consumed;
            if pos + length > data.len() {
                return Err(Error::ProtocolError);
            }
            number = number.checked_add(delta).ok_or(Error::ProtocolError)?;
            let value = &data[pos..pos + length];
            pos += length;

            match number {
                OPTION_URI_PATH => {
                    let segment = core::str::from_utf8(value).map_err(|_| Error::ProtocolError)?;
                    if !message.path.is_empty() {
                        message.path.push('/').map_err(|_| Error::BufferOverflow)?;
                    }
                    message
                        .path
                        .push_str(segment)
                        .map_err(|_| Error::BufferOverflow)?;
                }
                OPTION_CONTENT_FORMAT => {
                    let format = value
                        .iter()
                        .fold(0u32, |acc, byte| (acc << 8) | *byte as u32);
                    message.content_format =
                        Some(u16::try_from(format).map_err(|_| Error::ProtocolError)?);
                }
                _ => {}
            }
        }

        Ok(message)
    }
}

fn push<const N: usize>(buf: &mut Vec<u8, N>, bytes: &[u8]) -> Result<(), Error> {
    buf.extend_from_slice(bytes).map_err(|_| Error::BufferOverflow)
}

/// Writes one option with the 4-bit delta/length nibbles and their
/// 8 or 16 bit extensions.
fn encode_option<const N: usize>(
    buf: &mut Vec<u8, N>,
    delta: u16,
    value: &[u8],
) -> Result<(), Error> {
    let (delta_nibble, delta_ext) = option_nibble(delta as usize);
    let (len_nibble, len_ext) = option_nibble(value.len());

    push(buf, &[(delta_nibble << 4) | len_nibble])?;
    push(buf, &delta_ext)?;
    push(buf, &len_ext)?;
    push(buf, value)
}

fn option_nibble(value: usize) -> (u8, Vec<u8, 2>) {
    let mut ext = Vec::new();
    if value < 13 {
        (value as u8, ext)
    } else if value < 269 {
        // Capacity is 2, a single push cannot fail.
        let _ = ext.push((value - 13) as u8);
        (13, ext)
    } else {
        let _ = ext.extend_from_slice(&((value - 269) as u16).to_be_bytes());
        (14, ext)
    }
}

fn decode_option_header(data: &[u8]) -> Result<(u16, usize, usize), Error> {
    let first = data[0];
    let mut pos = 1;

    let mut read_ext = |nibble: u8| -> Result<usize, Error> {
        match nibble {
            0..=12 => Ok(nibble as usize),
            13 => {
                let byte = *data.get(pos).ok_or(Error::ProtocolError)?;
                pos += 1;
                Ok(byte as usize + 13)
            }
            14 => {
                let hi = *data.get(pos).ok_or(Error::ProtocolError)?;
                let lo = *data.get(pos + 1).ok_or(Error::ProtocolError)?;
                pos += 2;
                Ok(u16::from_be_bytes([hi, lo]) as usize + 269)
            }
            _ => Err(Error::ProtocolError),
        }
    };

    let delta = read_ext(first >> 4)?;
    let length = read_ext(first & 0x0F)?;
    let delta = u16::try_from(delta).map_err(|_| Error::ProtocolError)?;
    Ok((delta, length, pos))
}
