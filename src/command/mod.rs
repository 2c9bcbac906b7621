//! Lenient key-value extraction from inbound JSON-like command payloads.
//!
//! Payloads come from a constrained link and are small, so the scanner walks
//! the bytes once without building a document. [`pairs`] yields every
//! top-level key with a coarse classification of its value; [`parse`] keeps
//! the keys a device recognizes and turns their values into integers.
//!
//! ```
//! use libiot_node::command::{parse, ParseResult};
//!
//! match parse(br#"{"t":20}"#, &["t"]) {
//!     ParseResult::Found(values) => assert_eq!(values.get("t"), Some(20)),
//!     _ => unreachable!(),
//! }
//! assert_eq!(parse(b"{}", &["t"]), ParseResult::NotFound);
//! assert_eq!(parse(b"", &["t"]), ParseResult::Malformed);
//! ```

use crate::model::MAX_KEYS;
use heapless::Vec;

/// Inbound PUT handling on the device-hosted resource.
pub mod resource;

pub use resource::CommandResponse;

/// Classification of a scanned value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Value<'a> {
    /// A bare integer literal.
    Integer(i64),
    /// The raw contents of a string literal, escapes left in place.
    Str(&'a str),
    /// Anything else: floats, literals, nested objects and arrays.
    Other,
}

/// The payload is not shaped like a flat JSON object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Malformed;

#[cfg(feature = "defmt")]
impl defmt::Format for Malformed {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "Malformed")
    }
}

/// Iterator over the top-level pairs of a payload.
#[derive(Debug)]
pub struct Pairs<'a> {
    bytes: &'a [u8],
    pos: usize,
    state: ScanState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Start,
    Key,
    Separator,
    Done,
}

/// Scan `payload` for `"key": value` pairs in document order.
///
/// Scanning stops at the closing brace or when the payload runs out; a
/// pair cut short by the end of the payload is dropped silently. A payload
/// that does not open an object, including an empty one, and any later
/// structural error are reported once as [`Malformed`] and end the
/// iteration.
pub fn pairs(payload: &[u8]) -> Pairs<'_> {
    Pairs {
        bytes: payload,
        pos: 0,
        state: ScanState::Start,
    }
}

impl<'a> Pairs<'a> {
    fn skip_whitespace(&mut self) {
        while let Some(byte) = self.bytes.get(self.pos) {
            if !byte.is_ascii_whitespace() {
                break;
            }
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Consume a string literal starting at the opening quote. `Ok(None)`
    /// means the payload ended inside it.
    fn string(&mut self) -> Result<Option<&'a str>, Malformed> {
        let bytes = self.bytes;
        let start = self.pos + 1;
        let mut i = start;
        while i < bytes.len() {
            match bytes[i] {
                b'\\' => i += 2,
                b'"' => {
                    self.pos = i + 1;
                    let raw = core::str::from_utf8(&bytes[start..i]).map_err(|_| Malformed)?;
                    return Ok(Some(raw));
                }
                _ => i += 1,
            }
        }
        self.pos = bytes.len();
        Ok(None)
    }

    fn number(&mut self) -> Value<'a> {
        let start = self.pos;
        while let Some(byte) = self.peek() {
            if !matches!(byte, b'0'..=b'9' | b'-' | b'+' | b'.' | b'e' | b'E') {
                break;
            }
            self.pos += 1;
        }
        core::str::from_utf8(&self.bytes[start..self.pos])
            .ok()
            .and_then(|text| text.parse::<i64>().ok())
            .map_or(Value::Other, Value::Integer)
    }

    /// Skip a nested object or array. `false` means the payload ended first.
    fn nested(&mut self) -> bool {
        let mut depth = 0usize;
        while let Some(byte) = self.peek() {
            match byte {
                b'"' => {
                    if !matches!(self.string(), Ok(Some(_))) {
                        return false;
                    }
                    continue;
                }
                b'{' | b'[' => depth += 1,
                b'}' | b']' => {
                    depth -= 1;
                    if depth == 0 {
                        self.pos += 1;
                        return true;
                    }
                }
                _ => {}
            }
            self.pos += 1;
        }
        false
    }

    fn literal(&mut self) {
        while self.peek().is_some_and(|byte| byte.is_ascii_alphabetic()) {
            self.pos += 1;
        }
    }

    /// Read a value. `Ok(None)` means the payload ended inside it.
    fn value(&mut self) -> Result<Option<Value<'a>>, Malformed> {
        match self.peek() {
            None => Ok(None),
            Some(b'"') => Ok(self.string()?.map(Value::Str)),
            Some(b'-' | b'0'..=b'9') => Ok(Some(self.number())),
            Some(b'{' | b'[') => Ok(self.nested().then_some(Value::Other)),
            Some(b't' | b'f' | b'n') => {
                self.literal();
                Ok(Some(Value::Other))
            }
            Some(_) => Err(Malformed),
        }
    }

    fn pair(&mut self) -> Result<Option<(&'a str, Value<'a>)>, Malformed> {
        self.skip_whitespace();
        let key = match self.peek() {
            None => return Ok(None),
            Some(b'}') => return Ok(None),
            Some(b'"') => match self.string()? {
                Some(key) => key,
                None => return Ok(None),
            },
            Some(_) => return Err(Malformed),
        };

        self.skip_whitespace();
        match self.peek() {
            None => return Ok(None),
            Some(b':') => self.pos += 1,
            Some(_) => return Err(Malformed),
        }

        self.skip_whitespace();
        Ok(self.value()?.map(|value| (key, value)))
    }
}

impl<'a> Iterator for Pairs<'a> {
    type Item = Result<(&'a str, Value<'a>), Malformed>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            match self.state {
                ScanState::Done => return None,
                ScanState::Start => {
                    self.skip_whitespace();
                    match self.peek() {
                        Some(b'{') => {
                            self.pos += 1;
                            self.state = ScanState::Key;
                        }
                        _ => {
                            self.state = ScanState::Done;
                            return Some(Err(Malformed));
                        }
                    }
                }
                ScanState::Separator => {
                    self.skip_whitespace();
                    match self.peek() {
                        Some(b',') => {
                            self.pos += 1;
                            self.state = ScanState::Key;
                        }
                        None | Some(b'}') => self.state = ScanState::Done,
                        Some(_) => {
                            self.state = ScanState::Done;
                            return Some(Err(Malformed));
                        }
                    }
                }
                ScanState::Key => {
                    return match self.pair() {
                        Ok(Some(pair)) => {
                            self.state = ScanState::Separator;
                            Some(Ok(pair))
                        }
                        Ok(None) => {
                            self.state = ScanState::Done;
                            None
                        }
                        Err(err) => {
                            self.state = ScanState::Done;
                            Some(Err(err))
                        }
                    };
                }
            }
        }
    }
}

/// Integer values extracted for the recognized keys, in first-seen order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandValues {
    entries: Vec<(&'static str, i32), MAX_KEYS>,
}

impl CommandValues {
    /// No values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Value stored for `key`.
    pub fn get(&self, key: &str) -> Option<i32> {
        self.entries
            .iter()
            .find(|(known, _)| *known == key)
            .map(|(_, value)| *value)
    }

    /// Store `value` under `key`, replacing an earlier value.
    pub fn set(&mut self, key: &'static str, value: i32) {
        if let Some(entry) = self.entries.iter_mut().find(|(known, _)| *known == key) {
            entry.1 = value;
        } else if self.entries.push((key, value)).is_err() {
            log::warn!("Dropping command value for {}", key);
        }
    }

    /// Stored pairs in first-seen order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, i32)> + '_ {
        self.entries.iter().copied()
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no key was stored.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Result of [`parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseResult {
    /// At least one recognized key carried an integer.
    Found(CommandValues),
    /// The payload opens an object but names none of the keys.
    NotFound,
    /// The payload is empty or not an object, or a recognized key holds a
    /// non-integer value.
    Malformed,
}

fn integer(value: Value<'_>) -> Option<i32> {
    let wide = match value {
        Value::Integer(n) => n,
        Value::Str(text) => text.trim().parse::<i64>().ok()?,
        Value::Other => return None,
    };
    Some(wide.clamp(i32::MIN as i64, i32::MAX as i64) as i32)
}

/// Extract integer values for `keys` from `payload`.
pub fn parse(payload: &[u8], keys: &[&'static str]) -> ParseResult {
    let mut values = CommandValues::new();
    for item in pairs(payload) {
        let Ok((key, value)) = item else {
            return ParseResult::Malformed;
        };
        let Some(known) = keys.iter().copied().find(|known| *known == key) else {
            continue;
        };
        match integer(value) {
            Some(n) => values.set(known, n),
            None => return ParseResult::Malformed,
        }
    }

    if values.is_empty() {
        ParseResult::NotFound
    } else {
        ParseResult::Found(values)
    }
}
