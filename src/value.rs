//! Values collected from a form submission.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::ParseEncodingError;

/// A scalar payload: a submitted text field, or a buffered file after decoding
/// and conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Bytes(Vec<u8>),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl Value {
    /// Byte representation used by pattern rules.
    pub fn match_bytes(&self) -> Cow<'_, [u8]> {
        match self {
            Value::Text(s) => Cow::Borrowed(s.as_bytes()),
            Value::Bytes(b) => Cow::Borrowed(b.as_slice()),
            other => Cow::Owned(other.to_string().into_bytes()),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(n) => Some(*n),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Bytes(b) => f.write_str(&String::from_utf8_lossy(b)),
            Value::Integer(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

/// A value-to-value conversion applied before rules run.
///
/// A conversion failure is reported as a validation failure of the field.
#[derive(Clone)]
pub struct Converter(Arc<dyn Fn(Value) -> Result<Value, String> + Send + Sync>);

impl Converter {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    pub fn apply(&self, value: Value) -> Result<Value, String> {
        (self.0)(value)
    }

    /// Parse text as a base-10 signed integer.
    pub fn integer() -> Self {
        Self::new(|v| {
            let s = v.to_string();
            s.trim()
                .parse::<i64>()
                .map(Value::Integer)
                .map_err(|_| format!("'{s}' is not an integer"))
        })
    }

    /// Parse text as a floating point number.
    pub fn float() -> Self {
        Self::new(|v| {
            let s = v.to_string();
            s.trim()
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| format!("'{s}' is not a number"))
        })
    }

    /// Accepts `true`/`false`, `on`/`off`, `1`/`0` and `yes`/`no`.
    pub fn boolean() -> Self {
        Self::new(|v| match v.to_string().trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "1" | "yes" => Ok(Value::Bool(true)),
            "false" | "off" | "0" | "no" => Ok(Value::Bool(false)),
            other => Err(format!("'{other}' is not a boolean")),
        })
    }
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter").finish_non_exhaustive()
    }
}

/// Text decoding applied to a buffered file before conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// UTF-8, with invalid sequences replaced
    Utf8,
    /// One char per byte (ISO-8859-1), always lossless
    Latin1,
    /// 7-bit ASCII, high bit stripped
    Ascii,
    /// Lowercase hexadecimal
    Hex,
    /// Standard padded base64
    Base64,
    /// UTF-16, little-endian; an odd trailing byte is dropped
    Utf16Le,
}

impl FromStr for TextEncoding {
    type Err = ParseEncodingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(TextEncoding::Utf8),
            "latin1" | "binary" | "iso-8859-1" => Ok(TextEncoding::Latin1),
            "ascii" => Ok(TextEncoding::Ascii),
            "hex" => Ok(TextEncoding::Hex),
            "base64" => Ok(TextEncoding::Base64),
            "utf16le" | "utf-16le" | "ucs2" | "ucs-2" => Ok(TextEncoding::Utf16Le),
            _ => Err(ParseEncodingError(s.to_string())),
        }
    }
}

impl TextEncoding {

    pub fn decode(&self, bytes: &[u8]) -> String {
        match self {
            TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            TextEncoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            TextEncoding::Ascii => bytes.iter().map(|&b| (b & 0x7f) as char).collect(),
            TextEncoding::Hex => {
                const DIGITS: &[u8; 16] = b"0123456789abcdef";
                let mut out = String::with_capacity(bytes.len() * 2);
                for &b in bytes {
                    out.push(DIGITS[(b >> 4) as usize] as char);
                    out.push(DIGITS[(b & 0x0f) as usize] as char);
                }
                out
            }
            TextEncoding::Base64 => BASE64.encode(bytes),
            TextEncoding::Utf16Le => {
                let units: Vec<u16> = bytes
                    .chunks_exact(2)
                    .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
                    .collect();
                String::from_utf16_lossy(&units)
            }
        }
    }

    /// Inverse of [`TextEncoding::decode`].
    ///
    /// Characters that the encoding cannot represent are dropped, and an
    /// odd-length or non-hex string yields `None` for `Hex`, as does
    /// malformed input for `Base64`.
    pub fn encode(&self, text: &str) -> Option<Vec<u8>> {
        match self {
            TextEncoding::Utf8 => Some(text.as_bytes().to_vec()),
            TextEncoding::Latin1 => Some(
                text.chars()
                    .filter(|c| (*c as u32) <= 0xff)
                    .map(|c| c as u8)
                    .collect(),
            ),
            TextEncoding::Ascii => Some(text.chars().filter(char::is_ascii).map(|c| c as u8).collect()),
            TextEncoding::Hex => {
                if text.len() % 2 != 0 {
                    return None;
                }
                text.as_bytes()
                    .chunks(2)
                    .map(|pair| {
                        let hi = (pair[0] as char).to_digit(16)?;
                        let lo = (pair[1] as char).to_digit(16)?;
                        Some((hi * 16 + lo) as u8)
                    })
                    .collect()
            }
            TextEncoding::Base64 => BASE64.decode(text).ok(),
            TextEncoding::Utf16Le => Some(text.encode_utf16().flat_map(u16::to_le_bytes).collect()),
        }
    }
}

/// A single value collected for a key.
#[derive(Debug, Clone, PartialEq)]
pub enum CollectedValue {
    Scalar(Value),
    DiskFile { path: PathBuf, size: u64 },
    BufferedFile { data: Value, size: u64 },
    StreamedFile { size: u64 },
}

impl CollectedValue {
    /// Size in bytes of a file value; `None` for scalars.
    pub fn size(&self) -> Option<u64> {
        match self {
            CollectedValue::Scalar(_) => None,
            CollectedValue::DiskFile { size, .. }
            | CollectedValue::BufferedFile { size, .. }
            | CollectedValue::StreamedFile { size } => Some(*size),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            CollectedValue::DiskFile { path, .. } => Some(path),
            _ => None,
        }
    }

    /// The scalar or buffered payload, if this value carries one.
    pub fn value(&self) -> Option<&Value> {
        match self {
            CollectedValue::Scalar(v) | CollectedValue::BufferedFile { data: v, .. } => Some(v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.value().and_then(Value::as_str)
    }
}

/// Everything collected for one key.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldEntry {
    One(CollectedValue),
    /// Values of a `multiple` field, in arrival order
    Many(Vec<CollectedValue>),
}

impl FieldEntry {
    pub fn as_slice(&self) -> &[CollectedValue] {
        match self {
            FieldEntry::One(v) => std::slice::from_ref(v),
            FieldEntry::Many(vs) => vs,
        }
    }

    pub fn first(&self) -> Option<&CollectedValue> {
        self.as_slice().first()
    }
}

/// The published result of a successful parse.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormResult {
    entries: HashMap<String, FieldEntry>,
}

impl FormResult {
    pub(crate) fn from_entries(entries: HashMap<String, FieldEntry>) -> Self {
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&FieldEntry> {
        self.entries.get(key)
    }

    /// First value collected for `key`.
    pub fn value(&self, key: &str) -> Option<&CollectedValue> {
        self.get(key).and_then(FieldEntry::first)
    }

    /// All values collected for `key`, empty when none arrived.
    pub fn values(&self, key: &str) -> &[CollectedValue] {
        self.get(key).map(FieldEntry::as_slice).unwrap_or(&[])
    }

    /// Text of the first value for `key`, when it is textual.
    pub fn text(&self, key: &str) -> Option<&str> {
        self.value(key).and_then(CollectedValue::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldEntry)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Paths of every file written to disk for this form.
    pub fn disk_paths(&self) -> Vec<&Path> {
        self.entries
            .values()
            .flat_map(FieldEntry::as_slice)
            .filter_map(CollectedValue::path)
            .collect()
    }

    pub fn into_inner(self) -> HashMap<String, FieldEntry> {
        self.entries
    }
}
