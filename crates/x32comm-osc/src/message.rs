use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::codec;
use crate::error::{DecodeError, EncodeError, TypeMismatchError};

/// The type of a single message argument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    Int32,
    Float32,
    String,
}

impl Tag {
    /// The wire character for this tag.
    pub const fn as_char(self) -> char {
        match self {
            Tag::Int32 => 'i',
            Tag::Float32 => 'f',
            Tag::String => 's',
        }
    }

    /// Parse a wire character. Returns `None` for tags this codec cannot carry.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'i' => Some(Tag::Int32),
            'f' => Some(Tag::Float32),
            's' => Some(Tag::String),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Tag::Int32 => "int32",
            Tag::Float32 => "float32",
            Tag::String => "string",
        }
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single typed argument.
#[derive(Debug, Clone)]
pub enum Arg {
    Int(i32),
    Float(f32),
    Str(String),
}

impl Arg {
    pub fn tag(&self) -> Tag {
        match self {
            Arg::Int(_) => Tag::Int32,
            Arg::Float(_) => Tag::Float32,
            Arg::Str(_) => Tag::String,
        }
    }

    pub fn as_i32(&self) -> Result<i32, TypeMismatchError> {
        match self {
            Arg::Int(v) => Ok(*v),
            other => Err(other.mismatch(Tag::Int32)),
        }
    }

    pub fn as_f32(&self) -> Result<f32, TypeMismatchError> {
        match self {
            Arg::Float(v) => Ok(*v),
            other => Err(other.mismatch(Tag::Float32)),
        }
    }

    pub fn as_str(&self) -> Result<&str, TypeMismatchError> {
        match self {
            Arg::Str(v) => Ok(v),
            other => Err(other.mismatch(Tag::String)),
        }
    }

    fn mismatch(&self, expected: Tag) -> TypeMismatchError {
        TypeMismatchError {
            expected,
            found: self.tag(),
        }
    }
}

// Floats compare by bit pattern so a decoded NaN still equals its source.
impl PartialEq for Arg {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Arg::Int(a), Arg::Int(b)) => a == b,
            (Arg::Float(a), Arg::Float(b)) => a.to_bits() == b.to_bits(),
            (Arg::Str(a), Arg::Str(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Int(v) => write!(f, "{v}"),
            Arg::Float(v) => write!(f, "{v}"),
            Arg::Str(v) => f.write_str(v),
        }
    }
}

impl From<i32> for Arg {
    fn from(value: i32) -> Self {
        Arg::Int(value)
    }
}

impl From<f32> for Arg {
    fn from(value: f32) -> Self {
        Arg::Float(value)
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Arg::Float(value as f32)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Str(value.to_string())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Str(value)
    }
}

/// An OSC message: an address, typed arguments, and the wire bytes.
///
/// Messages built with [`Message::new`] and [`Message::add`] are sealed by
/// [`Message::encode`]; after that no further arguments can be added.
/// Messages received off the wire start out as [`Message::from_raw`] and are
/// parsed with [`Message::parse`].
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    address: String,
    args: Vec<Arg>,
    raw: Option<Bytes>,
}

impl Message {
    /// Start an empty message for `address`.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            args: Vec::new(),
            raw: None,
        }
    }

    /// Wrap received bytes without parsing them.
    pub fn from_raw(raw: impl Into<Bytes>) -> Self {
        Self {
            address: String::new(),
            args: Vec::new(),
            raw: Some(raw.into()),
        }
    }

    pub(crate) fn from_parts(address: String, args: Vec<Arg>, raw: Bytes) -> Self {
        Self {
            address,
            args,
            raw: Some(raw),
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn args(&self) -> &[Arg] {
        &self.args
    }

    pub fn arg(&self, index: usize) -> Option<&Arg> {
        self.args.get(index)
    }

    /// Type tags in argument order.
    pub fn tags(&self) -> impl Iterator<Item = Tag> + '_ {
        self.args.iter().map(Arg::tag)
    }

    /// Type tags as they appear on the wire, without the leading `,`.
    pub fn type_tags(&self) -> String {
        self.tags().map(Tag::as_char).collect()
    }

    /// The wire bytes, if the message has been encoded or was received.
    pub fn raw(&self) -> Option<&Bytes> {
        self.raw.as_ref()
    }

    pub fn is_encoded(&self) -> bool {
        self.raw.is_some()
    }

    /// Append an argument.
    pub fn add(&mut self, arg: impl Into<Arg>) -> Result<&mut Self, EncodeError> {
        if self.raw.is_some() {
            return Err(EncodeError::Sealed {
                address: self.address.clone(),
            });
        }
        self.args.push(arg.into());
        Ok(self)
    }

    /// Builder-style [`Message::add`].
    pub fn with_arg(mut self, arg: impl Into<Arg>) -> Result<Self, EncodeError> {
        self.add(arg)?;
        Ok(self)
    }

    /// Encode the message and seal it.
    ///
    /// Repeated calls return the cached bytes.
    pub fn encode(&mut self) -> Result<Bytes, EncodeError> {
        if let Some(raw) = &self.raw {
            return Ok(raw.clone());
        }
        let raw = self.to_bytes()?;
        self.raw = Some(raw.clone());
        Ok(raw)
    }

    /// Encode without sealing.
    pub fn to_bytes(&self) -> Result<Bytes, EncodeError> {
        let mut dst = BytesMut::new();
        codec::encode(&self.address, &self.args, &mut dst)?;
        Ok(dst.freeze())
    }

    /// Parse the raw bytes into a new, fully populated message.
    pub fn parse(&self) -> Result<Message, DecodeError> {
        match &self.raw {
            Some(raw) => codec::decode(raw.clone()),
            None => Err(DecodeError::EmptyPacket),
        }
    }

    /// Printable rendering of the wire bytes.
    ///
    /// Zero bytes render as `~`, other non-printable bytes as `\xNN`.
    pub fn describe(&self) -> String {
        let Some(raw) = &self.raw else {
            return String::new();
        };
        let mut out = String::with_capacity(raw.len());
        for &b in raw.iter() {
            match b {
                0 => out.push('~'),
                0x20..=0x7e => out.push(b as char),
                other => out.push_str(&format!("\\x{other:02x}")),
            }
        }
        out
    }
}
