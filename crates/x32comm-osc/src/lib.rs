//! OSC message codec for X32 console control.
//!
//! Every message on the wire is laid out as:
//! - the address pattern, zero-padded to a multiple of 4 bytes
//! - a `,` followed by one type tag per argument, zero-padded the same way
//! - each argument in tag order (`i`/`f` as 4 big-endian bytes, `s` padded)
//!
//! Padding is never empty: a field that is already aligned gets four zero bytes.
//! Blob arguments and bundles are not supported.

pub mod address;
pub mod codec;
pub mod error;
pub mod message;

pub use address::fader_path;
pub use codec::{decode, encode, pad_len, ALIGNMENT, TAG_PREFIX};
pub use error::{DecodeError, EncodeError, Result, TypeMismatchError};
pub use message::{Arg, Message, Tag};
