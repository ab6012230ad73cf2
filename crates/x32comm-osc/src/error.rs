use crate::message::Tag;

/// Errors that can occur while parsing a received packet.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The packet contained no bytes at all.
    #[error("received empty packet")]
    EmptyPacket,

    /// No `,` separates the address from the type tags.
    #[error("no type tag block found (missing ',')")]
    MissingTypeTags,

    /// The type tag block is not followed by a zero byte.
    #[error("no null byte following type tags")]
    MissingTagTerminator,

    /// The packet ended before argument `index` was complete.
    #[error("argument {index} ('{tag}') is truncated")]
    TruncatedArgument { index: usize, tag: char },

    /// Argument `index` is a blob, which this codec does not parse.
    #[error("argument {index} is a blob, which is not supported")]
    UnsupportedBlobType { index: usize },

    /// Argument `index` has a type tag this codec does not know.
    #[error("argument {index} has unknown type tag '{tag}'")]
    UnknownTag { index: usize, tag: char },

    /// Nonzero bytes follow the last argument.
    #[error("more data than expected: nonzero byte at offset {offset}")]
    TrailingNonZeroData { offset: usize },
}

/// Errors that can occur while building or encoding a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    /// The message was already encoded and can no longer change.
    #[error("message to {address} is already encoded")]
    Sealed { address: String },

    /// A zero-terminated field contains a zero byte of its own.
    #[error("{field} contains an interior null byte")]
    InteriorNul { field: &'static str },

    /// The address contains the tag separator.
    #[error("address {address:?} contains ','")]
    CommaInAddress { address: String },
}

/// A decoded argument did not have the type the caller asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("type mismatch: expected {expected}, found {found}")]
pub struct TypeMismatchError {
    pub expected: Tag,
    pub found: Tag,
}

pub type Result<T> = std::result::Result<T, DecodeError>;
