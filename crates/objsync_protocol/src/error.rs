//! Error types for the protocol crate.

use objsync_codec::CodecError;
use thiserror::Error;

/// Result type for decoding operations.
pub type ParseResult<T> = Result<T, BadChangesetError>;

/// Result type for encoding operations.
pub type EncodeResult<T> = Result<T, EncodeError>;

/// A changeset could not be decoded.
///
/// The message is part of the observable contract: callers and tests match
/// on substrings such as `"string too long"` or `"Unexpected intern index"`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct BadChangesetError {
    message: String,
}

impl BadChangesetError {
    /// Creates a new error with the given reason.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// The human-readable reason.
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<CodecError> for BadChangesetError {
    fn from(_: CodecError) -> Self {
        Self::new("bad changeset - integer decoding failure")
    }
}

/// A changeset could not be encoded because it references data it does not
/// own. This always indicates a bug in the producer, never bad input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// An instruction references an intern index that was never assigned.
    #[error("unknown interned string {0}")]
    UnknownInternString(u32),

    /// A string or binary payload points outside the changeset buffer.
    #[error("buffer range {offset}+{size} exceeds buffer of {len} bytes")]
    RangeOutOfBounds {
        /// Range offset.
        offset: u32,
        /// Range size.
        size: u32,
        /// Length of the changeset buffer.
        len: usize,
    },

    /// The instruction is structurally invalid.
    #[error("invalid instruction: {0}")]
    InvalidInstruction(String),
}

impl EncodeError {
    /// Create an invalid instruction error.
    pub fn invalid_instruction(message: impl Into<String>) -> Self {
        Self::InvalidInstruction(message.into())
    }
}
