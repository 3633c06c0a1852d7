//! Error types for the codec crate.

use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Errors that can occur while decoding an integer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The input ended before the final byte of an integer.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// The encoded value does not fit in the target type.
    #[error("integer overflow: value does not fit in {target}")]
    IntegerOverflow {
        /// Name of the target integer type.
        target: &'static str,
    },

    /// A negative value was decoded into an unsigned type.
    #[error("negative value for unsigned {target}")]
    NegativeUnsigned {
        /// Name of the target integer type.
        target: &'static str,
    },

    /// The encoding uses more bytes than the target type can ever need.
    #[error("integer encoding longer than {max_bytes} bytes")]
    Overlong {
        /// Maximum encoded length of the target type.
        max_bytes: usize,
    },
}

impl CodecError {
    /// Returns true if the error was caused by running out of input.
    pub fn is_truncation(&self) -> bool {
        matches!(self, CodecError::UnexpectedEof)
    }
}
