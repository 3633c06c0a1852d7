//! # objsync Codec
//!
//! Variable-length integer codec used by the objsync changeset format.
//!
//! Every integer in a changeset (opcodes, intern indices, lengths, payload
//! values) is written with the same scheme:
//! - Negative values are folded to `-(v + 1)` and flagged with a sign bit
//! - 7 value bits per continuation byte, least significant chunk first
//! - The final byte carries 6 value bits and the sign
//! - Values in `-64..=63` take a single byte
//!
//! Decoding is bounds-checked against the target type: truncated input,
//! overlong encodings, out-of-range values and negative values for unsigned
//! targets are all errors, never panics.
//!
//! ## Usage
//!
//! ```
//! use objsync_codec::{decode_int, encode_int};
//!
//! let mut buf = Vec::new();
//! encode_int(&mut buf, -12345i64);
//!
//! let decoded: i64 = decode_int(&mut buf.as_slice()).unwrap();
//! assert_eq!(decoded, -12345);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod decoder;
mod encoder;
mod error;
mod int;

pub use decoder::{decode_int, ByteSource, SliceReader};
pub use encoder::{encode_int, encoded_len, int_to_bytes};
pub use error::{CodecError, CodecResult};
pub use int::VarInt;
