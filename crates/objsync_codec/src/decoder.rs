//! Variable-length integer decoder.

use crate::error::{CodecError, CodecResult};
use crate::int::VarInt;

/// A source of bytes consumed one at a time.
///
/// Implemented by in-memory readers and by streaming parsers whose input
/// arrives in blocks. Returning `None` means the input is exhausted.
pub trait ByteSource {
    /// Returns the next byte, or `None` if no input remains.
    fn next_byte(&mut self) -> Option<u8>;
}

impl ByteSource for &[u8] {
    #[inline]
    fn next_byte(&mut self) -> Option<u8> {
        let (&first, rest) = self.split_first()?;
        *self = rest;
        Some(first)
    }
}

/// Decodes one integer of type `T` from `source`.
///
/// # Errors
///
/// - [`CodecError::UnexpectedEof`] if the input ends mid-integer
/// - [`CodecError::Overlong`] if more bytes follow than `T` can ever need
/// - [`CodecError::IntegerOverflow`] if the value exceeds the range of `T`
/// - [`CodecError::NegativeUnsigned`] if a negative value targets an unsigned type
pub fn decode_int<T: VarInt, S: ByteSource + ?Sized>(source: &mut S) -> CodecResult<T> {
    let mut magnitude: u128 = 0;
    let mut shift: u32 = 0;

    for _ in 0..T::MAX_ENCODED_LEN {
        let byte = source.next_byte().ok_or(CodecError::UnexpectedEof)?;
        if byte & 0x80 != 0 {
            magnitude |= shifted(u128::from(byte & 0x7f), shift).ok_or(overflow::<T>())?;
            shift += 7;
            continue;
        }

        magnitude |= shifted(u128::from(byte & 0x3f), shift).ok_or(overflow::<T>())?;
        let negative = byte & 0x40 != 0;
        return T::unfold(negative, magnitude).ok_or(if negative && !T::SIGNED {
            CodecError::NegativeUnsigned {
                target: T::TYPE_NAME,
            }
        } else {
            overflow::<T>()
        });
    }

    Err(CodecError::Overlong {
        max_bytes: T::MAX_ENCODED_LEN,
    })
}

fn overflow<T: VarInt>() -> CodecError {
    CodecError::IntegerOverflow {
        target: T::TYPE_NAME,
    }
}

/// `part << shift`, or `None` if any set bit would be shifted out.
#[inline]
fn shifted(part: u128, shift: u32) -> Option<u128> {
    if part == 0 {
        return Some(0);
    }
    if shift >= u128::BITS || part.leading_zeros() < shift {
        return None;
    }
    Some(part << shift)
}

/// A bounds-checked reader over an in-memory byte slice.
pub struct SliceReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> SliceReader<'a> {
    /// Create a new reader for the given bytes.
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Decode the next integer.
    pub fn read_int<T: VarInt>(&mut self) -> CodecResult<T> {
        decode_int(self)
    }

    /// Read exactly `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize) -> CodecResult<&'a [u8]> {
        if len > self.data.len() - self.pos {
            return Err(CodecError::UnexpectedEof);
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    /// Number of bytes consumed so far.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Check if all bytes have been consumed.
    pub fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Get remaining bytes.
    pub fn remaining(&self) -> &'a [u8] {
        &self.data[self.pos..]
    }
}

impl ByteSource for SliceReader<'_> {
    #[inline]
    fn next_byte(&mut self) -> Option<u8> {
        let byte = *self.data.get(self.pos)?;
        self.pos += 1;
        Some(byte)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::int_to_bytes;

    fn decode<T: VarInt>(mut bytes: &[u8]) -> CodecResult<T> {
        decode_int(&mut bytes)
    }

    #[test]
    fn decode_single_byte() {
        assert_eq!(decode::<u64>(&[0x00]), Ok(0));
        assert_eq!(decode::<u64>(&[0x3f]), Ok(63));
        assert_eq!(decode::<i64>(&[0x40]), Ok(-1));
        assert_eq!(decode::<i64>(&[0x7f]), Ok(-64));
    }

    #[test]
    fn decode_multi_byte() {
        assert_eq!(decode::<u64>(&[0xc0, 0x00]), Ok(64));
        assert_eq!(decode::<u32>(&[0xf4, 0x03]), Ok(500));
        assert_eq!(decode::<i64>(&[0xc0, 0x40]), Ok(-65));
    }

    #[test]
    fn extremes_roundtrip() {
        assert_eq!(decode::<i64>(&int_to_bytes(i64::MIN)), Ok(i64::MIN));
        assert_eq!(decode::<i64>(&int_to_bytes(i64::MAX)), Ok(i64::MAX));
        assert_eq!(decode::<u64>(&int_to_bytes(u64::MAX)), Ok(u64::MAX));
        assert_eq!(decode::<u128>(&int_to_bytes(u128::MAX)), Ok(u128::MAX));
    }

    #[test]
    fn truncated_input() {
        assert_eq!(decode::<u64>(&[]), Err(CodecError::UnexpectedEof));
        assert_eq!(decode::<u64>(&[0x80]), Err(CodecError::UnexpectedEof));
        assert_eq!(decode::<u64>(&[0xff, 0xff]), Err(CodecError::UnexpectedEof));
    }

    #[test]
    fn value_too_wide_for_target() {
        let bytes = int_to_bytes(u64::from(u32::MAX) + 1);
        assert!(matches!(
            decode::<u32>(&bytes),
            Err(CodecError::IntegerOverflow { target: "u32" })
        ));
        let bytes = int_to_bytes(256u64);
        assert!(matches!(
            decode::<u8>(&bytes),
            Err(CodecError::IntegerOverflow { .. })
        ));
    }

    #[test]
    fn negative_for_unsigned() {
        assert!(matches!(
            decode::<u64>(&[0x40]),
            Err(CodecError::NegativeUnsigned { target: "u64" })
        ));
    }

    #[test]
    fn overlong_encoding() {
        // Eleven continuation bytes can never be a u64
        let bytes = [0x80u8; 11];
        assert!(matches!(
            decode::<u64>(&bytes),
            Err(CodecError::Overlong { max_bytes: 10 })
        ));
    }

    #[test]
    fn high_bits_shifted_out() {
        // Ten bytes whose last chunk would land beyond bit 63 of the value
        let mut bytes = vec![0xffu8; 9];
        bytes.push(0x3f);
        assert!(matches!(
            decode::<u64>(&bytes),
            Err(CodecError::IntegerOverflow { .. })
        ));
    }

    #[test]
    fn slice_reader_tracks_position() {
        let mut data = int_to_bytes(1000u32);
        data.extend_from_slice(b"abc");
        let mut reader = SliceReader::new(&data);
        assert_eq!(reader.read_int::<u32>(), Ok(1000));
        assert_eq!(reader.position(), 2);
        assert_eq!(reader.read_bytes(3), Ok(&b"abc"[..]));
        assert!(reader.is_empty());
        assert_eq!(reader.read_bytes(1), Err(CodecError::UnexpectedEof));
    }
}
