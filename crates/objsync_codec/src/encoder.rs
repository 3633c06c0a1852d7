//! Variable-length integer encoder.

use crate::int::VarInt;
use bytes::BufMut;

/// Appends the encoding of `value` to `buf` and returns the number of bytes
/// written.
///
/// Every byte except the last carries 7 value bits with the high bit set.
/// The last byte has the high bit clear, 6 value bits, and the sign in bit 6.
/// Values in `-64..=63` therefore take a single byte.
pub fn encode_int<T: VarInt, B: BufMut + ?Sized>(buf: &mut B, value: T) -> usize {
    let (negative, mut magnitude) = value.fold();
    let mut written = 1;
    while magnitude >> 6 != 0 {
        buf.put_u8(0x80 | (magnitude & 0x7f) as u8);
        magnitude >>= 7;
        written += 1;
    }
    let sign = if negative { 0x40 } else { 0 };
    buf.put_u8(sign | magnitude as u8);
    written
}

/// Returns the number of bytes `encode_int` would write for `value`.
pub fn encoded_len<T: VarInt>(value: T) -> usize {
    let (_, mut magnitude) = value.fold();
    let mut len = 1;
    while magnitude >> 6 != 0 {
        magnitude >>= 7;
        len += 1;
    }
    len
}

/// Encodes a single integer into a fresh buffer.
pub fn int_to_bytes<T: VarInt>(value: T) -> Vec<u8> {
    let mut buf = Vec::with_capacity(T::MAX_ENCODED_LEN);
    encode_int(&mut buf, value);
    buf
}
