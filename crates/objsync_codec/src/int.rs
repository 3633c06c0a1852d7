//! Integer types supported by the codec.

/// An integer type that can be written with the variable-length codec.
///
/// Values are folded into a sign flag and a non-negative magnitude: a
/// negative `v` becomes `-(v + 1)`, so that small negative numbers have small
/// magnitudes just like small positive ones.
pub trait VarInt: Copy + Sized {
    /// Human-readable name used in error messages.
    const TYPE_NAME: &'static str;

    /// Whether the type can hold negative values.
    const SIGNED: bool;

    /// Largest number of bytes an encoding of this type can occupy.
    const MAX_ENCODED_LEN: usize;

    /// Splits the value into its sign and folded magnitude.
    fn fold(self) -> (bool, u128);

    /// Rebuilds a value from a sign and magnitude, or `None` if out of range.
    fn unfold(negative: bool, magnitude: u128) -> Option<Self>;
}

/// One sign bit plus the value bits, spread over 7 bits per byte.
const fn max_encoded_len(value_bits: u32) -> usize {
    ((1 + value_bits + 6) / 7) as usize
}

macro_rules! impl_unsigned {
    ($($t:ty),*) => {$(
        impl VarInt for $t {
            const TYPE_NAME: &'static str = stringify!($t);
            const SIGNED: bool = false;
            const MAX_ENCODED_LEN: usize = max_encoded_len(<$t>::BITS);

            #[inline]
            fn fold(self) -> (bool, u128) {
                (false, u128::from(self))
            }

            #[inline]
            fn unfold(negative: bool, magnitude: u128) -> Option<Self> {
                if negative {
                    return None;
                }
                <$t>::try_from(magnitude).ok()
            }
        }
    )*};
}

macro_rules! impl_signed {
    ($($t:ty),*) => {$(
        impl VarInt for $t {
            const TYPE_NAME: &'static str = stringify!($t);
            const SIGNED: bool = true;
            const MAX_ENCODED_LEN: usize = max_encoded_len(<$t>::BITS - 1);

            #[inline]
            #[allow(clippy::cast_sign_loss)]
            fn fold(self) -> (bool, u128) {
                if self < 0 {
                    // !v == -(v + 1), which never overflows
                    (true, (!self) as u128)
                } else {
                    (false, self as u128)
                }
            }

            #[inline]
            fn unfold(negative: bool, magnitude: u128) -> Option<Self> {
                let value = <$t>::try_from(magnitude).ok()?;
                Some(if negative { !value } else { value })
            }
        }
    )*};
}

impl_unsigned!(u8, u16, u32, u64, u128);
impl_signed!(i8, i16, i32, i64);
