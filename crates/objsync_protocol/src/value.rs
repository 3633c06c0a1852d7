//! Scalar value types carried by instructions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A point in time as seconds and nanoseconds since the Unix epoch.
///
/// Both components carry the same sign; the wire format does not normalize
/// them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp {
    /// Whole seconds.
    pub seconds: i64,
    /// Nanosecond part.
    pub nanoseconds: i32,
}

impl Timestamp {
    /// Creates a timestamp.
    pub fn new(seconds: i64, nanoseconds: i32) -> Self {
        Self {
            seconds,
            nanoseconds,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}:{}", self.seconds, self.nanoseconds)
    }
}

/// A 12-byte object identifier in the BSON layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub [u8; 12]);

impl ObjectId {
    /// Size of the identifier in bytes.
    pub const LEN: usize = 12;

    /// Wraps raw bytes.
    pub fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

/// An IEEE 754-2008 decimal128 value in unpacked form.
///
/// Only the wire representation is modeled; no arithmetic is provided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Decimal128 {
    /// Binary integer coefficient.
    pub coefficient: u128,
    /// Decimal exponent.
    pub exponent: i32,
    /// Whether the value is negative.
    pub negative: bool,
}

impl Decimal128 {
    /// Creates a decimal from its parts.
    pub fn new(coefficient: u128, exponent: i32, negative: bool) -> Self {
        Self {
            coefficient,
            exponent,
            negative,
        }
    }
}

impl fmt::Display for Decimal128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.negative { "-" } else { "" };
        write!(f, "{sign}{}E{}", self.coefficient, self.exponent)
    }
}
