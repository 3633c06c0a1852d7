//! Stable, globally unique object identifiers.

use crate::primary_key::PrimaryKeyValue;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Marks identifiers derived from a primary key value.
const PRIMARY_KEY_TAG: u64 = 1 << 63;

/// A stable object identifier shared by all peers.
///
/// For objects without a primary key, `hi` is the file ident of the peer that
/// created the object (0 while that peer has not been assigned one) and `lo`
/// is a per-table sequence number. For objects with a primary key the pair is
/// a pure function of the key value, see [`GlobalKey::from_primary_key`].
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct GlobalKey {
    hi: u64,
    lo: u64,
}

impl GlobalKey {
    /// Creates a key from its two halves.
    pub const fn new(hi: u64, lo: u64) -> Self {
        Self { hi, lo }
    }

    /// The peer half.
    pub const fn hi(&self) -> u64 {
        self.hi
    }

    /// The sequence half.
    pub const fn lo(&self) -> u64 {
        self.lo
    }

    /// Returns true if the key was allocated before the creating peer knew
    /// its file ident.
    pub const fn is_provisional(&self) -> bool {
        self.hi == 0
    }

    /// Returns the same sequence number under a different peer.
    pub const fn with_hi(self, hi: u64) -> Self {
        Self { hi, lo: self.lo }
    }

    /// Derives the identifier of a keyed object.
    ///
    /// - `Null` maps to `(0, 0)`
    /// - `Int(v)` maps to `(1 << 63, v)`
    /// - strings, ObjectIds and UUIDs are hashed with SHA-256 together with a
    ///   type tag; the first 16 digest bytes form the key, with bit 63 of `hi`
    ///   set
    pub fn from_primary_key(value: &PrimaryKeyValue) -> Self {
        match value {
            PrimaryKeyValue::Null => Self::new(0, 0),
            #[allow(clippy::cast_sign_loss)]
            PrimaryKeyValue::Int(v) => Self::new(PRIMARY_KEY_TAG, *v as u64),
            PrimaryKeyValue::String(s) => Self::hashed(b's', s.as_bytes()),
            PrimaryKeyValue::ObjectId(id) => Self::hashed(b'o', id.as_bytes()),
            PrimaryKeyValue::Uuid(uuid) => Self::hashed(b'u', uuid.as_bytes()),
            PrimaryKeyValue::GlobalKey(key) => *key,
        }
    }

    fn hashed(tag: u8, bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update([tag]);
        hasher.update(bytes);
        let digest = hasher.finalize();

        let mut hi = [0u8; 8];
        let mut lo = [0u8; 8];
        hi.copy_from_slice(&digest[..8]);
        lo.copy_from_slice(&digest[8..16]);
        Self::new(u64::from_be_bytes(hi) | PRIMARY_KEY_TAG, u64::from_be_bytes(lo))
    }
}

impl fmt::Display for GlobalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:x}-{:x}", self.hi, self.lo)
    }
}

/// Error parsing a [`GlobalKey`] from text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid global key: {0:?}")]
pub struct ParseGlobalKeyError(String);

impl FromStr for GlobalKey {
    type Err = ParseGlobalKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseGlobalKeyError(s.to_owned());
        let (hi, lo) = s.split_once('-').ok_or_else(err)?;
        let hi = u64::from_str_radix(hi, 16).map_err(|_| err())?;
        let lo = u64::from_str_radix(lo, 16).map_err(|_| err())?;
        Ok(Self::new(hi, lo))
    }
}
