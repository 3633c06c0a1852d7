//! Object addressing by primary key.

use crate::error::{BadChangesetError, ParseResult};
use crate::global_key::GlobalKey;
use crate::intern::InternString;
use crate::payload::PayloadType;
use crate::value::ObjectId;
use objsync_codec::{encode_int, SliceReader};
use std::fmt;
use uuid::Uuid;

/// Names a top-level object inside an instruction.
///
/// String keys refer to the changeset's intern table. Objects of tables
/// without a primary key are named by their allocated [`GlobalKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrimaryKey {
    /// Null primary key.
    Null,
    /// Integer primary key.
    Int(i64),
    /// String primary key.
    String(InternString),
    /// Allocated identifier of an object without a primary key.
    GlobalKey(GlobalKey),
    /// ObjectId primary key.
    ObjectId(ObjectId),
    /// UUID primary key.
    Uuid(Uuid),
}

impl PrimaryKey {
    /// Type tag written before the key value.
    pub fn payload_type(&self) -> PayloadType {
        match self {
            PrimaryKey::Null => PayloadType::Null,
            PrimaryKey::Int(_) => PayloadType::Int,
            PrimaryKey::String(_) => PayloadType::String,
            PrimaryKey::GlobalKey(_) => PayloadType::GlobalKey,
            PrimaryKey::ObjectId(_) => PayloadType::ObjectId,
            PrimaryKey::Uuid(_) => PayloadType::Uuid,
        }
    }
}

/// A primary key with string content resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrimaryKeyValue {
    /// Null primary key.
    Null,
    /// Integer primary key.
    Int(i64),
    /// String primary key.
    String(String),
    /// Allocated identifier of an object without a primary key.
    GlobalKey(GlobalKey),
    /// ObjectId primary key.
    ObjectId(ObjectId),
    /// UUID primary key.
    Uuid(Uuid),
}

impl PrimaryKeyValue {
    /// Type tag of the key.
    pub fn payload_type(&self) -> PayloadType {
        match self {
            PrimaryKeyValue::Null => PayloadType::Null,
            PrimaryKeyValue::Int(_) => PayloadType::Int,
            PrimaryKeyValue::String(_) => PayloadType::String,
            PrimaryKeyValue::GlobalKey(_) => PayloadType::GlobalKey,
            PrimaryKeyValue::ObjectId(_) => PayloadType::ObjectId,
            PrimaryKeyValue::Uuid(_) => PayloadType::Uuid,
        }
    }
}

impl fmt::Display for PrimaryKeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrimaryKeyValue::Null => f.write_str("NULL"),
            PrimaryKeyValue::Int(v) => write!(f, "{v}"),
            PrimaryKeyValue::String(s) => write!(f, "{s:?}"),
            PrimaryKeyValue::GlobalKey(key) => write!(f, "GlobalKey{{{key}}}"),
            PrimaryKeyValue::ObjectId(id) => write!(f, "ObjectId{{{id}}}"),
            PrimaryKeyValue::Uuid(uuid) => write!(f, "UUID{{{uuid}}}"),
        }
    }
}

impl From<i64> for PrimaryKeyValue {
    fn from(v: i64) -> Self {
        PrimaryKeyValue::Int(v)
    }
}

impl From<&str> for PrimaryKeyValue {
    fn from(s: &str) -> Self {
        PrimaryKeyValue::String(s.to_owned())
    }
}

impl From<String> for PrimaryKeyValue {
    fn from(s: String) -> Self {
        PrimaryKeyValue::String(s)
    }
}

impl From<GlobalKey> for PrimaryKeyValue {
    fn from(key: GlobalKey) -> Self {
        PrimaryKeyValue::GlobalKey(key)
    }
}

impl From<ObjectId> for PrimaryKeyValue {
    fn from(id: ObjectId) -> Self {
        PrimaryKeyValue::ObjectId(id)
    }
}

impl From<Uuid> for PrimaryKeyValue {
    fn from(uuid: Uuid) -> Self {
        PrimaryKeyValue::Uuid(uuid)
    }
}

/// Encodes a primary key as base64 text, e.g. for use in object paths sent
/// outside a changeset.
///
/// The bytes are the payload type code followed by the value; strings are
/// written inline with their length. GlobalKeys have no text form and encode
/// as their type code followed by both halves.
pub fn encode_primary_key_base64(value: &PrimaryKeyValue) -> String {
    let mut buf = Vec::new();
    encode_int(&mut buf, i64::from(value.payload_type().to_code()));
    match value {
        PrimaryKeyValue::Null => {}
        PrimaryKeyValue::Int(v) => {
            encode_int(&mut buf, *v);
        }
        PrimaryKeyValue::String(s) => {
            encode_int(&mut buf, s.len() as u64);
            buf.extend_from_slice(s.as_bytes());
        }
        PrimaryKeyValue::GlobalKey(key) => {
            encode_int(&mut buf, key.hi());
            encode_int(&mut buf, key.lo());
        }
        PrimaryKeyValue::ObjectId(id) => buf.extend_from_slice(id.as_bytes()),
        PrimaryKeyValue::Uuid(uuid) => buf.extend_from_slice(uuid.as_bytes()),
    }
    base64::encode(buf)
}

/// Parses the text produced by [`encode_primary_key_base64`].
///
/// # Errors
///
/// Returns a [`BadChangesetError`] for invalid base64, malformed content, or
/// a type that cannot be a primary key.
pub fn parse_base64_encoded_primary_key(text: &str) -> ParseResult<PrimaryKeyValue> {
    let bytes = base64::decode(text)
        .map_err(|_| BadChangesetError::new("invalid base64 in base64-encoded primary key"))?;
    let mut reader = SliceReader::new(&bytes);

    let code: i64 = reader.read_int()?;
    let value = match PayloadType::from_code(code) {
        Some(PayloadType::Null) => PrimaryKeyValue::Null,
        Some(PayloadType::Int) => PrimaryKeyValue::Int(reader.read_int()?),
        Some(PayloadType::String) => {
            let len: u64 = reader.read_int()?;
            let len = usize::try_from(len).map_err(|_| BadChangesetError::new("string too long"))?;
            let raw = reader
                .read_bytes(len)
                .map_err(|_| BadChangesetError::new("truncated input"))?;
            let s = std::str::from_utf8(raw)
                .map_err(|_| BadChangesetError::new("invalid UTF-8 string"))?;
            PrimaryKeyValue::String(s.to_owned())
        }
        Some(PayloadType::ObjectId) => {
            let raw = reader
                .read_bytes(ObjectId::LEN)
                .map_err(|_| BadChangesetError::new("truncated input"))?;
            let mut id = [0u8; ObjectId::LEN];
            id.copy_from_slice(raw);
            PrimaryKeyValue::ObjectId(ObjectId::from_bytes(id))
        }
        Some(PayloadType::Uuid) => {
            let raw = reader
                .read_bytes(16)
                .map_err(|_| BadChangesetError::new("truncated input"))?;
            let uuid = Uuid::from_slice(raw)
                .map_err(|_| BadChangesetError::new("truncated input"))?;
            PrimaryKeyValue::Uuid(uuid)
        }
        _ => {
            return Err(BadChangesetError::new(format!(
                "invalid primary key type {code}"
            )))
        }
    };

    if !reader.is_empty() {
        return Err(BadChangesetError::new("trailing bytes after primary key"));
    }
    Ok(value)
}
