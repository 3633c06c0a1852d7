//! Owned field values.

use objsync_protocol::{
    Changeset, Decimal128, Link, ObjectId, Payload, PayloadType, PrimaryKeyValue, Timestamp,
};
use uuid::Uuid;

/// A field value as written by a [`WriteTransaction`](crate::WriteTransaction).
///
/// Unlike [`Payload`], a `Value` owns its strings and binary data, so it can
/// outlive the changeset it is recorded into.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null.
    Null,
    /// 64-bit integer.
    Int(i64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    String(String),
    /// Binary data.
    Binary(Vec<u8>),
    /// Timestamp.
    Timestamp(Timestamp),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// 128-bit decimal.
    Decimal(Decimal128),
    /// ObjectId.
    ObjectId(ObjectId),
    /// UUID.
    Uuid(Uuid),
    /// Link to an object in another table.
    Link {
        /// Target table name.
        table: String,
        /// Target object.
        target: PrimaryKeyValue,
    },
    /// Creates an embedded object in place.
    ObjectValue,
    /// Creates an empty dictionary in place.
    Dictionary,
    /// Removes a dictionary entry.
    Erased,
}

impl Value {
    /// Creates a link value.
    pub fn link(table: impl Into<String>, target: impl Into<PrimaryKeyValue>) -> Self {
        Value::Link {
            table: table.into(),
            target: target.into(),
        }
    }

    /// Type of the value.
    pub fn payload_type(&self) -> PayloadType {
        match self {
            Value::Null => PayloadType::Null,
            Value::Int(_) => PayloadType::Int,
            Value::Bool(_) => PayloadType::Bool,
            Value::String(_) => PayloadType::String,
            Value::Binary(_) => PayloadType::Binary,
            Value::Timestamp(_) => PayloadType::Timestamp,
            Value::Float(_) => PayloadType::Float,
            Value::Double(_) => PayloadType::Double,
            Value::Decimal(_) => PayloadType::Decimal,
            Value::ObjectId(_) => PayloadType::ObjectId,
            Value::Uuid(_) => PayloadType::Uuid,
            Value::Link { .. } => PayloadType::Link,
            Value::ObjectValue => PayloadType::ObjectValue,
            Value::Dictionary => PayloadType::Dictionary,
            Value::Erased => PayloadType::Erased,
        }
    }

    /// Records the value's data in `cs` and returns the payload referring to it.
    pub fn to_payload(&self, cs: &mut Changeset) -> Payload {
        match self {
            Value::Null => Payload::Null,
            Value::Int(v) => Payload::Int(*v),
            Value::Bool(v) => Payload::Bool(*v),
            Value::String(s) => Payload::String(cs.append_string(s)),
            Value::Binary(b) => Payload::Binary(cs.append_binary(b)),
            Value::Timestamp(t) => Payload::Timestamp(*t),
            Value::Float(v) => Payload::Float(*v),
            Value::Double(v) => Payload::Double(*v),
            Value::Decimal(d) => Payload::Decimal(*d),
            Value::ObjectId(id) => Payload::ObjectId(*id),
            Value::Uuid(u) => Payload::Uuid(*u),
            Value::Link { table, target } => Payload::Link(Link {
                target_table: cs.intern_string(table),
                target: cs.intern_key(target),
            }),
            Value::ObjectValue => Payload::ObjectValue,
            Value::Dictionary => Payload::Dictionary,
            Value::Erased => Payload::Erased,
        }
    }

    /// Resolves a payload of `cs` into an owned value.
    ///
    /// Returns `None` if the payload refers to strings or buffer ranges that
    /// `cs` does not hold.
    pub fn from_payload(cs: &Changeset, payload: &Payload) -> Option<Self> {
        let value = match payload {
            Payload::Null => Value::Null,
            Payload::Int(v) => Value::Int(*v),
            Payload::Bool(v) => Value::Bool(*v),
            Payload::String(range) => Value::String(cs.get_range_str(*range)?.to_owned()),
            Payload::Binary(range) => Value::Binary(cs.get_range(*range)?.to_vec()),
            Payload::Timestamp(t) => Value::Timestamp(*t),
            Payload::Float(v) => Value::Float(*v),
            Payload::Double(v) => Value::Double(*v),
            Payload::Decimal(d) => Value::Decimal(*d),
            Payload::ObjectId(id) => Value::ObjectId(*id),
            Payload::Uuid(u) => Value::Uuid(*u),
            Payload::Link(link) => Value::Link {
                table: cs.get_string(link.target_table)?.to_owned(),
                target: cs.get_key(&link.target)?,
            },
            Payload::ObjectValue => Value::ObjectValue,
            Payload::Dictionary => Value::Dictionary,
            Payload::Erased => Value::Erased,
        };
        Some(value)
    }
}

macro_rules! impl_from_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_value!(
    i64 => Int,
    i32 => Int,
    bool => Bool,
    String => String,
    &str => String,
    Vec<u8> => Binary,
    &[u8] => Binary,
    Timestamp => Timestamp,
    f32 => Float,
    f64 => Double,
    Decimal128 => Decimal,
    ObjectId => ObjectId,
    Uuid => Uuid,
);
