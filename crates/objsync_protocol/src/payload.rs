//! Instruction payload values.

use crate::intern::{InternString, StringBufferRange};
use crate::primary_key::PrimaryKey;
use crate::value::{Decimal128, ObjectId, Timestamp};
use uuid::Uuid;

/// Type tag of a payload, primary key, or column.
///
/// The numeric codes are part of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadType {
    /// Auto-generated object identifier (primary keys only).
    GlobalKey,
    /// Dictionary value erasure marker.
    Erased,
    /// Creates a nested dictionary.
    Dictionary,
    /// Creates a nested embedded object.
    ObjectValue,
    /// Null, or "mixed" when used as a column type.
    Null,
    /// 64-bit signed integer.
    Int,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    String,
    /// Binary blob.
    Binary,
    /// Timestamp.
    Timestamp,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// Decimal128.
    Decimal,
    /// Link to an object.
    Link,
    /// ObjectId.
    ObjectId,
    /// UUID.
    Uuid,
}

impl PayloadType {
    /// Converts to the wire code.
    pub fn to_code(self) -> i8 {
        match self {
            PayloadType::GlobalKey => -4,
            PayloadType::Erased => -3,
            PayloadType::Dictionary => -2,
            PayloadType::ObjectValue => -1,
            PayloadType::Null => 0,
            PayloadType::Int => 1,
            PayloadType::Bool => 2,
            PayloadType::String => 3,
            PayloadType::Binary => 4,
            PayloadType::Timestamp => 5,
            PayloadType::Float => 6,
            PayloadType::Double => 7,
            PayloadType::Decimal => 8,
            PayloadType::Link => 9,
            PayloadType::ObjectId => 10,
            PayloadType::Uuid => 11,
        }
    }

    /// Converts from a wire code.
    pub fn from_code(code: i64) -> Option<Self> {
        Some(match code {
            -4 => PayloadType::GlobalKey,
            -3 => PayloadType::Erased,
            -2 => PayloadType::Dictionary,
            -1 => PayloadType::ObjectValue,
            0 => PayloadType::Null,
            1 => PayloadType::Int,
            2 => PayloadType::Bool,
            3 => PayloadType::String,
            4 => PayloadType::Binary,
            5 => PayloadType::Timestamp,
            6 => PayloadType::Float,
            7 => PayloadType::Double,
            8 => PayloadType::Decimal,
            9 => PayloadType::Link,
            10 => PayloadType::ObjectId,
            11 => PayloadType::Uuid,
            _ => return None,
        })
    }

    /// Returns true if a table may use this type for its primary key.
    pub fn is_valid_key_type(self) -> bool {
        matches!(
            self,
            PayloadType::Int
                | PayloadType::String
                | PayloadType::ObjectId
                | PayloadType::Uuid
                | PayloadType::GlobalKey
        )
    }

    /// Name used when printing changesets.
    pub fn name(self) -> &'static str {
        match self {
            PayloadType::GlobalKey => "GlobalKey",
            PayloadType::Erased => "Erased",
            PayloadType::Dictionary => "Dictionary",
            PayloadType::ObjectValue => "ObjectValue",
            PayloadType::Null => "Null",
            PayloadType::Int => "Int",
            PayloadType::Bool => "Bool",
            PayloadType::String => "String",
            PayloadType::Binary => "Binary",
            PayloadType::Timestamp => "Timestamp",
            PayloadType::Float => "Float",
            PayloadType::Double => "Double",
            PayloadType::Decimal => "Decimal",
            PayloadType::Link => "Link",
            PayloadType::ObjectId => "ObjectId",
            PayloadType::Uuid => "UUID",
        }
    }
}

/// Target of a link payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    /// Table of the target object.
    pub target_table: InternString,
    /// Key of the target object.
    pub target: PrimaryKey,
}

/// A value written by an instruction.
///
/// String and binary contents live in the changeset buffer; the payload only
/// holds the range.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Dictionary value erasure marker.
    Erased,
    /// Creates a nested dictionary.
    Dictionary,
    /// Creates a nested embedded object.
    ObjectValue,
    /// Null.
    Null,
    /// 64-bit signed integer.
    Int(i64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string in the changeset buffer.
    String(StringBufferRange),
    /// Binary blob in the changeset buffer.
    Binary(StringBufferRange),
    /// Timestamp.
    Timestamp(Timestamp),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// Decimal128.
    Decimal(Decimal128),
    /// Link to an object.
    Link(Link),
    /// ObjectId.
    ObjectId(ObjectId),
    /// UUID.
    Uuid(Uuid),
}

impl Payload {
    /// Returns the type tag of this payload.
    pub fn payload_type(&self) -> PayloadType {
        match self {
            Payload::Erased => PayloadType::Erased,
            Payload::Dictionary => PayloadType::Dictionary,
            Payload::ObjectValue => PayloadType::ObjectValue,
            Payload::Null => PayloadType::Null,
            Payload::Int(_) => PayloadType::Int,
            Payload::Bool(_) => PayloadType::Bool,
            Payload::String(_) => PayloadType::String,
            Payload::Binary(_) => PayloadType::Binary,
            Payload::Timestamp(_) => PayloadType::Timestamp,
            Payload::Float(_) => PayloadType::Float,
            Payload::Double(_) => PayloadType::Double,
            Payload::Decimal(_) => PayloadType::Decimal,
            Payload::Link(_) => PayloadType::Link,
            Payload::ObjectId(_) => PayloadType::ObjectId,
            Payload::Uuid(_) => PayloadType::Uuid,
        }
    }

    /// Returns true for the null payload.
    pub fn is_null(&self) -> bool {
        matches!(self, Payload::Null)
    }
}

impl Default for Payload {
    fn default() -> Self {
        Payload::Null
    }
}
