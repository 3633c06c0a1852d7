//! Wire format test vectors.
//!
//! Vectors are plain data so they can be exported as JSON and checked by
//! other implementations of the format.

use crate::fixtures;
use objsync_codec::{decode_int, encode_int};
use objsync_protocol::{encode_changeset, parse_changeset};
use serde::{Deserialize, Serialize};

/// A test vector that can be shared across implementations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestVector {
    /// Unique identifier for this vector.
    pub id: String,
    /// Human-readable description.
    pub description: String,
    /// Input data (hex-encoded).
    pub input_hex: String,
    /// Expected canonical re-encoding (hex-encoded).
    pub expected_hex: String,
    /// Expected error message (if this should fail).
    pub expected_error: Option<String>,
}

impl TestVector {
    fn ok(id: &str, description: &str, hex: &str) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            input_hex: hex.into(),
            expected_hex: hex.into(),
            expected_error: None,
        }
    }

    fn err(id: &str, description: &str, hex: &str, error: &str) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            input_hex: hex.into(),
            expected_hex: String::new(),
            expected_error: Some(error.into()),
        }
    }
}

/// Encodes bytes as lowercase hexadecimal.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Decodes hexadecimal, ignoring whitespace. Returns `None` on malformed
/// input.
pub fn hex_decode(hex: &str) -> Option<Vec<u8>> {
    let hex: String = hex.chars().filter(|c| !c.is_whitespace()).collect();
    if hex.len() % 2 != 0 {
        return None;
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok())
        .collect()
}

/// Signed 64-bit varint vectors.
pub fn varint_vectors() -> Vec<TestVector> {
    vec![
        TestVector::ok("varint_0", "zero", "00"),
        TestVector::ok("varint_63", "largest one-byte positive", "3f"),
        TestVector::ok("varint_64", "smallest two-byte positive", "c000"),
        TestVector::ok("varint_500", "500", "f403"),
        TestVector::ok("varint_neg_1", "-1", "40"),
        TestVector::ok("varint_neg_2", "-2", "41"),
        TestVector::ok("varint_neg_64", "smallest one-byte negative", "7f"),
        TestVector::ok("varint_neg_65", "largest two-byte negative", "c040"),
        TestVector::ok(
            "varint_string_limit",
            "largest string size plus one",
            "f0ffff07",
        ),
        TestVector::err(
            "varint_truncated",
            "continuation bit set on the last byte",
            "80",
            "unexpected end of input",
        ),
        TestVector::err("varint_empty", "no bytes at all", "", "unexpected end of input"),
    ]
}

/// Hand-assembled changesets, valid and malformed.
pub fn changeset_vectors() -> Vec<TestVector> {
    vec![
        TestVector::ok("changeset_empty", "empty changeset", ""),
        TestVector::ok(
            "changeset_erase_table",
            "intern declaration followed by EraseTable(\"Foo\")",
            "3f0003466f6f0100",
        ),
        TestVector::err(
            "changeset_intern_without_length",
            "intern opcode and index only",
            "3f00",
            "bad changeset - integer decoding failure",
        ),
        TestVector::err(
            "changeset_intern_too_long",
            "intern length one past the string limit",
            "3f00f0ffff07",
            "string too long",
        ),
        TestVector::err(
            "changeset_unknown_opcode",
            "opcode 0x30 is unassigned",
            "30",
            "unknown instruction",
        ),
        TestVector::err(
            "changeset_repeated_intern_index",
            "second declaration reuses index 0",
            "3f000161 3f000162",
            "Unexpected intern index",
        ),
        TestVector::err(
            "changeset_repeated_intern_content",
            "second declaration repeats \"a\"",
            "3f000161 3f010161",
            "Unexpected intern string",
        ),
    ]
}

/// Encodings of the fixture changesets, as produced by this implementation.
pub fn fixture_vectors() -> Vec<TestVector> {
    let fixtures = [
        (
            "fixture_add_table",
            "AddTable Foo keyed by nullable Int",
            fixtures::add_table_changeset(),
        ),
        (
            "fixture_create_object",
            "CreateObject Foo[123]",
            fixtures::create_object_changeset(),
        ),
        (
            "fixture_nested_update",
            "default Update of Foo[123].bar.baz.lol.boo",
            fixtures::nested_update_changeset(),
        ),
        (
            "fixture_array_update",
            "Update of Foo[123].bar[123], prior size 500",
            fixtures::array_update_changeset(),
        ),
        (
            "fixture_repeated_intern",
            "Program interned three times",
            fixtures::repeated_intern_changeset(),
        ),
        (
            "fixture_every_instruction",
            "every instruction and payload kind",
            fixtures::every_instruction_changeset(),
        ),
    ];
    fixtures
        .into_iter()
        .filter_map(|(id, description, cs)| {
            let bytes = encode_changeset(&cs).ok()?;
            Some(TestVector::ok(id, description, &hex_encode(&bytes)))
        })
        .collect()
}

/// Outcome of checking one vector.
pub type VectorResult = Result<(), String>;

/// Checks a varint vector: decoding then re-encoding must reproduce the
/// expected bytes, or decoding must fail with the expected message.
pub fn check_varint_vector(vector: &TestVector) -> VectorResult {
    let input = hex_decode(&vector.input_hex).ok_or("bad input hex")?;
    let mut source = input.as_slice();
    match (decode_int::<i64, _>(&mut source), &vector.expected_error) {
        (Ok(value), None) => {
            let mut out = Vec::new();
            encode_int(&mut out, value);
            expect_hex(vector, &out)
        }
        (Err(err), Some(expected)) if err.to_string() == *expected => Ok(()),
        (result, _) => Err(format!("{}: unexpected result {:?}", vector.id, result)),
    }
}

/// Checks a changeset vector the same way.
pub fn check_changeset_vector(vector: &TestVector) -> VectorResult {
    let input = hex_decode(&vector.input_hex).ok_or("bad input hex")?;
    match (parse_changeset(&input), &vector.expected_error) {
        (Ok(cs), None) => {
            let out = encode_changeset(&cs).map_err(|e| format!("{}: {e}", vector.id))?;
            expect_hex(vector, &out)
        }
        (Err(err), Some(expected)) if err.message() == expected.as_str() => Ok(()),
        (Err(err), _) => Err(format!("{}: unexpected error {err}", vector.id)),
        (Ok(_), Some(expected)) => Err(format!("{}: expected error {expected}", vector.id)),
    }
}

fn expect_hex(vector: &TestVector, bytes: &[u8]) -> VectorResult {
    let actual = hex_encode(bytes);
    let expected = hex_decode(&vector.expected_hex).map(|b| hex_encode(&b));
    if expected.as_deref() == Some(actual.as_str()) {
        Ok(())
    } else {
        Err(format!(
            "{} ({}): expected {}, got {}",
            vector.id, vector.description, vector.expected_hex, actual
        ))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AllTestVectors {
    varint: Vec<TestVector>,
    changeset: Vec<TestVector>,
    fixture: Vec<TestVector>,
}

/// Generate all test vectors as JSON.
pub fn all_vectors_json() -> String {
    let vectors = AllTestVectors {
        varint: varint_vectors(),
        changeset: changeset_vectors(),
        fixture: fixture_vectors(),
    };

    serde_json::to_string_pretty(&vectors).expect("Failed to serialize vectors")
}
