//! Streaming changeset parser.
//!
//! Input arrives as a sequence of [`Bytes`] blocks. Values may straddle block
//! boundaries; the parser reassembles them without seeking backwards and never
//! allocates more than the input actually delivered, so a corrupt length
//! prefix cannot trigger a large allocation.

use crate::changeset::Changeset;
use crate::error::{BadChangesetError, ParseResult};
use crate::global_key::GlobalKey;
use crate::instruction::{
    AddColumn, AddInteger, AddTable, ArrayErase, ArrayInsert, ArrayMove, Clear, CollectionType,
    CreateObject, EraseColumn, EraseObject, EraseTable, InstructionType, PathInstruction,
    SetErase, SetInsert, TableType, Update,
};
use crate::intern::{InternString, StringBufferRange};
use crate::path::{Path, PathElement};
use crate::payload::{Link, Payload, PayloadType};
use crate::primary_key::PrimaryKey;
use crate::value::{Decimal128, ObjectId, Timestamp};
use bytes::Bytes;
use objsync_codec::{decode_int, ByteSource, VarInt};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, trace};
use uuid::Uuid;

/// Default upper bound for string lengths.
pub const MAX_STRING_SIZE: u64 = 0x00FF_FFF8 - 9;

/// Default upper bound for binary lengths.
pub const MAX_BINARY_SIZE: u64 = MAX_STRING_SIZE;

/// A source of input blocks.
pub trait InputStream {
    /// Returns the next block, or `None` at the end of input.
    fn next_block(&mut self) -> Option<Bytes>;
}

/// Input consisting of a single block.
#[derive(Debug, Clone)]
pub struct BytesInputStream {
    block: Option<Bytes>,
}

impl BytesInputStream {
    /// Wraps `bytes`.
    pub fn new(bytes: impl Into<Bytes>) -> Self {
        Self {
            block: Some(bytes.into()),
        }
    }
}

impl InputStream for BytesInputStream {
    fn next_block(&mut self) -> Option<Bytes> {
        self.block.take()
    }
}

/// Input delivered as a sequence of blocks, e.g. as received from a socket.
#[derive(Debug, Clone, Default)]
pub struct ChunkedInputStream {
    blocks: VecDeque<Bytes>,
}

impl ChunkedInputStream {
    /// Creates a stream yielding `blocks` in order.
    pub fn new(blocks: impl IntoIterator<Item = Bytes>) -> Self {
        Self {
            blocks: blocks.into_iter().collect(),
        }
    }

    /// Splits `data` into blocks of at most `block_size` bytes.
    pub fn split(data: &[u8], block_size: usize) -> Self {
        let block_size = block_size.max(1);
        Self::new(
            data.chunks(block_size)
                .map(Bytes::copy_from_slice)
                .collect::<Vec<_>>(),
        )
    }

    /// Appends a block.
    pub fn push(&mut self, block: Bytes) {
        self.blocks.push_back(block);
    }
}

impl InputStream for ChunkedInputStream {
    fn next_block(&mut self) -> Option<Bytes> {
        self.blocks.pop_front()
    }
}

/// Limits applied while parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Longest accepted string, interned or payload, in bytes.
    pub max_string_size: u64,
    /// Longest accepted binary payload in bytes.
    pub max_binary_size: u64,
}

impl ParserConfig {
    /// Creates a configuration with the default limits.
    pub fn new() -> Self {
        Self {
            max_string_size: MAX_STRING_SIZE,
            max_binary_size: MAX_BINARY_SIZE,
        }
    }

    /// Sets the string size limit.
    pub fn with_max_string_size(mut self, size: u64) -> Self {
        self.max_string_size = size;
        self
    }

    /// Sets the binary size limit.
    pub fn with_max_binary_size(mut self, size: u64) -> Self {
        self.max_binary_size = size;
        self
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Decodes a complete changeset held in memory, with default limits.
///
/// # Errors
///
/// Returns a [`BadChangesetError`] describing the first malformation found.
pub fn parse_changeset(data: &[u8]) -> ParseResult<Changeset> {
    parse_changeset_with(data, &ParserConfig::default())
}

/// Decodes a complete changeset held in memory.
///
/// # Errors
///
/// Returns a [`BadChangesetError`] describing the first malformation found.
pub fn parse_changeset_with(data: &[u8], config: &ParserConfig) -> ParseResult<Changeset> {
    let mut input = BytesInputStream::new(Bytes::copy_from_slice(data));
    let mut changeset = Changeset::new();
    parse_changeset_stream(&mut input, config, &mut changeset)?;
    Ok(changeset)
}

/// Decodes a changeset from a block stream into `out`.
///
/// On success the instructions, strings and buffer of `out` are replaced;
/// its sync metadata is kept. On failure `out` is left untouched.
///
/// # Errors
///
/// Returns a [`BadChangesetError`] describing the first malformation found.
pub fn parse_changeset_stream<S: InputStream + ?Sized>(
    input: &mut S,
    config: &ParserConfig,
    out: &mut Changeset,
) -> ParseResult<()> {
    let mut state = State::new(input, config);
    while state.has_next() {
        if let Err(err) = state.parse_one() {
            debug!(offset = state.offset(), reason = %err, "rejected changeset");
            return Err(err);
        }
    }

    trace!(
        instructions = state.changeset.len(),
        bytes = state.offset(),
        "parsed changeset"
    );
    out.replace_contents(state.changeset);
    Ok(())
}

fn error(message: &str) -> BadChangesetError {
    BadChangesetError::new(message)
}

struct State<'a, S: InputStream + ?Sized> {
    input: &'a mut S,
    config: &'a ParserConfig,
    block: Bytes,
    pos: usize,
    consumed: usize,
    exhausted: bool,
    changeset: Changeset,
}

impl<S: InputStream + ?Sized> ByteSource for State<'_, S> {
    fn next_byte(&mut self) -> Option<u8> {
        if self.pos == self.block.len() && !self.next_block() {
            return None;
        }
        let byte = self.block[self.pos];
        self.pos += 1;
        Some(byte)
    }
}

impl<'a, S: InputStream + ?Sized> State<'a, S> {
    fn new(input: &'a mut S, config: &'a ParserConfig) -> Self {
        Self {
            input,
            config,
            block: Bytes::new(),
            pos: 0,
            consumed: 0,
            exhausted: false,
            changeset: Changeset::new(),
        }
    }

    /// Bytes consumed so far.
    fn offset(&self) -> usize {
        self.consumed + self.pos
    }

    /// Advances to the next non-empty block.
    fn next_block(&mut self) -> bool {
        while !self.exhausted {
            match self.input.next_block() {
                Some(block) if block.is_empty() => continue,
                Some(block) => {
                    self.consumed += self.block.len();
                    self.block = block;
                    self.pos = 0;
                    return true;
                }
                None => self.exhausted = true,
            }
        }
        false
    }

    fn has_next(&mut self) -> bool {
        self.pos < self.block.len() || self.next_block()
    }

    fn read_int<T: VarInt>(&mut self) -> ParseResult<T> {
        Ok(decode_int(self)?)
    }

    fn read_bool(&mut self) -> ParseResult<bool> {
        match self.read_int::<u8>()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(error("invalid bool")),
        }
    }

    /// Reads `len` raw bytes, growing the output only as input arrives.
    fn read_bytes(&mut self, len: usize) -> ParseResult<Vec<u8>> {
        let mut out = Vec::new();
        let mut remaining = len;
        while remaining > 0 {
            if self.pos == self.block.len() && !self.next_block() {
                return Err(error("truncated input"));
            }
            let take = remaining.min(self.block.len() - self.pos);
            out.extend_from_slice(&self.block[self.pos..self.pos + take]);
            self.pos += take;
            remaining -= take;
        }
        Ok(out)
    }

    fn read_array<const N: usize>(&mut self) -> ParseResult<[u8; N]> {
        let mut out = [0u8; N];
        let mut filled = 0;
        while filled < N {
            if self.pos == self.block.len() && !self.next_block() {
                return Err(error("truncated input"));
            }
            let take = (N - filled).min(self.block.len() - self.pos);
            out[filled..filled + take].copy_from_slice(&self.block[self.pos..self.pos + take]);
            self.pos += take;
            filled += take;
        }
        Ok(out)
    }

    fn read_sized(&mut self, limit: u64, too_long: &str) -> ParseResult<Vec<u8>> {
        let size: u64 = self.read_int()?;
        if size > limit {
            return Err(error(too_long));
        }
        let size = usize::try_from(size).map_err(|_| error(too_long))?;
        self.read_bytes(size)
    }

    fn read_string(&mut self) -> ParseResult<String> {
        let bytes = self.read_sized(self.config.max_string_size, "string too long")?;
        String::from_utf8(bytes).map_err(|_| error("invalid UTF-8 string"))
    }

    fn read_binary(&mut self) -> ParseResult<Vec<u8>> {
        self.read_sized(self.config.max_binary_size, "binary too long")
    }

    fn read_intern_string(&mut self) -> ParseResult<InternString> {
        let id = InternString(self.read_int()?);
        if !self.changeset.strings().contains(id) {
            return Err(error("Invalid interned string"));
        }
        Ok(id)
    }

    fn read_payload_type(&mut self) -> ParseResult<PayloadType> {
        let code: i64 = self.read_int()?;
        PayloadType::from_code(code).ok_or_else(|| error("Unsupported data type"))
    }

    fn read_collection_type(&mut self) -> ParseResult<CollectionType> {
        let code: u8 = self.read_int()?;
        CollectionType::from_code(code).ok_or_else(|| error("Unsupported collection type"))
    }

    fn read_global_key(&mut self) -> ParseResult<GlobalKey> {
        let hi = self.read_int()?;
        let lo = self.read_int()?;
        Ok(GlobalKey::new(hi, lo))
    }

    fn read_object_id(&mut self) -> ParseResult<ObjectId> {
        Ok(ObjectId::from_bytes(self.read_array()?))
    }

    fn read_uuid(&mut self) -> ParseResult<Uuid> {
        Ok(Uuid::from_bytes(self.read_array()?))
    }

    fn read_timestamp(&mut self) -> ParseResult<Timestamp> {
        let seconds: i64 = self.read_int()?;
        let nanoseconds: i64 = self.read_int()?;
        let nanoseconds =
            i32::try_from(nanoseconds).map_err(|_| error("timestamp out of range"))?;
        Ok(Timestamp::new(seconds, nanoseconds))
    }

    fn read_decimal(&mut self) -> ParseResult<Decimal128> {
        let coefficient: u128 = self.read_int()?;
        let exponent: i64 = self.read_int()?;
        let exponent = i32::try_from(exponent).map_err(|_| error("decimal out of range"))?;
        let negative = self.read_bool()?;
        Ok(Decimal128::new(coefficient, exponent, negative))
    }

    fn read_object_key(&mut self) -> ParseResult<PrimaryKey> {
        Ok(match self.read_payload_type()? {
            PayloadType::Null => PrimaryKey::Null,
            PayloadType::Int => PrimaryKey::Int(self.read_int()?),
            PayloadType::String => PrimaryKey::String(self.read_intern_string()?),
            PayloadType::GlobalKey => PrimaryKey::GlobalKey(self.read_global_key()?),
            PayloadType::ObjectId => PrimaryKey::ObjectId(self.read_object_id()?),
            PayloadType::Uuid => PrimaryKey::Uuid(self.read_uuid()?),
            _ => return Err(error("Unsupported object key type")),
        })
    }

    fn append_to_buffer(&mut self, data: &[u8]) -> ParseResult<StringBufferRange> {
        self.changeset
            .try_append(data)
            .ok_or_else(|| error("changeset too large"))
    }

    fn read_payload(&mut self) -> ParseResult<Payload> {
        Ok(match self.read_payload_type()? {
            PayloadType::GlobalKey => return Err(error("Unsupported payload data type")),
            PayloadType::Erased => Payload::Erased,
            PayloadType::Dictionary => Payload::Dictionary,
            PayloadType::ObjectValue => Payload::ObjectValue,
            PayloadType::Null => Payload::Null,
            PayloadType::Int => Payload::Int(self.read_int()?),
            PayloadType::Bool => Payload::Bool(self.read_bool()?),
            PayloadType::String => {
                let s = self.read_string()?;
                Payload::String(self.append_to_buffer(s.as_bytes())?)
            }
            PayloadType::Binary => {
                let data = self.read_binary()?;
                Payload::Binary(self.append_to_buffer(&data)?)
            }
            PayloadType::Timestamp => Payload::Timestamp(self.read_timestamp()?),
            PayloadType::Float => Payload::Float(f32::from_le_bytes(self.read_array()?)),
            PayloadType::Double => Payload::Double(f64::from_le_bytes(self.read_array()?)),
            PayloadType::Decimal => Payload::Decimal(self.read_decimal()?),
            PayloadType::Link => {
                let target_table = self.read_intern_string()?;
                let target = self.read_object_key()?;
                Payload::Link(Link {
                    target_table,
                    target,
                })
            }
            PayloadType::ObjectId => Payload::ObjectId(self.read_object_id()?),
            PayloadType::Uuid => Payload::Uuid(self.read_uuid()?),
        })
    }

    fn read_path(&mut self) -> ParseResult<Path> {
        let len: u32 = self.read_int()?;
        let mut path = Path::new();
        for _ in 0..len {
            let element: i64 = self.read_int()?;
            let element = match element {
                -1 => PathElement::Field(self.read_intern_string()?),
                i if i >= 0 => PathElement::Index(
                    u32::try_from(i).map_err(|_| error("path index out of range"))?,
                ),
                _ => return Err(error("invalid path element")),
            };
            path.push(element);
        }
        Ok(path)
    }

    fn read_path_instr(&mut self) -> ParseResult<PathInstruction> {
        let table = self.read_intern_string()?;
        let object = self.read_object_key()?;
        let field = self.read_intern_string()?;
        let path = self.read_path()?;
        Ok(PathInstruction::new(table, object, field).with_path(path))
    }

    fn read_array_target(&mut self, name: &str) -> ParseResult<PathInstruction> {
        let target = self.read_path_instr()?;
        if !target.path.is_array_index() {
            return Err(BadChangesetError::new(format!("{name} without an index")));
        }
        Ok(target)
    }

    fn parse_intern_string(&mut self) -> ParseResult<()> {
        let index: u32 = self.read_int()?;
        let s = self.read_string()?;
        self.changeset.strings_mut().declare(index, &s)?;
        Ok(())
    }

    fn parse_one(&mut self) -> ParseResult<()> {
        let code: u64 = self.read_int()?;
        if code == u64::from(InstructionType::INTERN_STRING) {
            return self.parse_intern_string();
        }

        let kind = InstructionType::from_code(code).ok_or_else(|| error("unknown instruction"))?;
        match kind {
            InstructionType::AddTable => {
                let table = self.read_intern_string()?;
                let table_type = match self.read_int::<u8>()? {
                    code @ (0 | 2) => {
                        let pk_field = self.read_intern_string()?;
                        let pk_type = self.read_payload_type()?;
                        if !pk_type.is_valid_key_type() {
                            return Err(error("Invalid primary key type in AddTable"));
                        }
                        let pk_nullable = self.read_bool()?;
                        TableType::TopLevel {
                            pk_field,
                            pk_type,
                            pk_nullable,
                            is_asymmetric: code == 2,
                        }
                    }
                    1 => TableType::Embedded,
                    _ => return Err(error("AddTable: unknown table type")),
                };
                self.changeset.push_back(AddTable { table, table_type });
            }
            InstructionType::EraseTable => {
                let table = self.read_intern_string()?;
                self.changeset.push_back(EraseTable { table });
            }
            InstructionType::AddColumn => {
                let table = self.read_intern_string()?;
                let field = self.read_intern_string()?;
                let value_type = self.read_payload_type()?;
                let nullable = self.read_bool()?;
                let collection_type = self.read_collection_type()?;
                let link_target_table = if value_type == PayloadType::Link {
                    Some(self.read_intern_string()?)
                } else {
                    None
                };
                let key_type = if collection_type == CollectionType::Dictionary {
                    Some(self.read_payload_type()?)
                } else {
                    None
                };
                self.changeset.push_back(AddColumn {
                    table,
                    field,
                    value_type,
                    nullable,
                    collection_type,
                    link_target_table,
                    key_type,
                });
            }
            InstructionType::EraseColumn => {
                let table = self.read_intern_string()?;
                let field = self.read_intern_string()?;
                self.changeset.push_back(EraseColumn { table, field });
            }
            InstructionType::CreateObject => {
                let table = self.read_intern_string()?;
                let object = self.read_object_key()?;
                self.changeset.push_back(CreateObject { table, object });
            }
            InstructionType::EraseObject => {
                let table = self.read_intern_string()?;
                let object = self.read_object_key()?;
                self.changeset.push_back(EraseObject { table, object });
            }
            InstructionType::Update => {
                let target = self.read_path_instr()?;
                let value = self.read_payload()?;
                let mut instr = Update::new(target, value);
                if instr.is_array_update() {
                    instr.prior_size = self.read_int()?;
                } else {
                    instr.is_default = self.read_bool()?;
                }
                self.changeset.push_back(instr);
            }
            InstructionType::AddInteger => {
                let target = self.read_path_instr()?;
                let value = self.read_int()?;
                self.changeset.push_back(AddInteger { target, value });
            }
            InstructionType::ArrayInsert => {
                let target = self.read_array_target("ArrayInsert")?;
                let value = self.read_payload()?;
                let prior_size = self.read_int()?;
                self.changeset.push_back(ArrayInsert {
                    target,
                    value,
                    prior_size,
                });
            }
            InstructionType::ArrayMove => {
                let target = self.read_array_target("ArrayMove")?;
                let destination = self.read_int()?;
                let prior_size = self.read_int()?;
                self.changeset.push_back(ArrayMove {
                    target,
                    destination,
                    prior_size,
                });
            }
            InstructionType::ArrayErase => {
                let target = self.read_array_target("ArrayErase")?;
                let prior_size = self.read_int()?;
                self.changeset.push_back(ArrayErase { target, prior_size });
            }
            InstructionType::Clear => {
                let target = self.read_path_instr()?;
                let _reserved: u32 = self.read_int()?;
                self.changeset.push_back(Clear { target });
            }
            InstructionType::SetInsert => {
                let target = self.read_path_instr()?;
                let value = self.read_payload()?;
                self.changeset.push_back(SetInsert { target, value });
            }
            InstructionType::SetErase => {
                let target = self.read_path_instr()?;
                let value = self.read_payload()?;
                self.changeset.push_back(SetErase { target, value });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objsync_codec::encode_int;

    fn bytes(values: &[i64]) -> Vec<u8> {
        let mut buf = Vec::new();
        for &v in values {
            encode_int(&mut buf, v);
        }
        buf
    }

    fn message(data: &[u8]) -> String {
        parse_changeset(data).unwrap_err().message().to_owned()
    }

    #[test]
    fn empty_input_is_empty_changeset() {
        assert!(parse_changeset(&[]).unwrap().is_empty());
    }

    #[test]
    fn unknown_opcode() {
        assert_eq!(message(&[0x30]), "unknown instruction");
        assert_eq!(message(&bytes(&[14])), "unknown instruction");
    }

    #[test]
    fn intern_declaration_without_length() {
        assert_eq!(
            message(&[0x3f, 0x00]),
            "bad changeset - integer decoding failure"
        );
    }

    #[test]
    fn intern_declaration_too_long() {
        let mut data = vec![0x3f, 0x00];
        encode_int(&mut data, MAX_STRING_SIZE + 1);
        assert_eq!(message(&data), "string too long");
    }

    #[test]
    fn configured_string_limit() {
        let mut data = vec![0x3f, 0x00, 0x05];
        data.extend_from_slice(b"hello");
        let config = ParserConfig::default().with_max_string_size(4);
        let err = parse_changeset_with(&data, &config).unwrap_err();
        assert_eq!(err.message(), "string too long");
        assert!(parse_changeset_with(&data, &ParserConfig::default()).is_ok());
    }

    #[test]
    fn truncated_string_body() {
        assert_eq!(message(&[0x3f, 0x00, 0x05, b'a']), "truncated input");
    }

    #[test]
    fn huge_declared_length_does_not_allocate() {
        let mut data = vec![0x3f, 0x00];
        encode_int(&mut data, MAX_STRING_SIZE);
        assert_eq!(message(&data), "truncated input");
    }

    #[test]
    fn undeclared_reference() {
        // EraseTable #0
        assert_eq!(message(&[0x01, 0x00]), "Invalid interned string");
    }

    #[test]
    fn intern_index_gap() {
        assert_eq!(message(&[0x3f, 0x01, 0x01, b'a']), "Unexpected intern index");
    }

    #[test]
    fn invalid_utf8() {
        assert_eq!(message(&[0x3f, 0x00, 0x01, 0xff]), "invalid UTF-8 string");
    }

    #[test]
    fn add_table_errors() {
        let decl = [0x3f, 0x00, 0x01, b'T'];

        let mut data = decl.to_vec();
        data.extend_from_slice(&[0x00, 0x00, 0x05]);
        assert_eq!(message(&data), "AddTable: unknown table type");

        let mut data = decl.to_vec();
        // TopLevel with a Double primary key
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x07, 0x00]);
        assert_eq!(message(&data), "Invalid primary key type in AddTable");
    }

    #[test]
    fn invalid_bool() {
        let mut data = vec![0x3f, 0x00, 0x01, b'T'];
        // TopLevel, pk Int, nullable = 2
        data.extend_from_slice(&[0x00, 0x00, 0x00, 0x00, 0x01, 0x02]);
        assert_eq!(message(&data), "invalid bool");
    }

    #[test]
    fn array_insert_requires_index() {
        let mut data = vec![0x3f, 0x00, 0x01, b'T'];
        // ArrayInsert T[Null].T with an empty path
        data.extend_from_slice(&[0x08, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(message(&data), "ArrayInsert without an index");
    }

    #[test]
    fn invalid_path_element() {
        let mut data = vec![0x3f, 0x00, 0x01, b'T'];
        // Clear T[Null].T with path [-2]
        data.extend_from_slice(&[0x0b, 0x00, 0x00, 0x00, 0x00, 0x01]);
        encode_int(&mut data, -2i64);
        assert_eq!(message(&data), "invalid path element");
    }

    #[test]
    fn global_key_is_not_a_payload() {
        let mut data = vec![0x3f, 0x00, 0x01, b'T'];
        // SetInsert T[Null].T = GlobalKey
        data.extend_from_slice(&[0x0c, 0x00, 0x00, 0x00, 0x00]);
        encode_int(&mut data, -4i64);
        assert_eq!(message(&data), "Unsupported payload data type");
    }

    #[test]
    fn unsupported_object_key() {
        let mut data = vec![0x3f, 0x00, 0x01, b'T'];
        // CreateObject T[Double]
        data.extend_from_slice(&[0x04, 0x00, 0x07]);
        assert_eq!(message(&data), "Unsupported object key type");
    }

    #[test]
    fn timestamp_out_of_range() {
        let mut data = vec![0x3f, 0x00, 0x01, b'T'];
        // SetInsert T[Null].T = Timestamp(0, i32::MAX + 1)
        data.extend_from_slice(&[0x0c, 0x00, 0x00, 0x00, 0x00, 0x05, 0x00]);
        encode_int(&mut data, i64::from(i32::MAX) + 1);
        assert_eq!(message(&data), "timestamp out of range");
    }

    #[test]
    fn split_blocks_match_single_block() {
        let mut data = vec![0x3f, 0x00, 0x05];
        data.extend_from_slice(b"Hello");
        data.extend_from_slice(&[0x01, 0x00]);
        let whole = parse_changeset(&data).unwrap();

        for block_size in 1..data.len() {
            let mut input = ChunkedInputStream::split(&data, block_size);
            let mut out = Changeset::new();
            parse_changeset_stream(&mut input, &ParserConfig::default(), &mut out).unwrap();
            assert_eq!(out, whole, "block size {block_size}");
        }
    }

    #[test]
    fn failed_stream_leaves_output_untouched() {
        let mut out = Changeset::new();
        let table = out.intern_string("keep");
        out.push_back(EraseTable { table });
        out.version = 7;

        let mut input = ChunkedInputStream::new([Bytes::from_static(&[0x01, 0x00])]);
        assert!(parse_changeset_stream(&mut input, &ParserConfig::default(), &mut out).is_err());
        assert_eq!(out.len(), 1);
        assert_eq!(out.version, 7);
    }

    #[test]
    fn empty_blocks_are_skipped() {
        let mut input = ChunkedInputStream::new([
            Bytes::new(),
            Bytes::from_static(&[0x3f, 0x00]),
            Bytes::new(),
            Bytes::from_static(&[0x01, b'x', 0x01, 0x00]),
        ]);
        let mut out = Changeset::new();
        parse_changeset_stream(&mut input, &ParserConfig::default(), &mut out).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out.get_string(InternString(0)), Some("x"));
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ParserConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, ParserConfig::default());
        assert_eq!(config.max_string_size, 16_777_199);

        let config: ParserConfig = serde_json::from_str(r#"{"max_binary_size": 10}"#).unwrap();
        assert_eq!(config.max_binary_size, 10);
        assert_eq!(config.max_string_size, MAX_STRING_SIZE);
    }
}
