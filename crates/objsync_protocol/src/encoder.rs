//! Changeset encoder.

use crate::changeset::Changeset;
use crate::error::{EncodeError, EncodeResult};
use crate::global_key::GlobalKey;
use crate::instruction::{Instruction, InstructionType, PathInstruction, TableType};
use crate::intern::{InternString, StringBufferRange};
use crate::path::PathElement;
use crate::payload::{Payload, PayloadType};
use crate::primary_key::PrimaryKey;
use objsync_codec::{encode_int, VarInt};
use std::collections::HashMap;
use tracing::trace;

/// Encodes an entire changeset into a new buffer.
///
/// An empty changeset encodes to an empty buffer.
///
/// # Errors
///
/// Returns an [`EncodeError`](crate::EncodeError) if the changeset references
/// strings or buffer ranges it does not own, or contains a malformed
/// instruction. Nothing is encoded in that case.
pub fn encode_changeset(changeset: &Changeset) -> EncodeResult<Vec<u8>> {
    let mut encoder = ChangesetEncoder::new();
    encoder.encode(changeset)?;
    Ok(encoder.into_bytes())
}

/// Incremental changeset encoder.
///
/// Interned strings are declared inline right before the first instruction
/// that references them. Wire indices are assigned densely in order of first
/// reference and deduplicated by content, so encoding several changesets into
/// the same encoder produces one stream that decodes as their concatenation.
#[derive(Debug, Default)]
pub struct ChangesetEncoder {
    buffer: Vec<u8>,
    scratch: Vec<u8>,
    wire_strings: HashMap<String, u32>,
}

impl ChangesetEncoder {
    /// Creates an empty encoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends the instructions of `changeset` to the output.
    ///
    /// # Errors
    ///
    /// Fails without writing anything if [`Changeset::validate`] fails.
    pub fn encode(&mut self, changeset: &Changeset) -> EncodeResult<()> {
        changeset.validate()?;

        let start = self.buffer.len();
        for instr in changeset {
            self.scratch.clear();
            self.append_instruction(changeset, instr)?;
            self.buffer.extend_from_slice(&self.scratch);
        }

        trace!(
            instructions = changeset.len(),
            bytes = self.buffer.len() - start,
            "encoded changeset"
        );
        Ok(())
    }

    /// The bytes written so far.
    pub fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    /// Consumes the encoder, returning the output.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }

    /// Clears the output and forgets all declared strings.
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.scratch.clear();
        self.wire_strings.clear();
    }

    fn append_instruction(&mut self, cs: &Changeset, instr: &Instruction) -> EncodeResult<()> {
        self.append_int(instr.kind().code());
        match instr {
            Instruction::AddTable(i) => {
                self.append_string(cs, i.table)?;
                self.append_int(i.table_type.code());
                if let TableType::TopLevel {
                    pk_field,
                    pk_type,
                    pk_nullable,
                    ..
                } = i.table_type
                {
                    self.append_string(cs, pk_field)?;
                    self.append_type(pk_type);
                    self.append_bool(pk_nullable);
                }
            }
            Instruction::EraseTable(i) => self.append_string(cs, i.table)?,
            Instruction::AddColumn(i) => {
                self.append_string(cs, i.table)?;
                self.append_string(cs, i.field)?;
                self.append_type(i.value_type);
                self.append_bool(i.nullable);
                self.append_int(i.collection_type.code());
                if let Some(target) = i.link_target_table {
                    self.append_string(cs, target)?;
                }
                if let Some(key_type) = i.key_type {
                    self.append_type(key_type);
                }
            }
            Instruction::EraseColumn(i) => {
                self.append_string(cs, i.table)?;
                self.append_string(cs, i.field)?;
            }
            Instruction::CreateObject(i) => {
                self.append_string(cs, i.table)?;
                self.append_key(cs, &i.object)?;
            }
            Instruction::EraseObject(i) => {
                self.append_string(cs, i.table)?;
                self.append_key(cs, &i.object)?;
            }
            Instruction::Update(i) => {
                self.append_target(cs, &i.target)?;
                self.append_payload(cs, &i.value)?;
                if i.is_array_update() {
                    self.append_int(i.prior_size);
                } else {
                    self.append_bool(i.is_default);
                }
            }
            Instruction::AddInteger(i) => {
                self.append_target(cs, &i.target)?;
                self.append_int(i.value);
            }
            Instruction::ArrayInsert(i) => {
                self.append_target(cs, &i.target)?;
                self.append_payload(cs, &i.value)?;
                self.append_int(i.prior_size);
            }
            Instruction::ArrayMove(i) => {
                self.append_target(cs, &i.target)?;
                self.append_int(i.destination);
                self.append_int(i.prior_size);
            }
            Instruction::ArrayErase(i) => {
                self.append_target(cs, &i.target)?;
                self.append_int(i.prior_size);
            }
            Instruction::Clear(i) => {
                self.append_target(cs, &i.target)?;
                // Reserved; always zero.
                self.append_int(0u32);
            }
            Instruction::SetInsert(i) => {
                self.append_target(cs, &i.target)?;
                self.append_payload(cs, &i.value)?;
            }
            Instruction::SetErase(i) => {
                self.append_target(cs, &i.target)?;
                self.append_payload(cs, &i.value)?;
            }
        }
        Ok(())
    }

    fn append_target(&mut self, cs: &Changeset, target: &PathInstruction) -> EncodeResult<()> {
        self.append_string(cs, target.table)?;
        self.append_key(cs, &target.object)?;
        self.append_string(cs, target.field)?;

        let len = u32::try_from(target.path.len())
            .map_err(|_| EncodeError::invalid_instruction("path too long"))?;
        self.append_int(len);
        for element in &target.path {
            match *element {
                PathElement::Index(index) => self.append_int(i64::from(index)),
                PathElement::Field(name) => {
                    self.append_int(-1i64);
                    self.append_string(cs, name)?;
                }
            }
        }
        Ok(())
    }

    fn append_key(&mut self, cs: &Changeset, key: &PrimaryKey) -> EncodeResult<()> {
        self.append_type(key.payload_type());
        match key {
            PrimaryKey::Null => {}
            PrimaryKey::Int(v) => self.append_int(*v),
            PrimaryKey::String(id) => self.append_string(cs, *id)?,
            PrimaryKey::GlobalKey(key) => self.append_global_key(*key),
            PrimaryKey::ObjectId(id) => self.scratch.extend_from_slice(id.as_bytes()),
            PrimaryKey::Uuid(uuid) => self.scratch.extend_from_slice(uuid.as_bytes()),
        }
        Ok(())
    }

    fn append_payload(&mut self, cs: &Changeset, payload: &Payload) -> EncodeResult<()> {
        self.append_type(payload.payload_type());
        match payload {
            Payload::Erased | Payload::Dictionary | Payload::ObjectValue | Payload::Null => {}
            Payload::Int(v) => self.append_int(*v),
            Payload::Bool(v) => self.append_bool(*v),
            Payload::String(range) | Payload::Binary(range) => self.append_range(cs, *range)?,
            Payload::Timestamp(t) => {
                self.append_int(t.seconds);
                self.append_int(i64::from(t.nanoseconds));
            }
            Payload::Float(v) => self.scratch.extend_from_slice(&v.to_le_bytes()),
            Payload::Double(v) => self.scratch.extend_from_slice(&v.to_le_bytes()),
            Payload::Decimal(d) => {
                self.append_int(d.coefficient);
                self.append_int(i64::from(d.exponent));
                self.append_bool(d.negative);
            }
            Payload::Link(link) => {
                self.append_string(cs, link.target_table)?;
                self.append_key(cs, &link.target)?;
            }
            Payload::ObjectId(id) => self.scratch.extend_from_slice(id.as_bytes()),
            Payload::Uuid(uuid) => self.scratch.extend_from_slice(uuid.as_bytes()),
        }
        Ok(())
    }

    fn append_range(&mut self, cs: &Changeset, range: StringBufferRange) -> EncodeResult<()> {
        let bytes = cs.check_range(range)?;
        self.append_int(bytes.len() as u64);
        self.scratch.extend_from_slice(bytes);
        Ok(())
    }

    /// Writes the wire index of `id`, declaring the string first if this is
    /// its first reference.
    fn append_string(&mut self, cs: &Changeset, id: InternString) -> EncodeResult<()> {
        let s = cs.check_string(id)?;
        let index = match self.wire_strings.get(s) {
            Some(&index) => index,
            None => {
                let index = u32::try_from(self.wire_strings.len()).map_err(|_| {
                    EncodeError::invalid_instruction("too many interned strings")
                })?;
                encode_int(&mut self.buffer, u64::from(InstructionType::INTERN_STRING));
                encode_int(&mut self.buffer, index);
                encode_int(&mut self.buffer, s.len() as u64);
                self.buffer.extend_from_slice(s.as_bytes());
                self.wire_strings.insert(s.to_owned(), index);
                index
            }
        };
        self.append_int(index);
        Ok(())
    }

    fn append_global_key(&mut self, key: GlobalKey) {
        self.append_int(key.hi());
        self.append_int(key.lo());
    }

    fn append_type(&mut self, ty: PayloadType) {
        self.append_int(i64::from(ty.to_code()));
    }

    fn append_bool(&mut self, v: bool) {
        self.append_int(u8::from(v));
    }

    fn append_int<T: VarInt>(&mut self, value: T) {
        encode_int(&mut self.scratch, value);
    }
}
