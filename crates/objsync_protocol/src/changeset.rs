//! The changeset container.

use crate::error::{EncodeError, EncodeResult};
use crate::instruction::{
    AddColumn, AddTable, CollectionType, Instruction, PathInstruction, TableType, Update,
};
use crate::intern::{InternString, InternTable, StringBufferRange};
use crate::parser::{MAX_BINARY_SIZE, MAX_STRING_SIZE};
use crate::path::{Path, PathElement};
use crate::payload::{Link, Payload, PayloadType};
use crate::primary_key::{PrimaryKey, PrimaryKeyValue};
use std::fmt;

/// One atomic batch of instructions together with the strings and binary
/// data they reference.
///
/// Instructions are kept in application order. Two changesets compare equal
/// when their instructions are equal after resolving intern references and
/// buffer ranges, so the same content interned under different IDs is equal.
/// The sync metadata fields are not compared.
#[derive(Debug, Clone, Default)]
pub struct Changeset {
    instructions: Vec<Instruction>,
    strings: InternTable,
    buffer: Vec<u8>,

    /// Version of the history entry this changeset produced.
    pub version: u64,
    /// Last remote version integrated before this changeset was made.
    pub last_integrated_remote_version: u64,
    /// Milliseconds since the epoch when the changeset was made.
    pub origin_timestamp: u64,
    /// File ident of the peer that made the changeset.
    pub origin_file_ident: u64,
}

impl Changeset {
    /// Creates an empty changeset.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an instruction.
    pub fn push_back(&mut self, instr: impl Into<Instruction>) {
        self.instructions.push(instr.into());
    }

    /// Interns `s`, returning the existing ID if the content is known.
    pub fn intern_string(&mut self, s: &str) -> InternString {
        self.strings.intern(s)
    }

    /// Looks up an interned string without adding it.
    pub fn find_string(&self, s: &str) -> Option<InternString> {
        self.strings.find(s)
    }

    /// Resolves an intern reference.
    pub fn get_string(&self, id: InternString) -> Option<&str> {
        self.strings.get(id)
    }

    /// Copies a string payload into the buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer would grow beyond `u32::MAX` bytes.
    pub fn append_string(&mut self, s: &str) -> StringBufferRange {
        self.append_binary(s.as_bytes())
    }

    /// Copies a binary payload into the buffer.
    ///
    /// # Panics
    ///
    /// Panics if the buffer would grow beyond `u32::MAX` bytes.
    pub fn append_binary(&mut self, data: &[u8]) -> StringBufferRange {
        match self.try_append(data) {
            Some(range) => range,
            None => panic!("changeset buffer exceeds 4 GiB"),
        }
    }

    /// Copies `data` into the buffer unless it would outgrow `u32` offsets.
    pub(crate) fn try_append(&mut self, data: &[u8]) -> Option<StringBufferRange> {
        let offset = u32::try_from(self.buffer.len()).ok()?;
        let size = u32::try_from(data.len()).ok()?;
        offset.checked_add(size)?;
        self.buffer.extend_from_slice(data);
        Some(StringBufferRange::new(offset, size))
    }

    /// Replaces the instructions, strings and buffer with those of `other`,
    /// keeping the sync metadata.
    pub(crate) fn replace_contents(&mut self, other: Changeset) {
        self.instructions = other.instructions;
        self.strings = other.strings;
        self.buffer = other.buffer;
    }

    /// Returns the bytes of a buffer range.
    pub fn get_range(&self, range: StringBufferRange) -> Option<&[u8]> {
        let start = range.offset as usize;
        let end = usize::try_from(range.end()).ok()?;
        self.buffer.get(start..end)
    }

    /// Returns a buffer range as a string.
    pub fn get_range_str(&self, range: StringBufferRange) -> Option<&str> {
        std::str::from_utf8(self.get_range(range)?).ok()
    }

    /// Resolves a primary key to its owned form.
    pub fn get_key(&self, key: &PrimaryKey) -> Option<PrimaryKeyValue> {
        Some(match key {
            PrimaryKey::Null => PrimaryKeyValue::Null,
            PrimaryKey::Int(v) => PrimaryKeyValue::Int(*v),
            PrimaryKey::String(id) => PrimaryKeyValue::String(self.get_string(*id)?.to_owned()),
            PrimaryKey::GlobalKey(key) => PrimaryKeyValue::GlobalKey(*key),
            PrimaryKey::ObjectId(id) => PrimaryKeyValue::ObjectId(*id),
            PrimaryKey::Uuid(uuid) => PrimaryKeyValue::Uuid(*uuid),
        })
    }

    /// Converts an owned primary key into one referencing this changeset.
    pub fn intern_key(&mut self, key: &PrimaryKeyValue) -> PrimaryKey {
        match key {
            PrimaryKeyValue::Null => PrimaryKey::Null,
            PrimaryKeyValue::Int(v) => PrimaryKey::Int(*v),
            PrimaryKeyValue::String(s) => PrimaryKey::String(self.intern_string(s)),
            PrimaryKeyValue::GlobalKey(key) => PrimaryKey::GlobalKey(*key),
            PrimaryKeyValue::ObjectId(id) => PrimaryKey::ObjectId(*id),
            PrimaryKeyValue::Uuid(uuid) => PrimaryKey::Uuid(*uuid),
        }
    }

    /// Iterates over the instructions in order.
    pub fn iter(&self) -> std::slice::Iter<'_, Instruction> {
        self.instructions.iter()
    }

    /// The instructions in order.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Mutable access to the instructions, for in-place rewriting.
    pub fn instructions_mut(&mut self) -> &mut [Instruction] {
        &mut self.instructions
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Returns true if there are no instructions.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The intern table.
    pub fn strings(&self) -> &InternTable {
        &self.strings
    }

    /// The payload buffer.
    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }

    pub(crate) fn strings_mut(&mut self) -> &mut InternTable {
        &mut self.strings
    }

    /// Checks that every instruction is encodable: all intern references and
    /// buffer ranges are in range and every instruction is well formed.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> EncodeResult<()> {
        for instr in &self.instructions {
            self.validate_instruction(instr)?;
        }
        Ok(())
    }

    pub(crate) fn check_string(&self, id: InternString) -> EncodeResult<&str> {
        let s = self
            .get_string(id)
            .ok_or(EncodeError::UnknownInternString(id.index()))?;
        check_size(s.len(), MAX_STRING_SIZE, "string too long")?;
        Ok(s)
    }

    pub(crate) fn check_range(&self, range: StringBufferRange) -> EncodeResult<&[u8]> {
        self.get_range(range).ok_or(EncodeError::RangeOutOfBounds {
            offset: range.offset,
            size: range.size,
            len: self.buffer.len(),
        })
    }

    fn validate_instruction(&self, instr: &Instruction) -> EncodeResult<()> {
        match instr {
            Instruction::AddTable(i) => {
                self.check_string(i.table)?;
                check_add_table(i)?;
                if let TableType::TopLevel { pk_field, .. } = i.table_type {
                    self.check_string(pk_field)?;
                }
            }
            Instruction::EraseTable(i) => {
                self.check_string(i.table)?;
            }
            Instruction::AddColumn(i) => {
                self.check_string(i.table)?;
                self.check_string(i.field)?;
                check_add_column(i)?;
                if let Some(target) = i.link_target_table {
                    self.check_string(target)?;
                }
            }
            Instruction::EraseColumn(i) => {
                self.check_string(i.table)?;
                self.check_string(i.field)?;
            }
            Instruction::CreateObject(i) => {
                self.check_string(i.table)?;
                self.validate_key(&i.object)?;
            }
            Instruction::EraseObject(i) => {
                self.check_string(i.table)?;
                self.validate_key(&i.object)?;
            }
            Instruction::Update(i) => {
                self.validate_target(&i.target)?;
                self.validate_payload(&i.value)?;
            }
            Instruction::AddInteger(i) => self.validate_target(&i.target)?,
            Instruction::ArrayInsert(i) => {
                self.validate_target(&i.target)?;
                self.validate_payload(&i.value)?;
            }
            Instruction::ArrayMove(i) => self.validate_target(&i.target)?,
            Instruction::ArrayErase(i) => self.validate_target(&i.target)?,
            Instruction::Clear(i) => self.validate_target(&i.target)?,
            Instruction::SetInsert(i) => {
                self.validate_target(&i.target)?;
                self.validate_payload(&i.value)?;
            }
            Instruction::SetErase(i) => {
                self.validate_target(&i.target)?;
                self.validate_payload(&i.value)?;
            }
        }
        check_array_index(instr)
    }

    fn validate_key(&self, key: &PrimaryKey) -> EncodeResult<()> {
        if let PrimaryKey::String(id) = key {
            self.check_string(*id)?;
        }
        Ok(())
    }

    fn validate_target(&self, target: &PathInstruction) -> EncodeResult<()> {
        self.check_string(target.table)?;
        self.validate_key(&target.object)?;
        self.check_string(target.field)?;
        for element in &target.path {
            if let PathElement::Field(id) = element {
                self.check_string(*id)?;
            }
        }
        Ok(())
    }

    fn validate_payload(&self, payload: &Payload) -> EncodeResult<()> {
        match payload {
            Payload::String(range) => {
                let bytes = self.check_range(*range)?;
                check_size(bytes.len(), MAX_STRING_SIZE, "string too long")?;
            }
            Payload::Binary(range) => {
                let bytes = self.check_range(*range)?;
                check_size(bytes.len(), MAX_BINARY_SIZE, "binary too long")?;
            }
            Payload::Link(link) => {
                self.check_string(link.target_table)?;
                self.validate_key(&link.target)?;
            }
            _ => {}
        }
        Ok(())
    }
}

/// Rejects values the default parser limits would refuse to read back.
fn check_size(len: usize, max: u64, msg: &str) -> EncodeResult<()> {
    if len as u64 > max {
        return Err(EncodeError::invalid_instruction(format!("{msg}: {len} bytes")));
    }
    Ok(())
}

pub(crate) fn check_add_table(instr: &AddTable) -> EncodeResult<()> {
    if let TableType::TopLevel { pk_type, .. } = instr.table_type {
        if !pk_type.is_valid_key_type() {
            return Err(EncodeError::invalid_instruction(format!(
                "{} is not a valid primary key type",
                pk_type.name()
            )));
        }
    }
    Ok(())
}

pub(crate) fn check_add_column(instr: &AddColumn) -> EncodeResult<()> {
    if instr.value_type == PayloadType::GlobalKey {
        return Err(EncodeError::invalid_instruction(
            "GlobalKey is not a column type",
        ));
    }
    if (instr.value_type == PayloadType::Link) != instr.link_target_table.is_some() {
        return Err(EncodeError::invalid_instruction(
            "link target table must be given for link columns only",
        ));
    }
    if (instr.collection_type == CollectionType::Dictionary) != instr.key_type.is_some() {
        return Err(EncodeError::invalid_instruction(
            "key type must be given for dictionary columns only",
        ));
    }
    if instr.value_type == PayloadType::Null
        && !instr.nullable
        && instr.collection_type != CollectionType::Dictionary
    {
        return Err(EncodeError::invalid_instruction(
            "mixed columns must be nullable",
        ));
    }
    Ok(())
}

fn check_array_index(instr: &Instruction) -> EncodeResult<()> {
    let (name, target) = match instr {
        Instruction::ArrayInsert(i) => ("ArrayInsert", &i.target),
        Instruction::ArrayMove(i) => ("ArrayMove", &i.target),
        Instruction::ArrayErase(i) => ("ArrayErase", &i.target),
        _ => return Ok(()),
    };
    if target.path.is_array_index() {
        Ok(())
    } else {
        Err(EncodeError::invalid_instruction(format!(
            "{name} without an index"
        )))
    }
}

impl<'a> IntoIterator for &'a Changeset {
    type Item = &'a Instruction;
    type IntoIter = std::slice::Iter<'a, Instruction>;

    fn into_iter(self) -> Self::IntoIter {
        self.instructions.iter()
    }
}

impl PartialEq for Changeset {
    fn eq(&self, other: &Self) -> bool {
        self.instructions.len() == other.instructions.len()
            && self
                .instructions
                .iter()
                .zip(&other.instructions)
                .all(|(a, b)| a.context_eq(self, b, other))
    }
}

/// Equality of values that reference their changeset's intern table or
/// payload buffer.
trait ContextEq {
    fn context_eq(&self, ctx: &Changeset, other: &Self, other_ctx: &Changeset) -> bool;
}

impl ContextEq for InternString {
    fn context_eq(&self, ctx: &Changeset, other: &Self, other_ctx: &Changeset) -> bool {
        match (ctx.get_string(*self), other_ctx.get_string(*other)) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self == other,
            _ => false,
        }
    }
}

impl<T: ContextEq> ContextEq for Option<T> {
    fn context_eq(&self, ctx: &Changeset, other: &Self, other_ctx: &Changeset) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.context_eq(ctx, b, other_ctx),
            (None, None) => true,
            _ => false,
        }
    }
}

impl ContextEq for PrimaryKey {
    fn context_eq(&self, ctx: &Changeset, other: &Self, other_ctx: &Changeset) -> bool {
        match (self, other) {
            (PrimaryKey::String(a), PrimaryKey::String(b)) => a.context_eq(ctx, b, other_ctx),
            _ => self == other,
        }
    }
}

impl ContextEq for Path {
    fn context_eq(&self, ctx: &Changeset, other: &Self, other_ctx: &Changeset) -> bool {
        self.len() == other.len()
            && self.iter().zip(other).all(|(a, b)| match (a, b) {
                (PathElement::Field(a), PathElement::Field(b)) => a.context_eq(ctx, b, other_ctx),
                (PathElement::Index(a), PathElement::Index(b)) => a == b,
                _ => false,
            })
    }
}

impl ContextEq for PathInstruction {
    fn context_eq(&self, ctx: &Changeset, other: &Self, other_ctx: &Changeset) -> bool {
        self.table.context_eq(ctx, &other.table, other_ctx)
            && self.object.context_eq(ctx, &other.object, other_ctx)
            && self.field.context_eq(ctx, &other.field, other_ctx)
            && self.path.context_eq(ctx, &other.path, other_ctx)
    }
}

impl ContextEq for Link {
    fn context_eq(&self, ctx: &Changeset, other: &Self, other_ctx: &Changeset) -> bool {
        self.target_table
            .context_eq(ctx, &other.target_table, other_ctx)
            && self.target.context_eq(ctx, &other.target, other_ctx)
    }
}

impl ContextEq for Payload {
    fn context_eq(&self, ctx: &Changeset, other: &Self, other_ctx: &Changeset) -> bool {
        match (self, other) {
            (Payload::String(a), Payload::String(b)) | (Payload::Binary(a), Payload::Binary(b)) => {
                ctx.get_range(*a) == other_ctx.get_range(*b)
            }
            (Payload::Link(a), Payload::Link(b)) => a.context_eq(ctx, b, other_ctx),
            (Payload::Float(a), Payload::Float(b)) => a.to_bits() == b.to_bits(),
            (Payload::Double(a), Payload::Double(b)) => a.to_bits() == b.to_bits(),
            _ => self == other,
        }
    }
}

impl ContextEq for TableType {
    fn context_eq(&self, ctx: &Changeset, other: &Self, other_ctx: &Changeset) -> bool {
        match (self, other) {
            (
                TableType::TopLevel {
                    pk_field: a_field,
                    pk_type: a_type,
                    pk_nullable: a_nullable,
                    is_asymmetric: a_asymmetric,
                },
                TableType::TopLevel {
                    pk_field: b_field,
                    pk_type: b_type,
                    pk_nullable: b_nullable,
                    is_asymmetric: b_asymmetric,
                },
            ) => {
                a_field.context_eq(ctx, b_field, other_ctx)
                    && a_type == b_type
                    && a_nullable == b_nullable
                    && a_asymmetric == b_asymmetric
            }
            (TableType::Embedded, TableType::Embedded) => true,
            _ => false,
        }
    }
}

impl ContextEq for Update {
    fn context_eq(&self, ctx: &Changeset, other: &Self, other_ctx: &Changeset) -> bool {
        if !self.target.context_eq(ctx, &other.target, other_ctx)
            || !self.value.context_eq(ctx, &other.value, other_ctx)
        {
            return false;
        }
        if self.is_array_update() {
            self.prior_size == other.prior_size
        } else {
            self.is_default == other.is_default
        }
    }
}

impl ContextEq for Instruction {
    fn context_eq(&self, ctx: &Changeset, other: &Self, other_ctx: &Changeset) -> bool {
        use Instruction as I;
        match (self, other) {
            (I::AddTable(a), I::AddTable(b)) => {
                a.table.context_eq(ctx, &b.table, other_ctx)
                    && a.table_type.context_eq(ctx, &b.table_type, other_ctx)
            }
            (I::EraseTable(a), I::EraseTable(b)) => a.table.context_eq(ctx, &b.table, other_ctx),
            (I::AddColumn(a), I::AddColumn(b)) => {
                a.table.context_eq(ctx, &b.table, other_ctx)
                    && a.field.context_eq(ctx, &b.field, other_ctx)
                    && a.value_type == b.value_type
                    && a.nullable == b.nullable
                    && a.collection_type == b.collection_type
                    && a.link_target_table
                        .context_eq(ctx, &b.link_target_table, other_ctx)
                    && a.key_type == b.key_type
            }
            (I::EraseColumn(a), I::EraseColumn(b)) => {
                a.table.context_eq(ctx, &b.table, other_ctx)
                    && a.field.context_eq(ctx, &b.field, other_ctx)
            }
            (I::CreateObject(a), I::CreateObject(b)) => {
                a.table.context_eq(ctx, &b.table, other_ctx)
                    && a.object.context_eq(ctx, &b.object, other_ctx)
            }
            (I::EraseObject(a), I::EraseObject(b)) => {
                a.table.context_eq(ctx, &b.table, other_ctx)
                    && a.object.context_eq(ctx, &b.object, other_ctx)
            }
            (I::Update(a), I::Update(b)) => a.context_eq(ctx, b, other_ctx),
            (I::AddInteger(a), I::AddInteger(b)) => {
                a.target.context_eq(ctx, &b.target, other_ctx) && a.value == b.value
            }
            (I::ArrayInsert(a), I::ArrayInsert(b)) => {
                a.target.context_eq(ctx, &b.target, other_ctx)
                    && a.value.context_eq(ctx, &b.value, other_ctx)
                    && a.prior_size == b.prior_size
            }
            (I::ArrayMove(a), I::ArrayMove(b)) => {
                a.target.context_eq(ctx, &b.target, other_ctx)
                    && a.destination == b.destination
                    && a.prior_size == b.prior_size
            }
            (I::ArrayErase(a), I::ArrayErase(b)) => {
                a.target.context_eq(ctx, &b.target, other_ctx) && a.prior_size == b.prior_size
            }
            (I::Clear(a), I::Clear(b)) => a.target.context_eq(ctx, &b.target, other_ctx),
            (I::SetInsert(a), I::SetInsert(b)) => {
                a.target.context_eq(ctx, &b.target, other_ctx)
                    && a.value.context_eq(ctx, &b.value, other_ctx)
            }
            (I::SetErase(a), I::SetErase(b)) => {
                a.target.context_eq(ctx, &b.target, other_ctx)
                    && a.value.context_eq(ctx, &b.value, other_ctx)
            }
            _ => false,
        }
    }
}

/// Renders a changeset for debugging, one instruction per line.
impl fmt::Display for Changeset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:<16}", "InternStrings")?;
        for (i, (_, s)) in self.strings.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{i}={s:?}")?;
        }
        writeln!(f)?;

        for instr in &self.instructions {
            write!(f, "{:<16}", instr.kind().name())?;
            self.print_instruction(f, instr)?;
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Changeset {
    fn name(&self, id: InternString) -> &str {
        self.get_string(id).unwrap_or("<invalid>")
    }

    fn print_object(
        &self,
        f: &mut fmt::Formatter<'_>,
        table: InternString,
        key: &PrimaryKey,
    ) -> fmt::Result {
        write!(f, "{}[", self.name(table))?;
        match self.get_key(key) {
            Some(value) => write!(f, "{value}")?,
            None => f.write_str("<invalid>")?,
        }
        f.write_str("]")
    }

    fn print_target(&self, f: &mut fmt::Formatter<'_>, target: &PathInstruction) -> fmt::Result {
        self.print_object(f, target.table, &target.object)?;
        write!(f, ".{}", self.name(target.field))?;
        for element in &target.path {
            match element {
                PathElement::Field(id) => write!(f, ".{}", self.name(*id))?,
                PathElement::Index(i) => write!(f, "[{i}]")?,
            }
        }
        Ok(())
    }

    fn print_payload(&self, f: &mut fmt::Formatter<'_>, payload: &Payload) -> fmt::Result {
        write!(f, "{}(", payload.payload_type().name())?;
        match payload {
            Payload::Erased | Payload::Dictionary | Payload::ObjectValue | Payload::Null => {}
            Payload::Int(v) => write!(f, "{v}")?,
            Payload::Bool(v) => write!(f, "{v}")?,
            Payload::String(range) => match self.get_range(*range) {
                Some(bytes) => write!(f, "{:?}", String::from_utf8_lossy(bytes))?,
                None => f.write_str("<invalid>")?,
            },
            Payload::Binary(range) => write!(f, "{} bytes", range.size)?,
            Payload::Timestamp(t) => write!(f, "{t}")?,
            Payload::Float(v) => write!(f, "{v}")?,
            Payload::Double(v) => write!(f, "{v}")?,
            Payload::Decimal(d) => write!(f, "{d}")?,
            Payload::Link(link) => {
                f.write_str("target = ")?;
                self.print_object(f, link.target_table, &link.target)?;
            }
            Payload::ObjectId(id) => write!(f, "{id}")?,
            Payload::Uuid(uuid) => write!(f, "{uuid}")?,
        }
        f.write_str(")")
    }

    fn print_instruction(&self, f: &mut fmt::Formatter<'_>, instr: &Instruction) -> fmt::Result {
        match instr {
            Instruction::AddTable(i) => {
                f.write_str(self.name(i.table))?;
                match i.table_type {
                    TableType::TopLevel {
                        pk_field,
                        pk_type,
                        pk_nullable,
                        is_asymmetric,
                    } => {
                        write!(
                            f,
                            " pk={}:{}{}",
                            self.name(pk_field),
                            pk_type.name(),
                            if pk_nullable { "?" } else { "" }
                        )?;
                        if is_asymmetric {
                            f.write_str(" asymmetric")?;
                        }
                        Ok(())
                    }
                    TableType::Embedded => f.write_str(" embedded"),
                }
            }
            Instruction::EraseTable(i) => f.write_str(self.name(i.table)),
            Instruction::AddColumn(i) => {
                write!(
                    f,
                    "{}.{} {}{} {}",
                    self.name(i.table),
                    self.name(i.field),
                    i.value_type.name(),
                    if i.nullable { "?" } else { "" },
                    i.collection_type.name()
                )?;
                if let Some(target) = i.link_target_table {
                    write!(f, " -> {}", self.name(target))?;
                }
                if let Some(key_type) = i.key_type {
                    write!(f, " key={}", key_type.name())?;
                }
                Ok(())
            }
            Instruction::EraseColumn(i) => {
                write!(f, "{}.{}", self.name(i.table), self.name(i.field))
            }
            Instruction::CreateObject(i) => self.print_object(f, i.table, &i.object),
            Instruction::EraseObject(i) => self.print_object(f, i.table, &i.object),
            Instruction::Update(i) => {
                self.print_target(f, &i.target)?;
                f.write_str(" = ")?;
                self.print_payload(f, &i.value)?;
                if i.is_array_update() {
                    write!(f, " prior_size={}", i.prior_size)
                } else if i.is_default {
                    f.write_str(" default")
                } else {
                    Ok(())
                }
            }
            Instruction::AddInteger(i) => {
                self.print_target(f, &i.target)?;
                write!(f, " += {}", i.value)
            }
            Instruction::ArrayInsert(i) => {
                self.print_target(f, &i.target)?;
                f.write_str(" = ")?;
                self.print_payload(f, &i.value)?;
                write!(f, " prior_size={}", i.prior_size)
            }
            Instruction::ArrayMove(i) => {
                self.print_target(f, &i.target)?;
                write!(f, " -> {} prior_size={}", i.destination, i.prior_size)
            }
            Instruction::ArrayErase(i) => {
                self.print_target(f, &i.target)?;
                write!(f, " prior_size={}", i.prior_size)
            }
            Instruction::Clear(i) => self.print_target(f, &i.target),
            Instruction::SetInsert(i) => {
                self.print_target(f, &i.target)?;
                f.write_str(" += ")?;
                self.print_payload(f, &i.value)
            }
            Instruction::SetErase(i) => {
                self.print_target(f, &i.target)?;
                f.write_str(" -= ")?;
                self.print_payload(f, &i.value)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruction::{ArrayInsert, CreateObject, EraseTable};

    fn update(cs: &mut Changeset, path: &[&str], value: Payload) -> Update {
        let table = cs.intern_string("Foo");
        let field = cs.intern_string("bar");
        let mut p = Path::new();
        for name in path {
            p.push(cs.intern_string(name));
        }
        Update::new(
            PathInstruction::new(table, PrimaryKey::Int(123), field).with_path(p),
            value,
        )
    }

    #[test]
    fn equality_resolves_intern_ids() {
        let mut a = Changeset::new();
        a.intern_string("unused");
        let instr = update(&mut a, &["baz"], Payload::Int(1));
        a.push_back(instr);

        let mut b = Changeset::new();
        let instr = update(&mut b, &["baz"], Payload::Int(1));
        b.push_back(instr);

        assert_ne!(a.instructions(), b.instructions());
        assert_eq!(a, b);
    }

    #[test]
    fn equality_resolves_buffer_ranges() {
        let mut a = Changeset::new();
        a.append_binary(b"padding");
        let range = a.append_string("hello");
        let instr = update(&mut a, &[], Payload::String(range));
        a.push_back(instr);

        let mut b = Changeset::new();
        let range = b.append_string("hello");
        let instr = update(&mut b, &[], Payload::String(range));
        b.push_back(instr);

        assert_eq!(a, b);

        let mut c = Changeset::new();
        let range = c.append_string("world");
        let instr = update(&mut c, &[], Payload::String(range));
        c.push_back(instr);
        assert_ne!(a, c);
    }

    #[test]
    fn field_update_ignores_prior_size() {
        let mut a = Changeset::new();
        let mut instr = update(&mut a, &["x"], Payload::Null);
        instr.prior_size = 10;
        a.push_back(instr);

        let mut b = Changeset::new();
        let instr = update(&mut b, &["x"], Payload::Null);
        b.push_back(instr);
        assert_eq!(a, b);

        let mut c = Changeset::new();
        let mut instr = update(&mut c, &["x"], Payload::Null);
        instr.is_default = true;
        c.push_back(instr);
        assert_ne!(a, c);
    }

    #[test]
    fn array_update_ignores_is_default() {
        let mut a = Changeset::new();
        let mut instr = update(&mut a, &[], Payload::Null);
        instr.target.path.push(3u32);
        instr.is_default = true;
        instr.prior_size = 5;
        a.push_back(instr);

        let mut b = Changeset::new();
        let mut instr2 = update(&mut b, &[], Payload::Null);
        instr2.target.path.push(3u32);
        instr2.prior_size = 5;
        b.push_back(instr2);
        assert_eq!(a, b);

        let mut c = Changeset::new();
        let mut instr3 = update(&mut c, &[], Payload::Null);
        instr3.target.path.push(3u32);
        instr3.prior_size = 6;
        c.push_back(instr3);
        assert_ne!(a, c);
    }

    #[test]
    fn validate_catches_dangling_references() {
        let mut cs = Changeset::new();
        cs.push_back(EraseTable {
            table: InternString(5),
        });
        assert_eq!(cs.validate(), Err(EncodeError::UnknownInternString(5)));

        let mut cs = Changeset::new();
        let instr = update(&mut cs, &[], Payload::Binary(StringBufferRange::new(0, 4)));
        cs.push_back(instr);
        assert!(matches!(
            cs.validate(),
            Err(EncodeError::RangeOutOfBounds { len: 0, .. })
        ));
    }

    #[test]
    fn validate_enforces_parser_size_limits() {
        let limit = MAX_BINARY_SIZE as usize;
        let mut cs = Changeset::new();
        let data = cs.append_binary(&vec![0; limit + 1]);
        let instr = update(&mut cs, &[], Payload::Binary(data));
        cs.push_back(instr);
        assert!(matches!(
            cs.validate(),
            Err(EncodeError::InvalidInstruction(msg)) if msg.starts_with("binary too long")
        ));
        assert!(crate::encode_changeset(&cs).is_err());

        let mut cs = Changeset::new();
        let text = cs.append_string(&"x".repeat(MAX_STRING_SIZE as usize + 1));
        let instr = update(&mut cs, &[], Payload::String(text));
        cs.push_back(instr);
        assert!(matches!(
            cs.validate(),
            Err(EncodeError::InvalidInstruction(msg)) if msg.starts_with("string too long")
        ));

        let mut cs = Changeset::new();
        let table = cs.intern_string(&"t".repeat(MAX_STRING_SIZE as usize + 1));
        cs.push_back(EraseTable { table });
        assert!(cs.validate().is_err());

        let mut cs = Changeset::new();
        let text = cs.append_string(&"x".repeat(MAX_STRING_SIZE as usize));
        let instr = update(&mut cs, &[], Payload::String(text));
        cs.push_back(instr);
        assert_eq!(cs.validate(), Ok(()));
    }

    #[test]
    fn validate_requires_array_index() {
        let mut cs = Changeset::new();
        let table = cs.intern_string("Foo");
        let field = cs.intern_string("list");
        cs.push_back(ArrayInsert {
            target: PathInstruction::new(table, PrimaryKey::Int(1), field),
            value: Payload::Int(1),
            prior_size: 0,
        });
        assert!(matches!(
            cs.validate(),
            Err(EncodeError::InvalidInstruction(_))
        ));
    }

    #[test]
    fn display_renders_paths() {
        let mut cs = Changeset::new();
        let instr = update(&mut cs, &["baz", "lol", "boo"], Payload::Int(1));
        cs.push_back(instr);
        let table = cs.intern_string("Foo");
        cs.push_back(CreateObject {
            table,
            object: PrimaryKey::Int(7),
        });

        let text = cs.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines[0].starts_with("InternStrings"));
        assert!(lines[0].contains("0=\"Foo\""));
        assert_eq!(lines[1], "Update          Foo[123].bar.baz.lol.boo = Int(1)");
        assert_eq!(lines[2], "CreateObject    Foo[7]");
    }

    #[test]
    fn keys_resolve_and_intern() {
        let mut cs = Changeset::new();
        let key = cs.intern_key(&PrimaryKeyValue::from("abc"));
        assert!(matches!(key, PrimaryKey::String(_)));
        assert_eq!(cs.get_key(&key), Some(PrimaryKeyValue::from("abc")));
        assert_eq!(cs.get_key(&PrimaryKey::String(InternString(9))), None);
    }
}
