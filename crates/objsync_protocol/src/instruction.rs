//! The closed set of changeset instructions.

use crate::intern::InternString;
use crate::path::Path;
use crate::payload::{Payload, PayloadType};
use crate::primary_key::PrimaryKey;

/// Instruction opcodes.
///
/// The discriminants are written as the first varint of every instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum InstructionType {
    /// Create a table.
    AddTable = 0,
    /// Remove a table.
    EraseTable = 1,
    /// Add a column to a table.
    AddColumn = 2,
    /// Remove a column.
    EraseColumn = 3,
    /// Create an object.
    CreateObject = 4,
    /// Remove an object.
    EraseObject = 5,
    /// Set a field or list element.
    Update = 6,
    /// Add to an integer field.
    AddInteger = 7,
    /// Insert into a list.
    ArrayInsert = 8,
    /// Move a list element.
    ArrayMove = 9,
    /// Remove a list element.
    ArrayErase = 10,
    /// Empty a collection.
    Clear = 11,
    /// Add to a set.
    SetInsert = 12,
    /// Remove from a set.
    SetErase = 13,
}

impl InstructionType {
    /// Opcode of the inline intern-string declaration.
    ///
    /// Declarations are not instructions of the model; they only exist on
    /// the wire.
    pub const INTERN_STRING: u8 = 0x3F;

    /// The opcode.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Looks up an opcode.
    pub fn from_code(code: u64) -> Option<Self> {
        Some(match code {
            0 => InstructionType::AddTable,
            1 => InstructionType::EraseTable,
            2 => InstructionType::AddColumn,
            3 => InstructionType::EraseColumn,
            4 => InstructionType::CreateObject,
            5 => InstructionType::EraseObject,
            6 => InstructionType::Update,
            7 => InstructionType::AddInteger,
            8 => InstructionType::ArrayInsert,
            9 => InstructionType::ArrayMove,
            10 => InstructionType::ArrayErase,
            11 => InstructionType::Clear,
            12 => InstructionType::SetInsert,
            13 => InstructionType::SetErase,
            _ => return None,
        })
    }

    /// Name used when printing changesets.
    pub fn name(self) -> &'static str {
        match self {
            InstructionType::AddTable => "AddTable",
            InstructionType::EraseTable => "EraseTable",
            InstructionType::AddColumn => "AddColumn",
            InstructionType::EraseColumn => "EraseColumn",
            InstructionType::CreateObject => "CreateObject",
            InstructionType::EraseObject => "EraseObject",
            InstructionType::Update => "Update",
            InstructionType::AddInteger => "AddInteger",
            InstructionType::ArrayInsert => "ArrayInsert",
            InstructionType::ArrayMove => "ArrayMove",
            InstructionType::ArrayErase => "ArrayErase",
            InstructionType::Clear => "Clear",
            InstructionType::SetInsert => "SetInsert",
            InstructionType::SetErase => "SetErase",
        }
    }
}

/// Kind of table created by [`AddTable`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableType {
    /// A table of top-level objects addressed by primary key.
    TopLevel {
        /// Name of the primary key column.
        pk_field: InternString,
        /// Type of the primary key. [`PayloadType::GlobalKey`] for tables
        /// without a user-visible primary key.
        pk_type: PayloadType,
        /// Whether the primary key may be null.
        pk_nullable: bool,
        /// Objects are only uploaded, never synced back down.
        is_asymmetric: bool,
    },
    /// A table of embedded objects owned by a parent object.
    Embedded,
}

impl TableType {
    /// Wire code of the table type.
    pub fn code(&self) -> u8 {
        match self {
            TableType::TopLevel {
                is_asymmetric: false,
                ..
            } => 0,
            TableType::Embedded => 1,
            TableType::TopLevel {
                is_asymmetric: true,
                ..
            } => 2,
        }
    }
}

/// Shape of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CollectionType {
    /// A single value.
    #[default]
    Single,
    /// An ordered list.
    List,
    /// String-keyed dictionary.
    Dictionary,
    /// An unordered set.
    Set,
}

impl CollectionType {
    /// Wire code.
    pub fn code(self) -> u8 {
        match self {
            CollectionType::Single => 0,
            CollectionType::List => 1,
            CollectionType::Dictionary => 2,
            CollectionType::Set => 3,
        }
    }

    /// Looks up a wire code.
    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0 => CollectionType::Single,
            1 => CollectionType::List,
            2 => CollectionType::Dictionary,
            3 => CollectionType::Set,
            _ => return None,
        })
    }

    /// Name used when printing changesets.
    pub fn name(self) -> &'static str {
        match self {
            CollectionType::Single => "Single",
            CollectionType::List => "List",
            CollectionType::Dictionary => "Dictionary",
            CollectionType::Set => "Set",
        }
    }
}

/// Creates a table.
#[derive(Debug, Clone, PartialEq)]
pub struct AddTable {
    /// Table name.
    pub table: InternString,
    /// Kind of table.
    pub table_type: TableType,
}

/// Removes a table and all of its objects.
#[derive(Debug, Clone, PartialEq)]
pub struct EraseTable {
    /// Table name.
    pub table: InternString,
}

/// Adds a column to a table.
#[derive(Debug, Clone, PartialEq)]
pub struct AddColumn {
    /// Table name.
    pub table: InternString,
    /// Column name.
    pub field: InternString,
    /// Element type. [`PayloadType::Null`] denotes a mixed column.
    pub value_type: PayloadType,
    /// Whether values may be null.
    pub nullable: bool,
    /// Column shape.
    pub collection_type: CollectionType,
    /// Target table, present iff `value_type` is [`PayloadType::Link`].
    pub link_target_table: Option<InternString>,
    /// Key type, present iff the column is a dictionary.
    pub key_type: Option<PayloadType>,
}

/// Removes a column.
#[derive(Debug, Clone, PartialEq)]
pub struct EraseColumn {
    /// Table name.
    pub table: InternString,
    /// Column name.
    pub field: InternString,
}

/// Creates an object.
#[derive(Debug, Clone, PartialEq)]
pub struct CreateObject {
    /// Table name.
    pub table: InternString,
    /// Key of the new object.
    pub object: PrimaryKey,
}

/// Removes an object.
#[derive(Debug, Clone, PartialEq)]
pub struct EraseObject {
    /// Table name.
    pub table: InternString,
    /// Key of the removed object.
    pub object: PrimaryKey,
}

/// Addresses a location inside an object: a top-level field, optionally
/// followed by a path into nested values.
#[derive(Debug, Clone, PartialEq)]
pub struct PathInstruction {
    /// Table name.
    pub table: InternString,
    /// Key of the object.
    pub object: PrimaryKey,
    /// Top-level field.
    pub field: InternString,
    /// Path below `field`.
    pub path: Path,
}

impl PathInstruction {
    /// Creates a target with an empty path.
    pub fn new(table: InternString, object: PrimaryKey, field: InternString) -> Self {
        Self {
            table,
            object,
            field,
            path: Path::new(),
        }
    }

    /// Returns the target with `path` replacing the current one.
    pub fn with_path(mut self, path: Path) -> Self {
        self.path = path;
        self
    }

    /// The trailing list index, if the path ends in one.
    pub fn index(&self) -> Option<u32> {
        self.path.index()
    }
}

/// Sets a field, or a list element when the path ends in an index.
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    /// Location written.
    pub target: PathInstruction,
    /// New value.
    pub value: Payload,
    /// The value is a default rather than an explicit write. Only meaningful
    /// for field updates.
    pub is_default: bool,
    /// List size before the write. Only meaningful for list element updates.
    pub prior_size: u32,
}

impl Update {
    /// Creates a non-default update.
    pub fn new(target: PathInstruction, value: Payload) -> Self {
        Self {
            target,
            value,
            is_default: false,
            prior_size: 0,
        }
    }

    /// Returns true if this writes a list element.
    pub fn is_array_update(&self) -> bool {
        self.target.path.is_array_index()
    }

    /// Index of the written list element.
    pub fn index(&self) -> Option<u32> {
        self.target.index()
    }
}

/// Adds to an integer field.
#[derive(Debug, Clone, PartialEq)]
pub struct AddInteger {
    /// Location written.
    pub target: PathInstruction,
    /// Amount added.
    pub value: i64,
}

/// Inserts into a list at the trailing path index.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayInsert {
    /// List element position.
    pub target: PathInstruction,
    /// Inserted value.
    pub value: Payload,
    /// List size before the insert.
    pub prior_size: u32,
}

/// Moves the list element at the trailing path index.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayMove {
    /// Source element position.
    pub target: PathInstruction,
    /// Destination index.
    pub destination: u32,
    /// List size before the move.
    pub prior_size: u32,
}

/// Removes the list element at the trailing path index.
#[derive(Debug, Clone, PartialEq)]
pub struct ArrayErase {
    /// List element position.
    pub target: PathInstruction,
    /// List size before the erase.
    pub prior_size: u32,
}

/// Removes all elements of a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Clear {
    /// The collection.
    pub target: PathInstruction,
}

/// Adds a value to a set.
#[derive(Debug, Clone, PartialEq)]
pub struct SetInsert {
    /// The set.
    pub target: PathInstruction,
    /// Added value.
    pub value: Payload,
}

/// Removes a value from a set.
#[derive(Debug, Clone, PartialEq)]
pub struct SetErase {
    /// The set.
    pub target: PathInstruction,
    /// Removed value.
    pub value: Payload,
}

/// One mutation.
#[derive(Debug, Clone, PartialEq)]
pub enum Instruction {
    /// See [`AddTable`].
    AddTable(AddTable),
    /// See [`EraseTable`].
    EraseTable(EraseTable),
    /// See [`AddColumn`].
    AddColumn(AddColumn),
    /// See [`EraseColumn`].
    EraseColumn(EraseColumn),
    /// See [`CreateObject`].
    CreateObject(CreateObject),
    /// See [`EraseObject`].
    EraseObject(EraseObject),
    /// See [`Update`].
    Update(Update),
    /// See [`AddInteger`].
    AddInteger(AddInteger),
    /// See [`ArrayInsert`].
    ArrayInsert(ArrayInsert),
    /// See [`ArrayMove`].
    ArrayMove(ArrayMove),
    /// See [`ArrayErase`].
    ArrayErase(ArrayErase),
    /// See [`Clear`].
    Clear(Clear),
    /// See [`SetInsert`].
    SetInsert(SetInsert),
    /// See [`SetErase`].
    SetErase(SetErase),
}

impl Instruction {
    /// The opcode of this instruction.
    pub fn kind(&self) -> InstructionType {
        match self {
            Instruction::AddTable(_) => InstructionType::AddTable,
            Instruction::EraseTable(_) => InstructionType::EraseTable,
            Instruction::AddColumn(_) => InstructionType::AddColumn,
            Instruction::EraseColumn(_) => InstructionType::EraseColumn,
            Instruction::CreateObject(_) => InstructionType::CreateObject,
            Instruction::EraseObject(_) => InstructionType::EraseObject,
            Instruction::Update(_) => InstructionType::Update,
            Instruction::AddInteger(_) => InstructionType::AddInteger,
            Instruction::ArrayInsert(_) => InstructionType::ArrayInsert,
            Instruction::ArrayMove(_) => InstructionType::ArrayMove,
            Instruction::ArrayErase(_) => InstructionType::ArrayErase,
            Instruction::Clear(_) => InstructionType::Clear,
            Instruction::SetInsert(_) => InstructionType::SetInsert,
            Instruction::SetErase(_) => InstructionType::SetErase,
        }
    }

    /// The table this instruction touches.
    pub fn table(&self) -> InternString {
        match self {
            Instruction::AddTable(i) => i.table,
            Instruction::EraseTable(i) => i.table,
            Instruction::AddColumn(i) => i.table,
            Instruction::EraseColumn(i) => i.table,
            Instruction::CreateObject(i) => i.table,
            Instruction::EraseObject(i) => i.table,
            Instruction::Update(i) => i.target.table,
            Instruction::AddInteger(i) => i.target.table,
            Instruction::ArrayInsert(i) => i.target.table,
            Instruction::ArrayMove(i) => i.target.table,
            Instruction::ArrayErase(i) => i.target.table,
            Instruction::Clear(i) => i.target.table,
            Instruction::SetInsert(i) => i.target.table,
            Instruction::SetErase(i) => i.target.table,
        }
    }

    /// The addressed location, for instructions that have one.
    pub fn path_instruction(&self) -> Option<&PathInstruction> {
        match self {
            Instruction::Update(i) => Some(&i.target),
            Instruction::AddInteger(i) => Some(&i.target),
            Instruction::ArrayInsert(i) => Some(&i.target),
            Instruction::ArrayMove(i) => Some(&i.target),
            Instruction::ArrayErase(i) => Some(&i.target),
            Instruction::Clear(i) => Some(&i.target),
            Instruction::SetInsert(i) => Some(&i.target),
            Instruction::SetErase(i) => Some(&i.target),
            Instruction::AddTable(_)
            | Instruction::EraseTable(_)
            | Instruction::AddColumn(_)
            | Instruction::EraseColumn(_)
            | Instruction::CreateObject(_)
            | Instruction::EraseObject(_) => None,
        }
    }

    /// Mutable access to the addressed location.
    pub fn path_instruction_mut(&mut self) -> Option<&mut PathInstruction> {
        match self {
            Instruction::Update(i) => Some(&mut i.target),
            Instruction::AddInteger(i) => Some(&mut i.target),
            Instruction::ArrayInsert(i) => Some(&mut i.target),
            Instruction::ArrayMove(i) => Some(&mut i.target),
            Instruction::ArrayErase(i) => Some(&mut i.target),
            Instruction::Clear(i) => Some(&mut i.target),
            Instruction::SetInsert(i) => Some(&mut i.target),
            Instruction::SetErase(i) => Some(&mut i.target),
            Instruction::AddTable(_)
            | Instruction::EraseTable(_)
            | Instruction::AddColumn(_)
            | Instruction::EraseColumn(_)
            | Instruction::CreateObject(_)
            | Instruction::EraseObject(_) => None,
        }
    }

    /// The value written, for instructions that carry one.
    pub fn payload(&self) -> Option<&Payload> {
        match self {
            Instruction::Update(i) => Some(&i.value),
            Instruction::ArrayInsert(i) => Some(&i.value),
            Instruction::SetInsert(i) => Some(&i.value),
            Instruction::SetErase(i) => Some(&i.value),
            _ => None,
        }
    }

    /// Mutable access to the value written.
    pub fn payload_mut(&mut self) -> Option<&mut Payload> {
        match self {
            Instruction::Update(i) => Some(&mut i.value),
            Instruction::ArrayInsert(i) => Some(&mut i.value),
            Instruction::SetInsert(i) => Some(&mut i.value),
            Instruction::SetErase(i) => Some(&mut i.value),
            _ => None,
        }
    }

    /// The object key, for instructions addressing a single object.
    pub fn object_mut(&mut self) -> Option<&mut PrimaryKey> {
        match self {
            Instruction::CreateObject(i) => Some(&mut i.object),
            Instruction::EraseObject(i) => Some(&mut i.object),
            other => other.path_instruction_mut().map(|target| &mut target.object),
        }
    }
}

macro_rules! impl_from_instruction {
    ($($kind:ident),* $(,)?) => {
        $(
            impl From<$kind> for Instruction {
                fn from(instr: $kind) -> Self {
                    Instruction::$kind(instr)
                }
            }
        )*
    };
}

impl_from_instruction!(
    AddTable,
    EraseTable,
    AddColumn,
    EraseColumn,
    CreateObject,
    EraseObject,
    Update,
    AddInteger,
    ArrayInsert,
    ArrayMove,
    ArrayErase,
    Clear,
    SetInsert,
    SetErase,
);
