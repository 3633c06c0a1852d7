//! Local view of the synchronized schema.

use objsync_protocol::{
    AddColumn, AddTable, Changeset, CollectionType, EraseColumn, EraseTable, InstructionHandler,
    PayloadType, TableType,
};
use std::collections::HashMap;
use std::convert::Infallible;

/// Shape of a column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Element type.
    pub value_type: PayloadType,
    /// Whether elements may be null.
    pub nullable: bool,
    /// Collection shape.
    pub collection_type: CollectionType,
    /// Target table, for link columns.
    pub link_target: Option<String>,
    /// Key type, for dictionary columns.
    pub key_type: Option<PayloadType>,
}

impl ColumnSpec {
    /// A non-nullable single-value column.
    pub fn new(value_type: PayloadType) -> Self {
        Self {
            value_type,
            nullable: false,
            collection_type: CollectionType::Single,
            link_target: None,
            key_type: None,
        }
    }

    /// A link column pointing at `target`.
    pub fn link(target: impl Into<String>) -> Self {
        Self {
            link_target: Some(target.into()),
            ..Self::new(PayloadType::Link)
        }
    }

    /// Makes the column nullable.
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Makes the column a list.
    pub fn list(mut self) -> Self {
        self.collection_type = CollectionType::List;
        self
    }

    /// Makes the column a set.
    pub fn set(mut self) -> Self {
        self.collection_type = CollectionType::Set;
        self
    }

    /// Makes the column a dictionary with string keys.
    pub fn dictionary(mut self) -> Self {
        self.collection_type = CollectionType::Dictionary;
        self.key_type = Some(PayloadType::String);
        self
    }
}

/// How objects of a table are addressed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableKind {
    /// Top-level objects. `pk_type` is [`PayloadType::GlobalKey`] for
    /// tables without a primary key.
    TopLevel {
        /// Primary key column name.
        pk_field: String,
        /// Primary key type.
        pk_type: PayloadType,
        /// Whether the primary key may be null.
        pk_nullable: bool,
        /// Objects are upload-only.
        asymmetric: bool,
    },
    /// Objects owned by a parent object.
    Embedded,
}

/// A table and its columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    /// Addressing of the table's objects.
    pub kind: TableKind,
    columns: HashMap<String, ColumnSpec>,
}

impl TableSchema {
    /// Creates a table without columns.
    pub fn new(kind: TableKind) -> Self {
        Self {
            kind,
            columns: HashMap::new(),
        }
    }

    /// Looks up a column.
    pub fn column(&self, name: &str) -> Option<&ColumnSpec> {
        self.columns.get(name)
    }

    /// Iterates over the columns in no particular order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, &ColumnSpec)> {
        self.columns.iter().map(|(name, spec)| (name.as_str(), spec))
    }

    /// Primary key type, for top-level tables.
    pub fn pk_type(&self) -> Option<PayloadType> {
        match &self.kind {
            TableKind::TopLevel { pk_type, .. } => Some(*pk_type),
            TableKind::Embedded => None,
        }
    }

    pub(crate) fn insert_column(&mut self, name: &str, spec: ColumnSpec) {
        self.columns.insert(name.to_owned(), spec);
    }

    pub(crate) fn remove_column(&mut self, name: &str) -> Option<ColumnSpec> {
        self.columns.remove(name)
    }
}

/// The set of tables known to a history.
///
/// Local transactions update it as they add tables and columns; remote
/// changesets update it by being applied to it as an [`InstructionHandler`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    tables: HashMap<String, TableSchema>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up a table.
    pub fn table(&self, name: &str) -> Option<&TableSchema> {
        self.tables.get(name)
    }

    /// Returns true if the table exists.
    pub fn contains_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Number of tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Returns true if there are no tables.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub(crate) fn table_mut(&mut self, name: &str) -> Option<&mut TableSchema> {
        self.tables.get_mut(name)
    }

    pub(crate) fn insert_table(&mut self, name: &str, table: TableSchema) {
        self.tables.insert(name.to_owned(), table);
    }

    pub(crate) fn remove_table(&mut self, name: &str) -> Option<TableSchema> {
        self.tables.remove(name)
    }
}

// Instructions naming unknown strings or tables are skipped; the decoder has
// already rejected malformed changesets.
impl InstructionHandler for Schema {
    type Error = Infallible;

    fn add_table(&mut self, cs: &Changeset, instr: &AddTable) -> Result<(), Infallible> {
        let Some(name) = cs.get_string(instr.table) else {
            return Ok(());
        };
        let kind = match &instr.table_type {
            TableType::TopLevel {
                pk_field,
                pk_type,
                pk_nullable,
                is_asymmetric,
            } => TableKind::TopLevel {
                pk_field: cs.get_string(*pk_field).unwrap_or_default().to_owned(),
                pk_type: *pk_type,
                pk_nullable: *pk_nullable,
                asymmetric: *is_asymmetric,
            },
            TableType::Embedded => TableKind::Embedded,
        };
        if self.table(name).map(|t| &t.kind) != Some(&kind) {
            self.insert_table(name, TableSchema::new(kind));
        }
        Ok(())
    }

    fn erase_table(&mut self, cs: &Changeset, instr: &EraseTable) -> Result<(), Infallible> {
        if let Some(name) = cs.get_string(instr.table) {
            self.remove_table(name);
        }
        Ok(())
    }

    fn add_column(&mut self, cs: &Changeset, instr: &AddColumn) -> Result<(), Infallible> {
        let (Some(table), Some(field)) = (cs.get_string(instr.table), cs.get_string(instr.field))
        else {
            return Ok(());
        };
        let spec = ColumnSpec {
            value_type: instr.value_type,
            nullable: instr.nullable,
            collection_type: instr.collection_type,
            link_target: instr
                .link_target_table
                .and_then(|t| cs.get_string(t))
                .map(str::to_owned),
            key_type: instr.key_type,
        };
        if let Some(table) = self.table_mut(table) {
            table.insert_column(field, spec);
        }
        Ok(())
    }

    fn erase_column(&mut self, cs: &Changeset, instr: &EraseColumn) -> Result<(), Infallible> {
        let (Some(table), Some(field)) = (cs.get_string(instr.table), cs.get_string(instr.field))
        else {
            return Ok(());
        };
        if let Some(table) = self.table_mut(table) {
            table.remove_column(field);
        }
        Ok(())
    }
}
