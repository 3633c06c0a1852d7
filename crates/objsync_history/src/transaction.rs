//! Recording local writes as changesets.

use crate::allocator::ObjectIdAllocator;
use crate::error::{HistoryError, HistoryResult};
use crate::history::HistoryState;
use crate::schema::{ColumnSpec, Schema, TableKind, TableSchema};
use crate::translate::translate_provisional_keys;
use crate::value::Value;
use objsync_protocol::{
    AddColumn, AddInteger, AddTable, ArrayErase, ArrayInsert, ArrayMove, Changeset, Clear,
    CreateObject, EncodeError, EraseColumn, EraseObject, EraseTable, InternString, Path,
    PathElement, PathInstruction, PayloadType, PrimaryKeyValue, SetErase, SetInsert, TableType,
    Update,
};
use parking_lot::RwLockWriteGuard;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;

/// Name of the primary key column of tables created without one.
const DEFAULT_PK_FIELD: &str = "_id";

/// One step below the top-level field of a [`FieldPath`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathStep {
    /// A field of an embedded object, or a dictionary key.
    Field(String),
    /// A list position.
    Index(u32),
}

impl From<&str> for PathStep {
    fn from(field: &str) -> Self {
        PathStep::Field(field.to_owned())
    }
}

impl From<u32> for PathStep {
    fn from(index: u32) -> Self {
        PathStep::Index(index)
    }
}

/// Addresses a value inside an object: table, object, field, and an optional
/// path into collections and embedded objects.
///
/// ```
/// use objsync_history::FieldPath;
///
/// let tags = FieldPath::new("Person", 5i64, "tags");
/// let first = tags.at(0);
/// assert!(first.ends_with_index());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPath {
    table: String,
    object: PrimaryKeyValue,
    field: String,
    steps: Vec<PathStep>,
}

impl FieldPath {
    /// Addresses a top-level field.
    pub fn new(
        table: impl Into<String>,
        object: impl Into<PrimaryKeyValue>,
        field: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            object: object.into(),
            field: field.into(),
            steps: Vec::new(),
        }
    }

    /// Descends into an embedded field or dictionary key.
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.steps.push(PathStep::Field(key.into()));
        self
    }

    /// Descends into a list position.
    pub fn index(mut self, index: u32) -> Self {
        self.steps.push(PathStep::Index(index));
        self
    }

    /// Returns a copy addressing list position `index` below this path.
    pub fn at(&self, index: u32) -> Self {
        self.clone().index(index)
    }

    /// Table name.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// Object key.
    pub fn object(&self) -> &PrimaryKeyValue {
        &self.object
    }

    /// Top-level field name.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Steps below the top-level field.
    pub fn steps(&self) -> &[PathStep] {
        &self.steps
    }

    /// Returns true if the last step is a list position.
    pub fn ends_with_index(&self) -> bool {
        matches!(self.steps.last(), Some(PathStep::Index(_)))
    }
}

/// A write transaction on a [`ClientHistory`](crate::ClientHistory).
///
/// Every mutation is validated against the schema and recorded as an
/// instruction. [`commit`](Self::commit) appends the resulting changeset to
/// the history; dropping the transaction discards it together with any
/// schema changes and allocated object IDs.
///
/// The transaction holds the history's write lock until it ends.
pub struct WriteTransaction<'a> {
    state: RwLockWriteGuard<'a, HistoryState>,
    schema: Schema,
    allocator: ObjectIdAllocator,
    changeset: Changeset,
}

impl<'a> WriteTransaction<'a> {
    pub(crate) fn new(state: RwLockWriteGuard<'a, HistoryState>) -> Self {
        let schema = state.schema.clone();
        let allocator = state.allocator.clone();
        Self {
            state,
            schema,
            allocator,
            changeset: Changeset::new(),
        }
    }

    /// Schema as seen by this transaction.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The changeset recorded so far.
    pub fn changeset(&self) -> &Changeset {
        &self.changeset
    }

    /// Adds a top-level table whose objects get allocated IDs.
    pub fn add_table(&mut self, name: &str) -> HistoryResult<()> {
        self.add_table_of_kind(
            name,
            TableKind::TopLevel {
                pk_field: DEFAULT_PK_FIELD.to_owned(),
                pk_type: PayloadType::GlobalKey,
                pk_nullable: false,
                asymmetric: false,
            },
        )
    }

    /// Adds a top-level table keyed by `pk_field`.
    pub fn add_table_with_primary_key(
        &mut self,
        name: &str,
        pk_field: &str,
        pk_type: PayloadType,
        pk_nullable: bool,
    ) -> HistoryResult<()> {
        if !pk_type.is_valid_key_type() {
            return Err(EncodeError::invalid_instruction(format!(
                "{} is not a valid primary key type",
                pk_type.name()
            ))
            .into());
        }
        self.add_table_of_kind(
            name,
            TableKind::TopLevel {
                pk_field: pk_field.to_owned(),
                pk_type,
                pk_nullable,
                asymmetric: false,
            },
        )
    }

    /// Adds a table of embedded objects.
    pub fn add_embedded_table(&mut self, name: &str) -> HistoryResult<()> {
        self.add_table_of_kind(name, TableKind::Embedded)
    }

    fn add_table_of_kind(&mut self, name: &str, kind: TableKind) -> HistoryResult<()> {
        if self.schema.contains_table(name) {
            return Err(HistoryError::TableExists(name.to_owned()));
        }

        let table = self.changeset.intern_string(name);
        let table_type = match &kind {
            TableKind::TopLevel {
                pk_field,
                pk_type,
                pk_nullable,
                asymmetric,
            } => TableType::TopLevel {
                pk_field: self.changeset.intern_string(pk_field),
                pk_type: *pk_type,
                pk_nullable: *pk_nullable,
                is_asymmetric: *asymmetric,
            },
            TableKind::Embedded => TableType::Embedded,
        };
        self.changeset.push_back(AddTable { table, table_type });
        self.schema.insert_table(name, TableSchema::new(kind));
        Ok(())
    }

    /// Erases a table and all its objects.
    pub fn erase_table(&mut self, name: &str) -> HistoryResult<()> {
        if self.schema.remove_table(name).is_none() {
            return Err(HistoryError::NoSuchTable(name.to_owned()));
        }
        self.allocator.forget_table(name);
        let table = self.changeset.intern_string(name);
        self.changeset.push_back(EraseTable { table });
        Ok(())
    }

    /// Adds a column.
    pub fn add_column(&mut self, table: &str, field: &str, spec: ColumnSpec) -> HistoryResult<()> {
        let existing = self
            .schema
            .table(table)
            .ok_or_else(|| HistoryError::NoSuchTable(table.to_owned()))?;
        if existing.column(field).is_some() {
            return Err(HistoryError::ColumnExists {
                table: table.to_owned(),
                column: field.to_owned(),
            });
        }
        if let Some(target) = &spec.link_target {
            if !self.schema.contains_table(target) {
                return Err(HistoryError::NoSuchTable(target.clone()));
            }
        }

        let instr = AddColumn {
            table: self.changeset.intern_string(table),
            field: self.changeset.intern_string(field),
            value_type: spec.value_type,
            nullable: spec.nullable,
            collection_type: spec.collection_type,
            link_target_table: spec
                .link_target
                .as_deref()
                .map(|target| self.changeset.intern_string(target)),
            key_type: spec.key_type,
        };
        self.changeset.push_back(instr);
        if let Some(schema) = self.schema.table_mut(table) {
            schema.insert_column(field, spec);
        }
        Ok(())
    }

    /// Erases a column.
    pub fn erase_column(&mut self, table: &str, field: &str) -> HistoryResult<()> {
        let schema = self
            .schema
            .table_mut(table)
            .ok_or_else(|| HistoryError::NoSuchTable(table.to_owned()))?;
        if schema.remove_column(field).is_none() {
            return Err(HistoryError::NoSuchColumn {
                table: table.to_owned(),
                column: field.to_owned(),
            });
        }
        let instr = EraseColumn {
            table: self.changeset.intern_string(table),
            field: self.changeset.intern_string(field),
        };
        self.changeset.push_back(instr);
        Ok(())
    }

    /// Creates an object in a table without a primary key and returns its
    /// allocated key.
    pub fn create_object(&mut self, table: &str) -> HistoryResult<PrimaryKeyValue> {
        let pk_type = self.top_level_pk_type(table)?;
        if pk_type != PayloadType::GlobalKey {
            return Err(HistoryError::MissingPrimaryKey(table.to_owned()));
        }
        let key = PrimaryKeyValue::GlobalKey(self.allocator.allocate(table));
        self.push_create(table, &key);
        Ok(key)
    }

    /// Creates an object in a keyed table.
    pub fn create_object_with_primary_key(
        &mut self,
        table: &str,
        key: impl Into<PrimaryKeyValue>,
    ) -> HistoryResult<PrimaryKeyValue> {
        let key = key.into();
        let expected = self.check_object_key(table, &key)?;
        if expected == PayloadType::GlobalKey {
            return Err(HistoryError::PrimaryKeyMismatch {
                table: table.to_owned(),
                expected,
                actual: key.payload_type(),
            });
        }
        self.push_create(table, &key);
        Ok(key)
    }

    fn push_create(&mut self, table: &str, key: &PrimaryKeyValue) {
        let table = self.changeset.intern_string(table);
        let object = self.changeset.intern_key(key);
        self.changeset.push_back(CreateObject { table, object });
    }

    /// Erases an object.
    pub fn erase_object(&mut self, table: &str, key: &PrimaryKeyValue) -> HistoryResult<()> {
        self.check_object_key(table, key)?;
        let table = self.changeset.intern_string(table);
        let object = self.changeset.intern_key(key);
        self.changeset.push_back(EraseObject { table, object });
        Ok(())
    }

    /// Sets a field or dictionary entry.
    pub fn set(&mut self, target: &FieldPath, value: impl Into<Value>) -> HistoryResult<()> {
        self.push_update(target, value.into(), false)
    }

    /// Sets a field to a default value. Defaults lose against any explicit
    /// write during merge.
    pub fn set_default(
        &mut self,
        target: &FieldPath,
        value: impl Into<Value>,
    ) -> HistoryResult<()> {
        self.push_update(target, value.into(), true)
    }

    fn push_update(
        &mut self,
        target: &FieldPath,
        value: Value,
        is_default: bool,
    ) -> HistoryResult<()> {
        if target.ends_with_index() {
            return Err(HistoryError::InvalidPath(
                "use list_set to update a list element".into(),
            ));
        }
        let path = self.path_instruction(target)?;
        let value = value.to_payload(&mut self.changeset);
        let mut update = Update::new(path, value);
        update.is_default = is_default;
        self.changeset.push_back(update);
        Ok(())
    }

    /// Adds `value` to an integer field.
    pub fn add_int(&mut self, target: &FieldPath, value: i64) -> HistoryResult<()> {
        let target = self.path_instruction(target)?;
        self.changeset.push_back(AddInteger { target, value });
        Ok(())
    }

    /// Inserts into a list at the index ending `target`. `prior_size` is the
    /// list length before the insert.
    pub fn list_insert(
        &mut self,
        target: &FieldPath,
        value: impl Into<Value>,
        prior_size: u32,
    ) -> HistoryResult<()> {
        let target = self.list_element(target, "list_insert")?;
        let value = value.into().to_payload(&mut self.changeset);
        self.changeset.push_back(ArrayInsert {
            target,
            value,
            prior_size,
        });
        Ok(())
    }

    /// Replaces the list element at the index ending `target`.
    pub fn list_set(
        &mut self,
        target: &FieldPath,
        value: impl Into<Value>,
        prior_size: u32,
    ) -> HistoryResult<()> {
        let target = self.list_element(target, "list_set")?;
        let value = value.into().to_payload(&mut self.changeset);
        let mut update = Update::new(target, value);
        update.prior_size = prior_size;
        self.changeset.push_back(update);
        Ok(())
    }

    /// Moves the list element at the index ending `target` to `destination`.
    pub fn list_move(
        &mut self,
        target: &FieldPath,
        destination: u32,
        prior_size: u32,
    ) -> HistoryResult<()> {
        let target = self.list_element(target, "list_move")?;
        self.changeset.push_back(ArrayMove {
            target,
            destination,
            prior_size,
        });
        Ok(())
    }

    /// Erases the list element at the index ending `target`.
    pub fn list_erase(&mut self, target: &FieldPath, prior_size: u32) -> HistoryResult<()> {
        let target = self.list_element(target, "list_erase")?;
        self.changeset.push_back(ArrayErase { target, prior_size });
        Ok(())
    }

    /// Removes every element of a collection.
    pub fn clear(&mut self, target: &FieldPath) -> HistoryResult<()> {
        let target = self.path_instruction(target)?;
        self.changeset.push_back(Clear { target });
        Ok(())
    }

    /// Adds a value to a set.
    pub fn set_insert(&mut self, target: &FieldPath, value: impl Into<Value>) -> HistoryResult<()> {
        let target = self.path_instruction(target)?;
        let value = value.into().to_payload(&mut self.changeset);
        self.changeset.push_back(SetInsert { target, value });
        Ok(())
    }

    /// Removes a value from a set.
    pub fn set_erase(&mut self, target: &FieldPath, value: impl Into<Value>) -> HistoryResult<()> {
        let target = self.path_instruction(target)?;
        let value = value.into().to_payload(&mut self.changeset);
        self.changeset.push_back(SetErase { target, value });
        Ok(())
    }

    /// Appends the changeset to the history and returns the latest version.
    ///
    /// A transaction without instructions leaves the history unchanged and
    /// returns the current version.
    pub fn commit(self) -> HistoryResult<u64> {
        let WriteTransaction {
            mut state,
            schema,
            allocator,
            mut changeset,
        } = self;

        if changeset.is_empty() {
            return Ok(state.version);
        }
        // Keys handed out before the file ident was assigned are still
        // provisional; pending changesets were rewritten at assignment time.
        if allocator.is_finalized() {
            translate_provisional_keys(&mut changeset, allocator.client_file_ident());
        }
        changeset.validate()?;

        let version = state.version + 1;
        changeset.version = version;
        changeset.last_integrated_remote_version = state.remote_version;
        changeset.origin_timestamp = now_millis();
        changeset.origin_file_ident = allocator.client_file_ident();

        debug!(
            version,
            instructions = changeset.len(),
            "committed local changeset"
        );

        state.version = version;
        state.schema = schema;
        state.allocator = allocator;
        state.pending.push_back(changeset);
        Ok(version)
    }

    fn top_level_pk_type(&self, table: &str) -> HistoryResult<PayloadType> {
        let schema = self
            .schema
            .table(table)
            .ok_or_else(|| HistoryError::NoSuchTable(table.to_owned()))?;
        schema
            .pk_type()
            .ok_or_else(|| HistoryError::EmbeddedTable(table.to_owned()))
    }

    /// Checks that `key` can name an object of `table` and returns the
    /// table's primary key type. Un-keyed tables only accept GlobalKeys.
    fn check_object_key(
        &self,
        table: &str,
        key: &PrimaryKeyValue,
    ) -> HistoryResult<PayloadType> {
        let expected = self.top_level_pk_type(table)?;
        let nullable = matches!(
            self.schema.table(table).map(|t| &t.kind),
            Some(TableKind::TopLevel {
                pk_nullable: true,
                ..
            })
        );
        let actual = key.payload_type();
        if actual == expected || (actual == PayloadType::Null && nullable) {
            Ok(expected)
        } else {
            Err(HistoryError::PrimaryKeyMismatch {
                table: table.to_owned(),
                expected,
                actual,
            })
        }
    }

    fn path_instruction(&mut self, target: &FieldPath) -> HistoryResult<PathInstruction> {
        self.check_object_key(&target.table, &target.object)?;
        let known = self
            .schema
            .table(&target.table)
            .is_some_and(|t| t.column(&target.field).is_some());
        if !known {
            return Err(HistoryError::NoSuchColumn {
                table: target.table.clone(),
                column: target.field.clone(),
            });
        }

        let table = self.changeset.intern_string(&target.table);
        let object = self.changeset.intern_key(&target.object);
        let field = self.changeset.intern_string(&target.field);
        let path = target
            .steps
            .iter()
            .map(|step| match step {
                PathStep::Field(name) => PathElement::Field(self.intern(name)),
                PathStep::Index(index) => PathElement::Index(*index),
            })
            .collect::<Vec<_>>();
        Ok(PathInstruction::new(table, object, field).with_path(Path::from(path)))
    }

    fn list_element(&mut self, target: &FieldPath, op: &str) -> HistoryResult<PathInstruction> {
        if !target.ends_with_index() {
            return Err(HistoryError::InvalidPath(format!("{op} requires an index")));
        }
        self.path_instruction(target)
    }

    fn intern(&mut self, s: &str) -> InternString {
        self.changeset.intern_string(s)
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
