//! An in-memory object store driven by changesets.
//!
//! [`ObjectTracker`] applies instructions the way a storage engine would,
//! for top-level fields and one level of collection access. It checks list
//! indices and prior sizes, which the protocol layer leaves to the applier.

use objsync_history::Value;
use objsync_protocol::{
    AddInteger, AddTable, ArrayErase, ArrayInsert, ArrayMove, Changeset, Clear, CreateObject,
    EraseColumn, EraseObject, EraseTable, InstructionHandler, InternString, PathElement,
    PathInstruction, Payload, PrimaryKeyValue, SetErase, SetInsert, Update,
};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Errors raised while applying instructions to an [`ObjectTracker`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TrackerError {
    /// The table does not exist.
    #[error("no such table: {0}")]
    NoSuchTable(String),

    /// The object does not exist.
    #[error("no such object: {table}[{key}]")]
    NoSuchObject {
        /// Table name.
        table: String,
        /// Object key, as displayed.
        key: String,
    },

    /// A list index is past the end of the list.
    #[error("index {index} out of range for list of size {size}")]
    IndexOutOfRange {
        /// Requested index.
        index: u32,
        /// Current list size.
        size: usize,
    },

    /// The instruction's prior size does not match the list.
    #[error("prior size {expected} does not match list of size {actual}")]
    PriorSizeMismatch {
        /// Size recorded in the instruction.
        expected: u32,
        /// Current list size.
        actual: usize,
    },

    /// The field holds a value of a different shape.
    #[error("field {0} has the wrong shape")]
    WrongShape(String),

    /// Paths deeper than one collection level are not tracked.
    #[error("unsupported path")]
    UnsupportedPath,

    /// The instruction refers to strings or data the changeset lacks.
    #[error("unresolved reference")]
    Unresolved,
}

/// Contents of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldState {
    /// A single value.
    Value(Value),
    /// A list.
    List(Vec<Value>),
    /// A set, in insertion order.
    Set(Vec<Value>),
    /// A dictionary.
    Dictionary(BTreeMap<String, Value>),
}

/// Fields of one object.
pub type TrackedObject = HashMap<String, FieldState>;

/// Tables, objects and field values built up from applied changesets.
#[derive(Debug, Default)]
pub struct ObjectTracker {
    tables: BTreeMap<String, HashMap<PrimaryKeyValue, TrackedObject>>,
}

fn resolve(cs: &Changeset, id: InternString) -> Result<&str, TrackerError> {
    cs.get_string(id).ok_or(TrackerError::Unresolved)
}

fn resolve_value(cs: &Changeset, payload: &Payload) -> Result<Value, TrackerError> {
    Value::from_payload(cs, payload).ok_or(TrackerError::Unresolved)
}

enum Step {
    Field,
    Index(u32),
    Key(String),
}

impl ObjectTracker {
    /// Creates an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all tables.
    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Number of objects in a table.
    pub fn object_count(&self, table: &str) -> usize {
        self.tables.get(table).map_or(0, HashMap::len)
    }

    /// Returns true if the object exists.
    pub fn contains_object(&self, table: &str, key: &PrimaryKeyValue) -> bool {
        self.tables
            .get(table)
            .is_some_and(|objects| objects.contains_key(key))
    }

    /// Looks up a field.
    pub fn get(&self, table: &str, key: &PrimaryKeyValue, field: &str) -> Option<&FieldState> {
        self.tables.get(table)?.get(key)?.get(field)
    }

    fn object_mut<'a>(
        &'a mut self,
        cs: &Changeset,
        target: &PathInstruction,
    ) -> Result<(&'a mut TrackedObject, String, Step), TrackerError> {
        let table = resolve(cs, target.table)?;
        let key = cs.get_key(&target.object).ok_or(TrackerError::Unresolved)?;
        let field = resolve(cs, target.field)?.to_owned();
        let step = match target.path.iter().as_slice() {
            [] => Step::Field,
            [PathElement::Index(i)] => Step::Index(*i),
            [PathElement::Field(k)] => Step::Key(resolve(cs, *k)?.to_owned()),
            _ => return Err(TrackerError::UnsupportedPath),
        };

        let objects = self
            .tables
            .get_mut(table)
            .ok_or_else(|| TrackerError::NoSuchTable(table.to_owned()))?;
        let object = objects
            .get_mut(&key)
            .ok_or_else(|| TrackerError::NoSuchObject {
                table: table.to_owned(),
                key: key.to_string(),
            })?;
        Ok((object, field, step))
    }

    fn list_mut<'a>(
        &'a mut self,
        cs: &Changeset,
        target: &PathInstruction,
        prior_size: u32,
    ) -> Result<(&'a mut Vec<Value>, u32), TrackerError> {
        let (object, field, step) = self.object_mut(cs, target)?;
        let Step::Index(index) = step else {
            return Err(TrackerError::UnsupportedPath);
        };
        let state = object
            .entry(field.clone())
            .or_insert_with(|| FieldState::List(Vec::new()));
        let FieldState::List(list) = state else {
            return Err(TrackerError::WrongShape(field));
        };
        if list.len() != prior_size as usize {
            return Err(TrackerError::PriorSizeMismatch {
                expected: prior_size,
                actual: list.len(),
            });
        }
        Ok((list, index))
    }

    fn set_mut<'a>(
        &'a mut self,
        cs: &Changeset,
        target: &PathInstruction,
    ) -> Result<&'a mut Vec<Value>, TrackerError> {
        let (object, field, step) = self.object_mut(cs, target)?;
        if !matches!(step, Step::Field) {
            return Err(TrackerError::UnsupportedPath);
        }
        match object
            .entry(field.clone())
            .or_insert_with(|| FieldState::Set(Vec::new()))
        {
            FieldState::Set(set) => Ok(set),
            _ => Err(TrackerError::WrongShape(field)),
        }
    }
}

fn check_index(index: u32, size: usize) -> Result<usize, TrackerError> {
    let i = index as usize;
    if i < size {
        Ok(i)
    } else {
        Err(TrackerError::IndexOutOfRange { index, size })
    }
}

impl InstructionHandler for ObjectTracker {
    type Error = TrackerError;

    fn add_table(&mut self, cs: &Changeset, instr: &AddTable) -> Result<(), TrackerError> {
        let table = resolve(cs, instr.table)?;
        self.tables.entry(table.to_owned()).or_default();
        Ok(())
    }

    fn erase_table(&mut self, cs: &Changeset, instr: &EraseTable) -> Result<(), TrackerError> {
        let table = resolve(cs, instr.table)?;
        self.tables
            .remove(table)
            .map(drop)
            .ok_or_else(|| TrackerError::NoSuchTable(table.to_owned()))
    }

    fn erase_column(&mut self, cs: &Changeset, instr: &EraseColumn) -> Result<(), TrackerError> {
        let table = resolve(cs, instr.table)?;
        let field = resolve(cs, instr.field)?;
        if let Some(objects) = self.tables.get_mut(table) {
            for object in objects.values_mut() {
                object.remove(field);
            }
        }
        Ok(())
    }

    fn create_object(&mut self, cs: &Changeset, instr: &CreateObject) -> Result<(), TrackerError> {
        let table = resolve(cs, instr.table)?;
        let key = cs.get_key(&instr.object).ok_or(TrackerError::Unresolved)?;
        self.tables
            .get_mut(table)
            .ok_or_else(|| TrackerError::NoSuchTable(table.to_owned()))?
            .entry(key)
            .or_default();
        Ok(())
    }

    fn erase_object(&mut self, cs: &Changeset, instr: &EraseObject) -> Result<(), TrackerError> {
        let table = resolve(cs, instr.table)?;
        let key = cs.get_key(&instr.object).ok_or(TrackerError::Unresolved)?;
        if let Some(objects) = self.tables.get_mut(table) {
            objects.remove(&key);
        }
        Ok(())
    }

    fn update(&mut self, cs: &Changeset, instr: &Update) -> Result<(), TrackerError> {
        let value = resolve_value(cs, &instr.value)?;
        if instr.is_array_update() {
            let (list, index) = self.list_mut(cs, &instr.target, instr.prior_size)?;
            let i = check_index(index, list.len())?;
            list[i] = value;
            return Ok(());
        }

        let (object, field, step) = self.object_mut(cs, &instr.target)?;
        match step {
            Step::Field => {
                if !(instr.is_default && object.contains_key(&field)) {
                    object.insert(field, FieldState::Value(value));
                }
            }
            Step::Key(key) => {
                let state = object
                    .entry(field.clone())
                    .or_insert_with(|| FieldState::Dictionary(BTreeMap::new()));
                let FieldState::Dictionary(dict) = state else {
                    return Err(TrackerError::WrongShape(field));
                };
                if value == Value::Erased {
                    dict.remove(&key);
                } else {
                    dict.insert(key, value);
                }
            }
            Step::Index(_) => return Err(TrackerError::UnsupportedPath),
        }
        Ok(())
    }

    fn add_integer(&mut self, cs: &Changeset, instr: &AddInteger) -> Result<(), TrackerError> {
        let (object, field, step) = self.object_mut(cs, &instr.target)?;
        if !matches!(step, Step::Field) {
            return Err(TrackerError::UnsupportedPath);
        }
        match object.get_mut(&field) {
            Some(FieldState::Value(Value::Int(v))) => {
                *v = v.wrapping_add(instr.value);
                Ok(())
            }
            // Adding to null leaves it null.
            None | Some(FieldState::Value(Value::Null)) => Ok(()),
            Some(_) => Err(TrackerError::WrongShape(field)),
        }
    }

    fn array_insert(&mut self, cs: &Changeset, instr: &ArrayInsert) -> Result<(), TrackerError> {
        let value = resolve_value(cs, &instr.value)?;
        let (list, index) = self.list_mut(cs, &instr.target, instr.prior_size)?;
        let i = index as usize;
        if i > list.len() {
            return Err(TrackerError::IndexOutOfRange {
                index,
                size: list.len(),
            });
        }
        list.insert(i, value);
        Ok(())
    }

    fn array_move(&mut self, cs: &Changeset, instr: &ArrayMove) -> Result<(), TrackerError> {
        let (list, index) = self.list_mut(cs, &instr.target, instr.prior_size)?;
        let from = check_index(index, list.len())?;
        let to = check_index(instr.destination, list.len())?;
        let value = list.remove(from);
        list.insert(to, value);
        Ok(())
    }

    fn array_erase(&mut self, cs: &Changeset, instr: &ArrayErase) -> Result<(), TrackerError> {
        let (list, index) = self.list_mut(cs, &instr.target, instr.prior_size)?;
        let i = check_index(index, list.len())?;
        list.remove(i);
        Ok(())
    }

    fn clear(&mut self, cs: &Changeset, instr: &Clear) -> Result<(), TrackerError> {
        let (object, field, step) = self.object_mut(cs, &instr.target)?;
        if !matches!(step, Step::Field) {
            return Err(TrackerError::UnsupportedPath);
        }
        match object.get_mut(&field) {
            Some(FieldState::List(items)) | Some(FieldState::Set(items)) => items.clear(),
            Some(FieldState::Dictionary(dict)) => dict.clear(),
            Some(FieldState::Value(_)) => return Err(TrackerError::WrongShape(field)),
            None => {}
        }
        Ok(())
    }

    fn set_insert(&mut self, cs: &Changeset, instr: &SetInsert) -> Result<(), TrackerError> {
        let value = resolve_value(cs, &instr.value)?;
        let set = self.set_mut(cs, &instr.target)?;
        if !set.contains(&value) {
            set.push(value);
        }
        Ok(())
    }

    fn set_erase(&mut self, cs: &Changeset, instr: &SetErase) -> Result<(), TrackerError> {
        let value = resolve_value(cs, &instr.value)?;
        self.set_mut(cs, &instr.target)?.retain(|v| *v != value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use objsync_history::{ClientHistory, ColumnSpec, FieldPath, HistoryError};
    use objsync_protocol::{apply_changeset, PayloadType};

    fn person_history() -> ClientHistory {
        let history = ClientHistory::default();
        let mut tx = history.begin_write();
        tx.add_table_with_primary_key("Person", "_id", PayloadType::Int, false)
            .unwrap();
        tx.add_column("Person", "age", ColumnSpec::new(PayloadType::Int))
            .unwrap();
        tx.add_column("Person", "tags", ColumnSpec::new(PayloadType::String).list())
            .unwrap();
        tx.add_column("Person", "pets", ColumnSpec::new(PayloadType::String).set())
            .unwrap();
        tx.add_column("Person", "meta", ColumnSpec::new(PayloadType::Int).dictionary())
            .unwrap();
        tx.create_object_with_primary_key("Person", 1i64).unwrap();
        tx.commit().unwrap();
        history
    }

    fn replay(history: &ClientHistory) -> Result<ObjectTracker, TrackerError> {
        let mut tracker = ObjectTracker::new();
        let mut result = Ok(());
        history.for_each_pending(|cs| {
            if result.is_ok() {
                result = apply_changeset(cs, &mut tracker);
            }
        });
        result.map(|()| tracker)
    }

    #[test]
    fn tracks_fields_and_collections() {
        let history = person_history();
        let mut tx = history.begin_write();
        let tags = FieldPath::new("Person", 1i64, "tags");
        tx.set(&FieldPath::new("Person", 1i64, "age"), 30).unwrap();
        tx.add_int(&FieldPath::new("Person", 1i64, "age"), 2).unwrap();
        tx.list_insert(&tags.at(0), "b", 0).unwrap();
        tx.list_insert(&tags.at(0), "a", 1).unwrap();
        tx.list_insert(&tags.at(2), "c", 2).unwrap();
        tx.list_move(&tags.at(2), 0, 3).unwrap();
        tx.list_erase(&tags.at(1), 3).unwrap();
        tx.list_set(&tags.at(1), "B", 2).unwrap();
        let pets = FieldPath::new("Person", 1i64, "pets");
        tx.set_insert(&pets, "cat").unwrap();
        tx.set_insert(&pets, "cat").unwrap();
        tx.set_insert(&pets, "dog").unwrap();
        tx.set_erase(&pets, "cat").unwrap();
        let meta = FieldPath::new("Person", 1i64, "meta");
        tx.set(&meta.clone().key("height"), 180).unwrap();
        tx.set(&meta.clone().key("weight"), 80).unwrap();
        tx.set(&meta.key("weight"), Value::Erased).unwrap();
        tx.commit().unwrap();

        let tracker = replay(&history).unwrap();
        let key = PrimaryKeyValue::Int(1);
        assert_eq!(
            tracker.get("Person", &key, "age"),
            Some(&FieldState::Value(Value::Int(32)))
        );
        assert_eq!(
            tracker.get("Person", &key, "tags"),
            Some(&FieldState::List(vec!["c".into(), "B".into()]))
        );
        assert_eq!(
            tracker.get("Person", &key, "pets"),
            Some(&FieldState::Set(vec!["dog".into()]))
        );
        assert_eq!(
            tracker.get("Person", &key, "meta"),
            Some(&FieldState::Dictionary(BTreeMap::from([(
                "height".to_owned(),
                Value::Int(180)
            )])))
        );
    }

    #[test]
    fn defaults_do_not_overwrite() {
        let history = person_history();
        let mut tx = history.begin_write();
        let age = FieldPath::new("Person", 1i64, "age");
        tx.set(&age, 5).unwrap();
        tx.set_default(&age, 0).unwrap();
        tx.commit().unwrap();

        let tracker = replay(&history).unwrap();
        assert_eq!(
            tracker.get("Person", &PrimaryKeyValue::Int(1), "age"),
            Some(&FieldState::Value(Value::Int(5)))
        );
    }

    #[test]
    fn out_of_range_index_is_rejected_by_applier() {
        let history = person_history();
        let mut tx = history.begin_write();
        let tags = FieldPath::new("Person", 1i64, "tags");
        tx.list_insert(&tags.at(3), "x", 0).unwrap();
        tx.commit().unwrap();

        assert_eq!(
            replay(&history).unwrap_err(),
            TrackerError::IndexOutOfRange { index: 3, size: 0 }
        );
    }

    #[test]
    fn prior_size_mismatch() {
        let history = person_history();
        let mut tx = history.begin_write();
        tx.list_insert(&FieldPath::new("Person", 1i64, "tags").at(0), "x", 4)
            .unwrap();
        tx.commit().unwrap();

        assert_eq!(
            replay(&history).unwrap_err(),
            TrackerError::PriorSizeMismatch {
                expected: 4,
                actual: 0
            }
        );
    }

    #[test]
    fn unknown_object_fails_integration() {
        let history = person_history();
        let mut tx = history.begin_write();
        tx.set(&FieldPath::new("Person", 2i64, "age"), 1).unwrap();
        tx.commit().unwrap();
        history.set_client_file_ident(1);

        let client = ClientHistory::default();
        let mut tracker = ObjectTracker::new();
        let uploads = history.pending_uploads(10).unwrap();
        client
            .integrate_remote(&uploads[0].data, &mut tracker)
            .unwrap();
        let err = client
            .integrate_remote(&uploads[1].data, &mut tracker)
            .unwrap_err();
        assert_eq!(
            err,
            HistoryError::Apply("no such object: Person[2]".into())
        );
    }

    #[test]
    fn erase_operations() {
        let history = person_history();
        let mut tx = history.begin_write();
        tx.set(&FieldPath::new("Person", 1i64, "age"), 3).unwrap();
        tx.erase_column("Person", "age").unwrap();
        tx.create_object_with_primary_key("Person", 2i64).unwrap();
        tx.erase_object("Person", &PrimaryKeyValue::Int(1)).unwrap();
        tx.commit().unwrap();

        let tracker = replay(&history).unwrap();
        assert_eq!(tracker.object_count("Person"), 1);
        assert!(tracker.contains_object("Person", &PrimaryKeyValue::Int(2)));
        assert_eq!(tracker.table_names().collect::<Vec<_>>(), vec!["Person"]);

        let mut tx = history.begin_write();
        tx.erase_table("Person").unwrap();
        tx.commit().unwrap();
        assert_eq!(replay(&history).unwrap().table_names().count(), 0);
    }
}
