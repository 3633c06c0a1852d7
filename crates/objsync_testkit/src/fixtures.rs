//! Sample changesets and histories.
//!
//! Provides ready-made changesets for the common test scenarios, one per
//! shape the wire format has to handle.

use objsync_history::{ClientHistory, ColumnSpec, HistoryConfig};
use objsync_protocol::{
    AddColumn, AddInteger, AddTable, ArrayErase, ArrayInsert, ArrayMove, Changeset, Clear,
    CollectionType, CreateObject, Decimal128, EraseColumn, EraseObject, EraseTable, GlobalKey,
    Link, ObjectId, Path, PathInstruction, Payload, PayloadType, PrimaryKey, SetErase, SetInsert,
    TableType, Timestamp, Update,
};
use uuid::Uuid;

/// `AddTable` of a table keyed by a nullable integer.
pub fn add_table_changeset() -> Changeset {
    let mut cs = Changeset::new();
    let table = cs.intern_string("Foo");
    let pk_field = cs.intern_string("pk");
    cs.push_back(AddTable {
        table,
        table_type: TableType::TopLevel {
            pk_field,
            pk_type: PayloadType::Int,
            pk_nullable: true,
            is_asymmetric: false,
        },
    });
    cs
}

/// `CreateObject` of `Foo[123]`.
pub fn create_object_changeset() -> Changeset {
    let mut cs = Changeset::new();
    let table = cs.intern_string("Foo");
    cs.push_back(CreateObject {
        table,
        object: PrimaryKey::Int(123),
    });
    cs
}

/// A default-valued field update at `Foo[123].bar.baz.lol.boo`.
pub fn nested_update_changeset() -> Changeset {
    let mut cs = Changeset::new();
    let table = cs.intern_string("Foo");
    let field = cs.intern_string("bar");
    let mut path = Path::new();
    for name in ["baz", "lol", "boo"] {
        path.push(cs.intern_string(name));
    }
    let mut update = Update::new(
        PathInstruction::new(table, PrimaryKey::Int(123), field).with_path(path),
        Payload::Int(1),
    );
    update.is_default = true;
    cs.push_back(update);
    cs
}

/// An array update at index 123 of a list of 500.
pub fn array_update_changeset() -> Changeset {
    let mut cs = Changeset::new();
    let table = cs.intern_string("Foo");
    let field = cs.intern_string("bar");
    let mut path = Path::new();
    path.push(123u32);
    let mut update = Update::new(
        PathInstruction::new(table, PrimaryKey::Int(123), field).with_path(path),
        Payload::Int(1),
    );
    update.prior_size = 500;
    cs.push_back(update);
    cs
}

/// Interns "Program" three times after strings with accented characters.
pub fn repeated_intern_changeset() -> Changeset {
    let mut cs = Changeset::new();
    let cafe = cs.intern_string("Café");
    let naive = cs.intern_string("naïve");
    cs.push_back(EraseTable { table: cafe });
    cs.push_back(EraseTable { table: naive });
    for _ in 0..3 {
        let program = cs.intern_string("Program");
        cs.push_back(CreateObject {
            table: program,
            object: PrimaryKey::Int(1),
        });
    }
    cs
}

/// A changeset holding every instruction kind and every payload kind.
pub fn every_instruction_changeset() -> Changeset {
    let mut cs = Changeset::new();
    let person = cs.intern_string("Person");
    let dog = cs.intern_string("Dog");
    let id = cs.intern_string("_id");
    let name = cs.intern_string("name");
    let tags = cs.intern_string("tags");
    let owner = cs.intern_string("owner");
    let meta = cs.intern_string("meta");
    let ann = cs.intern_string("ann");

    cs.push_back(AddTable {
        table: person,
        table_type: TableType::TopLevel {
            pk_field: id,
            pk_type: PayloadType::String,
            pk_nullable: false,
            is_asymmetric: false,
        },
    });
    cs.push_back(AddTable {
        table: dog,
        table_type: TableType::TopLevel {
            pk_field: id,
            pk_type: PayloadType::GlobalKey,
            pk_nullable: false,
            is_asymmetric: true,
        },
    });
    cs.push_back(AddColumn {
        table: person,
        field: tags,
        value_type: PayloadType::String,
        nullable: false,
        collection_type: CollectionType::List,
        link_target_table: None,
        key_type: None,
    });
    cs.push_back(AddColumn {
        table: dog,
        field: owner,
        value_type: PayloadType::Link,
        nullable: true,
        collection_type: CollectionType::Single,
        link_target_table: Some(person),
        key_type: None,
    });
    cs.push_back(AddColumn {
        table: person,
        field: meta,
        value_type: PayloadType::Null,
        nullable: false,
        collection_type: CollectionType::Dictionary,
        link_target_table: None,
        key_type: Some(PayloadType::String),
    });

    let ann_key = PrimaryKey::String(ann);
    let rex = PrimaryKey::GlobalKey(GlobalKey::new(0, 0));
    cs.push_back(CreateObject {
        table: person,
        object: ann_key.clone(),
    });
    cs.push_back(CreateObject {
        table: dog,
        object: rex.clone(),
    });

    let name_value = cs.append_string("Ann");
    cs.push_back(Update::new(
        PathInstruction::new(person, ann_key.clone(), name),
        Payload::String(name_value),
    ));
    cs.push_back(Update::new(
        PathInstruction::new(dog, rex.clone(), owner),
        Payload::Link(Link {
            target_table: person,
            target: ann_key.clone(),
        }),
    ));

    let blob = cs.append_binary(&[0, 1, 2, 0xff]);
    let height = cs.intern_string("height");
    let mut meta_path = Path::new();
    meta_path.push(height);
    let dict_target = PathInstruction::new(person, ann_key.clone(), meta).with_path(meta_path);
    let payloads = [
        Payload::Null,
        Payload::Int(-5),
        Payload::Bool(true),
        Payload::Binary(blob),
        Payload::Timestamp(Timestamp::new(1_700_000_000, 5)),
        Payload::Float(1.5),
        Payload::Double(-0.25),
        Payload::Decimal(Decimal128::new(314, -2, false)),
        Payload::ObjectId(ObjectId::from_bytes([3; 12])),
        Payload::Uuid(Uuid::from_u128(0x1234)),
        Payload::ObjectValue,
        Payload::Dictionary,
        Payload::Erased,
    ];
    for payload in payloads {
        cs.push_back(Update::new(dict_target.clone(), payload));
    }

    cs.push_back(AddInteger {
        target: PathInstruction::new(person, ann_key.clone(), name),
        value: 7,
    });

    let list = PathInstruction::new(person, ann_key.clone(), tags);
    let at = |index: u32| {
        let mut path = Path::new();
        path.push(index);
        list.clone().with_path(path)
    };
    let first = cs.append_string("first");
    cs.push_back(ArrayInsert {
        target: at(0),
        value: Payload::String(first),
        prior_size: 0,
    });
    let second = cs.append_string("second");
    cs.push_back(ArrayInsert {
        target: at(1),
        value: Payload::String(second),
        prior_size: 1,
    });
    cs.push_back(ArrayMove {
        target: at(1),
        destination: 0,
        prior_size: 2,
    });
    cs.push_back(ArrayErase {
        target: at(0),
        prior_size: 2,
    });
    cs.push_back(Clear {
        target: list.clone(),
    });
    cs.push_back(SetInsert {
        target: list.clone(),
        value: Payload::Int(1),
    });
    cs.push_back(SetErase {
        target: list,
        value: Payload::Int(1),
    });

    cs.push_back(EraseObject {
        table: dog,
        object: rex,
    });
    cs.push_back(EraseColumn {
        table: person,
        field: tags,
    });
    cs.push_back(EraseTable { table: dog });
    cs
}

/// A history holding one table `Dog` with a `name` column and `count`
/// objects, committed one per changeset.
pub fn history_with_dogs(count: usize) -> ClientHistory {
    let history = ClientHistory::new(HistoryConfig::default());
    let mut tx = history.begin_write();
    tx.add_table("Dog").expect("fresh history");
    tx.add_column("Dog", "name", ColumnSpec::new(PayloadType::String))
        .expect("fresh table");
    tx.commit().expect("valid schema");

    for _ in 0..count {
        let mut tx = history.begin_write();
        tx.create_object("Dog").expect("Dog exists");
        tx.commit().expect("valid changeset");
    }
    history
}

#[cfg(test)]
mod tests {
    use super::*;
    use objsync_protocol::{encode_changeset, parse_changeset, Instruction, InstructionType};
    use std::collections::HashSet;

    #[test]
    fn fixtures_round_trip() {
        for cs in [
            add_table_changeset(),
            create_object_changeset(),
            nested_update_changeset(),
            array_update_changeset(),
            repeated_intern_changeset(),
            every_instruction_changeset(),
        ] {
            let bytes = encode_changeset(&cs).unwrap();
            assert_eq!(parse_changeset(&bytes).unwrap(), cs);
        }
    }

    #[test]
    fn every_instruction_kind_is_present() {
        let cs = every_instruction_changeset();
        let kinds: HashSet<InstructionType> = cs.iter().map(Instruction::kind).collect();
        assert_eq!(kinds.len(), 14);
    }

    #[test]
    fn history_fixture() {
        let history = history_with_dogs(3);
        assert_eq!(history.version(), 4);
        assert_eq!(history.pending_count(), 4);
    }
}
