//! Property-based test generators using proptest.
//!
//! Every generated [`Changeset`] passes [`Changeset::validate`], so it can be
//! encoded without error.

use objsync_history::{PathStep, Value};
use objsync_protocol::{
    AddColumn, AddInteger, AddTable, ArrayErase, ArrayInsert, ArrayMove, Changeset, Clear,
    CollectionType, CreateObject, Decimal128, EraseColumn, EraseObject, EraseTable, GlobalKey,
    ObjectId, Path, PathElement, PathInstruction, PayloadType, PrimaryKeyValue, SetErase,
    SetInsert, TableType, Timestamp, Update,
};
use proptest::prelude::*;
use uuid::Uuid;

/// Strategy for table names.
pub fn table_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[A-Z][a-zA-Z0-9_]{0,15}").expect("Invalid regex")
}

/// Strategy for field names, including non-ASCII ones.
pub fn field_name_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        prop::string::string_regex("[a-z_][a-zA-Z0-9_]{0,15}").expect("Invalid regex"),
        Just("café".to_owned()),
        Just("名前".to_owned()),
    ]
}

/// Strategy for GlobalKeys, provisional ones included.
pub fn global_key_strategy() -> impl Strategy<Value = GlobalKey> {
    prop_oneof![
        (0u64..4).prop_map(|lo| GlobalKey::new(0, lo)),
        (any::<u64>(), any::<u64>()).prop_map(|(hi, lo)| GlobalKey::new(hi, lo)),
    ]
}

/// Strategy for primary keys of every kind.
pub fn primary_key_strategy() -> impl Strategy<Value = PrimaryKeyValue> {
    prop_oneof![
        Just(PrimaryKeyValue::Null),
        any::<i64>().prop_map(PrimaryKeyValue::Int),
        "[a-z]{0,12}".prop_map(PrimaryKeyValue::String),
        global_key_strategy().prop_map(PrimaryKeyValue::GlobalKey),
        any::<[u8; 12]>().prop_map(|b| PrimaryKeyValue::ObjectId(ObjectId::from_bytes(b))),
        any::<u128>().prop_map(|v| PrimaryKeyValue::Uuid(Uuid::from_u128(v))),
    ]
}

/// Strategy for primary keys that have a base64 text form.
pub fn text_primary_key_strategy() -> impl Strategy<Value = PrimaryKeyValue> {
    primary_key_strategy().prop_filter("GlobalKeys have no text form", |key| {
        !matches!(key, PrimaryKeyValue::GlobalKey(_))
    })
}

/// Strategy for timestamps with in-range nanoseconds.
pub fn timestamp_strategy() -> impl Strategy<Value = Timestamp> {
    (any::<i64>(), -999_999_999i32..=999_999_999).prop_map(|(s, ns)| Timestamp::new(s, ns))
}

/// Strategy for field values of every kind.
pub fn value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<i64>().prop_map(Value::Int),
        any::<bool>().prop_map(Value::Bool),
        any::<String>().prop_map(Value::String),
        prop::collection::vec(any::<u8>(), 0..64).prop_map(Value::Binary),
        timestamp_strategy().prop_map(Value::Timestamp),
        any::<f32>().prop_map(Value::Float),
        any::<f64>().prop_map(Value::Double),
        (any::<u128>(), any::<i32>(), any::<bool>())
            .prop_map(|(c, e, n)| Value::Decimal(Decimal128::new(c, e, n))),
        any::<[u8; 12]>().prop_map(|b| Value::ObjectId(ObjectId::from_bytes(b))),
        any::<u128>().prop_map(|v| Value::Uuid(Uuid::from_u128(v))),
        (table_name_strategy(), primary_key_strategy())
            .prop_map(|(table, target)| Value::Link { table, target }),
        Just(Value::ObjectValue),
        Just(Value::Dictionary),
        Just(Value::Erased),
    ]
}

/// Strategy for paths below a top-level field.
pub fn path_strategy() -> impl Strategy<Value = Vec<PathStep>> {
    prop::collection::vec(
        prop_oneof![
            field_name_strategy().prop_map(PathStep::Field),
            any::<u32>().prop_map(PathStep::Index),
        ],
        0..4,
    )
}

fn column_type_strategy() -> impl Strategy<Value = PayloadType> {
    prop::sample::select(vec![
        PayloadType::Null,
        PayloadType::Int,
        PayloadType::Bool,
        PayloadType::String,
        PayloadType::Binary,
        PayloadType::Timestamp,
        PayloadType::Float,
        PayloadType::Double,
        PayloadType::Decimal,
        PayloadType::Link,
        PayloadType::ObjectId,
        PayloadType::Uuid,
    ])
}

fn collection_type_strategy() -> impl Strategy<Value = CollectionType> {
    prop::sample::select(vec![
        CollectionType::Single,
        CollectionType::List,
        CollectionType::Dictionary,
        CollectionType::Set,
    ])
}

fn pk_type_strategy() -> impl Strategy<Value = PayloadType> {
    prop::sample::select(vec![
        PayloadType::Int,
        PayloadType::String,
        PayloadType::ObjectId,
        PayloadType::Uuid,
        PayloadType::GlobalKey,
    ])
}

#[derive(Debug, Clone)]
struct Target {
    table: String,
    object: PrimaryKeyValue,
    field: String,
    path: Vec<PathStep>,
}

fn target_strategy() -> impl Strategy<Value = Target> {
    (
        table_name_strategy(),
        primary_key_strategy(),
        field_name_strategy(),
        path_strategy(),
    )
        .prop_map(|(table, object, field, path)| Target {
            table,
            object,
            field,
            path,
        })
}

fn indexed_target_strategy() -> impl Strategy<Value = Target> {
    (target_strategy(), any::<u32>()).prop_map(|(mut target, index)| {
        target.path.push(PathStep::Index(index));
        target
    })
}

/// Owned description of one instruction, turned into a real instruction
/// once the changeset to intern into is known.
#[derive(Debug, Clone)]
enum Generated {
    AddTable {
        table: String,
        pk: Option<(String, PayloadType, bool)>,
        asymmetric: bool,
    },
    EraseTable(String),
    AddColumn {
        table: String,
        field: String,
        value_type: PayloadType,
        nullable: bool,
        collection_type: CollectionType,
        link_target: String,
    },
    EraseColumn(String, String),
    CreateObject(String, PrimaryKeyValue),
    EraseObject(String, PrimaryKeyValue),
    Update(Target, Value, bool, u32),
    AddInteger(Target, i64),
    ArrayInsert(Target, Value, u32),
    ArrayMove(Target, u32, u32),
    ArrayErase(Target, u32),
    Clear(Target),
    SetInsert(Target, Value),
    SetErase(Target, Value),
}

fn generated_strategy() -> impl Strategy<Value = Generated> {
    prop_oneof![
        (
            table_name_strategy(),
            prop::option::of((field_name_strategy(), pk_type_strategy(), any::<bool>())),
            any::<bool>(),
        )
            .prop_map(|(table, pk, asymmetric)| Generated::AddTable {
                table,
                pk,
                asymmetric,
            }),
        table_name_strategy().prop_map(Generated::EraseTable),
        (
            table_name_strategy(),
            field_name_strategy(),
            column_type_strategy(),
            any::<bool>(),
            collection_type_strategy(),
            table_name_strategy(),
        )
            .prop_map(
                |(table, field, value_type, nullable, collection_type, link_target)| {
                    Generated::AddColumn {
                        table,
                        field,
                        value_type,
                        nullable,
                        collection_type,
                        link_target,
                    }
                }
            ),
        (table_name_strategy(), field_name_strategy())
            .prop_map(|(t, f)| Generated::EraseColumn(t, f)),
        (table_name_strategy(), primary_key_strategy())
            .prop_map(|(t, k)| Generated::CreateObject(t, k)),
        (table_name_strategy(), primary_key_strategy())
            .prop_map(|(t, k)| Generated::EraseObject(t, k)),
        (target_strategy(), value_strategy(), any::<bool>(), any::<u32>())
            .prop_map(|(t, v, d, p)| Generated::Update(t, v, d, p)),
        (target_strategy(), any::<i64>()).prop_map(|(t, v)| Generated::AddInteger(t, v)),
        (indexed_target_strategy(), value_strategy(), any::<u32>())
            .prop_map(|(t, v, p)| Generated::ArrayInsert(t, v, p)),
        (indexed_target_strategy(), any::<u32>(), any::<u32>())
            .prop_map(|(t, d, p)| Generated::ArrayMove(t, d, p)),
        (indexed_target_strategy(), any::<u32>()).prop_map(|(t, p)| Generated::ArrayErase(t, p)),
        target_strategy().prop_map(Generated::Clear),
        (target_strategy(), value_strategy()).prop_map(|(t, v)| Generated::SetInsert(t, v)),
        (target_strategy(), value_strategy()).prop_map(|(t, v)| Generated::SetErase(t, v)),
    ]
}

fn path_instruction(cs: &mut Changeset, target: &Target) -> PathInstruction {
    let table = cs.intern_string(&target.table);
    let object = cs.intern_key(&target.object);
    let field = cs.intern_string(&target.field);
    let path: Path = target
        .path
        .iter()
        .map(|step| match step {
            PathStep::Field(name) => PathElement::Field(cs.intern_string(name)),
            PathStep::Index(index) => PathElement::Index(*index),
        })
        .collect::<Vec<_>>()
        .into();
    PathInstruction::new(table, object, field).with_path(path)
}

fn push_generated(cs: &mut Changeset, generated: Generated) {
    match generated {
        Generated::AddTable {
            table,
            pk,
            asymmetric,
        } => {
            let table = cs.intern_string(&table);
            let table_type = match pk {
                Some((field, pk_type, pk_nullable)) => TableType::TopLevel {
                    pk_field: cs.intern_string(&field),
                    pk_type,
                    pk_nullable,
                    is_asymmetric: asymmetric,
                },
                None => TableType::Embedded,
            };
            cs.push_back(AddTable { table, table_type });
        }
        Generated::EraseTable(table) => {
            let table = cs.intern_string(&table);
            cs.push_back(EraseTable { table });
        }
        Generated::AddColumn {
            table,
            field,
            value_type,
            nullable,
            collection_type,
            link_target,
        } => {
            let dictionary = collection_type == CollectionType::Dictionary;
            let instr = AddColumn {
                table: cs.intern_string(&table),
                field: cs.intern_string(&field),
                value_type,
                nullable: nullable || (value_type == PayloadType::Null && !dictionary),
                collection_type,
                link_target_table: (value_type == PayloadType::Link)
                    .then(|| cs.intern_string(&link_target)),
                key_type: dictionary.then_some(PayloadType::String),
            };
            cs.push_back(instr);
        }
        Generated::EraseColumn(table, field) => {
            let instr = EraseColumn {
                table: cs.intern_string(&table),
                field: cs.intern_string(&field),
            };
            cs.push_back(instr);
        }
        Generated::CreateObject(table, key) => {
            let table = cs.intern_string(&table);
            let object = cs.intern_key(&key);
            cs.push_back(CreateObject { table, object });
        }
        Generated::EraseObject(table, key) => {
            let table = cs.intern_string(&table);
            let object = cs.intern_key(&key);
            cs.push_back(EraseObject { table, object });
        }
        Generated::Update(target, value, is_default, prior_size) => {
            let target = path_instruction(cs, &target);
            let value = value.to_payload(cs);
            let mut update = Update::new(target, value);
            if update.is_array_update() {
                update.prior_size = prior_size;
            } else {
                update.is_default = is_default;
            }
            cs.push_back(update);
        }
        Generated::AddInteger(target, value) => {
            let target = path_instruction(cs, &target);
            cs.push_back(AddInteger { target, value });
        }
        Generated::ArrayInsert(target, value, prior_size) => {
            let target = path_instruction(cs, &target);
            let value = value.to_payload(cs);
            cs.push_back(ArrayInsert {
                target,
                value,
                prior_size,
            });
        }
        Generated::ArrayMove(target, destination, prior_size) => {
            let target = path_instruction(cs, &target);
            cs.push_back(ArrayMove {
                target,
                destination,
                prior_size,
            });
        }
        Generated::ArrayErase(target, prior_size) => {
            let target = path_instruction(cs, &target);
            cs.push_back(ArrayErase { target, prior_size });
        }
        Generated::Clear(target) => {
            let target = path_instruction(cs, &target);
            cs.push_back(Clear { target });
        }
        Generated::SetInsert(target, value) => {
            let target = path_instruction(cs, &target);
            let value = value.to_payload(cs);
            cs.push_back(SetInsert { target, value });
        }
        Generated::SetErase(target, value) => {
            let target = path_instruction(cs, &target);
            let value = value.to_payload(cs);
            cs.push_back(SetErase { target, value });
        }
    }
}

/// Strategy for valid changesets of up to `max_len` instructions covering
/// every instruction kind.
pub fn changeset_strategy(max_len: usize) -> impl Strategy<Value = Changeset> {
    prop::collection::vec(generated_strategy(), 0..=max_len).prop_map(|generated| {
        let mut cs = Changeset::new();
        for g in generated {
            push_generated(&mut cs, g);
        }
        cs
    })
}
