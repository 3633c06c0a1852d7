//! Integration tests for client histories exchanging changesets.

use objsync_history::{
    translate_provisional_keys, ClientHistory, ColumnSpec, FieldPath, HistoryConfig,
    HistoryError, Value,
};
use objsync_protocol::{
    parse_changeset, Changeset, CreateObject, GlobalKey, Instruction, InstructionHandler,
    ParserConfig, PayloadType, PrimaryKeyValue, Update,
};
use proptest::prelude::*;
use std::sync::Arc;
use std::thread;

/// Records created objects and field updates of applied changesets.
#[derive(Default)]
struct RecordingHandler {
    created: Vec<(String, PrimaryKeyValue)>,
    updates: Vec<(String, Value)>,
    reject_updates: bool,
}

impl InstructionHandler for RecordingHandler {
    type Error = String;

    fn create_object(&mut self, cs: &Changeset, instr: &CreateObject) -> Result<(), String> {
        let table = cs.get_string(instr.table).ok_or("bad table")?;
        let key = cs.get_key(&instr.object).ok_or("bad key")?;
        self.created.push((table.to_owned(), key));
        Ok(())
    }

    fn update(&mut self, cs: &Changeset, instr: &Update) -> Result<(), String> {
        if self.reject_updates {
            return Err("read-only".into());
        }
        let field = cs.get_string(instr.target.field).ok_or("bad field")?;
        let value = Value::from_payload(cs, &instr.value).ok_or("bad value")?;
        self.updates.push((field.to_owned(), value));
        Ok(())
    }
}

fn dog_schema(history: &ClientHistory) {
    let mut tx = history.begin_write();
    tx.add_table("Dog").unwrap();
    tx.add_column("Dog", "name", ColumnSpec::new(PayloadType::String))
        .unwrap();
    tx.add_column("Dog", "friend", ColumnSpec::link("Dog").nullable())
        .unwrap();
    tx.commit().unwrap();
}

#[test]
fn finalization_rewrites_links() {
    let history = ClientHistory::default();
    dog_schema(&history);

    let mut tx = history.begin_write();
    let a = tx.create_object("Dog").unwrap();
    let b = tx.create_object("Dog").unwrap();
    tx.set(&FieldPath::new("Dog", a, "friend"), Value::link("Dog", b))
        .unwrap();
    tx.commit().unwrap();

    // Two objects, the update's object and its link target.
    assert_eq!(history.set_client_file_ident(5), 4);

    let uploads = history.pending_uploads(10).unwrap();
    let mut handler = RecordingHandler::default();
    let client = ClientHistory::default();
    for upload in &uploads {
        client.integrate_remote(&upload.data, &mut handler).unwrap();
    }

    assert_eq!(
        handler.created,
        vec![
            ("Dog".into(), PrimaryKeyValue::GlobalKey(GlobalKey::new(5, 0))),
            ("Dog".into(), PrimaryKeyValue::GlobalKey(GlobalKey::new(5, 1))),
        ]
    );
    assert_eq!(
        handler.updates,
        vec![(
            "friend".into(),
            Value::link("Dog", GlobalKey::new(5, 1)),
        )]
    );
}

#[test]
fn keys_created_before_finalization_are_uploaded_translated() {
    let history = ClientHistory::default();
    dog_schema(&history);
    let mut tx = history.begin_write();
    tx.add_column("Dog", "age", ColumnSpec::new(PayloadType::Int))
        .unwrap();
    let old = tx.create_object("Dog").unwrap();
    let version = tx.commit().unwrap();

    history.set_client_file_ident(42);
    history.acknowledge_up_to(version);

    let mut tx = history.begin_write();
    tx.set(&FieldPath::new("Dog", old.clone(), "age"), 3).unwrap();
    let young = tx.create_object("Dog").unwrap();
    assert_eq!(young, PrimaryKeyValue::GlobalKey(GlobalKey::new(42, 1)));
    tx.set(
        &FieldPath::new("Dog", young, "friend"),
        Value::link("Dog", old),
    )
    .unwrap();
    tx.commit().unwrap();

    let uploads = history.pending_uploads(10).unwrap();
    assert_eq!(uploads.len(), 1);
    let cs = parse_changeset(&uploads[0].data).unwrap();
    let objects: Vec<_> = cs
        .iter()
        .filter_map(|instr| match instr {
            Instruction::Update(update) => cs.get_key(&update.target.object),
            _ => None,
        })
        .collect();
    assert_eq!(
        objects,
        vec![
            PrimaryKeyValue::GlobalKey(GlobalKey::new(42, 0)),
            PrimaryKeyValue::GlobalKey(GlobalKey::new(42, 1)),
        ]
    );

    let mut handler = RecordingHandler::default();
    objsync_protocol::apply_changeset(&cs, &mut handler).unwrap();
    assert_eq!(
        handler.updates[1],
        ("friend".into(), Value::link("Dog", GlobalKey::new(42, 0)))
    );
}

#[test]
fn independent_histories_do_not_share_counters() {
    let first = ClientHistory::default();
    let second = ClientHistory::default();
    dog_schema(&first);
    dog_schema(&second);

    let mut tx = first.begin_write();
    tx.create_object("Dog").unwrap();
    tx.create_object("Dog").unwrap();
    tx.commit().unwrap();

    let mut tx = second.begin_write();
    assert_eq!(
        tx.create_object("Dog").unwrap(),
        PrimaryKeyValue::GlobalKey(GlobalKey::new(0, 0))
    );
    tx.commit().unwrap();

    first.set_client_file_ident(1);
    second.set_client_file_ident(2);
    assert_eq!(first.client_file_ident(), 1);
    assert_eq!(second.client_file_ident(), 2);
}

#[test]
#[should_panic]
fn double_finalization_panics() {
    let history = ClientHistory::default();
    history.set_client_file_ident(3);
    history.set_client_file_ident(3);
}

#[test]
#[should_panic]
fn zero_file_ident_panics() {
    ClientHistory::default().set_client_file_ident(0);
}

#[test]
fn keyed_objects_are_stable_across_finalization() {
    let history = ClientHistory::default();
    let mut tx = history.begin_write();
    tx.add_table_with_primary_key("Person", "_id", PayloadType::String, false)
        .unwrap();
    tx.create_object_with_primary_key("Person", "ann").unwrap();
    tx.commit().unwrap();

    assert_eq!(history.set_client_file_ident(8), 0);
    let upload = history.pending_uploads(1).unwrap().remove(0);
    let cs = parse_changeset(&upload.data).unwrap();
    let mut handler = RecordingHandler::default();
    objsync_protocol::apply_changeset(&cs, &mut handler).unwrap();
    assert_eq!(
        handler.created,
        vec![("Person".into(), PrimaryKeyValue::from("ann"))]
    );
    assert_eq!(
        GlobalKey::from_primary_key(&handler.created[0].1),
        GlobalKey::from_primary_key(&PrimaryKeyValue::from("ann"))
    );
}

#[test]
fn handler_failure_leaves_state_untouched() {
    let server = ClientHistory::default();
    dog_schema(&server);
    let mut tx = server.begin_write();
    tx.add_column("Dog", "age", ColumnSpec::new(PayloadType::Int))
        .unwrap();
    let dog = tx.create_object("Dog").unwrap();
    tx.set(&FieldPath::new("Dog", dog, "age"), 4).unwrap();
    tx.commit().unwrap();
    server.set_client_file_ident(1);

    let client = ClientHistory::default();
    let mut handler = RecordingHandler {
        reject_updates: true,
        ..Default::default()
    };
    let uploads = server.pending_uploads(10).unwrap();
    client
        .integrate_remote(&uploads[0].data, &mut handler)
        .unwrap();
    let err = client
        .integrate_remote(&uploads[1].data, &mut handler)
        .unwrap_err();

    assert_eq!(err, HistoryError::Apply("read-only".into()));
    assert!(!err.is_protocol_violation());
    assert_eq!(client.remote_version(), 1);
    assert!(client
        .schema()
        .table("Dog")
        .unwrap()
        .column("age")
        .is_none());
}

#[test]
fn parser_limits_come_from_config() {
    let server = ClientHistory::default();
    dog_schema(&server);
    let mut tx = server.begin_write();
    let dog = tx.create_object("Dog").unwrap();
    tx.set(&FieldPath::new("Dog", dog, "name"), "a long name")
        .unwrap();
    tx.commit().unwrap();
    server.set_client_file_ident(1);
    let uploads = server.pending_uploads(10).unwrap();

    let client = ClientHistory::new(
        HistoryConfig::new().with_parser(ParserConfig::default().with_max_string_size(8)),
    );
    let mut handler = RecordingHandler::default();
    // Table and column names fit; the string payload does not.
    client
        .integrate_remote(&uploads[0].data, &mut handler)
        .unwrap();
    let err = client
        .integrate_remote(&uploads[1].data, &mut handler)
        .unwrap_err();
    assert!(err.is_protocol_violation());
}

#[test]
fn concurrent_writers_get_distinct_versions_and_keys() {
    let history = Arc::new(ClientHistory::default());
    dog_schema(&history);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let history = Arc::clone(&history);
            thread::spawn(move || {
                (0..10)
                    .map(|_| {
                        let mut tx = history.begin_write();
                        let key = tx.create_object("Dog").unwrap();
                        tx.commit().unwrap();
                        key
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut keys: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    keys.sort_by_key(|k| GlobalKey::from_primary_key(k));
    keys.dedup();
    assert_eq!(keys.len(), 40);
    assert_eq!(history.version(), 41);

    assert_eq!(history.set_client_file_ident(99), 40);
    let mut versions = Vec::new();
    history.for_each_pending(|cs| versions.push(cs.version));
    assert_eq!(versions, (1..=41).collect::<Vec<_>>());
}

proptest! {
    #[test]
    fn every_provisional_key_is_translated(counts in prop::collection::vec(0usize..5, 1..6), ident in 1u64..1000) {
        let history = ClientHistory::default();
        dog_schema(&history);
        for count in &counts {
            let mut tx = history.begin_write();
            for _ in 0..*count {
                tx.create_object("Dog").unwrap();
            }
            tx.commit().unwrap();
        }

        let total: usize = counts.iter().sum();
        prop_assert_eq!(history.set_client_file_ident(ident), total);

        let mut copies = Vec::new();
        history.for_each_pending(|cs| copies.push(cs.clone()));
        for mut cs in copies {
            prop_assert_eq!(translate_provisional_keys(&mut cs, ident), 0);
        }
    }
}
