//! Property tests over generated changesets and arbitrary bytes.

use objsync_history::{ClientHistory, ColumnSpec, FieldPath, Value};
use objsync_protocol::{
    encode_changeset, encode_primary_key_base64, parse_base64_encoded_primary_key,
    parse_changeset, PayloadType, PrimaryKeyValue,
};
use objsync_testkit::prelude::*;
use proptest::prelude::*;

fn is_comparable_scalar(value: &Value) -> bool {
    match value {
        Value::Float(f) => !f.is_nan(),
        Value::Double(d) => !d.is_nan(),
        Value::Link { .. } | Value::ObjectValue | Value::Dictionary | Value::Erased => false,
        _ => true,
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn generated_changesets_parse_under_any_split(cs in changeset_strategy(16)) {
        check_all_splits(&cs, 7);
    }

    #[test]
    fn arbitrary_bytes_never_panic(data in prop::collection::vec(any::<u8>(), 0..128)) {
        fuzz_all(&data);
    }

    #[test]
    fn encoded_changesets_survive_every_fuzz_target(cs in changeset_strategy(8)) {
        let bytes = encode_changeset(&cs).unwrap();
        fuzz_roundtrip(&bytes);
        fuzz_stream_split(&[3].iter().chain(&bytes).copied().collect::<Vec<_>>());
    }

    #[test]
    fn base64_keys_round_trip(key in text_primary_key_strategy()) {
        let text = encode_primary_key_base64(&key);
        prop_assert_eq!(parse_base64_encoded_primary_key(&text).unwrap(), key);
    }

    #[test]
    fn set_values_reach_the_tracker(value in value_strategy().prop_filter("comparable scalars", is_comparable_scalar)) {
        let server = ClientHistory::default();
        let mut tx = server.begin_write();
        tx.add_table_with_primary_key("Box", "_id", PayloadType::Int, false).unwrap();
        tx.add_column("Box", "content", ColumnSpec::new(PayloadType::Null).nullable()).unwrap();
        tx.create_object_with_primary_key("Box", 1i64).unwrap();
        tx.set(&FieldPath::new("Box", 1i64, "content"), value.clone()).unwrap();
        tx.commit().unwrap();
        server.set_client_file_ident(2);

        let client = ClientHistory::default();
        let mut tracker = ObjectTracker::new();
        for upload in server.pending_uploads(10).unwrap() {
            client.integrate_remote(&upload.data, &mut tracker).unwrap();
        }
        prop_assert_eq!(
            tracker.get("Box", &PrimaryKeyValue::Int(1), "content"),
            Some(&FieldState::Value(value))
        );
    }
}

#[test]
fn exported_vectors_all_pass() {
    for vector in varint_vectors() {
        check_varint_vector(&vector).unwrap();
    }
    for vector in changeset_vectors().into_iter().chain(fixture_vectors()) {
        check_changeset_vector(&vector).unwrap();
    }
}

#[test]
fn dog_history_replays_into_tracker() {
    let server = history_with_dogs(5);
    server.set_client_file_ident(9);

    let client = ClientHistory::default();
    let mut tracker = ObjectTracker::new();
    for upload in server.pending_uploads(100).unwrap() {
        client.integrate_remote(&upload.data, &mut tracker).unwrap();
    }

    assert_eq!(client.remote_version(), 6);
    assert_eq!(tracker.object_count("Dog"), 5);
    assert!(client.schema().table("Dog").unwrap().column("name").is_some());
    let roundtrip = encode_changeset(&every_instruction_changeset()).unwrap();
    assert!(parse_changeset(&roundtrip).is_ok());
}
