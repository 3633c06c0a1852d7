//! Malformed input must always produce an error, never a panic.

use bytes::Bytes;
use objsync_codec::encode_int;
use objsync_protocol::*;
use proptest::prelude::*;

fn sample() -> Vec<u8> {
    let mut cs = Changeset::new();
    let table = cs.intern_string("Café");
    let pk = cs.intern_string("_id");
    cs.push_back(AddTable {
        table,
        table_type: TableType::TopLevel {
            pk_field: pk,
            pk_type: PayloadType::String,
            pk_nullable: false,
            is_asymmetric: false,
        },
    });
    let key = cs.intern_string("alice");
    cs.push_back(CreateObject {
        table,
        object: PrimaryKey::String(key),
    });
    let field = cs.intern_string("scores");
    let mut path = Path::new();
    path.push(2u32);
    let text = cs.append_string("note");
    let mut update = Update::new(
        PathInstruction::new(table, PrimaryKey::String(key), field).with_path(path),
        Payload::String(text),
    );
    update.prior_size = 3;
    cs.push_back(update);
    cs.push_back(AddInteger {
        target: PathInstruction::new(table, PrimaryKey::String(key), field),
        value: 99,
    });
    encode_changeset(&cs).unwrap()
}

#[test]
fn every_strict_prefix_fails_or_parses_fewer_instructions() {
    let data = sample();
    let full = parse_changeset(&data).unwrap();
    for len in 0..data.len() {
        match parse_changeset(&data[..len]) {
            Ok(partial) => assert!(partial.len() < full.len(), "prefix {len}"),
            Err(err) => assert!(!err.message().is_empty()),
        }
    }
}

#[test]
fn empty_and_single_byte_inputs() {
    assert!(parse_changeset(&[]).unwrap().is_empty());
    for byte in 0..=u8::MAX {
        let _ = parse_changeset(&[byte]);
    }
    assert!(parse_changeset(&[0x3f]).is_err());
    assert!(parse_changeset(&[0x80]).is_err());
}

#[test]
fn corrupted_opcode() {
    let mut data = sample();
    data[0] = 0x30;
    let err = parse_changeset(&data).unwrap_err();
    assert_eq!(err.message(), "unknown instruction");
}

#[test]
fn intern_opcode_without_length() {
    let err = parse_changeset(&[0x3f, 0x00]).unwrap_err();
    assert_eq!(err.message(), "bad changeset - integer decoding failure");
}

#[test]
fn intern_opcode_with_oversized_length() {
    let mut data = vec![0x3f, 0x00];
    encode_int(&mut data, MAX_STRING_SIZE + 1);
    let err = parse_changeset(&data).unwrap_err();
    assert_eq!(err.message(), "string too long");
}

#[test]
fn duplicate_intern_index_and_content_are_distinguished() {
    let mut repeated_index = vec![0x3f, 0x00, 0x01, b'a'];
    repeated_index.extend_from_slice(&[0x3f, 0x00, 0x01, b'b']);
    assert_eq!(
        parse_changeset(&repeated_index).unwrap_err().message(),
        "Unexpected intern index"
    );

    let mut repeated_content = vec![0x3f, 0x00, 0x01, b'a'];
    repeated_content.extend_from_slice(&[0x3f, 0x01, 0x01, b'a']);
    assert_eq!(
        parse_changeset(&repeated_content).unwrap_err().message(),
        "Unexpected intern string"
    );

    let mut gap = vec![0x3f, 0x00, 0x01, b'a'];
    gap.extend_from_slice(&[0x3f, 0x02, 0x01, b'b']);
    assert_eq!(
        parse_changeset(&gap).unwrap_err().message(),
        "Unexpected intern index"
    );
}

#[test]
fn binary_limit_is_separate_from_string_limit() {
    let mut data = vec![0x3f, 0x00, 0x01, b'T'];
    // SetInsert T[Null].T = Binary(len 8)
    data.extend_from_slice(&[0x0c, 0x00, 0x00, 0x00, 0x00, 0x04, 0x08]);
    data.extend_from_slice(&[0u8; 8]);

    let config = ParserConfig::default().with_max_binary_size(4);
    let err = parse_changeset_with(&data, &config).unwrap_err();
    assert_eq!(err.message(), "binary too long");
    assert!(parse_changeset(&data).is_ok());
}

#[test]
fn stream_split_at_every_offset() {
    let data = sample();
    let whole = parse_changeset(&data).unwrap();
    for split in 0..=data.len() {
        let (a, b) = data.split_at(split);
        let mut input = ChunkedInputStream::new([
            Bytes::copy_from_slice(a),
            Bytes::copy_from_slice(b),
        ]);
        let mut out = Changeset::new();
        parse_changeset_stream(&mut input, &ParserConfig::default(), &mut out).unwrap();
        assert_eq!(out, whole, "split at {split}");
    }
}

proptest! {
    #[test]
    fn arbitrary_bytes_never_panic(data in prop::collection::vec(any::<u8>(), 0..256)) {
        let _ = parse_changeset(&data);
    }

    #[test]
    fn single_byte_corruption_never_panics(index in any::<prop::sample::Index>(), byte in any::<u8>()) {
        let mut data = sample();
        let i = index.index(data.len());
        data[i] = byte;
        if let Ok(parsed) = parse_changeset(&data) {
            // Whatever parses must be representable again.
            let _ = encode_changeset(&parsed);
        }
    }

    #[test]
    fn random_block_sizes_match(block_size in 1usize..16) {
        let data = sample();
        let mut input = ChunkedInputStream::split(&data, block_size);
        let mut out = Changeset::new();
        parse_changeset_stream(&mut input, &ParserConfig::default(), &mut out).unwrap();
        prop_assert_eq!(out, parse_changeset(&data).unwrap());
    }
}
