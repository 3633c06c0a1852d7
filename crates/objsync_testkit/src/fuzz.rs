//! Fuzz testing harnesses for the changeset wire format.
//!
//! Each target takes arbitrary bytes and must never panic. They can be
//! driven by cargo-fuzz or by the seeded loops in this module's tests.

use crate::tracker::ObjectTracker;
use bytes::Bytes;
use objsync_codec::{decode_int, encode_int};
use objsync_history::ClientHistory;
use objsync_protocol::{
    encode_changeset, encode_primary_key_base64, parse_base64_encoded_primary_key,
    parse_changeset, parse_changeset_stream, Changeset, ChunkedInputStream, ParserConfig,
};

/// Fuzz target for the changeset parser.
///
/// Arbitrary input either parses or yields a `BadChangesetError`.
pub fn fuzz_parse(data: &[u8]) {
    let _ = parse_changeset(data);
}

/// Fuzz target for parse, encode, reparse.
///
/// Anything the parser accepts and the encoder can write must reparse to
/// an equal changeset.
pub fn fuzz_roundtrip(data: &[u8]) {
    let Ok(parsed) = parse_changeset(data) else {
        return;
    };
    // The parser accepts schema instructions the encoder refuses to write.
    let Ok(encoded) = encode_changeset(&parsed) else {
        return;
    };
    let reparsed = parse_changeset(&encoded).expect("encoder output must parse");
    assert_eq!(parsed, reparsed, "roundtrip mismatch");
}

/// Fuzz target for block boundaries.
///
/// The first byte picks a block size; the rest is parsed both whole and
/// split into blocks of that size. Outcomes must agree.
pub fn fuzz_stream_split(data: &[u8]) {
    let Some((&first, rest)) = data.split_first() else {
        return;
    };
    let block_size = usize::from(first % 16) + 1;

    let whole = parse_changeset(rest);
    let mut input = ChunkedInputStream::split(rest, block_size);
    let mut split = Changeset::new();
    let streamed = parse_changeset_stream(&mut input, &ParserConfig::default(), &mut split);

    match (whole, streamed) {
        (Ok(whole), Ok(())) => assert_eq!(whole, split, "block size {block_size}"),
        (Err(a), Err(b)) => assert_eq!(a, b, "block size {block_size}"),
        (a, b) => panic!("block size {block_size}: whole {a:?}, streamed {b:?}"),
    }
}

/// Fuzz target for the varint decoder.
///
/// Decoded values re-encode canonically and decode to the same value.
pub fn fuzz_varint(data: &[u8]) {
    let mut source = data;
    let Ok(value) = decode_int::<i64, _>(&mut source) else {
        return;
    };
    let mut out = Vec::new();
    encode_int(&mut out, value);
    let mut again = out.as_slice();
    assert_eq!(decode_int::<i64, _>(&mut again).ok(), Some(value));
    assert!(again.is_empty());
}

/// Fuzz target for base64 primary keys.
pub fn fuzz_base64_primary_key(data: &[u8]) {
    let text = String::from_utf8_lossy(data);
    if let Ok(key) = parse_base64_encoded_primary_key(&text) {
        let encoded = encode_primary_key_base64(&key);
        assert_eq!(parse_base64_encoded_primary_key(&encoded).ok(), Some(key));
    }
}

/// Fuzz target for integrating remote changesets.
///
/// Arbitrary input is integrated into a fresh history through an
/// [`ObjectTracker`]. A rejected changeset must not bump the remote
/// version.
pub fn fuzz_integrate(data: &[u8]) {
    let history = ClientHistory::default();
    let mut tracker = ObjectTracker::new();
    match history.integrate_remote(data, &mut tracker) {
        Ok(_) => assert_eq!(history.remote_version(), 1),
        Err(_) => assert_eq!(history.remote_version(), 0),
    }
}

/// Runs every target on one input.
pub fn fuzz_all(data: &[u8]) {
    fuzz_parse(data);
    fuzz_roundtrip(data);
    fuzz_stream_split(data);
    fuzz_varint(data);
    fuzz_base64_primary_key(data);
    fuzz_integrate(data);
}

/// Splits a valid encoding into blocks of every size up to `max_block`
/// and checks each split parses to `expected`.
pub fn check_all_splits(expected: &Changeset, max_block: usize) {
    let bytes = encode_changeset(expected).expect("fixture must encode");
    for block_size in 1..=max_block {
        let blocks: Vec<Bytes> = bytes
            .chunks(block_size)
            .map(Bytes::copy_from_slice)
            .collect();
        let mut input = ChunkedInputStream::new(blocks);
        let mut out = Changeset::new();
        parse_changeset_stream(&mut input, &ParserConfig::default(), &mut out)
            .unwrap_or_else(|e| panic!("block size {block_size}: {e}"));
        assert_eq!(&out, expected, "block size {block_size}");
    }
}
