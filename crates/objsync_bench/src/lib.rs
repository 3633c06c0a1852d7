//! Benchmark utilities.

#![deny(unsafe_code)]

use objsync_protocol::{
    Changeset, CreateObject, GlobalKey, Link, Path, PathInstruction, Payload, PrimaryKey, Update,
};
use rand::Rng;

/// Generate random data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate a changeset of `objects` creations in one table, each followed
/// by a string update, an integer update and a link to a random earlier
/// object.
pub fn random_changeset(objects: usize, string_len: usize) -> Changeset {
    let mut rng = rand::thread_rng();
    let mut cs = Changeset::new();
    let table = cs.intern_string("Item");
    let name = cs.intern_string("name");
    let count = cs.intern_string("count");
    let parent = cs.intern_string("parent");

    for i in 0..objects as u64 {
        let object = PrimaryKey::GlobalKey(GlobalKey::new(0, i));
        cs.push_back(CreateObject {
            table,
            object: object.clone(),
        });

        let text: String = (0..string_len)
            .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
            .collect();
        let text = cs.append_string(&text);
        cs.push_back(Update::new(
            PathInstruction::new(table, object.clone(), name),
            Payload::String(text),
        ));
        cs.push_back(Update::new(
            PathInstruction::new(table, object.clone(), count),
            Payload::Int(rng.gen()),
        ));
        let target = PrimaryKey::GlobalKey(GlobalKey::new(0, rng.gen_range(0..=i)));
        cs.push_back(Update::new(
            PathInstruction::new(table, object, parent),
            Payload::Link(Link {
                target_table: table,
                target,
            }),
        ));
    }
    cs
}

/// Generate a changeset of updates with `depth`-deep paths drawn from a
/// pool of `distinct` field names, stressing the intern table.
pub fn deep_path_changeset(updates: usize, depth: usize, distinct: usize) -> Changeset {
    let mut rng = rand::thread_rng();
    let mut cs = Changeset::new();
    let table = cs.intern_string("Doc");
    let root = cs.intern_string("root");
    let names: Vec<String> = (0..distinct.max(1)).map(|i| format!("field_{i}")).collect();

    for _ in 0..updates {
        let mut path = Path::new();
        for _ in 0..depth {
            let name = &names[rng.gen_range(0..names.len())];
            path.push(cs.intern_string(name));
        }
        cs.push_back(Update::new(
            PathInstruction::new(table, PrimaryKey::Int(1), root).with_path(path),
            Payload::Double(rng.gen()),
        ));
    }
    cs
}

/// Generate random signed integers spread over every varint length.
pub fn random_varints(count: usize) -> Vec<i64> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            let bits = rng.gen_range(0..64);
            rng.gen::<i64>() >> bits
        })
        .collect()
}
