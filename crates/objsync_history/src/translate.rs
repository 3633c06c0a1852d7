//! Rewriting of provisional object keys.

use objsync_protocol::{Changeset, Payload, PrimaryKey};

/// Rewrites every provisional `(0, n)` [`GlobalKey`](objsync_protocol::GlobalKey)
/// in `changeset` to `(file_ident, n)`.
///
/// Object keys of every instruction and link targets inside payloads are
/// rewritten in place. Returns the number of keys changed.
///
/// # Panics
///
/// Panics if `file_ident` is 0.
pub fn translate_provisional_keys(changeset: &mut Changeset, file_ident: u64) -> usize {
    assert!(file_ident != 0, "cannot translate to file ident 0");

    let mut translated = 0;
    for instr in changeset.instructions_mut() {
        if let Some(object) = instr.object_mut() {
            translated += translate_key(object, file_ident);
        }
        if let Some(Payload::Link(link)) = instr.payload_mut() {
            translated += translate_key(&mut link.target, file_ident);
        }
    }
    translated
}

fn translate_key(key: &mut PrimaryKey, file_ident: u64) -> usize {
    match key {
        PrimaryKey::GlobalKey(gk) if gk.is_provisional() => {
            *gk = gk.with_hi(file_ident);
            1
        }
        _ => 0,
    }
}
