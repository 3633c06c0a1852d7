//! String interning.
//!
//! Table names, field names and string primary keys repeat across the
//! instructions of a changeset. Each distinct string is stored once and
//! instructions refer to it by a dense [`InternString`] index.

use crate::error::BadChangesetError;
use std::collections::HashMap;
use std::fmt;

/// Reference to an interned string within one changeset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InternString(pub u32);

impl InternString {
    /// Returns the raw index.
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for InternString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A range of the changeset's payload buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StringBufferRange {
    /// Byte offset into the buffer.
    pub offset: u32,
    /// Length in bytes.
    pub size: u32,
}

impl StringBufferRange {
    /// Creates a range.
    pub fn new(offset: u32, size: u32) -> Self {
        Self { offset, size }
    }

    /// One past the last byte, widened so it cannot overflow.
    pub fn end(self) -> u64 {
        u64::from(self.offset) + u64::from(self.size)
    }
}

/// Dense table of unique strings.
///
/// IDs are assigned from 0 in first-seen order. Interning the same content
/// twice returns the same ID.
#[derive(Debug, Clone, Default)]
pub struct InternTable {
    strings: Vec<String>,
    lookup: HashMap<String, InternString>,
}

impl InternTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns `s`, returning the existing ID if the content is known.
    pub fn intern(&mut self, s: &str) -> InternString {
        if let Some(&id) = self.lookup.get(s) {
            return id;
        }
        let id = InternString(self.next_index());
        self.strings.push(s.to_owned());
        self.lookup.insert(s.to_owned(), id);
        id
    }

    /// Declares a string received from the wire at an explicit index.
    ///
    /// Content is checked before the index so that the two kinds of
    /// duplicates are reported distinctly.
    pub fn declare(&mut self, index: u32, s: &str) -> Result<InternString, BadChangesetError> {
        if self.lookup.contains_key(s) {
            return Err(BadChangesetError::new("Unexpected intern string"));
        }
        if index != self.next_index() {
            return Err(BadChangesetError::new("Unexpected intern index"));
        }
        Ok(self.intern(s))
    }

    /// Looks up the ID of `s` without interning it.
    pub fn find(&self, s: &str) -> Option<InternString> {
        self.lookup.get(s).copied()
    }

    /// Returns the string for `id`.
    pub fn get(&self, id: InternString) -> Option<&str> {
        self.strings.get(id.0 as usize).map(String::as_str)
    }

    /// Returns true if `id` has been assigned.
    pub fn contains(&self, id: InternString) -> bool {
        (id.0 as usize) < self.strings.len()
    }

    /// Number of interned strings.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Returns true if nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    /// Iterates over `(id, string)` in ID order.
    pub fn iter(&self) -> impl Iterator<Item = (InternString, &str)> {
        self.strings
            .iter()
            .enumerate()
            .map(|(i, s)| (InternString(i as u32), s.as_str()))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn next_index(&self) -> u32 {
        self.strings.len() as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_idempotent() {
        let mut table = InternTable::new();
        let a = table.intern("Program");
        let b = table.intern("Program");
        let c = table.intern("Program");
        assert_eq!(a, b);
        assert_eq!(b, c);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn ids_are_dense_in_first_seen_order() {
        let mut table = InternTable::new();
        assert_eq!(table.intern("a"), InternString(0));
        assert_eq!(table.intern("b"), InternString(1));
        assert_eq!(table.intern("a"), InternString(0));
        assert_eq!(table.intern("c"), InternString(2));
        assert_eq!(table.get(InternString(1)), Some("b"));
        assert_eq!(table.get(InternString(3)), None);
    }

    #[test]
    fn declare_requires_next_index() {
        let mut table = InternTable::new();
        table.declare(0, "x").unwrap();
        let err = table.declare(2, "y").unwrap_err();
        assert_eq!(err.message(), "Unexpected intern index");
        let err = table.declare(0, "z").unwrap_err();
        assert_eq!(err.message(), "Unexpected intern index");
        table.declare(1, "y").unwrap();
    }

    #[test]
    fn declare_rejects_duplicate_content() {
        let mut table = InternTable::new();
        table.declare(0, "Café").unwrap();
        let err = table.declare(1, "Café").unwrap_err();
        assert_eq!(err.message(), "Unexpected intern string");
    }

    #[test]
    fn duplicate_content_reported_before_index() {
        let mut table = InternTable::new();
        table.declare(0, "x").unwrap();
        let err = table.declare(0, "x").unwrap_err();
        assert_eq!(err.message(), "Unexpected intern string");
    }
}
