//! Object ID allocation for tables without a primary key.

use objsync_protocol::GlobalKey;
use std::collections::HashMap;

/// Allocation state of a single table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TableIdState {
    /// No object has been created in the table by this peer.
    #[default]
    NoLocalObjectsYet,
    /// Objects were created before the file ident was known. Their keys are
    /// provisional and will be rewritten on finalization.
    AssigningSequentialIds,
    /// The file ident is known and keys are issued with it directly.
    IdsFinalized,
}

#[derive(Debug, Clone, Default)]
struct TableSequence {
    next: u64,
    state: TableIdState,
}

/// Issues [`GlobalKey`]s for objects created locally in un-keyed tables.
///
/// Keys are `(file_ident, n)` with `n` counting up from zero per table. Until
/// the server assigns a file ident the `hi` half is zero.
#[derive(Debug, Clone, Default)]
pub struct ObjectIdAllocator {
    file_ident: u64,
    tables: HashMap<String, TableSequence>,
}

impl ObjectIdAllocator {
    /// Creates an allocator without a file ident.
    pub fn new() -> Self {
        Self::default()
    }

    /// The client file ident, or 0 while it has not been assigned.
    pub fn client_file_ident(&self) -> u64 {
        self.file_ident
    }

    /// Returns true once the file ident is known.
    pub fn is_finalized(&self) -> bool {
        self.file_ident != 0
    }

    /// Allocation state of a table.
    pub fn state(&self, table: &str) -> TableIdState {
        self.tables
            .get(table)
            .map(|seq| seq.state)
            .unwrap_or_default()
    }

    /// Issues the next key for `table`.
    pub fn allocate(&mut self, table: &str) -> GlobalKey {
        let finalized = self.is_finalized();
        let seq = self.tables.entry(table.to_owned()).or_default();
        let key = GlobalKey::new(self.file_ident, seq.next);
        seq.next += 1;
        seq.state = if finalized {
            TableIdState::IdsFinalized
        } else {
            TableIdState::AssigningSequentialIds
        };
        key
    }

    /// Forgets the sequence of an erased table.
    pub fn forget_table(&mut self, table: &str) {
        self.tables.remove(table);
    }

    /// Records the server-assigned file ident.
    ///
    /// # Panics
    ///
    /// Panics if `file_ident` is 0 or if an ident was already set.
    pub fn set_client_file_ident(&mut self, file_ident: u64) {
        assert!(file_ident != 0, "client file ident must be non-zero");
        assert!(
            self.file_ident == 0,
            "client file ident already set to {} (attempted {})",
            self.file_ident,
            file_ident
        );
        self.file_ident = file_ident;
        for seq in self.tables.values_mut() {
            if seq.state == TableIdState::AssigningSequentialIds {
                seq.state = TableIdState::IdsFinalized;
            }
        }
    }
}
