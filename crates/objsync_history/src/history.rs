//! Client-side history of local changesets.

use crate::allocator::ObjectIdAllocator;
use crate::config::HistoryConfig;
use crate::error::{HistoryError, HistoryResult};
use crate::schema::Schema;
use crate::transaction::WriteTransaction;
use crate::translate::translate_provisional_keys;
use objsync_protocol::{
    apply_changeset, encode_changeset, parse_changeset_with, Changeset, InstructionHandler,
};
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::fmt;
use tracing::{debug, info, warn};

/// State guarded by the history lock.
#[derive(Debug, Default)]
pub(crate) struct HistoryState {
    pub(crate) schema: Schema,
    pub(crate) allocator: ObjectIdAllocator,
    /// Version of the latest local changeset.
    pub(crate) version: u64,
    /// Number of remote changesets integrated.
    pub(crate) remote_version: u64,
    /// Local changesets not yet acknowledged by the server, oldest first.
    pub(crate) pending: VecDeque<Changeset>,
}

/// A local changeset ready for upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadChangeset {
    /// Local version the changeset produced.
    pub version: u64,
    /// Remote version the changeset was based on.
    pub last_integrated_remote_version: u64,
    /// Milliseconds since the epoch when the changeset was committed.
    pub origin_timestamp: u64,
    /// Encoded changeset.
    pub data: Vec<u8>,
}

/// The local history of a synchronized file.
///
/// Local writes go through [`begin_write`](Self::begin_write) and are kept
/// until the server acknowledges them. Remote changesets are decoded and
/// replayed through [`integrate_remote`](Self::integrate_remote).
///
/// # Thread Safety
///
/// All state sits behind one lock. Key translation on
/// [`set_client_file_ident`](Self::set_client_file_ident) runs under the
/// write lock, so an uploader sees each changeset either entirely before or
/// entirely after translation.
pub struct ClientHistory {
    config: HistoryConfig,
    state: RwLock<HistoryState>,
}

impl ClientHistory {
    /// Creates an empty history.
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            config,
            state: RwLock::new(HistoryState::default()),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Starts a write transaction. Blocks while another transaction is open.
    pub fn begin_write(&self) -> WriteTransaction<'_> {
        WriteTransaction::new(self.state.write())
    }

    /// Version of the latest local changeset, 0 if there is none.
    pub fn version(&self) -> u64 {
        self.state.read().version
    }

    /// Number of remote changesets integrated.
    pub fn remote_version(&self) -> u64 {
        self.state.read().remote_version
    }

    /// The client file ident, 0 while it has not been assigned.
    pub fn client_file_ident(&self) -> u64 {
        self.state.read().allocator.client_file_ident()
    }

    /// A snapshot of the current schema.
    pub fn schema(&self) -> Schema {
        self.state.read().schema.clone()
    }

    /// Number of changesets awaiting acknowledgement.
    pub fn pending_count(&self) -> usize {
        self.state.read().pending.len()
    }

    /// Calls `f` with each pending changeset, oldest first.
    pub fn for_each_pending(&self, mut f: impl FnMut(&Changeset)) {
        for changeset in &self.state.read().pending {
            f(changeset);
        }
    }

    /// Records the file ident assigned by the server and rewrites every
    /// provisional key in pending changesets. Returns the number of keys
    /// rewritten.
    ///
    /// # Panics
    ///
    /// Panics if `file_ident` is 0 or if an ident was already assigned.
    pub fn set_client_file_ident(&self, file_ident: u64) -> usize {
        let mut state = self.state.write();
        state.allocator.set_client_file_ident(file_ident);

        let mut translated = 0;
        for changeset in state.pending.iter_mut() {
            translated += translate_provisional_keys(changeset, file_ident);
            changeset.origin_file_ident = file_ident;
        }

        info!(
            file_ident,
            translated,
            pending = state.pending.len(),
            "client file ident assigned"
        );
        translated
    }

    /// Encodes up to `limit` pending changesets, oldest first.
    ///
    /// Fails with [`HistoryError::FileIdentNotAssigned`] before the server
    /// has assigned a file ident, since pending changesets may still hold
    /// provisional keys.
    pub fn pending_uploads(&self, limit: usize) -> HistoryResult<Vec<UploadChangeset>> {
        let state = self.state.read();
        if !state.allocator.is_finalized() {
            return Err(HistoryError::FileIdentNotAssigned);
        }

        state
            .pending
            .iter()
            .take(limit)
            .map(|changeset| -> HistoryResult<UploadChangeset> {
                Ok(UploadChangeset {
                    version: changeset.version,
                    last_integrated_remote_version: changeset.last_integrated_remote_version,
                    origin_timestamp: changeset.origin_timestamp,
                    data: encode_changeset(changeset)?,
                })
            })
            .collect()
    }

    /// Encodes the next batch of pending changesets using the configured
    /// batch size.
    pub fn next_upload_batch(&self) -> HistoryResult<Vec<UploadChangeset>> {
        self.pending_uploads(self.config.upload_batch_size)
    }

    /// Drops pending changesets with a version up to and including
    /// `version`. Returns the number dropped.
    pub fn acknowledge_up_to(&self, version: u64) -> usize {
        let mut state = self.state.write();
        let before = state.pending.len();
        while state
            .pending
            .front()
            .is_some_and(|changeset| changeset.version <= version)
        {
            state.pending.pop_front();
        }
        let acknowledged = before - state.pending.len();
        debug!(version, acknowledged, "acknowledged local changesets");
        acknowledged
    }

    /// Decodes a changeset received from the server and replays it through
    /// `handler`. Schema instructions also update the local schema once the
    /// handler has accepted the whole changeset.
    ///
    /// Returns the number of instructions applied.
    pub fn integrate_remote<H>(&self, data: &[u8], handler: &mut H) -> HistoryResult<usize>
    where
        H: InstructionHandler + ?Sized,
        H::Error: fmt::Display,
    {
        let changeset = parse_changeset_with(data, &self.config.parser)?;

        let mut state = self.state.write();
        if let Err(err) = apply_changeset(&changeset, handler) {
            warn!(
                error = %err,
                instructions = changeset.len(),
                "failed to integrate remote changeset"
            );
            return Err(HistoryError::Apply(err.to_string()));
        }
        if let Err(never) = apply_changeset(&changeset, &mut state.schema) {
            match never {}
        }
        state.remote_version += 1;

        debug!(
            remote_version = state.remote_version,
            instructions = changeset.len(),
            bytes = data.len(),
            "integrated remote changeset"
        );
        Ok(changeset.len())
    }
}

impl Default for ClientHistory {
    fn default() -> Self {
        Self::new(HistoryConfig::default())
    }
}

impl fmt::Debug for ClientHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("ClientHistory")
            .field("version", &state.version)
            .field("remote_version", &state.remote_version)
            .field("client_file_ident", &state.allocator.client_file_ident())
            .field("pending", &state.pending.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ColumnSpec, FieldPath};
    use objsync_protocol::{
        parse_changeset, CreateObject, GlobalKey, Instruction, NullInstructionHandler, PayloadType,
        PrimaryKey,
    };

    fn commit_objects(history: &ClientHistory, count: usize) {
        let mut tx = history.begin_write();
        if !tx.schema().contains_table("Dog") {
            tx.add_table("Dog").unwrap();
        }
        for _ in 0..count {
            tx.create_object("Dog").unwrap();
        }
        tx.commit().unwrap();
    }

    #[test]
    fn uploads_require_file_ident() {
        let history = ClientHistory::default();
        commit_objects(&history, 1);
        assert_eq!(
            history.pending_uploads(10),
            Err(HistoryError::FileIdentNotAssigned)
        );
    }

    #[test]
    fn finalization_translates_pending() {
        let history = ClientHistory::default();
        commit_objects(&history, 2);
        commit_objects(&history, 1);

        assert_eq!(history.set_client_file_ident(42), 3);
        assert_eq!(history.client_file_ident(), 42);

        let uploads = history.pending_uploads(10).unwrap();
        assert_eq!(uploads.len(), 2);
        assert_eq!(uploads[0].version, 1);

        let second = parse_changeset(&uploads[1].data).unwrap();
        assert_eq!(
            second.instructions()[0],
            Instruction::CreateObject(CreateObject {
                table: second.find_string("Dog").unwrap(),
                object: PrimaryKey::GlobalKey(GlobalKey::new(42, 2)),
            })
        );

        // New objects get the final ident directly.
        commit_objects(&history, 1);
        history.for_each_pending(|cs| assert_eq!(cs.origin_file_ident, 42));
    }

    #[test]
    fn acknowledge_drops_prefix() {
        let history = ClientHistory::default();
        for _ in 0..3 {
            commit_objects(&history, 1);
        }
        history.set_client_file_ident(1);

        assert_eq!(history.acknowledge_up_to(2), 2);
        assert_eq!(history.pending_count(), 1);
        assert_eq!(history.acknowledge_up_to(2), 0);
        assert_eq!(history.pending_uploads(10).unwrap()[0].version, 3);
    }

    #[test]
    fn upload_batch_size_limits() {
        let history = ClientHistory::new(HistoryConfig::new().with_upload_batch_size(2));
        for _ in 0..5 {
            commit_objects(&history, 1);
        }
        history.set_client_file_ident(9);
        assert_eq!(history.next_upload_batch().unwrap().len(), 2);
        assert_eq!(history.pending_uploads(0).unwrap().len(), 0);
    }

    #[test]
    fn remote_schema_is_tracked() {
        let server = ClientHistory::default();
        let mut tx = server.begin_write();
        tx.add_table_with_primary_key("Person", "_id", PayloadType::Int, false)
            .unwrap();
        tx.add_column("Person", "age", ColumnSpec::new(PayloadType::Int))
            .unwrap();
        tx.commit().unwrap();
        server.set_client_file_ident(1);
        let upload = server.pending_uploads(1).unwrap().remove(0);

        let client = ClientHistory::default();
        assert_eq!(
            client
                .integrate_remote(&upload.data, &mut NullInstructionHandler)
                .unwrap(),
            2
        );
        assert_eq!(client.remote_version(), 1);

        let mut tx = client.begin_write();
        let person = tx.create_object_with_primary_key("Person", 3i64).unwrap();
        tx.set(&FieldPath::new("Person", person, "age"), 30).unwrap();
        tx.commit().unwrap();
        client.for_each_pending(|cs| assert_eq!(cs.last_integrated_remote_version, 1));
    }

    #[test]
    fn malformed_remote_is_protocol_violation() {
        let history = ClientHistory::default();
        let err = history
            .integrate_remote(&[0x3f], &mut NullInstructionHandler)
            .unwrap_err();
        assert!(err.is_protocol_violation());
        assert_eq!(history.remote_version(), 0);
    }

    #[test]
    fn debug_output() {
        let history = ClientHistory::default();
        commit_objects(&history, 1);
        let text = format!("{history:?}");
        assert!(text.contains("version: 1"));
        assert!(text.contains("pending: 1"));
    }
}
