//! Error types for the history crate.

use objsync_protocol::{BadChangesetError, EncodeError, PayloadType};
use thiserror::Error;

/// Result type for history operations.
pub type HistoryResult<T> = Result<T, HistoryError>;

/// Errors that can occur while recording or integrating changesets.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    /// A remote changeset could not be decoded. The session should treat
    /// this as a protocol violation.
    #[error("bad changeset: {0}")]
    BadChangeset(#[from] BadChangesetError),

    /// A local changeset could not be encoded.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// The instruction handler rejected a remote changeset.
    #[error("failed to apply changeset: {0}")]
    Apply(String),

    /// The table does not exist.
    #[error("no such table: {0}")]
    NoSuchTable(String),

    /// A table with this name already exists.
    #[error("table already exists: {0}")]
    TableExists(String),

    /// The column does not exist.
    #[error("no such column: {table}.{column}")]
    NoSuchColumn {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// A column with this name already exists.
    #[error("column already exists: {table}.{column}")]
    ColumnExists {
        /// Table name.
        table: String,
        /// Column name.
        column: String,
    },

    /// Objects of embedded tables can only be reached through their parent.
    #[error("table {0} is embedded")]
    EmbeddedTable(String),

    /// An object without a primary key was created in a keyed table.
    #[error("table {0} requires a primary key")]
    MissingPrimaryKey(String),

    /// The primary key does not match the table's primary key type.
    #[error("primary key mismatch in {table}: expected {expected:?}, got {actual:?}")]
    PrimaryKeyMismatch {
        /// Table name.
        table: String,
        /// Type declared by the table.
        expected: PayloadType,
        /// Type supplied.
        actual: PayloadType,
    },

    /// The field path does not fit the operation, e.g. a list operation
    /// without a trailing index.
    #[error("invalid path: {0}")]
    InvalidPath(String),

    /// Uploading requires the server-assigned file ident.
    #[error("client file ident has not been assigned")]
    FileIdentNotAssigned,
}

impl HistoryError {
    /// Returns true if the error means the remote peer violated the protocol.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, HistoryError::BadChangeset(_))
    }
}
