//! # objsync History
//!
//! Client-side replication for objsync.
//!
//! This crate provides:
//! - [`WriteTransaction`], which records local writes as a changeset
//! - [`ClientHistory`], which keeps local changesets until acknowledged and
//!   integrates remote ones
//! - [`ObjectIdAllocator`], which issues [`GlobalKey`](objsync_protocol::GlobalKey)s
//!   for objects of tables without a primary key
//! - [`translate_provisional_keys`], which rewrites provisional keys once the
//!   server assigns a file ident
//!
//! ## Key Invariants
//!
//! - A committed changeset is appended whole or not at all
//! - Un-keyed objects get `(file_ident, n)` with `n` counting per table
//! - Keys allocated before the file ident is known are `(0, n)` and are
//!   rewritten in every pending changeset exactly once
//! - Each history owns its counters; histories in one process never share them
//!
//! ## Example
//!
//! ```
//! use objsync_history::{ClientHistory, ColumnSpec, FieldPath, HistoryConfig};
//! use objsync_protocol::PayloadType;
//!
//! let history = ClientHistory::new(HistoryConfig::default());
//!
//! let mut tx = history.begin_write();
//! tx.add_table("Dog").unwrap();
//! tx.add_column("Dog", "name", ColumnSpec::new(PayloadType::String)).unwrap();
//! let dog = tx.create_object("Dog").unwrap();
//! tx.set(&FieldPath::new("Dog", dog, "name"), "Rex").unwrap();
//! assert_eq!(tx.commit().unwrap(), 1);
//!
//! history.set_client_file_ident(17);
//! let uploads = history.pending_uploads(10).unwrap();
//! assert_eq!(uploads.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod allocator;
mod config;
mod error;
mod history;
mod schema;
mod transaction;
mod translate;
mod value;

pub use allocator::{ObjectIdAllocator, TableIdState};
pub use config::HistoryConfig;
pub use error::{HistoryError, HistoryResult};
pub use history::{ClientHistory, UploadChangeset};
pub use schema::{ColumnSpec, Schema, TableKind, TableSchema};
pub use transaction::{FieldPath, PathStep, WriteTransaction};
pub use translate::translate_provisional_keys;
pub use value::Value;
