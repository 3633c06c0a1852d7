//! # objsync Protocol
//!
//! Changeset instruction model and wire format for objsync.
//!
//! This crate provides:
//! - [`Instruction`], a closed set of object-level mutations
//! - [`Changeset`], a batch of instructions with its intern table and payload buffer
//! - [`encode_changeset`] and the streaming [`parse_changeset_stream`]
//! - [`GlobalKey`], the cross-peer object identifier
//! - [`InstructionHandler`] for replaying changesets against storage
//!
//! This is a pure protocol crate with no I/O operations.
//!
//! ## Example
//!
//! ```
//! use objsync_protocol::{
//!     encode_changeset, parse_changeset, Changeset, CreateObject, PrimaryKey,
//! };
//!
//! let mut changeset = Changeset::new();
//! let table = changeset.intern_string("Foo");
//! changeset.push_back(CreateObject { table, object: PrimaryKey::Int(123) });
//!
//! let bytes = encode_changeset(&changeset).unwrap();
//! assert_eq!(parse_changeset(&bytes).unwrap(), changeset);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod changeset;
mod encoder;
mod error;
mod global_key;
mod handler;
mod instruction;
mod intern;
mod parser;
mod path;
mod payload;
mod primary_key;
mod value;

pub use changeset::Changeset;
pub use encoder::{encode_changeset, ChangesetEncoder};
pub use error::{BadChangesetError, EncodeError, EncodeResult, ParseResult};
pub use global_key::{GlobalKey, ParseGlobalKeyError};
pub use handler::{apply_changeset, InstructionHandler, NullInstructionHandler};
pub use instruction::{
    AddColumn, AddInteger, AddTable, ArrayErase, ArrayInsert, ArrayMove, Clear, CollectionType,
    CreateObject, EraseColumn, EraseObject, EraseTable, Instruction, InstructionType,
    PathInstruction, SetErase, SetInsert, TableType, Update,
};
pub use intern::{InternString, InternTable, StringBufferRange};
pub use parser::{
    parse_changeset, parse_changeset_stream, parse_changeset_with, BytesInputStream,
    ChunkedInputStream, InputStream, ParserConfig, MAX_BINARY_SIZE, MAX_STRING_SIZE,
};
pub use path::{Path, PathElement};
pub use payload::{Link, Payload, PayloadType};
pub use primary_key::{
    encode_primary_key_base64, parse_base64_encoded_primary_key, PrimaryKey, PrimaryKeyValue,
};
pub use value::{Decimal128, ObjectId, Timestamp};
