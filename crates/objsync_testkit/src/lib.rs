//! # objsync Testkit
//!
//! Test utilities for objsync.
//!
//! This crate provides:
//! - Sample changesets covering every instruction and payload kind
//! - Property-based generators for keys, values, paths and whole changesets
//! - An in-memory [`ObjectTracker`] that replays changesets as object state
//! - Fuzz harnesses for the parser, the varint codec and base64 keys
//! - Cross-implementation test vectors
//!
//! ## Usage
//!
//! ```rust
//! use objsync_testkit::prelude::*;
//! use objsync_protocol::{encode_changeset, parse_changeset};
//!
//! let cs = every_instruction_changeset();
//! let bytes = encode_changeset(&cs).unwrap();
//! assert_eq!(parse_changeset(&bytes).unwrap(), cs);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod fuzz;
pub mod generators;
pub mod tracker;
pub mod vectors;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::fuzz::*;
    pub use crate::generators::*;
    pub use crate::tracker::*;
    pub use crate::vectors::*;
}

pub use fixtures::*;
pub use fuzz::*;
pub use generators::*;
pub use tracker::*;
pub use vectors::*;
