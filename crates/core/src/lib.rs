//! Core domain logic for studyshelf saved items.
//!
//! Embedded library, one instance per client session: local cache, identity
//! resolution, optimistic mutation with rollback, reconciliation, and
//! in-process change notification. The remote HTTP contract lives in
//! `studyshelf-remote`; cache persistence in `studyshelf-storage-sqlite`.

pub mod errors;
pub mod saved_items;

pub use errors::{Error, Result};
