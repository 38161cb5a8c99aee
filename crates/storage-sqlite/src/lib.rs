//! SQLite persistence for the studyshelf saved-items cache.
//!
//! Implements the core crate's `CachePersistence` seam: one serialized
//! record list per entity kind, replaced atomically on every write.

pub mod db;
pub mod errors;
pub mod saved_items;

mod schema;

pub use db::{create_pool, get_connection, DbPool};
pub use errors::StorageError;
pub use saved_items::SavedItemsCacheRepository;
