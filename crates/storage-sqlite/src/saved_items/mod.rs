//! SQLite storage implementation for the saved-items cache.

pub mod model;
pub mod repository;

pub use model::SavedItemsCacheDB;
pub use repository::SavedItemsCacheRepository;
