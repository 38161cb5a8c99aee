//! HTTP client for the studyshelf saved-items backend.
//!
//! Implements the core crate's `SavedItemsStoreTrait` and `AccountDirectory`
//! seams over the REST API. Transport/schema details stay behind those
//! contracts.

mod client;
mod error;
mod types;

pub use client::SavedItemsClient;
pub use error::{RemoteError, Result};
pub use types::{AccountResponse, ApiErrorResponse, SavedItemsResponse};
