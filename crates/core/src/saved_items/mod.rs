//! Saved-items domain models and services.

mod cache;
mod identity;
mod model;
mod mutation;
mod notifier;
mod reconcile;
mod store;

pub use cache::*;
pub use identity::*;
pub use model::*;
pub use mutation::*;
pub use notifier::*;
pub use reconcile::*;
pub use store::*;
