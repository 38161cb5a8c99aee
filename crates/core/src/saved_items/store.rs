//! Server-side saved-items contract.

use async_trait::async_trait;

use crate::errors::Result;
use crate::saved_items::model::{EntityKind, OwnerIdentity, SavedItemKey, SavedItemRecord};

/// Authoritative per-account saved-items collection.
///
/// `add` and `remove` are idempotent set operations: re-adding a present
/// `(entity_kind, external_key)` and removing an absent one both succeed with
/// the set unchanged. That idempotency is the concurrency-safety mechanism —
/// concurrent adds from racing tabs converge without coordination.
///
/// Errors: `OwnerNotFound` when the identity does not resolve server-side,
/// `Transport` for unreachable/timed-out calls, `Validation` for malformed
/// records.
#[async_trait]
pub trait SavedItemsStoreTrait: Send + Sync {
    async fn list(&self, identity: &OwnerIdentity, kind: EntityKind)
        -> Result<Vec<SavedItemRecord>>;

    async fn add(
        &self,
        identity: &OwnerIdentity,
        record: SavedItemRecord,
    ) -> Result<Vec<SavedItemRecord>>;

    async fn remove(
        &self,
        identity: &OwnerIdentity,
        key: &SavedItemKey,
    ) -> Result<Vec<SavedItemRecord>>;
}
