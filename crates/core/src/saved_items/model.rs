//! Saved-items domain models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Catalog entity kinds that can be bookmarked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Exam,
    Scholarship,
    Course,
}

impl EntityKind {
    /// All kinds, in the order reconciliation walks them.
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Exam,
        EntityKind::Scholarship,
        EntityKind::Course,
    ];

    /// Stable string form used as a storage key.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Exam => "exam",
            EntityKind::Scholarship => "scholarship",
            EntityKind::Course => "course",
        }
    }
}

/// Denormalized display data carried with each saved item so surfaces can
/// render offline without a catalog lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayFields {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
}

/// A user-curated bookmark referencing a catalog entity by stable key.
///
/// Unique per `(owner, entity_kind, external_key)`; set semantics everywhere.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedItemRecord {
    pub entity_kind: EntityKind,
    pub external_key: String,
    pub display: DisplayFields,
    pub added_at: DateTime<Utc>,
}

impl SavedItemRecord {
    pub fn new(entity_kind: EntityKind, external_key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            entity_kind,
            external_key: external_key.into(),
            display: DisplayFields {
                name: name.into(),
                labels: Vec::new(),
            },
            added_at: Utc::now(),
        }
    }

    pub fn key(&self) -> SavedItemKey {
        SavedItemKey {
            entity_kind: self.entity_kind,
            external_key: self.external_key.clone(),
        }
    }
}

/// Identity of a saved item within one owner's collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedItemKey {
    pub entity_kind: EntityKind,
    pub external_key: String,
}

impl SavedItemKey {
    pub fn new(entity_kind: EntityKind, external_key: impl Into<String>) -> Self {
        Self {
            entity_kind,
            external_key: external_key.into(),
        }
    }
}

/// Account context owning a saved-items collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "mode")]
pub enum OwnerIdentity {
    /// No account yet; items live only in the device cache.
    Local,
    /// Resolved account. `native_id` is the storage primary key;
    /// `external_auth_id` is the opaque token issued by the auth provider.
    Remote {
        native_id: String,
        external_auth_id: String,
    },
}

impl OwnerIdentity {
    pub fn remote(native_id: impl Into<String>, external_auth_id: impl Into<String>) -> Self {
        Self::Remote {
            native_id: native_id.into(),
            external_auth_id: external_auth_id.into(),
        }
    }

    pub fn native_id(&self) -> Option<&str> {
        match self {
            Self::Local => None,
            Self::Remote { native_id, .. } => Some(native_id),
        }
    }
}

/// Outcome of an identity resolution attempt.
///
/// `Unresolved` is an expected, recoverable state (e.g. a page load right
/// after sign-up, before account propagation) — callers switch to local-only
/// mode rather than treating it as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedIdentity {
    Resolved(OwnerIdentity),
    Unresolved,
}

impl ResolvedIdentity {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }
}

/// How a save/unsave action settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOutcome {
    /// Server acknowledged the mutation.
    Confirmed,
    /// Identity unresolved; the optimistic local state is final (guest mode).
    LocalOnly,
    /// Add hit `OwnerNotFound`; the optimistic record is kept locally.
    AcceptedLocally,
    /// Folded into an action already in flight for the same key.
    Coalesced,
}
