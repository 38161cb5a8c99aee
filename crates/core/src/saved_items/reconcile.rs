//! Local/remote merge on identity transitions.
//!
//! Runs when identity goes from unresolved to resolved (sign-in) or when a
//! surface needs a fresh view. Remote is authoritative once it exists, but
//! guest contributions made before login are uploaded, never discarded.

use std::collections::HashSet;
use std::sync::Arc;

use log::{debug, warn};

use crate::errors::Result;
use crate::saved_items::cache::LocalCacheStore;
use crate::saved_items::identity::IdentityResolver;
use crate::saved_items::model::{EntityKind, ResolvedIdentity, SavedItemRecord};
use crate::saved_items::notifier::ChangeNotifier;
use crate::saved_items::store::SavedItemsStoreTrait;

/// Merges local and remote saved-item sets into one truth.
pub struct Reconciler {
    cache: Arc<LocalCacheStore>,
    store: Arc<dyn SavedItemsStoreTrait>,
    resolver: IdentityResolver,
    notifier: Arc<ChangeNotifier>,
}

impl Reconciler {
    pub fn new(
        cache: Arc<LocalCacheStore>,
        store: Arc<dyn SavedItemsStoreTrait>,
        resolver: IdentityResolver,
        notifier: Arc<ChangeNotifier>,
    ) -> Self {
        Self {
            cache,
            store,
            resolver,
            notifier,
        }
    }

    /// Reconcile one entity kind and return the resulting truth.
    ///
    /// Unresolved identity leaves the local cache untouched. With a resolved
    /// identity, local records absent from the remote set are uploaded via
    /// the idempotent `add`; records that fail to upload stay in the local
    /// cache so the next reconciliation retries them.
    pub async fn reconcile(&self, owner_ref: &str, kind: EntityKind) -> Result<Vec<SavedItemRecord>> {
        let local = self.cache.read(kind);

        let identity = match self.resolver.resolve(owner_ref).await? {
            ResolvedIdentity::Resolved(identity) => identity,
            ResolvedIdentity::Unresolved => {
                // Guest mode: local is the truth, unchanged.
                self.notifier.publish(kind, &local);
                return Ok(local);
            }
        };

        let remote = self.store.list(&identity, kind).await?;

        if local.is_empty() {
            self.cache.write(kind, remote.clone());
            self.notifier.publish(kind, &remote);
            return Ok(remote);
        }

        let remote_keys: HashSet<_> = remote.iter().map(SavedItemRecord::key).collect();
        let mut truth = remote;
        let mut retained_failures = Vec::new();

        // Guest contributions made before login: upload everything the
        // server does not have yet.
        for record in local {
            if remote_keys.contains(&record.key()) {
                continue;
            }
            match self.store.add(&identity, record.clone()).await {
                Ok(_) => {
                    debug!(
                        "Uploaded guest saved item {}/{}",
                        kind.as_str(),
                        record.external_key
                    );
                    truth.insert(0, record);
                }
                Err(e) => {
                    warn!(
                        "Failed to upload guest saved item {}/{}; retained for retry: {}",
                        kind.as_str(),
                        record.external_key,
                        e
                    );
                    retained_failures.push(record);
                }
            }
        }

        // Failed uploads stay cached ahead of the merged truth so they are
        // never silently dropped.
        let mut cached = retained_failures;
        cached.extend(truth.iter().cloned());
        self.cache.write(kind, cached);

        self.notifier.publish(kind, &truth);
        Ok(truth)
    }

    /// Reconcile every entity kind. A failure on one kind is logged and does
    /// not abort the others.
    pub async fn reconcile_all(&self, owner_ref: &str) -> Vec<(EntityKind, Result<Vec<SavedItemRecord>>)> {
        let mut results = Vec::with_capacity(EntityKind::ALL.len());
        for kind in EntityKind::ALL {
            let result = self.reconcile(owner_ref, kind).await;
            if let Err(e) = &result {
                warn!("Reconciliation failed for {}: {}", kind.as_str(), e);
            }
            results.push((kind, result));
        }
        results
    }
}
