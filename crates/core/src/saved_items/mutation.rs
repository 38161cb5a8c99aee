//! Optimistic save/unsave orchestration.
//!
//! Single entry point for mutations: apply to the local cache immediately,
//! then confirm against the server store, rolling back on hard failure. A
//! guest (unresolved identity) is never blocked — the optimistic local state
//! is final for them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{debug, warn};

use crate::errors::{Error, Result};
use crate::saved_items::cache::LocalCacheStore;
use crate::saved_items::identity::IdentityResolver;
use crate::saved_items::model::{
    EntityKind, MutationOutcome, ResolvedIdentity, SavedItemKey, SavedItemRecord,
};
use crate::saved_items::notifier::ChangeNotifier;
use crate::saved_items::store::SavedItemsStoreTrait;

/// Net state a mutation wants for its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DesiredState {
    Saved,
    Removed,
}

/// Book-keeping for a key with a server call pending.
///
/// `prior` is the kind's cache list before the first optimistic apply of the
/// episode; rollback restores it. `generation` bumps every time an inverse
/// action supersedes the pending one, so a completion for a superseded
/// desired state can be recognized as stale and discarded.
struct InFlight {
    desired: DesiredState,
    generation: u64,
    prior: Vec<SavedItemRecord>,
    record: Option<SavedItemRecord>,
}

/// Orchestrates optimistic local apply plus remote confirm/rollback.
///
/// One instance per client session; all mounted surfaces mutate through it.
pub struct MutationController {
    cache: Arc<LocalCacheStore>,
    store: Arc<dyn SavedItemsStoreTrait>,
    resolver: IdentityResolver,
    notifier: Arc<ChangeNotifier>,
    in_flight: Mutex<HashMap<SavedItemKey, InFlight>>,
}

impl MutationController {
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
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Save `record` for the owner behind `owner_ref`.
    ///
    /// Returns `Coalesced` when the action folded into one already in flight
    /// for the same key; the call that opened the episode settles the net
    /// effect.
    pub async fn save(&self, owner_ref: &str, record: SavedItemRecord) -> Result<MutationOutcome> {
        let key = record.key();
        self.mutate(owner_ref, key, DesiredState::Saved, Some(record))
            .await
    }

    /// Remove the saved item for `key`, for the owner behind `owner_ref`.
    ///
    /// Removal is idempotent end to end: a key absent locally and remotely
    /// still settles as success.
    pub async fn unsave(&self, owner_ref: &str, key: SavedItemKey) -> Result<MutationOutcome> {
        self.mutate(owner_ref, key, DesiredState::Removed, None).await
    }

    async fn mutate(
        &self,
        owner_ref: &str,
        key: SavedItemKey,
        desired: DesiredState,
        record: Option<SavedItemRecord>,
    ) -> Result<MutationOutcome> {
        {
            let mut in_flight = self.in_flight.lock().unwrap();
            if let Some(entry) = in_flight.get_mut(&key) {
                if entry.desired == desired {
                    // Repeated identical action: already on its way.
                    return Ok(MutationOutcome::Coalesced);
                }
                // Inverse action supersedes the pending one; only the net
                // effect is eventually sent.
                entry.desired = desired;
                entry.generation += 1;
                if record.is_some() {
                    entry.record = record.clone();
                }
                self.apply_local(desired, &key, record);
                debug!(
                    "Superseded in-flight action for {}/{}",
                    key.entity_kind.as_str(),
                    key.external_key
                );
                return Ok(MutationOutcome::Coalesced);
            }

            let prior = self.cache.read(key.entity_kind);
            self.apply_local(desired, &key, record.clone());
            in_flight.insert(
                key.clone(),
                InFlight {
                    desired,
                    generation: 0,
                    prior,
                    record,
                },
            );
        }

        // Only this call drives the entry to a settled state. If the caller
        // drops the future mid-settle, the guard clears the entry and rolls
        // the cache back so the key is not wedged for later actions. On
        // normal completion the entry is already gone and the guard is a
        // no-op.
        let _guard = SettleGuard {
            controller: self,
            key: key.clone(),
        };
        self.settle(owner_ref, key).await
    }

    fn apply_local(
        &self,
        desired: DesiredState,
        key: &SavedItemKey,
        record: Option<SavedItemRecord>,
    ) {
        match desired {
            DesiredState::Saved => {
                if let Some(record) = record {
                    self.cache.apply_add(record);
                }
            }
            DesiredState::Removed => self.cache.apply_remove(key),
        }
    }

    /// Drive the in-flight entry for `key` to a settled state.
    ///
    /// Only the call that created the entry runs this. A completion whose
    /// generation no longer matches the entry is discarded and the loop
    /// re-issues the now-current desired state.
    async fn settle(&self, owner_ref: &str, key: SavedItemKey) -> Result<MutationOutcome> {
        loop {
            let (desired, generation, record) = {
                let in_flight = self.in_flight.lock().unwrap();
                match in_flight.get(&key) {
                    Some(entry) => (entry.desired, entry.generation, entry.record.clone()),
                    // Entry gone means the episode already settled.
                    None => return Ok(MutationOutcome::Confirmed),
                }
            };

            let resolved = self.resolver.resolve(owner_ref).await;

            let identity = match resolved {
                Ok(ResolvedIdentity::Resolved(identity)) => identity,
                Ok(ResolvedIdentity::Unresolved) => {
                    // Guest mode: no server call, the optimistic state is
                    // final and no error is shown. Whatever the latest
                    // desired state is, the cache already reflects it.
                    self.in_flight.lock().unwrap().remove(&key);
                    self.publish(key.entity_kind);
                    return Ok(MutationOutcome::LocalOnly);
                }
                Err(e) => match self.settle_failure(&key, generation, e) {
                    Settled::Superseded => continue,
                    Settled::Failed(e) => return Err(e),
                },
            };

            let op_result = match (desired, record) {
                (DesiredState::Saved, Some(record)) => self.store.add(&identity, record).await,
                (DesiredState::Saved, None) => {
                    Err(Error::validation("save action carries no record payload"))
                }
                (DesiredState::Removed, _) => self.store.remove(&identity, &key).await,
            };

            match op_result {
                Ok(_) => {
                    let mut in_flight = self.in_flight.lock().unwrap();
                    match in_flight.get(&key) {
                        Some(entry) if entry.generation != generation => continue,
                        _ => {}
                    }
                    in_flight.remove(&key);
                    drop(in_flight);
                    self.publish(key.entity_kind);
                    return Ok(MutationOutcome::Confirmed);
                }
                Err(Error::OwnerNotFound(message)) => {
                    let mut in_flight = self.in_flight.lock().unwrap();
                    match in_flight.get(&key) {
                        Some(entry) if entry.generation != generation => continue,
                        _ => {}
                    }
                    in_flight.remove(&key);
                    drop(in_flight);
                    self.publish(key.entity_kind);
                    return match desired {
                        // Absence is already true; removal succeeded.
                        DesiredState::Removed => Ok(MutationOutcome::Confirmed),
                        // Keep the optimistic record; the next reconciliation
                        // uploads it once the account exists.
                        DesiredState::Saved => {
                            warn!(
                                "Owner not found while saving {}/{}; keeping local record: {}",
                                key.entity_kind.as_str(),
                                key.external_key,
                                message
                            );
                            Ok(MutationOutcome::AcceptedLocally)
                        }
                    };
                }
                Err(e) => match self.settle_failure(&key, generation, e) {
                    Settled::Superseded => continue,
                    Settled::Failed(e) => return Err(e),
                },
            }
        }
    }

    /// Settle a transport/validation failure: roll the cache back to the
    /// pre-action state, unless the failed attempt was superseded while
    /// airborne (then the loop keeps driving the net effect).
    fn settle_failure(&self, key: &SavedItemKey, generation: u64, error: Error) -> Settled {
        let prior = {
            let mut in_flight = self.in_flight.lock().unwrap();
            match in_flight.get(key) {
                Some(entry) if entry.generation != generation => {
                    return Settled::Superseded;
                }
                _ => {}
            }
            in_flight.remove(key).map(|entry| entry.prior)
        };

        if let Some(prior) = prior {
            self.cache.write(key.entity_kind, prior);
        }
        self.publish(key.entity_kind);
        Settled::Failed(error)
    }

    fn publish(&self, kind: EntityKind) {
        let truth = self.cache.read(kind);
        self.notifier.publish(kind, &truth);
    }
}

enum Settled {
    Superseded,
    Failed(Error),
}

struct SettleGuard<'a> {
    controller: &'a MutationController,
    key: SavedItemKey,
}

impl Drop for SettleGuard<'_> {
    fn drop(&mut self) {
        let prior = self
            .controller
            .in_flight
            .lock()
            .unwrap()
            .remove(&self.key)
            .map(|entry| entry.prior);
        if let Some(prior) = prior {
            warn!(
                "Mutation for {}/{} was dropped mid-flight; rolling back",
                self.key.entity_kind.as_str(),
                self.key.external_key
            );
            self.controller.cache.write(self.key.entity_kind, prior);
            self.controller.publish(self.key.entity_kind);
        }
    }
}
