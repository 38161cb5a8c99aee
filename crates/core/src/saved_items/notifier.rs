//! In-process change notification.
//!
//! Every mounted surface subscribes per entity kind and receives the new
//! truth synchronously after each settled mutation or reconciliation, so all
//! surfaces converge without independent polling.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::saved_items::model::{EntityKind, SavedItemRecord};

/// Handle returned by `subscribe`, used to deregister.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&[SavedItemRecord]) + Send + Sync>;

/// Process-local pub/sub keyed by entity kind.
#[derive(Default)]
pub struct ChangeNotifier {
    next_id: AtomicU64,
    subscribers: Mutex<HashMap<EntityKind, Vec<(SubscriptionId, Handler)>>>,
}

impl ChangeNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `kind`. Handlers are invoked synchronously, in
    /// subscription order, with the new truth.
    pub fn subscribe(
        &self,
        kind: EntityKind,
        handler: impl Fn(&[SavedItemRecord]) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push((id, Arc::new(handler) as Handler));
        id
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut subscribers = self.subscribers.lock().unwrap();
        for handlers in subscribers.values_mut() {
            handlers.retain(|(existing, _)| *existing != id);
        }
    }

    /// Broadcast `truth` to every subscriber of `kind`.
    ///
    /// The subscriber list is snapshotted before invocation, so handlers may
    /// call `subscribe` or `unsubscribe` without deadlocking. A handler removed
    /// mid-publish can still see the broadcast that was already underway.
    pub fn publish(&self, kind: EntityKind, truth: &[SavedItemRecord]) {
        let handlers: Vec<Handler> = {
            let subscribers = self.subscribers.lock().unwrap();
            subscribers
                .get(&kind)
                .map(|handlers| handlers.iter().map(|(_, handler)| handler.clone()).collect())
                .unwrap_or_default()
        };
        for handler in handlers {
            handler(truth);
        }
    }
}
