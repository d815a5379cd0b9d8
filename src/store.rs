use crate::ports::store::SubscriptionStore;
use crate::types::push::{NewSubscription, PushSubscription};

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

#[derive(Debug, Default)]
struct Rows {
    next_id: u64,
    rows: BTreeMap<u64, PushSubscription>,
}

/// Process-local subscription table. Ids grow monotonically, so iterating the
/// map yields rows in insertion order.
#[derive(Debug, Clone, Default)]
pub struct MemorySubscriptionStore {
    inner: Arc<Mutex<Rows>>,
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().expect("subscription store lock").rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SubscriptionStore for MemorySubscriptionStore {
    fn list_for_user(&self, user_id: u64) -> Vec<PushSubscription> {
        let guard = self.inner.lock().expect("subscription store lock");
        guard
            .rows
            .values()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect()
    }

    fn get(&self, id: u64) -> Option<PushSubscription> {
        let guard = self.inner.lock().expect("subscription store lock");
        guard.rows.get(&id).cloned()
    }

    fn upsert(&self, subscription: NewSubscription) -> PushSubscription {
        let mut guard = self.inner.lock().expect("subscription store lock");
        let existing = guard
            .rows
            .values_mut()
            .find(|row| row.user_id == subscription.user_id && row.endpoint == subscription.endpoint);
        if let Some(row) = existing {
            row.p256dh = subscription.p256dh;
            row.auth = subscription.auth;
            row.user_agent = subscription.user_agent;
            return row.clone();
        }

        guard.next_id += 1;
        let row = PushSubscription {
            id: guard.next_id,
            user_id: subscription.user_id,
            endpoint: subscription.endpoint,
            p256dh: subscription.p256dh,
            auth: subscription.auth,
            user_agent: subscription.user_agent,
        };
        guard.rows.insert(row.id, row.clone());
        row
    }

    fn delete(&self, id: u64) -> bool {
        let mut guard = self.inner.lock().expect("subscription store lock");
        guard.rows.remove(&id).is_some()
    }
}
