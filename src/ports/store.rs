use crate::types::push::{NewSubscription, PushSubscription};

pub trait SubscriptionStore: Clone + Send + Sync + 'static {
    /// Rows owned by `user_id`, in insertion order.
    fn list_for_user(&self, user_id: u64) -> Vec<PushSubscription>;

    fn get(&self, id: u64) -> Option<PushSubscription>;

    /// Inserts a row, or refreshes the keys of the row the same user already
    /// registered for this endpoint.
    fn upsert(&self, subscription: NewSubscription) -> PushSubscription;

    /// Returns `false` when no row with `id` exists.
    fn delete(&self, id: u64) -> bool;
}
