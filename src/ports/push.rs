use crate::types::push::{DeliveryReport, PushSubscription};

/// Delivers one payload to one push endpoint.
///
/// A push service rejection is an `Ok` report carrying the HTTP status; `Err`
/// is reserved for failures where no status is known (transport, crypto,
/// malformed endpoint).
pub trait PushSender: Clone + Send + Sync + 'static {
    type Error: std::fmt::Display + Send + Sync + 'static;
    type Fut<'a>: Future<Output = Result<DeliveryReport, Self::Error>> + Send + 'a
    where
        Self: 'a;

    fn send<'a>(&'a self, subscription: &'a PushSubscription, payload: &'a str) -> Self::Fut<'a>;
}
