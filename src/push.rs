use crate::adapters::{TokioTimeProvider, WebPushSender};
use crate::config;
use crate::store::MemorySubscriptionStore;

mod dispatcher;
pub(crate) mod vapid;

pub use dispatcher::{DEFAULT_DELIVERY_TIMEOUT, PERMANENT_FAILURE_STATUSES, PushDispatcher};
pub use vapid::{VapidConfigStatus, VapidCredentials, generate_vapid_credentials, load_vapid_config};

pub type WebPushDispatcher = PushDispatcher<WebPushSender, MemorySubscriptionStore, TokioTimeProvider>;

/// Builds the production dispatcher, or `None` when push is not configured.
pub fn build_dispatcher(
    config: &config::AppConfig,
    store: MemorySubscriptionStore,
) -> Option<WebPushDispatcher> {
    let vapid = match load_vapid_config(config) {
        VapidConfigStatus::Ready(vapid) => vapid,
        VapidConfigStatus::Incomplete => {
            tracing::warn!("push notifications disabled: incomplete VAPID configuration");
            return None;
        }
        VapidConfigStatus::Missing => {
            tracing::info!("push notifications disabled: no VAPID configuration");
            return None;
        }
    };

    let sender = match WebPushSender::new(vapid) {
        Ok(sender) => sender,
        Err(err) => {
            tracing::error!(error = %err, "push notifications disabled: failed to init web-push");
            return None;
        }
    };

    Some(
        PushDispatcher::new(sender, store, TokioTimeProvider, config.app_name.clone())
            .with_timeout(config.push_timeout),
    )
}
