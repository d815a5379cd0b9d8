use crate::ports::{PushSender, SubscriptionStore, TimeProvider};
use crate::types::push::{DeliveryReport, DispatchResult, PushSubscription};

use serde_json::Value as JsonValue;
use serde_json::json;
use std::time::Duration;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

/// Push service statuses after which an endpoint will never accept messages
/// again.
pub const PERMANENT_FAILURE_STATUSES: [u16; 4] = [400, 404, 410, 413];

pub const DEFAULT_DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

const NOTIFICATION_ICON: &str = "/favicon.ico";

enum Attempt<E> {
    Reported(DeliveryReport),
    Failed(E),
    TimedOut,
}

pub struct PushDispatcher<S, St, T> {
    sender: S,
    store: St,
    time: T,
    app_name: String,
    timeout: Duration,
}

impl<S, St, T> PushDispatcher<S, St, T>
where
    S: PushSender,
    St: SubscriptionStore,
    T: TimeProvider,
{
    pub fn new(sender: S, store: St, time: T, app_name: impl Into<String>) -> Self {
        Self {
            sender,
            store,
            time,
            app_name: app_name.into(),
            timeout: DEFAULT_DELIVERY_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Delivers one notification to every endpoint `user_id` registered.
    ///
    /// Returns one result per subscription in store order. Endpoints the push
    /// service rejects permanently are deleted; every other failure keeps the
    /// row so a later call can retry it.
    pub async fn send_to_user(
        &self,
        user_id: u64,
        title: &str,
        body: &str,
        data: JsonValue,
    ) -> Vec<DispatchResult> {
        self.send_at(self.time.now(), user_id, title, body, data)
            .await
    }

    pub async fn send_test_notification(&self, user_id: u64) -> Vec<DispatchResult> {
        let now = self.time.now();
        let timestamp = now
            .format(&Rfc3339)
            .unwrap_or_else(|_| now.unix_timestamp().to_string());
        let body = format!("This is a test push notification from {}.", self.app_name);
        let data = json!({
            "type": "test-push",
            "timestamp": timestamp,
        });
        self.send_at(now, user_id, "Test notification", &body, data)
            .await
    }

    async fn send_at(
        &self,
        now: OffsetDateTime,
        user_id: u64,
        title: &str,
        body: &str,
        data: JsonValue,
    ) -> Vec<DispatchResult> {
        let subscriptions = self.store.list_for_user(user_id);
        if subscriptions.is_empty() {
            tracing::info!(user_id, "no push subscriptions for user");
            return Vec::new();
        }

        let payload = json!({
            "title": title,
            "body": body,
            "icon": NOTIFICATION_ICON,
            "tag": format!("notification-{}", now.unix_timestamp()),
            "data": data,
            "timestamp": (now.unix_timestamp_nanos() / 1_000_000) as i64,
        })
        .to_string();

        let mut results = Vec::with_capacity(subscriptions.len());
        for subscription in &subscriptions {
            results.push(self.deliver(subscription, &payload).await);
        }

        tracing::info!(
            user_id,
            attempted = subscriptions.len(),
            results = ?results,
            "push dispatch finished"
        );
        results
    }

    async fn deliver(&self, subscription: &PushSubscription, payload: &str) -> DispatchResult {
        let attempt = tokio::select! {
            biased;
            result = self.sender.send(subscription, payload) => match result {
                Ok(report) => Attempt::Reported(report),
                Err(err) => Attempt::Failed(err),
            },
            _ = self.time.sleep(self.timeout) => Attempt::TimedOut,
        };

        match attempt {
            Attempt::Reported(report) if report.success => DispatchResult {
                subscription_id: subscription.id,
                success: true,
                reason: report.reason,
            },
            Attempt::Reported(report) => {
                let permanent = report
                    .status
                    .is_some_and(|status| PERMANENT_FAILURE_STATUSES.contains(&status));
                if permanent {
                    let removed = self.store.delete(subscription.id);
                    tracing::info!(
                        subscription_id = subscription.id,
                        status = report.status,
                        removed,
                        "pruned push subscription after permanent failure"
                    );
                } else {
                    tracing::warn!(
                        subscription_id = subscription.id,
                        status = report.status,
                        reason = %report.reason,
                        "push delivery rejected"
                    );
                }
                DispatchResult {
                    subscription_id: subscription.id,
                    success: false,
                    reason: report.reason,
                }
            }
            Attempt::Failed(err) => {
                tracing::warn!(
                    subscription_id = subscription.id,
                    error = %err,
                    "push delivery error"
                );
                DispatchResult {
                    subscription_id: subscription.id,
                    success: false,
                    reason: err.to_string(),
                }
            }
            Attempt::TimedOut => {
                tracing::warn!(
                    subscription_id = subscription.id,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "push delivery timed out"
                );
                DispatchResult {
                    subscription_id: subscription.id,
                    success: false,
                    reason: format!("delivery timed out after {}ms", self.timeout.as_millis()),
                }
            }
        }
    }
}
