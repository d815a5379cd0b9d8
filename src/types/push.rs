use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct VapidConfig {
    pub private_key: String,
    pub public_key: String,
    pub subject: String,
}

/// A browser push endpoint registered by one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushSubscription {
    pub id: u64,
    pub user_id: u64,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub user_id: u64,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub user_agent: Option<String>,
}

/// Outcome of a single delivery attempt as reported by the push service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryReport {
    pub success: bool,
    pub reason: String,
    pub status: Option<u16>,
}

impl DeliveryReport {
    pub fn delivered(reason: impl Into<String>) -> Self {
        Self {
            success: true,
            reason: reason.into(),
            status: None,
        }
    }

    pub fn rejected(status: u16, reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: reason.into(),
            status: Some(status),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchResult {
    pub subscription_id: u64,
    pub success: bool,
    pub reason: String,
}
