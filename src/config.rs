use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone)]
pub struct AppConfig {
    pub app_name: String,
    pub users_file: Option<PathBuf>,
    pub auth: AuthConfig,
    pub broadcast: Option<BroadcastConfig>,
    pub vapid_private_key: Option<String>,
    pub vapid_public_key: Option<String>,
    pub vapid_subject: Option<String>,
    pub push_timeout: Duration,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub key: String,
    pub token_ttl: time::Duration,
    pub cookie_name: String,
    pub cookie_secure: bool,
}

/// Credentials shared with the real-time broadcaster for signing private
/// channel subscriptions.
#[derive(Clone)]
pub struct BroadcastConfig {
    pub app_key: String,
    pub secret: String,
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "Beacon".to_string(),
            users_file: None,
            auth: AuthConfig {
                key: "dGVzdC1hdXRoLWtleQ".to_string(),
                token_ttl: time::Duration::days(1),
                cookie_name: "beacon_session".to_string(),
                cookie_secure: false,
            },
            broadcast: None,
            vapid_private_key: None,
            vapid_public_key: None,
            vapid_subject: None,
            push_timeout: crate::push::DEFAULT_DELIVERY_TIMEOUT,
        }
    }
}
