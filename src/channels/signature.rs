use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error)]
pub enum SignerError {
    #[error("broadcast app key cannot be empty")]
    EmptyKey,
    #[error("broadcast secret cannot be empty")]
    EmptySecret,
}

/// Signs private channel subscriptions in the `<app_key>:<hex hmac>` format
/// expected by Pusher-compatible clients.
#[derive(Clone)]
pub struct ChannelSigner {
    app_key: String,
    secret: String,
}

impl ChannelSigner {
    pub fn new(app_key: impl Into<String>, secret: impl Into<String>) -> Result<Self, SignerError> {
        let app_key = app_key.into();
        let secret = secret.into();
        if app_key.trim().is_empty() {
            return Err(SignerError::EmptyKey);
        }
        if secret.is_empty() {
            return Err(SignerError::EmptySecret);
        }
        Ok(Self { app_key, secret })
    }

    pub fn sign(&self, socket_id: &str, channel: &str) -> String {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(socket_id.as_bytes());
        mac.update(b":");
        mac.update(channel.as_bytes());
        let digest = hex::encode(mac.finalize().into_bytes());
        format!("{}:{digest}", self.app_key)
    }
}

impl std::fmt::Debug for ChannelSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSigner")
            .field("app_key", &self.app_key)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// Short, non-reversible fingerprint of a credential for log lines.
pub fn token_preview(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..4])
}
