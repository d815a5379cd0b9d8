use crate::types::channels::Principal;

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DelegateError {
    #[error("no rule matches channel '{0}'")]
    NoMatchingRule(String),
    #[error("invalid parameter '{name}' in channel '{channel}'")]
    InvalidParameter { channel: String, name: String },
}

/// Authorizes channels that have no dedicated branch in the authorizer.
pub trait ChannelDelegate: Send + Sync + 'static {
    fn authorize(&self, channel: &str, principal: &Principal) -> Result<bool, DelegateError>;
}
