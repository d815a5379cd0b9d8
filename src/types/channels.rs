use serde::Serialize;
use thiserror::Error;

/// Identity making a request, already resolved by the auth layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    Anonymous,
    User { id: u64, is_admin: bool },
}

impl Principal {
    pub fn user_id(&self) -> Option<u64> {
        match self {
            Principal::Anonymous => None,
            Principal::User { id, .. } => Some(*id),
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Principal::User { is_admin: true, .. })
    }

    pub fn is_anonymous(&self) -> bool {
        matches!(self, Principal::Anonymous)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// The shared channel that requires a signed auth token.
    SignedNotifications,
    /// `private-notifications.{id}`
    UserNotifications,
    Admin,
    Public,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    #[error("Unauthorized")]
    Unauthorized,
    #[error("Forbidden")]
    Forbidden,
    #[error("Channel not authorized")]
    DelegateFailure,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    AllowSigned { auth: String },
    Deny(AuthorizationError),
}

impl Decision {
    pub fn from_bool(allowed: bool) -> Self {
        if allowed {
            Decision::Allow
        } else {
            Decision::Deny(AuthorizationError::Forbidden)
        }
    }

    pub(crate) fn outcome(&self) -> &'static str {
        match self {
            Decision::Allow => "allow",
            Decision::AllowSigned { .. } => "allow_signed",
            Decision::Deny(AuthorizationError::Unauthorized) => "deny_unauthorized",
            Decision::Deny(AuthorizationError::Forbidden) => "deny_forbidden",
            Decision::Deny(AuthorizationError::DelegateFailure) => "deny_delegate_failure",
        }
    }
}
