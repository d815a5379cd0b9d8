use crate::channels::signature::ChannelSigner;
use crate::ports::channels::ChannelDelegate;
use crate::types::channels::{AuthorizationError, ChannelKind, Decision, Principal};

pub const SIGNED_NOTIFICATIONS_CHANNEL: &str = "private-notifications";
pub const USER_NOTIFICATIONS_PREFIX: &str = "private-notifications.";

/// Channels matched by exact name, before any prefix or delegate lookup.
const NAMED_CHANNELS: &[(&str, ChannelKind)] = &[
    (SIGNED_NOTIFICATIONS_CHANNEL, ChannelKind::SignedNotifications),
    ("admin-chat", ChannelKind::Admin),
    ("admin-chat-typing", ChannelKind::Admin),
    ("public-chat", ChannelKind::Public),
    ("public-chat-typing", ChannelKind::Public),
];

pub fn classify(channel: &str) -> ChannelKind {
    if channel.starts_with(USER_NOTIFICATIONS_PREFIX) {
        return ChannelKind::UserNotifications;
    }
    NAMED_CHANNELS
        .iter()
        .find(|(name, _)| *name == channel)
        .map(|(_, kind)| *kind)
        .unwrap_or(ChannelKind::Other)
}

/// Authorization request for one channel subscription.
#[derive(Debug, Clone, Copy)]
pub struct ChannelRequest<'a> {
    pub channel: &'a str,
    pub socket_id: Option<&'a str>,
    pub principal: Principal,
}

pub struct ChannelAuthorizer<D> {
    signer: Option<ChannelSigner>,
    delegate: D,
}

impl<D: ChannelDelegate> ChannelAuthorizer<D> {
    pub fn new(signer: Option<ChannelSigner>, delegate: D) -> Self {
        Self { signer, delegate }
    }

    pub fn authorize(&self, request: ChannelRequest<'_>) -> Decision {
        let kind = classify(request.channel);
        if request.principal.is_anonymous() && kind != ChannelKind::Public {
            return Decision::Deny(AuthorizationError::Unauthorized);
        }

        match kind {
            ChannelKind::SignedNotifications => self.sign(request),
            ChannelKind::UserNotifications => {
                let suffix = &request.channel[USER_NOTIFICATIONS_PREFIX.len()..];
                match suffix.parse::<u64>() {
                    Ok(id) => Decision::from_bool(request.principal.user_id() == Some(id)),
                    Err(_) => {
                        tracing::debug!(
                            channel = request.channel,
                            "non-numeric user id in notifications channel"
                        );
                        Decision::Deny(AuthorizationError::Forbidden)
                    }
                }
            }
            ChannelKind::Admin => Decision::from_bool(request.principal.is_admin()),
            ChannelKind::Public => Decision::Allow,
            ChannelKind::Other => match self.delegate.authorize(request.channel, &request.principal)
            {
                Ok(allowed) => Decision::from_bool(allowed),
                Err(err) => {
                    tracing::warn!(channel = request.channel, error = %err, "channel delegate failed");
                    Decision::Deny(AuthorizationError::DelegateFailure)
                }
            },
        }
    }

    fn sign(&self, request: ChannelRequest<'_>) -> Decision {
        let Some(signer) = self.signer.as_ref() else {
            tracing::warn!(
                channel = request.channel,
                "broadcast credentials not configured, cannot sign channel"
            );
            return Decision::Deny(AuthorizationError::Forbidden);
        };
        let socket_id = request.socket_id.unwrap_or_default();
        Decision::AllowSigned {
            auth: signer.sign(socket_id, request.channel),
        }
    }
}
