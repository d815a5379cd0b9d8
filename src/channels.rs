mod authorizer;
pub mod rules;
mod signature;

pub use authorizer::{
    ChannelAuthorizer, ChannelRequest, SIGNED_NOTIFICATIONS_CHANNEL, USER_NOTIFICATIONS_PREFIX,
    classify,
};
pub use rules::RuleTable;
pub use signature::{ChannelSigner, SignerError, token_preview};
