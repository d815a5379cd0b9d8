use crate::auth::AuthState;
use crate::channels::{ChannelAuthorizer, RuleTable};
use crate::config::AppConfig;
use crate::push::WebPushDispatcher;
use crate::store::MemorySubscriptionStore;
use crate::users::UserDirectory;

use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub(crate) auth: AuthState,
    pub users: Arc<UserDirectory>,
    pub channels: Arc<ChannelAuthorizer<RuleTable>>,
    pub subscriptions: MemorySubscriptionStore,
    pub push: Option<Arc<WebPushDispatcher>>,
}
