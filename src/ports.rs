pub mod channels;
pub mod push;
pub mod store;
pub mod time;

pub use channels::{ChannelDelegate, DelegateError};
pub use push::PushSender;
pub use store::SubscriptionStore;
pub use time::TimeProvider;
