pub mod bus;
pub mod pubsub_reconnect;

pub use bus::RedisBus;
pub use pubsub_reconnect::{ReconnectConfig, ReconnectingMessageStream, ReconnectingPubSub, ReconnectStats};
