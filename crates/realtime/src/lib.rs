//! Redis pub/sub backplane for realtime notifications.
//!
//! Every instance publishes user events to Redis and forwards whatever it
//! receives back to its own SSE subscribers, so a user connected to any
//! instance sees events produced on all of them.

pub mod pubsub;

pub use pubsub::{PubSubSseBridge, RedisPubSub, UserEnvelope, user_channel, user_pattern};
