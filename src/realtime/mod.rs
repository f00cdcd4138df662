use serde::{Deserialize, Serialize};
use serde_json::Value;

mod connection;
mod registry;

pub use connection::{ConnectionState, RealtimeClient, SubscriptionHandle};
pub use registry::{HandlerId, PushHandler, SubscriptionRegistry};

/// Shape of every server-pushed payload: `{type, payload}`.
///
/// Only `type == "notification"` is interpreted by the notification store;
/// other types are opaque here and must be handled by whichever collaborator
/// subscribed to the channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PushEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub payload: Value,
}

/// Channel carrying the authenticated user's private pushes.
pub fn personal_channel(user_id: &uuid::Uuid) -> String {
    format!("personal:#{user_id}")
}
