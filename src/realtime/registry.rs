use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::PushEvent;

/// Callback invoked for every push delivered on a subscribed channel.
pub type PushHandler = Arc<dyn Fn(&PushEvent) + Send + Sync>;

/// Unique identifier for one registered handler.
///
/// Allows precise detachment when a consumer unsubscribes, without touching
/// the other handlers sharing the channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(Uuid);

impl HandlerId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

struct Entry {
    id: HandlerId,
    handler: PushHandler,
}

/// Channel-keyed handler registry.
///
/// The invariant this type enforces: one underlying transport subscription
/// per channel name, no matter how many handlers attach. `attach` reports
/// whether the channel is new (the caller then sends the transport
/// `subscribe` frame exactly once) and `detach` reports when the last
/// handler left (the caller then unsubscribes the transport).
#[derive(Default, Clone)]
pub struct SubscriptionRegistry {
    inner: Arc<RwLock<HashMap<String, Vec<Entry>>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a handler to a channel. Returns the handler id and whether
    /// this is the channel's first handler.
    pub async fn attach(&self, channel: &str, handler: PushHandler) -> (HandlerId, bool) {
        let mut guard = self.inner.write().await;
        let entries = guard.entry(channel.to_string()).or_default();
        let first = entries.is_empty();
        let id = HandlerId::new();
        entries.push(Entry { id, handler });

        tracing::debug!(
            channel,
            handlers = entries.len(),
            first_for_channel = first,
            "attached push handler"
        );
        (id, first)
    }

    /// Detach one handler. Returns true when the channel has no handlers
    /// left (and was removed from the registry).
    pub async fn detach(&self, channel: &str, id: HandlerId) -> bool {
        let mut guard = self.inner.write().await;
        let Some(entries) = guard.get_mut(channel) else {
            return false;
        };
        entries.retain(|e| e.id != id);
        if entries.is_empty() {
            guard.remove(channel);
            tracing::debug!(channel, "removed empty channel from registry");
            return true;
        }
        false
    }

    /// Invoke every handler registered for a channel. Returns how many ran.
    pub async fn dispatch(&self, channel: &str, event: &PushEvent) -> usize {
        let guard = self.inner.read().await;
        let Some(entries) = guard.get(channel) else {
            return 0;
        };
        for entry in entries {
            (entry.handler)(event);
        }
        entries.len()
    }

    /// Channel names with at least one handler, for resubscribe replay
    /// after a reconnect.
    pub async fn channels(&self) -> Vec<String> {
        let guard = self.inner.read().await;
        guard.keys().cloned().collect()
    }

    pub async fn handler_count(&self, channel: &str) -> usize {
        let guard = self.inner.read().await;
        guard.get(channel).map(|v| v.len()).unwrap_or(0)
    }

    /// Drop every subscription and handler atomically. Called on connection
    /// teardown so nothing leaks past credential loss.
    pub async fn clear(&self) {
        let mut guard = self.inner.write().await;
        guard.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_handler(counter: Arc<AtomicUsize>) -> PushHandler {
        Arc::new(move |_event| {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn event() -> PushEvent {
        PushEvent {
            event_type: "notification".to_string(),
            payload: json!({"id": "n1"}),
        }
    }

    #[tokio::test]
    async fn second_attach_shares_the_channel() {
        let registry = SubscriptionRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));

        let (_, first) = registry.attach("x", counting_handler(count.clone())).await;
        let (_, second) = registry.attach("x", counting_handler(count.clone())).await;

        assert!(first);
        assert!(!second, "second handler must not open a new subscription");
        assert_eq!(registry.handler_count("x").await, 2);
        assert_eq!(registry.channels().await, vec!["x".to_string()]);
    }

    #[tokio::test]
    async fn dispatch_invokes_every_handler_once() {
        let registry = SubscriptionRegistry::new();
        let c1 = Arc::new(AtomicUsize::new(0));
        let c2 = Arc::new(AtomicUsize::new(0));

        registry.attach("x", counting_handler(c1.clone())).await;
        registry.attach("x", counting_handler(c2.clone())).await;

        let invoked = registry.dispatch("x", &event()).await;
        assert_eq!(invoked, 2);
        assert_eq!(c1.load(Ordering::SeqCst), 1);
        assert_eq!(c2.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn dispatch_on_unknown_channel_is_a_no_op() {
        let registry = SubscriptionRegistry::new();
        assert_eq!(registry.dispatch("nobody", &event()).await, 0);
    }

    #[tokio::test]
    async fn detach_removes_only_the_named_handler() {
        let registry = SubscriptionRegistry::new();
        let c1 = Arc::new(AtomicUsize::new(0));
        let c2 = Arc::new(AtomicUsize::new(0));

        let (id1, _) = registry.attach("x", counting_handler(c1.clone())).await;
        registry.attach("x", counting_handler(c2.clone())).await;

        let emptied = registry.detach("x", id1).await;
        assert!(!emptied);
        registry.dispatch("x", &event()).await;
        assert_eq!(c1.load(Ordering::SeqCst), 0);
        assert_eq!(c2.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn detaching_last_handler_empties_the_channel() {
        let registry = SubscriptionRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        let (id, _) = registry.attach("x", counting_handler(count)).await;

        assert!(registry.detach("x", id).await);
        assert!(registry.channels().await.is_empty());
    }

    #[tokio::test]
    async fn clear_drops_everything() {
        let registry = SubscriptionRegistry::new();
        let count = Arc::new(AtomicUsize::new(0));
        registry.attach("a", counting_handler(count.clone())).await;
        registry.attach("b", counting_handler(count.clone())).await;

        registry.clear().await;
        assert!(registry.channels().await.is_empty());
        assert_eq!(registry.dispatch("a", &event()).await, 0);
    }
}
