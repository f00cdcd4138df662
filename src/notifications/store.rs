use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::api::{NotificationQuery, NotificationsApi};
use crate::http::Envelope;
use crate::models::{Notification, UnreadCount};
use crate::realtime::{personal_channel, PushEvent, RealtimeClient, SubscriptionHandle};

#[derive(Default)]
struct Inner {
    /// Working set, most-recent-first.
    notifications: Vec<Notification>,
    unread_count: u64,
}

/// Application-level notification cache.
///
/// Combines three event sources into one consistent view: list fetches,
/// optimistic local mutations, and realtime pushes. Local mutations are
/// applied synchronously, in invocation order, before their server call
/// resolves; a failed server call is NOT rolled back — the periodic
/// unread-count poll (or an explicit [`NotificationStore::refresh`]) is the
/// recovery path.
///
/// `fetch` wholesale-replaces the working set. A push that lands between
/// fetch-start and fetch-resolve is overwritten by the fetched page
/// (last-fetch-wins); this is accepted behavior, not a bug. Merging by id
/// would change what callers observe, so it is deliberately not done here.
#[derive(Clone)]
pub struct NotificationStore {
    api: NotificationsApi,
    inner: Arc<RwLock<Inner>>,
}

impl NotificationStore {
    pub fn new(api: NotificationsApi) -> Self {
        Self {
            api,
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    /// Snapshot of the working set, most-recent-first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.inner.read().expect("notification state poisoned").notifications.clone()
    }

    pub fn unread_count(&self) -> u64 {
        self.inner.read().expect("notification state poisoned").unread_count
    }

    /// Fetch a page and replace the working set with it (last-fetch-wins).
    /// The unread counter is left for mutations, pushes and the count
    /// endpoint; a fetched page is only a window onto the server's list.
    pub async fn fetch(&self, query: &NotificationQuery) -> Envelope<Vec<Notification>> {
        let envelope = self.api.list(query).await;
        if let Some(items) = &envelope.data {
            self.apply_fetch(items.clone());
        }
        envelope
    }

    /// Optimistically mark one notification read, then confirm server-side.
    /// Idempotent: a second call on an already-read id changes nothing.
    pub async fn mark_read(&self, id: &str) -> Envelope<()> {
        self.apply_mark_read(id, Utc::now());
        let envelope = self.api.mark_read(id).await;
        if let Some(error) = &envelope.error {
            warn!(id, "mark-read not confirmed by server: {}", error);
        }
        envelope
    }

    /// Optimistically mark everything read and zero the counter, then
    /// confirm server-side.
    pub async fn mark_all_read(&self) -> Envelope<()> {
        self.apply_mark_all_read(Utc::now());
        let envelope = self.api.mark_all_read().await;
        if let Some(error) = &envelope.error {
            warn!("mark-all-read not confirmed by server: {}", error);
        }
        envelope
    }

    /// Optimistically remove one notification, then confirm server-side.
    pub async fn delete(&self, id: &str) -> Envelope<()> {
        self.apply_delete(id);
        let envelope = self.api.delete(id).await;
        if let Some(error) = &envelope.error {
            warn!(id, "delete not confirmed by server: {}", error);
        }
        envelope
    }

    /// Handle a push event from the personal channel. Only
    /// `type == "notification"` payloads are interpreted; everything else is
    /// someone else's contract.
    pub fn handle_push(&self, event: &PushEvent) {
        if event.event_type != "notification" {
            return;
        }
        match serde_json::from_value::<Notification>(event.payload.clone()) {
            Ok(notification) => {
                debug!(id = %notification.id, "push notification received");
                self.apply_push(notification);
            }
            Err(e) => warn!("ignoring malformed notification push: {}", e),
        }
    }

    /// Subscribe this store to the user's personal channel.
    pub async fn attach_to(
        &self,
        realtime: &RealtimeClient,
        user_id: &Uuid,
    ) -> SubscriptionHandle {
        let store = self.clone();
        realtime
            .subscribe(&personal_channel(user_id), move |event| {
                store.handle_push(event);
            })
            .await
    }

    /// Resynchronize the unread counter from the server, correcting drift
    /// from missed pushes or failed optimistic updates.
    pub async fn refresh_unread_count(&self) -> Envelope<UnreadCount> {
        let envelope = self.api.unread_count().await;
        if let Some(count) = &envelope.data {
            let mut inner = self.inner.write().expect("notification state poisoned");
            inner.unread_count = count.unread_count;
        }
        envelope
    }

    /// Full resynchronization: re-fetch the working set and the counter.
    pub async fn refresh(&self) -> Envelope<Vec<Notification>> {
        let envelope = self.fetch(&NotificationQuery::default()).await;
        self.refresh_unread_count().await;
        envelope
    }

    /// Background poll keeping the unread counter honest.
    pub fn spawn_unread_refresh(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // First tick fires immediately; skip it so startup fetches win.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let envelope = store.refresh_unread_count().await;
                if let Some(error) = envelope.error {
                    debug!("unread refresh failed: {}", error);
                }
            }
        })
    }

    // Synchronous state transitions. Each one holds the lock for the whole
    // mutation so concurrent callers observe them in invocation order.

    fn apply_fetch(&self, items: Vec<Notification>) {
        let mut inner = self.inner.write().expect("notification state poisoned");
        inner.notifications = items;
    }

    fn apply_mark_read(&self, id: &str, read_at: DateTime<Utc>) -> bool {
        let mut inner = self.inner.write().expect("notification state poisoned");
        let Some(item) = inner.notifications.iter_mut().find(|n| n.id == id) else {
            return false;
        };
        if item.read {
            return false;
        }
        item.read = true;
        item.read_at = Some(read_at);
        inner.unread_count = inner.unread_count.saturating_sub(1);
        true
    }

    fn apply_mark_all_read(&self, read_at: DateTime<Utc>) {
        let mut inner = self.inner.write().expect("notification state poisoned");
        for item in &mut inner.notifications {
            if !item.read {
                item.read = true;
                item.read_at = Some(read_at);
            }
        }
        inner.unread_count = 0;
    }

    fn apply_delete(&self, id: &str) -> bool {
        let mut inner = self.inner.write().expect("notification state poisoned");
        let Some(index) = inner.notifications.iter().position(|n| n.id == id) else {
            return false;
        };
        let removed = inner.notifications.remove(index);
        if !removed.read {
            inner.unread_count = inner.unread_count.saturating_sub(1);
            return true;
        }
        false
    }

    /// A pushed item is always unread by construction, so the counter is
    /// incremented unconditionally.
    fn apply_push(&self, notification: Notification) {
        let mut inner = self.inner.write().expect("notification state poisoned");
        inner.notifications.insert(0, notification);
        inner.unread_count += 1;
    }
}
