use std::sync::Arc;

use crate::http::{Envelope, RequestExecutor, RequestOptions};
use crate::models::{Notification, UnreadCount};

/// Recognized notification list parameters.
#[derive(Debug, Clone, Default)]
pub struct NotificationQuery {
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub unread_only: Option<bool>,
}

#[derive(Clone)]
pub struct NotificationsApi {
    exec: Arc<RequestExecutor>,
}

impl NotificationsApi {
    pub fn new(exec: Arc<RequestExecutor>) -> Self {
        Self { exec }
    }

    pub async fn list(&self, query: &NotificationQuery) -> Envelope<Vec<Notification>> {
        self.exec
            .execute(
                "/api/v1/notifications",
                RequestOptions::get()
                    .query("limit", query.limit)
                    .query("offset", query.offset)
                    .query("unread_only", query.unread_only),
            )
            .await
    }

    pub async fn mark_read(&self, id: &str) -> Envelope<()> {
        self.exec
            .execute(
                &format!("/api/v1/notifications/{id}/read"),
                RequestOptions::put(),
            )
            .await
    }

    pub async fn mark_all_read(&self) -> Envelope<()> {
        self.exec
            .execute("/api/v1/notifications/read-all", RequestOptions::put())
            .await
    }

    pub async fn delete(&self, id: &str) -> Envelope<()> {
        self.exec
            .execute(
                &format!("/api/v1/notifications/{id}"),
                RequestOptions::delete(),
            )
            .await
    }

    pub async fn unread_count(&self) -> Envelope<UnreadCount> {
        self.exec
            .execute(
                "/api/v1/notifications/unread-count",
                RequestOptions::get(),
            )
            .await
    }
}
