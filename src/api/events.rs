use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::http::{Envelope, RequestExecutor, RequestOptions};
use crate::models::{Event, RsvpStatus};

/// Recognized event list filters.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub community_id: Option<Uuid>,
    pub after: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Clone)]
pub struct EventsApi {
    exec: Arc<RequestExecutor>,
}

impl EventsApi {
    pub fn new(exec: Arc<RequestExecutor>) -> Self {
        Self { exec }
    }

    pub async fn list(&self, filter: &EventFilter) -> Envelope<Vec<Event>> {
        self.exec
            .execute(
                "/api/v1/events",
                RequestOptions::get()
                    .query("community_id", filter.community_id)
                    .query("after", filter.after.map(|t| t.to_rfc3339()))
                    .query("limit", filter.limit)
                    .query("offset", filter.offset),
            )
            .await
    }

    pub async fn get(&self, id: Uuid) -> Envelope<Event> {
        self.exec
            .execute(&format!("/api/v1/events/{id}"), RequestOptions::get())
            .await
    }

    pub async fn rsvp(&self, event_id: Uuid, status: RsvpStatus) -> Envelope<Event> {
        self.exec
            .execute(
                &format!("/api/v1/events/{event_id}/rsvp"),
                RequestOptions::post().json(json!({ "status": status.as_str() })),
            )
            .await
    }
}
