use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::http::{Envelope, RequestExecutor, RequestOptions};
use crate::models::{CreateThreadRequest, ForumComment, ForumThread};

#[derive(Clone)]
pub struct ForumApi {
    exec: Arc<RequestExecutor>,
}

impl ForumApi {
    pub fn new(exec: Arc<RequestExecutor>) -> Self {
        Self { exec }
    }

    pub async fn threads(
        &self,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Envelope<Vec<ForumThread>> {
        self.exec
            .execute(
                "/api/v1/forum/threads",
                RequestOptions::get()
                    .query("limit", limit)
                    .query("offset", offset),
            )
            .await
    }

    pub async fn thread(&self, id: Uuid) -> Envelope<ForumThread> {
        self.exec
            .execute(&format!("/api/v1/forum/threads/{id}"), RequestOptions::get())
            .await
    }

    pub async fn create_thread(&self, payload: &CreateThreadRequest) -> Envelope<ForumThread> {
        self.exec
            .execute(
                "/api/v1/forum/threads",
                RequestOptions::post().json(json!(payload)),
            )
            .await
    }

    pub async fn delete_thread(&self, id: Uuid) -> Envelope<()> {
        self.exec
            .execute(
                &format!("/api/v1/forum/threads/{id}"),
                RequestOptions::delete(),
            )
            .await
    }

    pub async fn comments(&self, thread_id: Uuid) -> Envelope<Vec<ForumComment>> {
        self.exec
            .execute(
                &format!("/api/v1/forum/threads/{thread_id}/comments"),
                RequestOptions::get(),
            )
            .await
    }

    pub async fn create_comment(&self, thread_id: Uuid, body: &str) -> Envelope<ForumComment> {
        self.exec
            .execute(
                &format!("/api/v1/forum/threads/{thread_id}/comments"),
                RequestOptions::post().json(json!({ "body": body })),
            )
            .await
    }

    pub async fn delete_comment(&self, thread_id: Uuid, comment_id: Uuid) -> Envelope<()> {
        self.exec
            .execute(
                &format!("/api/v1/forum/threads/{thread_id}/comments/{comment_id}"),
                RequestOptions::delete(),
            )
            .await
    }
}
