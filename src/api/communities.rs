use std::sync::Arc;

use uuid::Uuid;

use crate::http::{Envelope, RequestExecutor, RequestOptions};
use crate::models::{Community, CommunityMember};

#[derive(Clone)]
pub struct CommunitiesApi {
    exec: Arc<RequestExecutor>,
}

impl CommunitiesApi {
    pub fn new(exec: Arc<RequestExecutor>) -> Self {
        Self { exec }
    }

    pub async fn list(&self, limit: Option<u32>, offset: Option<u32>) -> Envelope<Vec<Community>> {
        self.exec
            .execute(
                "/api/v1/communities",
                RequestOptions::get()
                    .query("limit", limit)
                    .query("offset", offset),
            )
            .await
    }

    pub async fn get(&self, id: Uuid) -> Envelope<Community> {
        self.exec
            .execute(&format!("/api/v1/communities/{id}"), RequestOptions::get())
            .await
    }

    pub async fn join(&self, id: Uuid) -> Envelope<Community> {
        self.exec
            .execute(
                &format!("/api/v1/communities/{id}/join"),
                RequestOptions::post(),
            )
            .await
    }

    pub async fn leave(&self, id: Uuid) -> Envelope<Community> {
        self.exec
            .execute(
                &format!("/api/v1/communities/{id}/leave"),
                RequestOptions::post(),
            )
            .await
    }

    pub async fn members(
        &self,
        id: Uuid,
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Envelope<Vec<CommunityMember>> {
        self.exec
            .execute(
                &format!("/api/v1/communities/{id}/members"),
                RequestOptions::get()
                    .query("limit", limit)
                    .query("offset", offset),
            )
            .await
    }
}
