use std::sync::Arc;

use serde_json::json;
use uuid::Uuid;

use crate::http::{Envelope, RequestExecutor, RequestOptions};
use crate::models::{ProfilePatch, UserProfile};

#[derive(Clone)]
pub struct UsersApi {
    exec: Arc<RequestExecutor>,
}

impl UsersApi {
    pub fn new(exec: Arc<RequestExecutor>) -> Self {
        Self { exec }
    }

    pub async fn get_profile(&self, user_id: Uuid) -> Envelope<UserProfile> {
        self.exec
            .execute(
                &format!("/api/v1/users/{user_id}/profile"),
                RequestOptions::get(),
            )
            .await
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        patch: &ProfilePatch,
    ) -> Envelope<UserProfile> {
        self.exec
            .execute(
                &format!("/api/v1/users/{user_id}/profile"),
                RequestOptions::patch().json(json!(patch)),
            )
            .await
    }
}
