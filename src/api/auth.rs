use std::sync::Arc;

use serde_json::json;
use tracing::info;

use crate::auth::TokenStore;
use crate::http::{Envelope, RequestExecutor, RequestOptions};
use crate::models::{AuthResponse, SignUpRequest, User};

/// Authentication endpoints. The only facade that also touches the token
/// store: a successful sign-in/sign-up installs the credential, sign-out
/// destroys it.
#[derive(Clone)]
pub struct AuthApi {
    exec: Arc<RequestExecutor>,
    tokens: TokenStore,
}

impl AuthApi {
    pub fn new(exec: Arc<RequestExecutor>, tokens: TokenStore) -> Self {
        Self { exec, tokens }
    }

    pub async fn sign_up(&self, payload: &SignUpRequest) -> Envelope<AuthResponse> {
        let envelope: Envelope<AuthResponse> = self
            .exec
            .execute(
                "/api/v1/auth/register",
                RequestOptions::post().json(json!(payload)),
            )
            .await;
        self.install_credential(&envelope).await;
        envelope
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Envelope<AuthResponse> {
        let envelope: Envelope<AuthResponse> = self
            .exec
            .execute(
                "/api/v1/auth/login",
                RequestOptions::post().json(json!({
                    "email": email,
                    "password": password,
                })),
            )
            .await;
        self.install_credential(&envelope).await;
        envelope
    }

    /// Sign out server-side, then clear the local credential regardless of
    /// the server's answer: a failed logout call must not leave a usable
    /// token behind.
    pub async fn sign_out(&self) -> Envelope<()> {
        let envelope = self
            .exec
            .execute("/api/v1/auth/logout", RequestOptions::post())
            .await;
        self.tokens.clear().await;
        envelope
    }

    pub async fn me(&self) -> Envelope<User> {
        self.exec
            .execute("/api/v1/auth/me", RequestOptions::get())
            .await
    }

    async fn install_credential(&self, envelope: &Envelope<AuthResponse>) {
        if let Some(auth) = &envelope.data {
            info!(user_id = %auth.user.id, "authenticated");
            self.tokens.set(auth.token.clone()).await;
        }
    }
}
