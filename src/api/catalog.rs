use std::sync::Arc;

use uuid::Uuid;

use crate::http::{Envelope, RequestExecutor, RequestOptions};
use crate::models::{Article, Therapist};

/// Recognized article filters: `{limit, category}`. Text search over titles
/// is a presentation-layer concern and deliberately has no field here.
#[derive(Debug, Clone, Default)]
pub struct ArticleFilter {
    pub limit: Option<u32>,
    pub category: Option<String>,
}

/// Recognized therapist filters. The backend paginates therapists with
/// `limit`; callers think in `page_size`, so the facade owns the rename.
#[derive(Debug, Clone, Default)]
pub struct TherapistFilter {
    pub search: Option<String>,
    pub page_size: Option<u32>,
}

/// Public read-only catalogs: articles, the therapist directory and
/// meditation audio. No credential required, though one is sent when held.
#[derive(Clone)]
pub struct CatalogApi {
    exec: Arc<RequestExecutor>,
}

impl CatalogApi {
    pub fn new(exec: Arc<RequestExecutor>) -> Self {
        Self { exec }
    }

    pub async fn articles(&self, filter: &ArticleFilter) -> Envelope<Vec<Article>> {
        self.exec
            .execute(
                "/api/v1/articles",
                RequestOptions::get()
                    .query("limit", filter.limit)
                    .query("category", filter.category.as_deref()),
            )
            .await
    }

    pub async fn article(&self, id: Uuid) -> Envelope<Article> {
        self.exec
            .execute(&format!("/api/v1/articles/{id}"), RequestOptions::get())
            .await
    }

    pub async fn therapists(&self, filter: &TherapistFilter) -> Envelope<Vec<Therapist>> {
        self.exec
            .execute(
                "/api/v1/therapists",
                RequestOptions::get()
                    .query("search", filter.search.as_deref())
                    // page_size -> limit: canonical parameter name is the
                    // facade's job, not the executor's.
                    .query("limit", filter.page_size),
            )
            .await
    }

    pub async fn therapist(&self, id: Uuid) -> Envelope<Therapist> {
        self.exec
            .execute(&format!("/api/v1/therapists/{id}"), RequestOptions::get())
            .await
    }

    /// Meditation audio as a raw blob.
    pub async fn meditation_audio(&self, id: Uuid) -> Envelope<Vec<u8>> {
        self.exec
            .execute_bytes(
                &format!("/api/v1/meditations/{id}/audio"),
                RequestOptions::get(),
            )
            .await
    }
}
