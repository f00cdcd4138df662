use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::json;
use uuid::Uuid;

use crate::http::{Envelope, RequestExecutor, RequestOptions};
use crate::models::{Appointment, AppointmentStatus, CreateAppointmentRequest};

/// Recognized appointment list filters. Anything else the caller might want
/// to filter on is not part of the contract and has no field here.
#[derive(Debug, Clone, Default)]
pub struct AppointmentFilter {
    pub status: Option<AppointmentStatus>,
    pub from: Option<DateTime<Utc>>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Clone)]
pub struct AppointmentsApi {
    exec: Arc<RequestExecutor>,
}

impl AppointmentsApi {
    pub fn new(exec: Arc<RequestExecutor>) -> Self {
        Self { exec }
    }

    pub async fn list(&self, filter: &AppointmentFilter) -> Envelope<Vec<Appointment>> {
        let status = filter.status.map(|s| match s {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        });

        self.exec
            .execute(
                "/api/v1/appointments",
                RequestOptions::get()
                    .query("status", status)
                    .query("from", filter.from.map(|t| t.to_rfc3339()))
                    .query("limit", filter.limit)
                    .query("offset", filter.offset),
            )
            .await
    }

    pub async fn get(&self, id: Uuid) -> Envelope<Appointment> {
        self.exec
            .execute(&format!("/api/v1/appointments/{id}"), RequestOptions::get())
            .await
    }

    pub async fn create(&self, payload: &CreateAppointmentRequest) -> Envelope<Appointment> {
        self.exec
            .execute(
                "/api/v1/appointments",
                RequestOptions::post().json(json!(payload)),
            )
            .await
    }

    pub async fn cancel(&self, id: Uuid) -> Envelope<Appointment> {
        self.exec
            .execute(
                &format!("/api/v1/appointments/{id}/cancel"),
                RequestOptions::post(),
            )
            .await
    }

    pub async fn reschedule(
        &self,
        id: Uuid,
        scheduled_at: DateTime<Utc>,
    ) -> Envelope<Appointment> {
        self.exec
            .execute(
                &format!("/api/v1/appointments/{id}/reschedule"),
                RequestOptions::post().json(json!({
                    "scheduled_at": scheduled_at.to_rfc3339(),
                })),
            )
            .await
    }
}
