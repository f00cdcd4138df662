//! Resource facades: one thin client per backend resource family.
//!
//! A facade only knows how to shape a path, query and body for its resource;
//! all transport (timeouts, auth headers, error normalization) goes through
//! [`crate::http::RequestExecutor`]. Filters are typed structs, so the
//! "unrecognized keys are dropped" contract holds structurally: a key a
//! facade does not enumerate cannot be forwarded at all.

pub mod appointments;
pub mod auth;
pub mod catalog;
pub mod communities;
pub mod events;
pub mod forum;
pub mod notifications;
pub mod users;

pub use appointments::{AppointmentFilter, AppointmentsApi};
pub use auth::AuthApi;
pub use catalog::{ArticleFilter, CatalogApi, TherapistFilter};
pub use communities::CommunitiesApi;
pub use events::{EventFilter, EventsApi};
pub use forum::ForumApi;
pub use notifications::{NotificationQuery, NotificationsApi};
pub use users::UsersApi;
