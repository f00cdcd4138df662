pub mod api;
pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod models;
pub mod notifications;
pub mod realtime;

pub use auth::TokenStore;
pub use client::SolaceClient;
pub use config::Config;
pub use error::{ClientError, Result};
pub use http::{Envelope, PageMeta, RequestExecutor, RequestOptions};
pub use notifications::NotificationStore;
pub use realtime::{ConnectionState, PushEvent, RealtimeClient, SubscriptionHandle};
