use std::sync::Arc;

use uuid::Uuid;

use crate::api::{
    AppointmentsApi, AuthApi, CatalogApi, CommunitiesApi, EventsApi, ForumApi, NotificationsApi,
    UsersApi,
};
use crate::auth::TokenStore;
use crate::config::Config;
use crate::http::RequestExecutor;
use crate::notifications::NotificationStore;
use crate::realtime::{RealtimeClient, SubscriptionHandle};

/// Top-level wiring for the SDK: one token store, one request executor, one
/// facade per resource family, one realtime connection, one notification
/// store. UI code talks to the facades and the stores; it never touches the
/// executor or the subscription registry directly.
pub struct SolaceClient {
    config: Config,
    tokens: TokenStore,
    realtime: RealtimeClient,
    notifications_store: NotificationStore,

    pub auth: AuthApi,
    pub users: UsersApi,
    pub appointments: AppointmentsApi,
    pub notifications: NotificationsApi,
    pub forum: ForumApi,
    pub communities: CommunitiesApi,
    pub events: EventsApi,
    pub catalog: CatalogApi,
}

impl SolaceClient {
    pub fn new(config: Config) -> Self {
        let tokens = TokenStore::new(config.credential_path.clone());
        let exec = Arc::new(RequestExecutor::new(&config, tokens.clone()));
        let realtime = RealtimeClient::new(&config, tokens.clone());
        let notifications = NotificationsApi::new(exec.clone());
        let notifications_store = NotificationStore::new(notifications.clone());

        Self {
            auth: AuthApi::new(exec.clone(), tokens.clone()),
            users: UsersApi::new(exec.clone()),
            appointments: AppointmentsApi::new(exec.clone()),
            notifications,
            forum: ForumApi::new(exec.clone()),
            communities: CommunitiesApi::new(exec.clone()),
            events: EventsApi::new(exec.clone()),
            catalog: CatalogApi::new(exec),
            config,
            tokens,
            realtime,
            notifications_store,
        }
    }

    pub fn from_env() -> crate::error::Result<Self> {
        Ok(Self::new(Config::from_env()?))
    }

    /// Load any persisted credential and start the background machinery:
    /// the realtime driver (which connects once a credential exists) and
    /// the periodic unread-count resync.
    pub async fn start(&self) {
        self.tokens.load().await;
        let _driver = self.realtime.spawn_driver();
        let _poll = self
            .notifications_store
            .spawn_unread_refresh(self.config.unread_refresh_interval);
    }

    /// Route the authenticated user's personal channel into the
    /// notification store.
    pub async fn attach_notifications(&self, user_id: &Uuid) -> SubscriptionHandle {
        self.notifications_store
            .attach_to(&self.realtime, user_id)
            .await
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn realtime(&self) -> &RealtimeClient {
        &self.realtime
    }

    pub fn notification_store(&self) -> &NotificationStore {
        &self.notifications_store
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Sign out: server call plus credential destruction. Clearing the
    /// credential tears the realtime connection down via the token watch;
    /// the driver stays alive so a later sign-in reconnects. Permanent
    /// teardown is [`RealtimeClient::close`], called only when the client
    /// itself is being dropped.
    pub async fn sign_out(&self) {
        let _ = self.auth.sign_out().await;
    }
}
