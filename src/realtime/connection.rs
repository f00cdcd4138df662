use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{mpsc, watch, RwLock};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use super::registry::{HandlerId, PushHandler, SubscriptionRegistry};
use super::PushEvent;
use crate::auth::TokenStore;
use crate::config::Config;
use crate::error::{ClientError, Result};

const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

/// Wire frames for the multiplexed pub/sub connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum Frame {
    Subscribe { channel: String },
    Unsubscribe { channel: String },
    Publish { channel: String, payload: Value },
    Message { channel: String, data: PushEvent },
}

/// Why one live connection ended.
enum SessionEnd {
    /// Socket dropped; reconnect and replay subscriptions.
    SocketLost,
    /// Credential cleared; tear down bookkeeping, wait for sign-in.
    CredentialLost,
    /// Client closed; stop the driver.
    Shutdown,
}

struct Shared {
    url: String,
    tokens: TokenStore,
    registry: SubscriptionRegistry,
    state: RwLock<ConnectionState>,
    outbound: RwLock<Option<mpsc::UnboundedSender<Message>>>,
    shutdown_tx: watch::Sender<bool>,
}

/// Owner of the single multiplexed pub/sub connection.
///
/// Lifecycle is keyed to the credential: a driver task follows the token
/// store's watch channel, connects while a credential exists, and destroys
/// the connection (and every subscription) the moment it is cleared. Across
/// a transient reconnect the subscription registry survives and every
/// channel's `subscribe` frame is replayed, so no channel is silently
/// dropped.
#[derive(Clone)]
pub struct RealtimeClient {
    shared: Arc<Shared>,
}

/// Handle returned by [`RealtimeClient::subscribe`]. The caller detaches on
/// unmount; connection teardown detaches everything regardless.
pub struct SubscriptionHandle {
    client: RealtimeClient,
    channel: String,
    id: HandlerId,
}

impl SubscriptionHandle {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Detach this handler. When it was the channel's last handler, the
    /// transport subscription is released too.
    pub async fn unsubscribe(self) {
        let emptied = self
            .client
            .shared
            .registry
            .detach(&self.channel, self.id)
            .await;
        if emptied {
            let _ = self
                .client
                .send_frame(Frame::Unsubscribe {
                    channel: self.channel.clone(),
                })
                .await;
        }
    }
}

impl RealtimeClient {
    pub fn new(config: &Config, tokens: TokenStore) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            shared: Arc::new(Shared {
                url: config.realtime_url.clone(),
                tokens,
                registry: SubscriptionRegistry::new(),
                state: RwLock::new(ConnectionState::Disconnected),
                outbound: RwLock::new(None),
                shutdown_tx,
            }),
        }
    }

    pub async fn state(&self) -> ConnectionState {
        *self.shared.state.read().await
    }

    /// Register a handler for a channel.
    ///
    /// The first handler for a channel opens the transport subscription;
    /// later handlers share it. Never opens a second transport subscription
    /// for the same channel name.
    pub async fn subscribe<F>(&self, channel: &str, handler: F) -> SubscriptionHandle
    where
        F: Fn(&PushEvent) + Send + Sync + 'static,
    {
        let handler: PushHandler = Arc::new(handler);
        let (id, first) = self.shared.registry.attach(channel, handler).await;
        if first {
            // Queued only while connected; after a reconnect the driver
            // replays subscribe frames for every registered channel anyway.
            let _ = self
                .send_frame(Frame::Subscribe {
                    channel: channel.to_string(),
                })
                .await;
        }
        SubscriptionHandle {
            client: self.clone(),
            channel: channel.to_string(),
            id,
        }
    }

    /// Publish a payload to a channel. Fails when no live connection exists.
    pub async fn publish(&self, channel: &str, payload: Value) -> Result<()> {
        if *self.shared.state.read().await != ConnectionState::Connected {
            return Err(ClientError::NotConnected);
        }
        self.send_frame(Frame::Publish {
            channel: channel.to_string(),
            payload,
        })
        .await
    }

    /// Start the driver task that keeps the connection in step with the
    /// credential lifecycle.
    pub fn spawn_driver(&self) -> tokio::task::JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move { client.drive().await })
    }

    /// Permanently shut the connection down and drop all subscriptions.
    pub async fn close(&self) {
        let _ = self.shared.shutdown_tx.send(true);
        self.shared.registry.clear().await;
        *self.shared.outbound.write().await = None;
        *self.shared.state.write().await = ConnectionState::Disconnected;
    }

    async fn send_frame(&self, frame: Frame) -> Result<()> {
        let sender = match self.shared.outbound.read().await.as_ref() {
            Some(sender) => sender.clone(),
            None => return Err(ClientError::NotConnected),
        };
        let text = serde_json::to_string(&frame)
            .map_err(|e| ClientError::Transport(e.to_string()))?;
        sender
            .send(Message::Text(text.into()))
            .map_err(|_| ClientError::NotConnected)
    }

    async fn set_state(&self, state: ConnectionState) {
        *self.shared.state.write().await = state;
    }

    async fn drive(&self) {
        let mut token_rx = self.shared.tokens.subscribe();
        let mut shutdown_rx = self.shared.shutdown_tx.subscribe();
        let mut backoff = INITIAL_BACKOFF;

        loop {
            if *shutdown_rx.borrow() {
                return;
            }

            let Some(token) = self.shared.tokens.get().await else {
                // No credential means no session to hand these channels to;
                // drop them so a later sign-in starts from a clean registry.
                self.shared.registry.clear().await;
                self.set_state(ConnectionState::Disconnected).await;
                tokio::select! {
                    changed = token_rx.changed() => {
                        if changed.is_err() {
                            return;
                        }
                    }
                    _ = shutdown_rx.changed() => return,
                }
                continue;
            };

            self.set_state(ConnectionState::Connecting).await;
            let url = format!("{}?token={}", self.shared.url, urlencoding::encode(&token));

            let stream = match connect_async(url.as_str()).await {
                Ok((stream, _)) => stream,
                Err(e) => {
                    warn!("realtime connect failed: {}", e);
                    self.set_state(ConnectionState::Disconnected).await;
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = token_rx.changed() => {}
                        _ = shutdown_rx.changed() => return,
                    }
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    continue;
                }
            };

            backoff = INITIAL_BACKOFF;
            info!("realtime connection established");

            match self.run_session(stream, &mut token_rx, &mut shutdown_rx).await {
                SessionEnd::SocketLost => {
                    // Registry kept: the next session replays every channel.
                    self.set_state(ConnectionState::Disconnected).await;
                    tokio::select! {
                        _ = tokio::time::sleep(backoff) => {}
                        _ = token_rx.changed() => {}
                        _ = shutdown_rx.changed() => return,
                    }
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                SessionEnd::CredentialLost => {
                    info!("credential cleared, tearing down realtime connection");
                    self.shared.registry.clear().await;
                    self.set_state(ConnectionState::Disconnected).await;
                }
                SessionEnd::Shutdown => {
                    self.shared.registry.clear().await;
                    self.set_state(ConnectionState::Disconnected).await;
                    return;
                }
            }
        }
    }

    async fn run_session(
        &self,
        stream: tokio_tungstenite::WebSocketStream<
            tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
        >,
        token_rx: &mut watch::Receiver<bool>,
        shutdown_rx: &mut watch::Receiver<bool>,
    ) -> SessionEnd {
        let (mut sink, mut source) = stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();
        *self.shared.outbound.write().await = Some(tx);
        self.set_state(ConnectionState::Connected).await;

        // Replay the subscription bookkeeping onto the fresh socket.
        for channel in self.shared.registry.channels().await {
            debug!(channel, "replaying subscription");
            let frame = Frame::Subscribe { channel };
            if let Ok(text) = serde_json::to_string(&frame) {
                if sink.send(Message::Text(text.into())).await.is_err() {
                    *self.shared.outbound.write().await = None;
                    return SessionEnd::SocketLost;
                }
            }
        }

        let end = loop {
            tokio::select! {
                incoming = source.next() => match incoming {
                    Some(Ok(Message::Text(text))) => self.handle_frame(text.as_str()).await,
                    Some(Ok(Message::Ping(payload))) => {
                        if sink.send(Message::Pong(payload)).await.is_err() {
                            break SessionEnd::SocketLost;
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break SessionEnd::SocketLost,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("realtime socket error: {}", e);
                        break SessionEnd::SocketLost;
                    }
                },
                outgoing = rx.recv() => match outgoing {
                    Some(message) => {
                        if sink.send(message).await.is_err() {
                            break SessionEnd::SocketLost;
                        }
                    }
                    None => break SessionEnd::SocketLost,
                },
                changed = token_rx.changed() => {
                    if changed.is_err() || !*token_rx.borrow() {
                        let _ = sink.send(Message::Close(None)).await;
                        break SessionEnd::CredentialLost;
                    }
                },
                _ = shutdown_rx.changed() => {
                    let _ = sink.send(Message::Close(None)).await;
                    break SessionEnd::Shutdown;
                },
            }
        };

        *self.shared.outbound.write().await = None;
        end
    }

    async fn handle_frame(&self, raw: &str) {
        match serde_json::from_str::<Frame>(raw) {
            Ok(Frame::Message { channel, data }) => {
                let delivered = self.shared.registry.dispatch(&channel, &data).await;
                debug!(channel, handlers = delivered, "dispatched push event");
            }
            Ok(_) => {}
            Err(e) => debug!("ignoring unparseable realtime frame: {}", e),
        }
    }

    #[cfg(test)]
    async fn install_outbound_for_test(&self) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        *self.shared.outbound.write().await = Some(tx);
        self.set_state(ConnectionState::Connected).await;
        rx
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn client() -> RealtimeClient {
        let config = Config::for_base_url("http://localhost:9999");
        RealtimeClient::new(&config, TokenStore::in_memory())
    }

    fn frame_from(message: Message) -> Frame {
        match message {
            Message::Text(text) => serde_json::from_str(text.as_str()).unwrap(),
            other => panic!("expected text frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn publish_without_connection_fails() {
        let client = client();
        let result = client.publish("personal:#u1", json!({"hello": 1})).await;
        assert_eq!(result, Err(ClientError::NotConnected));
    }

    #[tokio::test]
    async fn two_subscribes_open_one_transport_subscription() {
        let client = client();
        let mut rx = client.install_outbound_for_test().await;

        let c1 = Arc::new(AtomicUsize::new(0));
        let c2 = Arc::new(AtomicUsize::new(0));
        let c1h = c1.clone();
        let c2h = c2.clone();

        let _h1 = client
            .subscribe("x", move |_| {
                c1h.fetch_add(1, Ordering::SeqCst);
            })
            .await;
        let _h2 = client
            .subscribe("x", move |_| {
                c2h.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        // Exactly one subscribe frame hit the transport.
        assert!(matches!(
            frame_from(rx.recv().await.unwrap()),
            Frame::Subscribe { channel } if channel == "x"
        ));
        assert!(rx.try_recv().is_err());

        // One push event invokes both handlers.
        client
            .handle_frame(
                &json!({
                    "op": "message",
                    "channel": "x",
                    "data": {"type": "notification", "payload": {"id": "n1"}}
                })
                .to_string(),
            )
            .await;
        assert_eq!(c1.load(Ordering::SeqCst), 1);
        assert_eq!(c2.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn unsubscribing_last_handler_releases_the_channel() {
        let client = client();
        let mut rx = client.install_outbound_for_test().await;

        let h1 = client.subscribe("x", |_| {}).await;
        let h2 = client.subscribe("x", |_| {}).await;
        let _subscribe = rx.recv().await.unwrap();

        h1.unsubscribe().await;
        assert!(rx.try_recv().is_err(), "channel still has a handler");

        h2.unsubscribe().await;
        assert!(matches!(
            frame_from(rx.recv().await.unwrap()),
            Frame::Unsubscribe { channel } if channel == "x"
        ));
    }

    #[tokio::test]
    async fn publish_forwards_frame_when_connected() {
        let client = client();
        let mut rx = client.install_outbound_for_test().await;

        client
            .publish("room:42", json!({"body": "hi"}))
            .await
            .unwrap();

        match frame_from(rx.recv().await.unwrap()) {
            Frame::Publish { channel, payload } => {
                assert_eq!(channel, "room:42");
                assert_eq!(payload, json!({"body": "hi"}));
            }
            other => panic!("expected publish frame, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn close_clears_registry_and_state() {
        let client = client();
        let _rx = client.install_outbound_for_test().await;
        let _handle = client.subscribe("x", |_| {}).await;

        client.close().await;
        assert_eq!(client.state().await, ConnectionState::Disconnected);
        assert!(client.shared.registry.channels().await.is_empty());
        assert_eq!(
            client.publish("x", json!({})).await,
            Err(ClientError::NotConnected)
        );
    }

    #[tokio::test]
    async fn credential_loss_while_socket_down_drops_subscriptions() {
        use std::time::Duration;

        // Nothing listens on port 9, so the driver never gets a session and
        // sits in its reconnect backoff the whole time.
        let config = Config::for_base_url("http://127.0.0.1:9");
        let tokens = TokenStore::in_memory();
        let client = RealtimeClient::new(&config, tokens.clone());

        tokens.set("session".to_string()).await;
        let driver = client.spawn_driver();
        tokio::time::sleep(Duration::from_millis(200)).await;

        // Subscribed while the socket is down: the registry holds the channel
        // so the next session can replay it.
        let _handle = client.subscribe("personal:#u1", |_| {}).await;
        assert_eq!(client.shared.registry.channels().await, vec!["personal:#u1"]);

        // Losing the credential mid-backoff must still tear the channels down.
        tokens.clear().await;
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(client.shared.registry.channels().await.is_empty());
        assert!(!driver.is_finished(), "driver waits for the next credential");

        driver.abort();
    }

    #[tokio::test]
    async fn frames_serialize_with_op_tags() {
        let frame = Frame::Subscribe {
            channel: "personal:#u1".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&frame).unwrap(),
            json!({"op": "subscribe", "channel": "personal:#u1"})
        );
    }
}
