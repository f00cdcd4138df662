use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::{debug, warn};

/// Process-wide holder of the bearer credential.
///
/// Cheap to clone; all clones share the same state. Injected into both the
/// request executor (header injection, 401 clearing) and the realtime client
/// (connection lifecycle), so neither reaches for global mutable state.
///
/// A `watch` channel broadcasts "credential present" transitions: the
/// realtime client follows it to connect on sign-in and tear down on
/// sign-out or a server-reported 401.
#[derive(Clone)]
pub struct TokenStore {
    token: Arc<RwLock<Option<String>>>,
    changed_tx: watch::Sender<bool>,
    path: Option<PathBuf>,
}

impl TokenStore {
    /// Store backed by a file; the credential survives restarts.
    pub fn new(path: Option<PathBuf>) -> Self {
        let (changed_tx, _) = watch::channel(false);
        Self {
            token: Arc::new(RwLock::new(None)),
            changed_tx,
            path,
        }
    }

    /// Store with no persistence, for tests and embedded use.
    pub fn in_memory() -> Self {
        Self::new(None)
    }

    /// Read the persisted credential, if any. A missing file means
    /// "unauthenticated", not an error.
    pub async fn load(&self) {
        let Some(path) = &self.path else { return };
        match tokio::fs::read_to_string(path).await {
            Ok(raw) => {
                let token = raw.trim().to_string();
                if !token.is_empty() {
                    debug!("loaded persisted credential");
                    *self.token.write().await = Some(token);
                    let _ = self.changed_tx.send(true);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("failed to read credential file: {}", e),
        }
    }

    pub async fn get(&self) -> Option<String> {
        self.token.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.token.read().await.is_some()
    }

    /// Install a new credential (successful sign-in or sign-up).
    pub async fn set(&self, token: String) {
        *self.token.write().await = Some(token.clone());
        self.persist(Some(&token)).await;
        let _ = self.changed_tx.send(true);
    }

    /// Destroy the credential (sign-out, or a 401 from any request).
    pub async fn clear(&self) {
        let had_token = self.token.write().await.take().is_some();
        if had_token {
            self.persist(None).await;
            let _ = self.changed_tx.send(false);
        }
    }

    /// Receiver that yields on every sign-in/sign-out transition.
    /// The value is "a credential is currently present".
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.changed_tx.subscribe()
    }

    async fn persist(&self, token: Option<&str>) {
        let Some(path) = &self.path else { return };
        let result = match token {
            Some(token) => {
                if let Some(parent) = path.parent() {
                    let _ = tokio::fs::create_dir_all(parent).await;
                }
                tokio::fs::write(path, token).await
            }
            None => match tokio::fs::remove_file(path).await {
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                other => other,
            },
        };
        if let Err(e) = result {
            warn!("failed to persist credential: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_clear_roundtrip() {
        let store = TokenStore::in_memory();
        assert_eq!(store.get().await, None);

        store.set("tok-1".to_string()).await;
        assert_eq!(store.get().await, Some("tok-1".to_string()));
        assert!(store.is_authenticated().await);

        store.clear().await;
        assert_eq!(store.get().await, None);
        assert!(!store.is_authenticated().await);
    }

    #[tokio::test]
    async fn clear_is_idempotent_and_silent_when_empty() {
        let store = TokenStore::in_memory();
        let rx = store.subscribe();
        store.clear().await;
        // No token was present, so no transition was broadcast.
        assert!(!rx.has_changed().unwrap());
    }

    #[tokio::test]
    async fn subscribers_see_transitions() {
        let store = TokenStore::in_memory();
        let mut rx = store.subscribe();

        store.set("tok".to_string()).await;
        rx.changed().await.unwrap();
        assert!(*rx.borrow());

        store.clear().await;
        rx.changed().await.unwrap();
        assert!(!*rx.borrow());
    }

    #[tokio::test]
    async fn persists_and_reloads_credential() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credential");

        let store = TokenStore::new(Some(path.clone()));
        store.set("persisted-token".to_string()).await;

        let reloaded = TokenStore::new(Some(path.clone()));
        reloaded.load().await;
        assert_eq!(reloaded.get().await, Some("persisted-token".to_string()));

        reloaded.clear().await;
        assert!(!path.exists());

        // Missing file on load is "unauthenticated", not an error.
        let empty = TokenStore::new(Some(path));
        empty.load().await;
        assert_eq!(empty.get().await, None);
    }
}
