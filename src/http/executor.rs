use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::envelope::{Envelope, PageMeta};
use crate::auth::TokenStore;
use crate::config::Config;

/// Parameters for a single gateway call.
///
/// Facades shape these; they never touch the transport directly.
#[derive(Debug, Clone)]
pub struct RequestOptions {
    method: Method,
    query: Vec<(String, Option<String>)>,
    body: Option<Value>,
    timeout: Option<Duration>,
}

impl RequestOptions {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            query: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    pub fn patch() -> Self {
        Self::new(Method::PATCH)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    /// Add a query parameter. `None` values are omitted from the final URL,
    /// so optional filters can be passed through unconditionally.
    pub fn query(mut self, key: impl Into<String>, value: Option<impl ToString>) -> Self {
        self.query
            .push((key.into(), value.map(|v| v.to_string())));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// The single path every outbound call goes through.
///
/// Owns URL/query construction, bearer-header injection, the per-request
/// deadline, response decoding and error normalization. Every outcome is an
/// [`Envelope`]; the only side effects are network I/O and clearing the
/// credential on a 401.
#[derive(Clone)]
pub struct RequestExecutor {
    client: Client,
    base_url: String,
    default_timeout: Duration,
    tokens: TokenStore,
}

impl RequestExecutor {
    pub fn new(config: &Config, tokens: TokenStore) -> Self {
        Self {
            client: Client::new(),
            base_url: config.api_base_url.clone(),
            default_timeout: config.request_timeout,
            tokens,
        }
    }

    /// Execute a call and decode the body as JSON.
    ///
    /// Paginated list bodies (`{"data": [...], "total": N, ...}`) have their
    /// metadata lifted into `Envelope.meta`; everything else decodes as `T`
    /// directly.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Envelope<T> {
        let (status, text) = match self.send(path, &options).await {
            Ok(ok) => ok,
            Err(envelope) => return envelope,
        };

        if text.trim().is_empty() {
            // 204-style responses: decode from `null` so `T = ()` and
            // `Option<_>` payloads still resolve to data.
            return match serde_json::from_value::<T>(Value::Null) {
                Ok(data) => Envelope::ok(data),
                Err(e) => Envelope::err(
                    format!("Invalid response body: {e}"),
                    Some(status.as_u16()),
                ),
            };
        }

        let value: Value = match serde_json::from_str(&text) {
            Ok(value) => value,
            Err(e) => {
                return Envelope::err(
                    format!("Invalid response body: {e}"),
                    Some(status.as_u16()),
                )
            }
        };

        let (payload, meta) = lift_page_meta(value);
        match serde_json::from_value::<T>(payload) {
            Ok(data) => match meta {
                Some(meta) => Envelope::ok_with_meta(data, meta),
                None => Envelope::ok(data),
            },
            Err(e) => Envelope::err(
                format!("Invalid response body: {e}"),
                Some(status.as_u16()),
            ),
        }
    }

    /// Execute a call and return the raw body bytes (audio, images).
    pub async fn execute_bytes(&self, path: &str, options: RequestOptions) -> Envelope<Vec<u8>> {
        let url = self.build_url(path, &options.query);
        let timeout = options.timeout.unwrap_or(self.default_timeout);

        let mut request = self.client.request(options.method.clone(), &url);
        if let Some(token) = self.tokens.get().await {
            request = request.bearer_auth(token);
        }

        let response = match tokio::time::timeout(timeout, request.send()).await {
            Err(_) => return Envelope::err("Request timeout", None),
            Ok(Err(e)) => return Envelope::err(format!("Request failed: {e}"), None),
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            self.tokens.clear().await;
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Envelope::err(error_message(status, &text), Some(status.as_u16()));
        }

        match tokio::time::timeout(timeout, response.bytes()).await {
            Err(_) => Envelope::err("Request timeout", None),
            Ok(Err(e)) => Envelope::err(format!("Request failed: {e}"), None),
            Ok(Ok(bytes)) => Envelope::ok(bytes.to_vec()),
        }
    }

    /// Issue the request and read the body as text, normalizing every
    /// failure path into an error envelope.
    async fn send<T>(
        &self,
        path: &str,
        options: &RequestOptions,
    ) -> Result<(StatusCode, String), Envelope<T>> {
        let url = self.build_url(path, &options.query);
        let timeout = options.timeout.unwrap_or(self.default_timeout);
        let started = std::time::Instant::now();

        let mut request = self.client.request(options.method.clone(), &url);
        if let Some(token) = self.tokens.get().await {
            request = request.bearer_auth(token);
        }
        if let Some(body) = &options.body {
            request = request.json(body);
        }

        // Racing the call against the deadline drops the request future on
        // expiry, which aborts the in-flight connection.
        let response = match tokio::time::timeout(timeout, request.send()).await {
            Err(_) => {
                warn!(%url, timeout_ms = timeout.as_millis() as u64, "request deadline elapsed");
                return Err(Envelope::err("Request timeout", None));
            }
            Ok(Err(e)) => {
                warn!(%url, "request failed: {}", e);
                return Err(Envelope::err(format!("Request failed: {e}"), None));
            }
            Ok(Ok(response)) => response,
        };

        let status = response.status();
        debug!(
            method = %options.method,
            %url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );

        if status == StatusCode::UNAUTHORIZED {
            // A stale credential must not be retried on subsequent calls.
            self.tokens.clear().await;
        }

        let text = match tokio::time::timeout(timeout, response.text()).await {
            Err(_) => return Err(Envelope::err("Request timeout", None)),
            Ok(Err(e)) => return Err(Envelope::err(format!("Request failed: {e}"), None)),
            Ok(Ok(text)) => text,
        };

        if !status.is_success() {
            return Err(Envelope::err(
                error_message(status, &text),
                Some(status.as_u16()),
            ));
        }

        Ok((status, text))
    }

    /// Append a deterministically ordered query string: `None` values are
    /// omitted, the rest sorted by key and percent-encoded.
    fn build_url(&self, path: &str, query: &[(String, Option<String>)]) -> String {
        let pairs: BTreeMap<&str, &str> = query
            .iter()
            .filter_map(|(k, v)| v.as_deref().map(|v| (k.as_str(), v)))
            .collect();

        let mut url = format!("{}{}", self.base_url, path);
        if !pairs.is_empty() {
            let encoded: Vec<String> = pairs
                .iter()
                .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
                .collect();
            url.push('?');
            url.push_str(&encoded.join("&"));
        }
        url
    }
}

/// Pull a human-readable message out of a JSON error body, falling back to
/// the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message", "detail"] {
            if let Some(message) = value.get(key).and_then(Value::as_str) {
                if !message.is_empty() {
                    return message.to_string();
                }
            }
        }
    }
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
}

/// Split `{"data": [...], "total": N, "limit": N, "offset": N}` into payload
/// plus [`PageMeta`]. Bodies without the pagination shape pass through whole.
fn lift_page_meta(value: Value) -> (Value, Option<PageMeta>) {
    let Some(object) = value.as_object() else {
        return (value, None);
    };
    if !(object.contains_key("data") && object.contains_key("total")) {
        return (value, None);
    }

    let meta = PageMeta {
        total: object.get("total").and_then(Value::as_u64).unwrap_or(0),
        limit: object.get("limit").and_then(Value::as_u64).unwrap_or(0),
        offset: object.get("offset").and_then(Value::as_u64).unwrap_or(0),
    };
    let payload = object.get("data").cloned().unwrap_or(Value::Null);
    (payload, Some(meta))
}
