//! Gateway behavior against a live mock server: envelope normalization,
//! deadlines, credential handling.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use solace_client::{Config, Envelope, RequestExecutor, RequestOptions, TokenStore};

fn executor_for(server: &MockServer) -> (Arc<RequestExecutor>, TokenStore) {
    let config = Config::for_base_url(&server.uri());
    let tokens = TokenStore::in_memory();
    (
        Arc::new(RequestExecutor::new(&config, tokens.clone())),
        tokens,
    )
}

#[tokio::test]
async fn success_populates_data_and_only_data() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/ping"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"pong": true})))
        .mount(&server)
        .await;

    let (exec, _) = executor_for(&server);
    let envelope: Envelope<Value> = exec.execute("/api/v1/ping", RequestOptions::get()).await;

    assert_eq!(envelope.data, Some(json!({"pong": true})));
    assert!(envelope.error.is_none());
    assert!(envelope.meta.is_none());
}

#[tokio::test]
async fn failure_populates_error_and_only_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/broken"))
        .respond_with(
            ResponseTemplate::new(500).set_body_json(json!({"error": "database on fire"})),
        )
        .mount(&server)
        .await;

    let (exec, _) = executor_for(&server);
    let envelope: Envelope<Value> = exec.execute("/api/v1/broken", RequestOptions::get()).await;

    assert!(envelope.data.is_none());
    assert_eq!(envelope.error, Some("database on fire".to_string()));
    assert_eq!(envelope.status, Some(500));
}

#[tokio::test]
async fn non_json_error_body_falls_back_to_status_reason() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/teapot"))
        .respond_with(ResponseTemplate::new(503).set_body_string("<html>down</html>"))
        .mount(&server)
        .await;

    let (exec, _) = executor_for(&server);
    let envelope: Envelope<Value> = exec.execute("/api/v1/teapot", RequestOptions::get()).await;

    assert_eq!(envelope.error, Some("Service Unavailable".to_string()));
    assert_eq!(envelope.status, Some(503));
}

#[tokio::test]
async fn elapsed_deadline_resolves_to_timeout_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"ok": true}))
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let (exec, _) = executor_for(&server);
    let envelope: Envelope<Value> = exec
        .execute(
            "/api/v1/slow",
            RequestOptions::get().timeout(Duration::from_millis(100)),
        )
        .await;

    assert_eq!(envelope.error, Some("Request timeout".to_string()));
    assert!(envelope.data.is_none());
    assert!(envelope.status.is_none());
}

#[tokio::test]
async fn bearer_header_is_injected_when_credential_held() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "u1"})))
        .mount(&server)
        .await;

    let (exec, tokens) = executor_for(&server);
    tokens.set("secret-token".to_string()).await;
    let _: Envelope<Value> = exec.execute("/api/v1/me", RequestOptions::get()).await;

    let requests = server.received_requests().await.unwrap();
    let auth = requests[0]
        .headers
        .get("authorization")
        .expect("authorization header missing");
    assert_eq!(auth.to_str().unwrap(), "Bearer secret-token");
}

#[tokio::test]
async fn unauthorized_clears_credential_and_next_request_omits_header() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/private"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"error": "expired"})))
        .mount(&server)
        .await;

    let (exec, tokens) = executor_for(&server);
    tokens.set("stale-token".to_string()).await;

    let envelope: Envelope<Value> = exec.execute("/api/v1/private", RequestOptions::get()).await;
    assert_eq!(envelope.status, Some(401));
    assert_eq!(envelope.error, Some("expired".to_string()));
    assert_eq!(tokens.get().await, None, "401 must clear the credential");

    let _: Envelope<Value> = exec.execute("/api/v1/private", RequestOptions::get()).await;
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert!(
        !requests[1].headers.contains_key("authorization"),
        "request after 401 must not carry the stale credential"
    );
}

#[tokio::test]
async fn paginated_body_lifts_meta() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/things"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [{"id": 1}, {"id": 2}],
            "total": 9,
            "limit": 2,
            "offset": 4
        })))
        .mount(&server)
        .await;

    let (exec, _) = executor_for(&server);
    let envelope: Envelope<Vec<Value>> =
        exec.execute("/api/v1/things", RequestOptions::get()).await;

    assert_eq!(envelope.data.as_ref().map(Vec::len), Some(2));
    let meta = envelope.meta.expect("meta must be lifted");
    assert_eq!((meta.total, meta.limit, meta.offset), (9, 2, 4));
}

#[tokio::test]
async fn query_string_is_deterministically_ordered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v1/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .mount(&server)
        .await;

    let (exec, _) = executor_for(&server);
    let _: Envelope<Value> = exec
        .execute(
            "/api/v1/search",
            RequestOptions::get()
                .query("zeta", Some("1"))
                .query("alpha", Some("2"))
                .query("skipped", None::<String>),
        )
        .await;

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests[0].url.query(), Some("alpha=2&zeta=1"));
}

#[tokio::test]
async fn binary_endpoint_returns_raw_bytes() {
    let server = MockServer::start().await;
    let audio = vec![0x52u8, 0x49, 0x46, 0x46, 0x00, 0x01];
    Mock::given(method("GET"))
        .and(path("/api/v1/meditations/a1/audio"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(audio.clone()))
        .mount(&server)
        .await;

    let (exec, _) = executor_for(&server);
    let envelope = exec
        .execute_bytes("/api/v1/meditations/a1/audio", RequestOptions::get())
        .await;

    assert_eq!(envelope.data, Some(audio));
    assert!(envelope.error.is_none());
}

#[tokio::test]
async fn empty_body_decodes_unit_payload() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/v1/notifications/read-all"))
        .respond_with(ResponseTemplate::new(204))
        .mount(&server)
        .await;

    let (exec, _) = executor_for(&server);
    let envelope: Envelope<()> = exec
        .execute("/api/v1/notifications/read-all", RequestOptions::put())
        .await;

    assert!(envelope.is_ok());
    assert_eq!(envelope.data, Some(()));
}
