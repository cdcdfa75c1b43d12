//! End-to-end behaviour of the shared client against a mock backend.

use serde_json::json;
use sessionctl::api::{ApiClient, ApiError};
use sessionctl::config::ClientConfig;
use sessionctl::session::{
    MemoryStore, Navigation, RecordingNavigator, SessionEvent, SessionEvents, TokenStore,
    TOKEN_KEY,
};
use std::sync::Arc;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Harness {
    server: MockServer,
    store: Arc<MemoryStore>,
    navigator: Arc<RecordingNavigator>,
    client: ApiClient,
}

async fn harness() -> Harness {
    let server = MockServer::start().await;
    let store = Arc::new(MemoryStore::with_token("abc123"));
    let navigator = Arc::new(RecordingNavigator::new());
    let config = ClientConfig::new(&server.uri()).unwrap();
    let client = ApiClient::with_session(config, store.clone(), navigator.clone()).unwrap();

    Harness {
        server,
        store,
        navigator,
        client,
    }
}

async fn mount(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

#[tokio::test]
async fn success_is_returned_unchanged() {
    let h = harness().await;
    mount(
        &h.server,
        "/profile",
        ResponseTemplate::new(200)
            .insert_header("x-request-kind", "profile")
            .set_body_json(json!({ "name": "Ada" })),
    )
    .await;

    let response = h.client.execute(h.client.get("/profile").unwrap()).await.unwrap();

    assert_eq!(response.status(), 200);
    assert_eq!(response.headers()["x-request-kind"], "profile");
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "name": "Ada" }));
    assert_eq!(h.store.get(TOKEN_KEY).unwrap().as_deref(), Some("abc123"));
    assert!(h.navigator.events().is_empty());
}

#[tokio::test]
async fn unauthorized_ends_session_and_surfaces_failure() {
    let h = harness().await;
    mount(
        &h.server,
        "/orders",
        ResponseTemplate::new(401).set_body_string("{\"error\":\"token expired\"}"),
    )
    .await;

    let result = h.client.execute(h.client.get("/orders").unwrap()).await;

    match result {
        Err(ApiError::Status { status, body }) => {
            assert_eq!(status, 401);
            assert_eq!(body, "{\"error\":\"token expired\"}");
        }
        other => panic!("expected a 401 failure, got {other:?}"),
    }
    assert_eq!(h.store.get(TOKEN_KEY).unwrap(), None);
    assert_eq!(h.navigator.location().as_deref(), Some("/"));
    assert_eq!(
        h.navigator.events(),
        vec![SessionEvent::Expired {
            location: "/".to_string(),
            navigation: Navigation::Full,
        }]
    );
}

#[tokio::test]
async fn server_error_leaves_session_alone() {
    let h = harness().await;
    mount(
        &h.server,
        "/orders",
        ResponseTemplate::new(500).set_body_string("database unavailable"),
    )
    .await;

    let result = h.client.execute(h.client.get("/orders").unwrap()).await;

    match result {
        Err(ApiError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "database unavailable");
        }
        other => panic!("expected a 500 failure, got {other:?}"),
    }
    assert_eq!(h.store.get(TOKEN_KEY).unwrap().as_deref(), Some("abc123"));
    assert!(h.navigator.events().is_empty());
}

#[tokio::test]
async fn not_found_leaves_session_alone() {
    let h = harness().await;
    mount(&h.server, "/missing", ResponseTemplate::new(404)).await;

    let error = h
        .client
        .execute(h.client.get("/missing").unwrap())
        .await
        .unwrap_err();

    assert_eq!(error.status().map(|s| s.as_u16()), Some(404));
    assert_eq!(h.store.get(TOKEN_KEY).unwrap().as_deref(), Some("abc123"));
    assert!(h.navigator.events().is_empty());
}

#[tokio::test]
async fn network_failure_leaves_session_alone() {
    let store = Arc::new(MemoryStore::with_token("abc123"));
    let navigator = Arc::new(RecordingNavigator::new());

    // Reserve a port, then release it so nothing is listening there.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let config = ClientConfig::new(&format!("http://127.0.0.1:{port}")).unwrap();
    let client = ApiClient::with_session(config, store.clone(), navigator.clone()).unwrap();
    let error = client
        .execute(client.get("/orders").unwrap())
        .await
        .unwrap_err();

    assert!(matches!(error, ApiError::Transport(_)));
    assert_eq!(error.status(), None);
    assert_eq!(store.get(TOKEN_KEY).unwrap().as_deref(), Some("abc123"));
    assert!(navigator.events().is_empty());
}

#[tokio::test]
async fn builders_for_other_hosts_are_refused() {
    let h = harness().await;
    let elsewhere = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/orders"))
        .respond_with(ResponseTemplate::new(401))
        .expect(0)
        .mount(&elsewhere)
        .await;

    let foreign = reqwest::Client::new().get(format!("{}/orders", elsewhere.uri()));
    let error = h.client.execute(foreign).await.unwrap_err();

    assert!(matches!(error, ApiError::ForeignOrigin(_)));
    assert_eq!(error.status(), None);
    assert_eq!(h.store.get(TOKEN_KEY).unwrap().as_deref(), Some("abc123"));
    assert!(h.navigator.events().is_empty());
    elsewhere.verify().await;
}

#[tokio::test]
async fn concurrent_unauthorized_responses_are_harmless() {
    let h = harness().await;
    mount(&h.server, "/a", ResponseTemplate::new(401)).await;
    mount(&h.server, "/b", ResponseTemplate::new(401)).await;

    let (a, b) = tokio::join!(
        h.client.execute(h.client.get("/a").unwrap()),
        h.client.execute(h.client.get("/b").unwrap()),
    );

    assert!(a.unwrap_err().is_unauthorized());
    assert!(b.unwrap_err().is_unauthorized());
    assert_eq!(h.store.get(TOKEN_KEY).unwrap(), None);
    assert_eq!(h.navigator.events().len(), 2);
    assert_eq!(h.navigator.location().as_deref(), Some("/"));
}

#[tokio::test]
async fn requests_carry_the_stored_token() {
    let h = harness().await;
    Mock::given(method("GET"))
        .and(path("/me"))
        .and(header("authorization", "Bearer abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "id": 7 })))
        .expect(1)
        .mount(&h.server)
        .await;

    let body: serde_json::Value = h.client.get_json("/me").await.unwrap();
    assert_eq!(body["id"], 7);
}

#[tokio::test]
async fn json_helpers_send_and_decode() {
    let h = harness().await;
    Mock::given(method("POST"))
        .and(path("/notes"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": 1, "text": "hi" })))
        .mount(&h.server)
        .await;

    let created: serde_json::Value = h
        .client
        .send_json(reqwest::Method::POST, "/notes", &json!({ "text": "hi" }))
        .await
        .unwrap();
    assert_eq!(created["text"], "hi");
}

#[tokio::test]
async fn undecodable_body_is_a_decode_error() {
    let h = harness().await;
    mount(
        &h.server,
        "/plain",
        ResponseTemplate::new(200).set_body_string("not json"),
    )
    .await;

    let result: Result<serde_json::Value, _> = h.client.get_json("/plain").await;
    assert!(matches!(result, Err(ApiError::Decode(_))));
    assert!(h.navigator.events().is_empty());
}

#[tokio::test]
async fn broadcast_subscribers_observe_expiry() {
    let server = MockServer::start().await;
    mount(&server, "/orders", ResponseTemplate::new(401)).await;

    let store = Arc::new(MemoryStore::with_token("abc123"));
    let events = SessionEvents::default();
    let mut subscriber = events.subscribe();
    let config = ClientConfig::new(&server.uri()).unwrap();
    let client = ApiClient::with_session(config, store.clone(), Arc::new(events)).unwrap();

    let result = client.execute(client.get("/orders").unwrap()).await;

    assert!(result.unwrap_err().is_unauthorized());
    assert_eq!(subscriber.recv().await.unwrap(), SessionEvent::expired());
    assert_eq!(store.get(TOKEN_KEY).unwrap(), None);
}
