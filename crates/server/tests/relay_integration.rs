//! Relay tests against a local fake provider API.

mod common;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, Uri};
use axum::routing::any;
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use common::{test_config, TestFixture};

/// Echo back what the relay sent upstream.
async fn echo(
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, Json<Value>) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    (
        StatusCode::CREATED,
        Json(json!({
            "method": method.as_str(),
            "path": uri.path(),
            "query": uri.query(),
            "avatar_key": header("x-api-key"),
            "speech_key": header("xi-api-key"),
            "content_type": header("content-type"),
            "body": String::from_utf8_lossy(&body),
        })),
    )
}

/// Start the fake provider and return its base URL.
async fn spawn_upstream() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = Router::new().route("/{*path}", any(echo));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

async fn fixture_with_upstream() -> TestFixture {
    let upstream = spawn_upstream().await;
    TestFixture::with_config(test_config(Some(&upstream))).await
}

fn request(method: &str, uri: &str) -> axum::http::request::Builder {
    Request::builder().method(method).uri(uri)
}

#[tokio::test]
async fn test_forwards_with_configured_key() {
    let fixture = fixture_with_upstream().await;

    let response = fixture
        .send(
            request("GET", "/relay/avatar/v1/video_status.get?video_id=abc")
                .header("Origin", "https://admin.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await;

    assert_status!(response, StatusCode::CREATED);
    assert_eq!(response.content_type.as_deref(), Some("application/json"));
    assert_eq!(response.body["method"], "GET");
    assert_eq!(response.body["path"], "/v1/video_status.get");
    assert_eq!(response.body["query"], "video_id=abc");
    assert_eq!(response.body["avatar_key"], "configured-avatar-key");
    assert!(response.body["speech_key"].is_null());
    assert_eq!(
        response.headers["access-control-allow-origin"],
        "https://admin.example"
    );
    assert_eq!(response.headers["vary"], "Origin");
}

#[tokio::test]
async fn test_request_key_and_body_are_forwarded() {
    let fixture = fixture_with_upstream().await;

    let response = fixture
        .send(
            request("POST", "/relay/elevenlabs/v1/text-to-speech/voice-1")
                .header("xi-api-key", "client-key")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"text":"hi"}"#))
                .unwrap(),
        )
        .await;

    assert_status!(response, StatusCode::CREATED);
    let body = tokio_test::assert_ok!(serde_json::from_slice::<Value>(&response.bytes));
    assert_eq!(body["path"], "/v1/text-to-speech/voice-1");
    assert_eq!(body["speech_key"], "client-key");
    assert_eq!(body["content_type"], "application/json");
    assert_eq!(body["body"], r#"{"text":"hi"}"#);
}

#[tokio::test]
async fn test_preflight_and_origin_allow_list() {
    let fixture = fixture_with_upstream().await;

    let preflight = fixture
        .send(
            request("OPTIONS", "/relay/avatar/v2/video/generate")
                .header("Origin", "https://admin.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_status!(preflight, StatusCode::NO_CONTENT);
    assert!(preflight.bytes.is_empty());
    assert_eq!(
        preflight.headers["access-control-allow-origin"],
        "https://admin.example"
    );

    let other = fixture
        .send(
            request("OPTIONS", "/relay/speech/v1/voices")
                .header("Origin", "https://evil.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_status!(other, StatusCode::NO_CONTENT);
    assert_eq!(
        other.headers["access-control-allow-origin"],
        "https://app.example"
    );
    assert_eq!(other.headers["access-control-max-age"], "86400");
    assert!(other.headers["access-control-allow-headers"]
        .to_str()
        .unwrap()
        .contains("xi-api-key"));
}

#[tokio::test]
async fn test_error_responses_carry_cors_headers() {
    let fixture = fixture_with_upstream().await;

    let response = fixture
        .send(
            request("GET", "/relay/openai/v1/models")
                .header("Origin", "https://admin.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers["access-control-allow-origin"],
        "https://admin.example"
    );
}

#[tokio::test]
async fn test_unknown_provider_is_not_found() {
    let fixture = fixture_with_upstream().await;

    let response = fixture
        .send(request("GET", "/relay/openai/v1/models").body(Body::empty()).unwrap())
        .await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert!(response.body["error"].is_string());
}

#[tokio::test]
async fn test_missing_key_is_bad_request() {
    let upstream = spawn_upstream().await;
    let mut config = test_config(Some(&upstream));
    config.relay.use_configured_keys = false;
    let fixture = TestFixture::with_config(config).await;

    let response = fixture
        .send(request("GET", "/relay/avatar/v1/asset").body(Body::empty()).unwrap())
        .await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Missing required parameters");
}

#[tokio::test]
async fn test_unreachable_upstream_is_server_error() {
    // Default test config points the relay at a closed port
    let fixture = TestFixture::new().await;

    let response = fixture
        .send(request("GET", "/relay/avatar/v1/asset").body(Body::empty()).unwrap())
        .await;
    assert_status!(response, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.body["error"].is_string());
}
