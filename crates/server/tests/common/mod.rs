//! Common test utilities for in-process API testing with mock providers.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use talkinghead_core::{
    load_config_from_str, Config, GenerationPipeline, IngestConfig, PipelineConfig, Relay,
    SessionManager, SpeechProvider,
    testing::{MockAvatarProvider, MockSpeechProvider},
};
use talkinghead_server::api::{create_router, WsBroadcaster, WsMessage};
use talkinghead_server::state::AppState;

/// Re-export fixtures for test convenience
pub use talkinghead_core::testing::fixtures;

const BOUNDARY: &str = "talkinghead-test-boundary";

/// In-process server wired to mock providers.
pub struct TestFixture {
    pub router: Router,
    pub avatar: Arc<MockAvatarProvider>,
    pub speech: Arc<MockSpeechProvider>,
    pub sessions: Arc<SessionManager>,
    pub broadcaster: WsBroadcaster,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
    pub body: Value,
}

/// Base configuration; relay upstreams can be pointed at a local server.
pub fn test_config(relay_upstream: Option<&str>) -> Config {
    let upstream = relay_upstream.unwrap_or("http://127.0.0.1:9");
    load_config_from_str(&format!(
        r#"
[avatar]
api_key = "configured-avatar-key"

[speech]
api_key = "configured-speech-key"

[relay]
allowed_origins = ["https://app.example", "https://admin.example"]

[relay.upstreams]
avatar = "{upstream}"
avatar_upload = "{upstream}"
speech = "{upstream}"
"#
    ))
    .expect("test config should parse")
}

impl TestFixture {
    pub async fn new() -> Self {
        Self::with_config(test_config(None)).await
    }

    pub async fn with_config(config: Config) -> Self {
        let avatar = Arc::new(MockAvatarProvider::new());
        let speech = Arc::new(MockSpeechProvider::new());

        let pipeline = GenerationPipeline::new(
            avatar.clone(),
            Some(speech.clone() as Arc<dyn SpeechProvider>),
            IngestConfig::default(),
            PipelineConfig {
                poll_interval_ms: 5,
                max_training_polls: 1000,
                max_rendering_polls: 1000,
            },
        );

        let broadcaster = WsBroadcaster::default();
        let callback_broadcaster = broadcaster.clone();
        let sessions = Arc::new(
            SessionManager::new(Arc::new(pipeline)).with_update_callback(Arc::new(
                move |snapshot| callback_broadcaster.session_updated(snapshot),
            )),
        );

        let relay = Arc::new(Relay::from_config(&config).expect("relay should build"));
        let state = Arc::new(AppState::new(
            config,
            Arc::clone(&sessions),
            relay,
            broadcaster.clone(),
        ));

        Self {
            router: create_router(state),
            avatar,
            speech,
            sessions,
            broadcaster,
        }
    }

    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<WsMessage> {
        self.broadcaster.subscribe()
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        self.send(Request::builder().method("GET").uri(path).body(Body::empty()).unwrap())
            .await
    }

    pub async fn delete(&self, path: &str) -> TestResponse {
        self.send(
            Request::builder()
                .method("DELETE")
                .uri(path)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    /// POST a multipart form.
    pub async fn post_form(&self, path: &str, form: MultipartForm) -> TestResponse {
        let request = Request::builder()
            .method("POST")
            .uri(path)
            .header(
                "Content-Type",
                format!("multipart/form-data; boundary={}", BOUNDARY),
            )
            .body(Body::from(form.finish()))
            .unwrap();
        self.send(request).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let content_type = headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes()
            .to_vec();

        let body: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            content_type,
            bytes,
            body,
        }
    }

    /// Poll a session until it is done or failed.
    pub async fn wait_finished(&self, id: &str) -> Value {
        for _ in 0..500 {
            let response = self.get(&format!("/api/v1/sessions/{}", id)).await;
            let body = response.body;
            if body["stage"] == "done" || !body["error"].is_null() {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("session {} did not finish", id);
    }
}

/// Builder for `multipart/form-data` bodies.
#[derive(Default)]
pub struct MultipartForm {
    body: Vec<u8>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"\r\n\r\n{}\r\n",
                BOUNDARY, name, value
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                BOUNDARY, name, file_name, content_type
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// Photo and voice sample from the shared fixtures.
    pub fn with_media(self) -> Self {
        let photo = fixtures::photo();
        let voice = fixtures::voice_sample();
        self.file("photo", &photo.file_name, &photo.content_type, &photo.data)
            .file("audio", &voice.file_name, &voice.content_type, &voice.data)
            .text("audio_duration_secs", "20")
    }

    fn finish(mut self) -> Vec<u8> {
        self.body
            .extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());
        self.body
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
