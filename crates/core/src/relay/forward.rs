//! Request forwarding.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, ORIGIN};
use reqwest::{Client, Method, StatusCode};
use serde_json::json;
use tracing::{debug, warn};

use super::{CorsPolicy, RelayConfig, RelayError, RelayTarget};
use crate::config::Config;
use crate::metrics;

/// A request to relay, already split from the incoming HTTP request.
#[derive(Debug, Clone)]
pub struct RelayRequest {
    pub method: Method,
    /// Upstream path, starting with `/`.
    pub path: String,
    /// Raw query string, without `?`.
    pub query: Option<String>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RelayRequest {
    fn origin(&self) -> Option<&str> {
        self.headers.get(ORIGIN).and_then(|v| v.to_str().ok())
    }
}

/// Response handed back to the caller.
#[derive(Debug, Clone)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl RelayResponse {
    fn empty(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Vec::new(),
        }
    }

    fn json_error(status: StatusCode, message: &str) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            status,
            headers,
            body: json!({ "error": message }).to_string().into_bytes(),
        }
    }
}

#[derive(Debug, Clone)]
struct Upstream {
    base_url: String,
    api_key: Option<String>,
}

/// Relay to the avatar and speech provider APIs.
pub struct Relay {
    client: Client,
    upstreams: HashMap<RelayTarget, Upstream>,
    cors: CorsPolicy,
}

fn non_blank(value: &str) -> Option<String> {
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}

impl Relay {
    /// Create a relay with explicit fallback keys per provider.
    pub fn new(
        config: &RelayConfig,
        avatar_api_key: Option<String>,
        speech_api_key: Option<String>,
    ) -> Result<Self, RelayError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        let (avatar_api_key, speech_api_key) = if config.use_configured_keys {
            (avatar_api_key, speech_api_key)
        } else {
            (None, None)
        };

        let upstream = |base: &str, api_key: Option<String>| Upstream {
            base_url: base.trim_end_matches('/').to_string(),
            api_key,
        };

        let mut upstreams = HashMap::new();
        upstreams.insert(
            RelayTarget::Avatar,
            upstream(&config.upstreams.avatar, avatar_api_key.clone()),
        );
        upstreams.insert(
            RelayTarget::AvatarUpload,
            upstream(&config.upstreams.avatar_upload, avatar_api_key),
        );
        upstreams.insert(
            RelayTarget::Speech,
            upstream(&config.upstreams.speech, speech_api_key),
        );

        Ok(Self {
            client,
            upstreams,
            cors: CorsPolicy::from_config(config),
        })
    }

    /// Create a relay from the service configuration.
    pub fn from_config(config: &Config) -> Result<Self, RelayError> {
        Self::new(
            &config.relay,
            non_blank(&config.avatar.api_key),
            config.speech.as_ref().and_then(|s| non_blank(&s.api_key)),
        )
    }

    pub fn cors(&self) -> &CorsPolicy {
        &self.cors
    }

    /// Handle a relayed request end to end.
    ///
    /// Never fails: errors become JSON `{"error": ...}` responses. CORS
    /// headers are attached to every response.
    pub async fn handle(&self, provider: &str, request: RelayRequest) -> RelayResponse {
        let origin = request.origin().map(str::to_string);
        let label = RelayTarget::from_name(provider)
            .map(|t| t.as_str())
            .unwrap_or("unknown");

        let mut response = if request.method == Method::OPTIONS {
            RelayResponse::empty(StatusCode::NO_CONTENT)
        } else {
            match self.forward(provider, request).await {
                Ok(response) => response,
                Err(e) => {
                    warn!("Relay to '{}' failed: {}", provider, e);
                    RelayResponse::json_error(e.status(), &e.to_string())
                }
            }
        };

        metrics::RELAY_REQUESTS
            .with_label_values(&[label, response.status.as_str()])
            .inc();

        self.cors.apply(origin.as_deref(), &mut response.headers);
        response
    }

    /// Forward a request upstream and return the upstream response as-is.
    pub async fn forward(
        &self,
        provider: &str,
        request: RelayRequest,
    ) -> Result<RelayResponse, RelayError> {
        let target = RelayTarget::from_name(provider)
            .ok_or_else(|| RelayError::UnknownProvider(provider.to_string()))?;
        let upstream = self
            .upstreams
            .get(&target)
            .ok_or_else(|| RelayError::UnknownProvider(provider.to_string()))?;

        let key_header = target.api_key_header();
        let api_key = request
            .headers
            .get(key_header)
            .and_then(|v| v.to_str().ok())
            .and_then(non_blank)
            .or_else(|| upstream.api_key.clone())
            .ok_or(RelayError::MissingParameters)?;

        let mut url = format!("{}{}", upstream.base_url, request.path);
        if let Some(query) = request.query.as_deref().filter(|q| !q.is_empty()) {
            url.push('?');
            url.push_str(query);
        }

        debug!("Relaying {} {} -> {}", request.method, request.path, target.as_str());

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(key_header, api_key);
        for name in [CONTENT_TYPE, ACCEPT] {
            if let Some(value) = request.headers.get(&name) {
                builder = builder.header(name, value.clone());
            }
        }
        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let started = Instant::now();
        let upstream_response = builder.send().await?;
        let status = upstream_response.status();
        let content_type = upstream_response.headers().get(CONTENT_TYPE).cloned();
        let body = upstream_response.bytes().await?.to_vec();
        metrics::RELAY_DURATION
            .with_label_values(&[target.as_str()])
            .observe(started.elapsed().as_secs_f64());

        debug!(
            "Upstream {} answered {} ({} bytes)",
            target.as_str(),
            status,
            body.len()
        );

        let mut headers = HeaderMap::new();
        if let Some(content_type) = content_type {
            headers.insert(CONTENT_TYPE, content_type);
        }

        Ok(RelayResponse {
            status,
            headers,
            body,
        })
    }
}
