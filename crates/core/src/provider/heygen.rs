//! HeyGen-compatible avatar/video provider client.
//!
//! Every JSON response is wrapped in a `{ "data": { ... } }` envelope.
//! Requests authenticate with the `X-Api-Key` header. The base URL may point
//! at the provider directly or at this service's relay.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::types::{
    GenerateVideoRequest, MediaBlob, TrainingStatus, UploadedAsset, VideoJobState, VideoStatus,
};
use super::{ensure_success, AvatarProvider, ProviderError};

/// Header carrying the avatar provider API key.
pub const AVATAR_API_KEY_HEADER: &str = "X-Api-Key";

/// Avatar provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarProviderConfig {
    /// Provider API key.
    #[serde(default)]
    pub api_key: String,
    /// Base URL for JSON endpoints.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Base URL for binary asset uploads.
    #[serde(default = "default_upload_url")]
    pub upload_url: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

fn default_base_url() -> String {
    "https://api.heygen.com".to_string()
}

fn default_upload_url() -> String {
    "https://upload.heygen.com".to_string()
}

fn default_timeout() -> u32 {
    30
}

impl AvatarProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            upload_url: default_upload_url(),
            timeout_secs: default_timeout(),
        }
    }
}

/// HeyGen API client.
pub struct HeyGenClient {
    client: Client,
    base_url: String,
    upload_url: String,
    api_key: String,
}

impl HeyGenClient {
    /// Create a new client.
    pub fn new(config: AvatarProviderConfig) -> Result<Self, ProviderError> {
        if config.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "avatar provider API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            upload_url: config.upload_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        })
    }

    async fn get_data<T: DeserializeOwned>(&self, path: &str) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .get(&url)
            .header(AVATAR_API_KEY_HEADER, &self.api_key)
            .send()
            .await?;
        parse_envelope(ensure_success(response).await?).await
    }

    async fn post_data<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, ProviderError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .post(&url)
            .header(AVATAR_API_KEY_HEADER, &self.api_key)
            .json(body)
            .send()
            .await?;
        parse_envelope(ensure_success(response).await?).await
    }
}

/// Envelope used by every JSON endpoint.
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: Option<T>,
    #[serde(default)]
    error: Option<Value>,
}

async fn parse_envelope<T: DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ProviderError> {
    let status = response.status().as_u16();
    let text = response.text().await?;
    decode_envelope(status, &text)
}

fn decode_envelope<T: DeserializeOwned>(status: u16, text: &str) -> Result<T, ProviderError> {
    let envelope: Envelope<T> = serde_json::from_str(text)
        .map_err(|e| ProviderError::ParseError(format!("invalid envelope: {}", e)))?;

    match envelope.data {
        Some(data) => Ok(data),
        None => Err(ProviderError::ApiError {
            status,
            message: envelope
                .error
                .as_ref()
                .and_then(error_message)
                .unwrap_or_else(|| "response carried no data".to_string()),
        }),
    }
}

/// Extract a human-readable message from the provider's `error` field,
/// which is either a string or an object with `message`/`detail`.
fn error_message(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Object(map) => map
            .get("message")
            .or_else(|| map.get("detail"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        _ => None,
    }
}

#[derive(Debug, Deserialize)]
struct UploadData {
    #[serde(alias = "asset_id")]
    id: String,
    #[serde(default)]
    image_key: Option<String>,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GroupData {
    #[serde(alias = "id")]
    group_id: String,
}

#[derive(Debug, Deserialize)]
struct VoiceData {
    voice_id: String,
}

#[derive(Debug, Deserialize)]
struct VideoData {
    video_id: String,
}

#[derive(Debug, Deserialize)]
struct VideoStatusData {
    status: VideoJobState,
    #[serde(default)]
    video_url: Option<String>,
    #[serde(default)]
    error_msg: Option<String>,
    #[serde(default)]
    error: Option<Value>,
}

impl From<VideoStatusData> for VideoStatus {
    fn from(data: VideoStatusData) -> Self {
        let error_msg = data
            .error_msg
            .or_else(|| data.error.as_ref().and_then(error_message));
        Self {
            status: data.status,
            video_url: data.video_url,
            error_msg,
        }
    }
}

/// Build the `/v2/video/generate` payload.
pub(crate) fn video_payload(request: &GenerateVideoRequest) -> Value {
    json!({
        "video_inputs": [
            {
                "character": {
                    "type": "talking_photo",
                    "talking_photo_id": request.talking_photo_id,
                },
                "voice": request.voice,
            }
        ]
    })
}

#[async_trait]
impl AvatarProvider for HeyGenClient {
    async fn upload_asset(&self, blob: &MediaBlob) -> Result<UploadedAsset, ProviderError> {
        let url = format!("{}/v1/asset", self.upload_url);

        debug!(
            "Uploading asset: name='{}', type={}, bytes={}",
            blob.file_name,
            blob.content_type,
            blob.len()
        );

        let response = self
            .client
            .post(&url)
            .header(AVATAR_API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::CONTENT_TYPE, &blob.content_type)
            .body(blob.data.clone())
            .send()
            .await?;

        let data: UploadData = parse_envelope(ensure_success(response).await?).await?;
        Ok(UploadedAsset {
            asset_id: data.id,
            image_key: data.image_key,
            url: data.url,
        })
    }

    async fn create_avatar_group(
        &self,
        image_key: &str,
        name: &str,
    ) -> Result<String, ProviderError> {
        debug!("Creating avatar group: image_key='{}'", image_key);
        let data: GroupData = self
            .post_data(
                "/v2/photo_avatar/avatar_group/create",
                &json!({ "name": name, "image_key": image_key }),
            )
            .await?;
        Ok(data.group_id)
    }

    async fn start_training(&self, group_id: &str) -> Result<(), ProviderError> {
        debug!("Starting training: group_id='{}'", group_id);
        let url = format!("{}/v2/photo_avatar/train", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(AVATAR_API_KEY_HEADER, &self.api_key)
            .json(&json!({ "group_id": group_id }))
            .send()
            .await?;
        // The body only echoes the request; a success status is enough.
        ensure_success(response).await?;
        Ok(())
    }

    async fn training_status(&self, group_id: &str) -> Result<TrainingStatus, ProviderError> {
        self.get_data(&format!(
            "/v2/photo_avatar/train/status/{}",
            urlencoding::encode(group_id)
        ))
        .await
    }

    async fn create_voice(&self, audio_asset_id: &str, name: &str) -> Result<String, ProviderError> {
        debug!("Creating brand voice: audio_asset_id='{}'", audio_asset_id);
        let data: VoiceData = self
            .post_data(
                "/v1/brand_voice/create",
                &json!({ "audio_asset_id": audio_asset_id, "name": name }),
            )
            .await?;
        Ok(data.voice_id)
    }

    async fn link_voice(&self, cloned_voice_id: &str) -> Result<String, ProviderError> {
        debug!("Linking cloned voice: voice_id='{}'", cloned_voice_id);
        let data: VoiceData = self
            .post_data("/v1/voice.add", &json!({ "voice_id": cloned_voice_id }))
            .await?;
        Ok(data.voice_id)
    }

    async fn generate_video(&self, request: &GenerateVideoRequest) -> Result<String, ProviderError> {
        debug!(
            "Generating video: talking_photo_id='{}', voice={}",
            request.talking_photo_id,
            request.voice.kind()
        );
        let data: VideoData = self
            .post_data("/v2/video/generate", &video_payload(request))
            .await?;
        Ok(data.video_id)
    }

    async fn video_status(&self, video_id: &str) -> Result<VideoStatus, ProviderError> {
        let data: VideoStatusData = self
            .get_data(&format!(
                "/v1/video_status.get?video_id={}",
                urlencoding::encode(video_id)
            ))
            .await?;
        Ok(data.into())
    }
}
