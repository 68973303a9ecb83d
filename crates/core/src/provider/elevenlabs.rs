//! ElevenLabs-compatible speech provider client.
//!
//! Requests authenticate with the `xi-api-key` header. Voice cloning uses a
//! multipart upload; synthesis answers with raw `audio/mpeg` bytes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{multipart, Client};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::types::{MediaBlob, SynthesizedAudio, VoiceSummary};
use super::{ensure_success, ProviderError, SpeechProvider};

/// Header carrying the speech provider API key.
pub const SPEECH_API_KEY_HEADER: &str = "xi-api-key";

/// Page size used when listing personal voices.
const VOICE_PAGE_SIZE: u32 = 100;

/// Speech provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechProviderConfig {
    /// Provider API key.
    #[serde(default)]
    pub api_key: String,
    /// Base URL (default: https://api.elevenlabs.io).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Synthesis model.
    #[serde(default = "default_model_id")]
    pub model_id: String,
    #[serde(default = "default_stability")]
    pub stability: f32,
    #[serde(default = "default_similarity_boost")]
    pub similarity_boost: f32,
}

fn default_base_url() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_model_id() -> String {
    "eleven_monolingual_v1".to_string()
}

fn default_stability() -> f32 {
    0.5
}

fn default_similarity_boost() -> f32 {
    0.75
}

impl SpeechProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            model_id: default_model_id(),
            stability: default_stability(),
            similarity_boost: default_similarity_boost(),
        }
    }
}

/// ElevenLabs API client.
pub struct ElevenLabsClient {
    client: Client,
    base_url: String,
    api_key: String,
    model_id: String,
    stability: f32,
    similarity_boost: f32,
}

impl ElevenLabsClient {
    /// Create a new client.
    pub fn new(config: SpeechProviderConfig) -> Result<Self, ProviderError> {
        if config.api_key.is_empty() {
            return Err(ProviderError::NotConfigured(
                "speech provider API key is required".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            model_id: config.model_id,
            stability: config.stability,
            similarity_boost: config.similarity_boost,
        })
    }
}

#[derive(Debug, Deserialize)]
struct AddVoiceResponse {
    voice_id: String,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    voices: Vec<VoiceSummary>,
    #[serde(default)]
    total_count: Option<u64>,
}

/// Whether a synthesis response carries audio.
fn is_audio_content_type(content_type: &str) -> bool {
    content_type.trim_start().to_ascii_lowercase().starts_with("audio/")
}

#[async_trait]
impl SpeechProvider for ElevenLabsClient {
    async fn clone_voice(&self, sample: &MediaBlob, name: &str) -> Result<String, ProviderError> {
        let url = format!("{}/v1/voices/add", self.base_url);

        debug!(
            "Cloning voice: name='{}', sample_type={}, bytes={}",
            name,
            sample.content_type,
            sample.len()
        );

        let part = multipart::Part::bytes(sample.data.clone())
            .file_name(sample.file_name.clone())
            .mime_str(&sample.content_type)?;
        let form = multipart::Form::new()
            .text("name", name.to_string())
            .part("files", part);

        let response = self
            .client
            .post(&url)
            .header(SPEECH_API_KEY_HEADER, &self.api_key)
            .multipart(form)
            .send()
            .await?;

        let added: AddVoiceResponse = ensure_success(response).await?.json().await.map_err(|e| {
            ProviderError::ParseError(format!("Failed to parse voice creation response: {}", e))
        })?;

        Ok(added.voice_id)
    }

    async fn list_personal_voices(&self) -> Result<Vec<VoiceSummary>, ProviderError> {
        let url = format!("{}/v2/voices", self.base_url);

        let response = self
            .client
            .get(&url)
            .header(SPEECH_API_KEY_HEADER, &self.api_key)
            .query(&[
                ("voice_type", "personal"),
                ("sort", "created_at_unix"),
                ("sort_direction", "asc"),
            ])
            .query(&[("page_size", VOICE_PAGE_SIZE)])
            .send()
            .await?;

        let listing: VoicesResponse = ensure_success(response).await?.json().await.map_err(|e| {
            ProviderError::ParseError(format!("Failed to parse voice listing: {}", e))
        })?;

        debug!(
            "Listed {} personal voices (total_count={:?})",
            listing.voices.len(),
            listing.total_count
        );

        Ok(listing.voices)
    }

    async fn delete_voice(&self, voice_id: &str) -> Result<(), ProviderError> {
        let url = format!(
            "{}/v1/voices/{}",
            self.base_url,
            urlencoding::encode(voice_id)
        );

        let response = self
            .client
            .delete(&url)
            .header(SPEECH_API_KEY_HEADER, &self.api_key)
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }

    async fn synthesize(&self, voice_id: &str, text: &str) -> Result<SynthesizedAudio, ProviderError> {
        let url = format!(
            "{}/v1/text-to-speech/{}",
            self.base_url,
            urlencoding::encode(voice_id)
        );

        debug!("Synthesizing speech: voice_id='{}', chars={}", voice_id, text.len());

        let response = self
            .client
            .post(&url)
            .header(SPEECH_API_KEY_HEADER, &self.api_key)
            .header(reqwest::header::ACCEPT, "audio/mpeg")
            .json(&json!({
                "text": text,
                "model_id": self.model_id,
                "voice_settings": {
                    "stability": self.stability,
                    "similarity_boost": self.similarity_boost,
                },
            }))
            .send()
            .await?;

        let response = ensure_success(response).await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        if !is_audio_content_type(&content_type) {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::UnexpectedResponse(format!(
                "expected audio, got '{}': {}",
                content_type,
                body.chars().take(200).collect::<String>()
            )));
        }

        let data = response.bytes().await?.to_vec();
        Ok(SynthesizedAudio { content_type, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_api_key() {
        let result = ElevenLabsClient::new(SpeechProviderConfig::new(""));
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }

    #[test]
    fn test_config_defaults() {
        let config: SpeechProviderConfig = toml::from_str(r#"api_key = "k""#).unwrap();
        assert_eq!(config.base_url, "https://api.elevenlabs.io");
        assert_eq!(config.model_id, "eleven_monolingual_v1");
        assert_eq!(config.stability, 0.5);
        assert_eq!(config.similarity_boost, 0.75);
    }

    #[test]
    fn test_parse_voice_listing() {
        let json = r#"{
            "voices": [
                {"voice_id": "v1", "name": "Voice 1", "created_at_unix": 1700000000, "category": "cloned", "is_owner": true},
                {"voice_id": "v2", "name": "Shared", "created_at_unix": null, "is_owner": false},
                {"voice_id": "v3"}
            ],
            "has_more": false,
            "total_count": 3
        }"#;
        let listing: VoicesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(listing.voices.len(), 3);
        assert_eq!(listing.voices[0].created_at_unix, Some(1_700_000_000));
        assert!(listing.voices[0].is_owner);
        assert_eq!(listing.voices[1].created_at_unix, None);
        assert!(!listing.voices[2].is_owner);
    }

    #[test]
    fn test_audio_content_type_detection() {
        assert!(is_audio_content_type("audio/mpeg"));
        assert!(is_audio_content_type("Audio/MPEG; charset=binary"));
        assert!(!is_audio_content_type("application/json"));
        assert!(!is_audio_content_type(""));
    }
}
