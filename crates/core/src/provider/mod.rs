//! Clients for the two third-party providers the pipeline drives.
//!
//! - The avatar provider (HeyGen-compatible API) uploads assets, trains
//!   talking-photo avatars, derives voices and renders videos.
//! - The speech provider (ElevenLabs-compatible API) clones voices from a
//!   sample and synthesizes speech.
//!
//! Both are reached through traits so the pipeline can be driven by mocks
//! in tests (see the `testing` module).

mod elevenlabs;
mod heygen;
mod types;

pub use elevenlabs::{ElevenLabsClient, SpeechProviderConfig, SPEECH_API_KEY_HEADER};
pub use heygen::{AvatarProviderConfig, HeyGenClient, AVATAR_API_KEY_HEADER};
pub use types::*;

use async_trait::async_trait;
use reqwest::Response;
use thiserror::Error;

/// Errors that can occur when talking to a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Provider answered with a non-success status.
    #[error("API error: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Response was well-formed but not what the operation expects.
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),

    /// Client not configured (missing API key, etc.).
    #[error("Provider not configured: {0}")]
    NotConfigured(String),
}

impl ProviderError {
    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiError { status, .. } => Some(*status),
            Self::HttpError(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

/// Operations consumed from the avatar/video provider.
#[async_trait]
pub trait AvatarProvider: Send + Sync {
    /// Upload a binary asset (photo or audio).
    async fn upload_asset(&self, blob: &MediaBlob) -> Result<UploadedAsset, ProviderError>;

    /// Create an avatar group from an uploaded image key. Returns the group id.
    async fn create_avatar_group(&self, image_key: &str, name: &str)
        -> Result<String, ProviderError>;

    /// Ask the provider to start training an avatar group.
    async fn start_training(&self, group_id: &str) -> Result<(), ProviderError>;

    /// Current training status of an avatar group.
    async fn training_status(&self, group_id: &str) -> Result<TrainingStatus, ProviderError>;

    /// Create a provider-side voice from an uploaded audio asset. Returns the voice id.
    async fn create_voice(&self, audio_asset_id: &str, name: &str)
        -> Result<String, ProviderError>;

    /// Register a voice cloned by the speech provider. Returns the provider-side voice id.
    async fn link_voice(&self, cloned_voice_id: &str) -> Result<String, ProviderError>;

    /// Submit a video generation job. Returns the video id.
    async fn generate_video(&self, request: &GenerateVideoRequest)
        -> Result<String, ProviderError>;

    /// Current status of a video job.
    async fn video_status(&self, video_id: &str) -> Result<VideoStatus, ProviderError>;
}

/// Operations consumed from the speech/voice provider.
#[async_trait]
pub trait SpeechProvider: Send + Sync {
    /// Clone a voice from an audio sample. Returns the voice id.
    async fn clone_voice(&self, sample: &MediaBlob, name: &str) -> Result<String, ProviderError>;

    /// List the personal (cloned) voices on the account.
    async fn list_personal_voices(&self) -> Result<Vec<VoiceSummary>, ProviderError>;

    /// Delete a voice by id.
    async fn delete_voice(&self, voice_id: &str) -> Result<(), ProviderError>;

    /// Synthesize speech for `text` with the given voice.
    async fn synthesize(&self, voice_id: &str, text: &str)
        -> Result<SynthesizedAudio, ProviderError>;
}

/// Turn a non-success response into [`ProviderError::ApiError`] carrying the body.
pub(crate) async fn ensure_success(response: Response) -> Result<Response, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ProviderError::ApiError {
        status: status.as_u16(),
        message: body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display_and_status() {
        let err = ProviderError::ApiError {
            status: 403,
            message: "forbidden".to_string(),
        };
        assert_eq!(err.to_string(), "API error: 403 - forbidden");
        assert_eq!(err.status(), Some(403));
    }

    #[test]
    fn test_non_http_errors_have_no_status() {
        let err = ProviderError::UnexpectedResponse("text/html".to_string());
        assert_eq!(err.status(), None);
    }
}
