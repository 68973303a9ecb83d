//! Provider-facing data types.

use serde::{Deserialize, Serialize};

/// A user-provided binary (photo or voice sample).
#[derive(Clone, PartialEq, Eq)]
pub struct MediaBlob {
    /// Original file name, used for multipart uploads.
    pub file_name: String,
    /// MIME type (e.g. `image/jpeg`, `audio/webm`).
    pub content_type: String,
    /// Raw bytes.
    pub data: Vec<u8>,
}

impl MediaBlob {
    pub fn new(
        file_name: impl Into<String>,
        content_type: impl Into<String>,
        data: Vec<u8>,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            data,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    pub fn is_audio(&self) -> bool {
        self.content_type.starts_with("audio/")
    }
}

// Bytes are omitted so logs stay readable.
impl std::fmt::Debug for MediaBlob {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaBlob")
            .field("file_name", &self.file_name)
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}

/// Opaque identifier returned by a provider after accepting an upload.
///
/// Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetReference(String);

impl AssetReference {
    /// Wrap a provider identifier, rejecting empty or blank values.
    pub fn new(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            None
        } else {
            Some(Self(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AssetReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Result of an asset upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadedAsset {
    /// Provider asset id.
    pub asset_id: String,
    /// Image key, when the provider returns one for images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_key: Option<String>,
    /// Public URL of the stored asset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl UploadedAsset {
    /// Key usable to create an avatar group from this asset.
    pub fn image_key(&self) -> String {
        self.image_key
            .clone()
            .unwrap_or_else(|| format!("image/{}/original", self.asset_id))
    }
}

/// Training status of an avatar group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingState {
    Processing,
    Ready,
    Completed,
    Failed,
    /// Any status this client does not know; treated as still in progress.
    #[serde(other)]
    Unknown,
}

impl TrainingState {
    /// `ready` and `completed` both mean the avatar can be used.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Ready | Self::Completed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingStatus {
    pub status: TrainingState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}

impl TrainingStatus {
    pub fn new(status: TrainingState) -> Self {
        Self {
            status,
            error_msg: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: TrainingState::Failed,
            error_msg: Some(message.into()),
        }
    }
}

/// Status of a video generation job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoJobState {
    Pending,
    Processing,
    Waiting,
    Completed,
    Failed,
    #[serde(other)]
    Unknown,
}

impl VideoJobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoStatus {
    pub status: VideoJobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}

impl VideoStatus {
    pub fn new(status: VideoJobState) -> Self {
        Self {
            status,
            video_url: None,
            error_msg: None,
        }
    }

    pub fn completed(url: impl Into<String>) -> Self {
        Self {
            status: VideoJobState::Completed,
            video_url: Some(url.into()),
            error_msg: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: VideoJobState::Failed,
            video_url: None,
            error_msg: Some(message.into()),
        }
    }
}

/// Voice configuration of a video generation request.
///
/// Serialized exactly as the provider expects in `video_inputs[].voice`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VideoVoice {
    /// Text-to-speech with a provider-side voice.
    Text { voice_id: String, input_text: String },
    /// Lip-sync to the uploaded audio asset.
    Audio { audio_asset_id: String },
}

impl VideoVoice {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Audio { .. } => "audio",
        }
    }
}

/// A video generation job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateVideoRequest {
    pub talking_photo_id: String,
    pub voice: VideoVoice,
}

/// A personal voice listed by the speech provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceSummary {
    pub voice_id: String,
    #[serde(default)]
    pub name: String,
    /// Creation time (unix seconds). Unknown ages are never reclaimed.
    #[serde(default)]
    pub created_at_unix: Option<i64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_owner: bool,
}

/// Audio returned by a synthesis request.
#[derive(Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub content_type: String,
    pub data: Vec<u8>,
}

impl std::fmt::Debug for SynthesizedAudio {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynthesizedAudio")
            .field("content_type", &self.content_type)
            .field("len", &self.data.len())
            .finish()
    }
}
