//! Mock avatar provider for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::provider::{
    AvatarProvider, GenerateVideoRequest, MediaBlob, ProviderError, TrainingState,
    TrainingStatus, UploadedAsset, VideoStatus,
};

/// Avatar provider operations, used to target failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AvatarOp {
    UploadAsset,
    CreateAvatarGroup,
    StartTraining,
    TrainingStatus,
    CreateVoice,
    LinkVoice,
    GenerateVideo,
    VideoStatus,
}

/// A recorded call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AvatarCall {
    UploadAsset { content_type: String, bytes: usize },
    CreateAvatarGroup { image_key: String, name: String },
    StartTraining { group_id: String },
    TrainingStatus { group_id: String },
    CreateVoice { audio_asset_id: String, name: String },
    LinkVoice { voice_id: String },
    GenerateVideo(GenerateVideoRequest),
    VideoStatus { video_id: String },
}

/// Default URL returned for completed videos.
pub const MOCK_VIDEO_URL: &str = "https://cdn.mock/video.mp4";

/// Mock implementation of the AvatarProvider trait.
///
/// Provides controllable behavior for testing:
/// - Scripted training and video statuses (falling back to a default once
///   the script is exhausted)
/// - One-shot failure injection per operation
/// - Recorded calls for assertions
///
/// # Example
///
/// ```rust,ignore
/// let avatar = MockAvatarProvider::new();
/// avatar.push_training_status(TrainingStatus::new(TrainingState::Processing)).await;
/// avatar.fail_next(AvatarOp::CreateVoice, ProviderError::ApiError {
///     status: 403,
///     message: "forbidden".into(),
/// }).await;
///
/// // ... run the pipeline ...
///
/// let calls = avatar.calls().await;
/// assert!(calls.iter().any(|c| matches!(c, AvatarCall::GenerateVideo(_))));
/// ```
#[derive(Debug)]
pub struct MockAvatarProvider {
    /// Recorded calls in order.
    calls: Arc<RwLock<Vec<AvatarCall>>>,
    /// One-shot errors by operation.
    failures: Arc<RwLock<HashMap<AvatarOp, ProviderError>>>,
    /// Scripted training statuses, consumed one per poll.
    training_statuses: Arc<RwLock<VecDeque<TrainingStatus>>>,
    /// Returned once the training script is exhausted.
    default_training_status: Arc<RwLock<TrainingStatus>>,
    /// Scripted video statuses, consumed one per poll.
    video_statuses: Arc<RwLock<VecDeque<VideoStatus>>>,
    /// Returned once the video script is exhausted.
    default_video_status: Arc<RwLock<VideoStatus>>,
    /// Counter for generating unique ids.
    id_counter: Arc<RwLock<u32>>,
}

impl Default for MockAvatarProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAvatarProvider {
    /// Create a mock whose training and rendering complete on the first poll.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            training_statuses: Arc::new(RwLock::new(VecDeque::new())),
            default_training_status: Arc::new(RwLock::new(TrainingStatus::new(
                TrainingState::Completed,
            ))),
            video_statuses: Arc::new(RwLock::new(VecDeque::new())),
            default_video_status: Arc::new(RwLock::new(VideoStatus::completed(MOCK_VIDEO_URL))),
            id_counter: Arc::new(RwLock::new(0)),
        }
    }

    /// Get all recorded calls.
    pub async fn calls(&self) -> Vec<AvatarCall> {
        self.calls.read().await.clone()
    }

    /// Clear recorded calls.
    pub async fn clear_recorded(&self) {
        self.calls.write().await.clear();
    }

    /// Configure the next call of `op` to fail with the given error.
    pub async fn fail_next(&self, op: AvatarOp, error: ProviderError) {
        self.failures.write().await.insert(op, error);
    }

    /// Configure the next upload to fail.
    pub async fn fail_upload(&self, error: ProviderError) {
        self.fail_next(AvatarOp::UploadAsset, error).await;
    }

    /// Queue a training status for the next poll.
    pub async fn push_training_status(&self, status: TrainingStatus) {
        self.training_statuses.write().await.push_back(status);
    }

    /// Status returned when no scripted training status is queued.
    pub async fn set_default_training_status(&self, status: TrainingStatus) {
        *self.default_training_status.write().await = status;
    }

    /// Queue a video status for the next poll.
    pub async fn push_video_status(&self, status: VideoStatus) {
        self.video_statuses.write().await.push_back(status);
    }

    /// Status returned when no scripted video status is queued.
    pub async fn set_default_video_status(&self, status: VideoStatus) {
        *self.default_video_status.write().await = status;
    }

    /// Record a call and take the pending error for its operation.
    async fn enter(&self, op: AvatarOp, call: AvatarCall) -> Result<(), ProviderError> {
        self.calls.write().await.push(call);
        match self.failures.write().await.remove(&op) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    /// Generate a unique mock id.
    async fn generate_id(&self, prefix: &str) -> String {
        let mut counter = self.id_counter.write().await;
        *counter += 1;
        format!("{}-{:04}", prefix, *counter)
    }
}

#[async_trait]
impl AvatarProvider for MockAvatarProvider {
    async fn upload_asset(&self, blob: &MediaBlob) -> Result<UploadedAsset, ProviderError> {
        self.enter(
            AvatarOp::UploadAsset,
            AvatarCall::UploadAsset {
                content_type: blob.content_type.clone(),
                bytes: blob.len(),
            },
        )
        .await?;

        let asset_id = self.generate_id("asset").await;
        let image_key = blob
            .is_image()
            .then(|| format!("image/{}/original", asset_id));
        Ok(UploadedAsset {
            url: Some(format!("https://assets.mock/{}", asset_id)),
            asset_id,
            image_key,
        })
    }

    async fn create_avatar_group(
        &self,
        image_key: &str,
        name: &str,
    ) -> Result<String, ProviderError> {
        self.enter(
            AvatarOp::CreateAvatarGroup,
            AvatarCall::CreateAvatarGroup {
                image_key: image_key.to_string(),
                name: name.to_string(),
            },
        )
        .await?;
        Ok(self.generate_id("group").await)
    }

    async fn start_training(&self, group_id: &str) -> Result<(), ProviderError> {
        self.enter(
            AvatarOp::StartTraining,
            AvatarCall::StartTraining {
                group_id: group_id.to_string(),
            },
        )
        .await
    }

    async fn training_status(&self, group_id: &str) -> Result<TrainingStatus, ProviderError> {
        self.enter(
            AvatarOp::TrainingStatus,
            AvatarCall::TrainingStatus {
                group_id: group_id.to_string(),
            },
        )
        .await?;

        if let Some(status) = self.training_statuses.write().await.pop_front() {
            return Ok(status);
        }
        Ok(self.default_training_status.read().await.clone())
    }

    async fn create_voice(
        &self,
        audio_asset_id: &str,
        name: &str,
    ) -> Result<String, ProviderError> {
        self.enter(
            AvatarOp::CreateVoice,
            AvatarCall::CreateVoice {
                audio_asset_id: audio_asset_id.to_string(),
                name: name.to_string(),
            },
        )
        .await?;
        Ok(self.generate_id("brand-voice").await)
    }

    async fn link_voice(&self, cloned_voice_id: &str) -> Result<String, ProviderError> {
        self.enter(
            AvatarOp::LinkVoice,
            AvatarCall::LinkVoice {
                voice_id: cloned_voice_id.to_string(),
            },
        )
        .await?;
        Ok(format!("linked-{}", cloned_voice_id))
    }

    async fn generate_video(
        &self,
        request: &GenerateVideoRequest,
    ) -> Result<String, ProviderError> {
        self.enter(AvatarOp::GenerateVideo, AvatarCall::GenerateVideo(request.clone()))
            .await?;
        Ok(self.generate_id("video").await)
    }

    async fn video_status(&self, video_id: &str) -> Result<VideoStatus, ProviderError> {
        self.enter(
            AvatarOp::VideoStatus,
            AvatarCall::VideoStatus {
                video_id: video_id.to_string(),
            },
        )
        .await?;

        if let Some(status) = self.video_statuses.write().await.pop_front() {
            return Ok(status);
        }
        Ok(self.default_video_status.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::VideoJobState;

    #[tokio::test]
    async fn test_scripted_statuses_then_default() {
        let avatar = MockAvatarProvider::new();
        avatar
            .push_video_status(VideoStatus::new(VideoJobState::Pending))
            .await;

        let first = avatar.video_status("v").await.unwrap();
        assert_eq!(first.status, VideoJobState::Pending);
        let second = avatar.video_status("v").await.unwrap();
        assert_eq!(second.status, VideoJobState::Completed);
        assert_eq!(second.video_url.as_deref(), Some(MOCK_VIDEO_URL));
    }

    #[tokio::test]
    async fn test_failure_is_one_shot() {
        let avatar = MockAvatarProvider::new();
        avatar
            .fail_next(
                AvatarOp::CreateVoice,
                ProviderError::ApiError {
                    status: 403,
                    message: "forbidden".to_string(),
                },
            )
            .await;

        assert!(avatar.create_voice("a", "n").await.is_err());
        assert!(avatar.create_voice("a", "n").await.is_ok());
        assert_eq!(avatar.calls().await.len(), 2);
    }
}
