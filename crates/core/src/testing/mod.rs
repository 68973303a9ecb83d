//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of both provider traits,
//! allowing the pipeline and the server to be exercised without network
//! access.
//!
//! # Example
//!
//! ```rust,ignore
//! use talkinghead_core::testing::{fixtures, MockAvatarProvider, MockSpeechProvider};
//!
//! let avatar = Arc::new(MockAvatarProvider::new());
//! let speech = Arc::new(MockSpeechProvider::new());
//!
//! // Keep training busy for two polls
//! avatar.push_training_status(TrainingStatus::new(TrainingState::Processing)).await;
//! avatar.push_training_status(TrainingStatus::new(TrainingState::Processing)).await;
//!
//! let pipeline = GenerationPipeline::new(avatar.clone(), Some(speech.clone()), ..);
//! pipeline.run(&fixtures::video_submission("Hi!"), &observer, &token).await?;
//! ```

mod mock_avatar;
mod mock_speech;

pub use mock_avatar::{AvatarCall, AvatarOp, MockAvatarProvider, MOCK_VIDEO_URL};
pub use mock_speech::{MockSpeechProvider, SpeechCall, SpeechOp};

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::pipeline::{ProgressUpdate, SessionObserver};

/// Observer that records every update it receives.
#[derive(Debug, Default, Clone)]
pub struct RecordingObserver {
    updates: Arc<RwLock<Vec<ProgressUpdate>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// All updates received so far.
    pub async fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates.read().await.clone()
    }

    /// Distinct stages in the order they were first reported.
    pub async fn stages(&self) -> Vec<crate::pipeline::Stage> {
        let mut stages = Vec::new();
        for update in self.updates.read().await.iter() {
            if stages.last() != Some(&update.stage) {
                stages.push(update.stage);
            }
        }
        stages
    }
}

#[async_trait]
impl SessionObserver for RecordingObserver {
    async fn on_progress(&self, update: ProgressUpdate) {
        self.updates.write().await.push(update);
    }
}

/// Test fixtures and helper functions.
pub mod fixtures {
    use crate::pipeline::{Script, Submission};
    use crate::provider::MediaBlob;

    /// A small JPEG-typed photo.
    pub fn photo() -> MediaBlob {
        MediaBlob::new("face.jpg", "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10])
    }

    /// A small WebM-typed voice sample.
    pub fn voice_sample() -> MediaBlob {
        MediaBlob::new("voice.webm", "audio/webm", vec![0x1A, 0x45, 0xDF, 0xA3, 0x01])
    }

    /// A valid video submission speaking `script`.
    pub fn video_submission(script: &str) -> Submission {
        Submission::video(photo(), voice_sample(), script).with_audio_duration(20.0)
    }

    /// A valid speech submission with one script per entry.
    pub fn speech_submission(texts: &[&str]) -> Submission {
        let scripts = texts
            .iter()
            .enumerate()
            .map(|(i, text)| Script::new(format!("clip-{}", i + 1), *text))
            .collect();
        Submission::speech(voice_sample(), scripts).with_audio_duration(20.0)
    }
}
