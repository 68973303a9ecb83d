//! Mock speech provider for testing.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::provider::{MediaBlob, ProviderError, SpeechProvider, SynthesizedAudio, VoiceSummary};

/// Speech provider operations, used to target failure injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpeechOp {
    CloneVoice,
    ListVoices,
    DeleteVoice,
    Synthesize,
}

/// A recorded call for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechCall {
    CloneVoice { name: String },
    ListVoices,
    DeleteVoice { voice_id: String },
    Synthesize { voice_id: String, text: String },
}

/// Mock implementation of the SpeechProvider trait.
///
/// Keeps an in-memory voice list: cloning adds an owned voice created
/// "now", deleting removes it. Synthesis echoes the text as bytes.
#[derive(Debug)]
pub struct MockSpeechProvider {
    /// Recorded calls in order.
    calls: Arc<RwLock<Vec<SpeechCall>>>,
    /// Voices on the mock account.
    voices: Arc<RwLock<Vec<VoiceSummary>>>,
    /// One-shot errors by operation.
    failures: Arc<RwLock<HashMap<SpeechOp, ProviderError>>>,
    /// Voice ids whose deletion always fails.
    undeletable: Arc<RwLock<HashSet<String>>>,
    /// Content type returned by synthesis.
    synth_content_type: Arc<RwLock<String>>,
    /// Counter for generating unique ids.
    id_counter: Arc<RwLock<u32>>,
}

impl Default for MockSpeechProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSpeechProvider {
    /// Create a new mock with no voices.
    pub fn new() -> Self {
        Self {
            calls: Arc::new(RwLock::new(Vec::new())),
            voices: Arc::new(RwLock::new(Vec::new())),
            failures: Arc::new(RwLock::new(HashMap::new())),
            undeletable: Arc::new(RwLock::new(HashSet::new())),
            synth_content_type: Arc::new(RwLock::new("audio/mpeg".to_string())),
            id_counter: Arc::new(RwLock::new(0)),
        }
    }

    /// Get all recorded calls.
    pub async fn calls(&self) -> Vec<SpeechCall> {
        self.calls.read().await.clone()
    }

    /// Voices currently on the mock account.
    pub async fn voices(&self) -> Vec<VoiceSummary> {
        self.voices.read().await.clone()
    }

    /// Replace the voices on the mock account.
    pub async fn set_voices(&self, voices: Vec<VoiceSummary>) {
        *self.voices.write().await = voices;
    }

    /// Configure the next call of `op` to fail with the given error.
    pub async fn fail_next(&self, op: SpeechOp, error: ProviderError) {
        self.failures.write().await.insert(op, error);
    }

    /// Configure the next clone to fail.
    pub async fn fail_clone(&self, error: ProviderError) {
        self.fail_next(SpeechOp::CloneVoice, error).await;
    }

    /// Configure the next voice listing to fail.
    pub async fn fail_list(&self, error: ProviderError) {
        self.fail_next(SpeechOp::ListVoices, error).await;
    }

    /// Make every deletion of `voice_id` fail.
    pub async fn fail_delete(&self, voice_id: &str) {
        self.undeletable.write().await.insert(voice_id.to_string());
    }

    /// Content type returned by subsequent syntheses.
    pub async fn set_synth_content_type(&self, content_type: &str) {
        *self.synth_content_type.write().await = content_type.to_string();
    }

    /// Record a call and take the pending error for its operation.
    async fn enter(&self, op: SpeechOp, call: SpeechCall) -> Result<(), ProviderError> {
        self.calls.write().await.push(call);
        match self.failures.write().await.remove(&op) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SpeechProvider for MockSpeechProvider {
    async fn clone_voice(&self, sample: &MediaBlob, name: &str) -> Result<String, ProviderError> {
        self.enter(
            SpeechOp::CloneVoice,
            SpeechCall::CloneVoice {
                name: name.to_string(),
            },
        )
        .await?;

        if sample.is_empty() {
            return Err(ProviderError::ApiError {
                status: 422,
                message: "empty sample".to_string(),
            });
        }

        let voice_id = {
            let mut counter = self.id_counter.write().await;
            *counter += 1;
            format!("cloned-{:04}", *counter)
        };
        self.voices.write().await.push(VoiceSummary {
            voice_id: voice_id.clone(),
            name: name.to_string(),
            created_at_unix: Some(Utc::now().timestamp()),
            category: Some("cloned".to_string()),
            is_owner: true,
        });
        Ok(voice_id)
    }

    async fn list_personal_voices(&self) -> Result<Vec<VoiceSummary>, ProviderError> {
        self.enter(SpeechOp::ListVoices, SpeechCall::ListVoices).await?;
        let mut voices = self.voices.read().await.clone();
        voices.sort_by_key(|v| v.created_at_unix);
        Ok(voices)
    }

    async fn delete_voice(&self, voice_id: &str) -> Result<(), ProviderError> {
        self.enter(
            SpeechOp::DeleteVoice,
            SpeechCall::DeleteVoice {
                voice_id: voice_id.to_string(),
            },
        )
        .await?;

        if self.undeletable.read().await.contains(voice_id) {
            return Err(ProviderError::ApiError {
                status: 500,
                message: format!("cannot delete {}", voice_id),
            });
        }

        let mut voices = self.voices.write().await;
        let before = voices.len();
        voices.retain(|v| v.voice_id != voice_id);
        if voices.len() == before {
            return Err(ProviderError::ApiError {
                status: 404,
                message: format!("voice {} not found", voice_id),
            });
        }
        Ok(())
    }

    async fn synthesize(
        &self,
        voice_id: &str,
        text: &str,
    ) -> Result<SynthesizedAudio, ProviderError> {
        self.enter(
            SpeechOp::Synthesize,
            SpeechCall::Synthesize {
                voice_id: voice_id.to_string(),
                text: text.to_string(),
            },
        )
        .await?;

        Ok(SynthesizedAudio {
            content_type: self.synth_content_type.read().await.clone(),
            data: text.as_bytes().to_vec(),
        })
    }
}
