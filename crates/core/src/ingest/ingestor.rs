//! Asset ingestor implementation.

use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{IngestConfig, IngestError};
use crate::metrics;
use crate::provider::{AssetReference, AvatarProvider, MediaBlob, SpeechProvider, VoiceSummary};

/// Identifiers produced by ingesting a voice sample.
///
/// At least one of the two is always present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioReference {
    /// Voice cloned on the speech provider.
    pub voice_id: Option<AssetReference>,
    /// Raw audio asset uploaded to the avatar provider.
    pub audio_asset_id: Option<AssetReference>,
}

/// Outcome of a stale voice reclamation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanupReport {
    /// Number of voices deleted.
    pub deleted: usize,
    /// Errors encountered (listing or individual deletions).
    pub errors: Vec<String>,
}

/// Select the voices eligible for reclamation.
///
/// A voice is stale when it is owned by the account and strictly older than
/// `retention_secs` at `now_unix`. Voices with an unknown creation time are kept.
pub fn select_stale_voices(
    voices: &[VoiceSummary],
    now_unix: i64,
    retention_secs: u64,
) -> Vec<&VoiceSummary> {
    let cutoff = now_unix.saturating_sub(retention_secs as i64);
    voices
        .iter()
        .filter(|v| v.is_owner)
        .filter(|v| matches!(v.created_at_unix, Some(created) if created < cutoff))
        .collect()
}

/// Converts user-provided binaries into provider-side identifiers.
pub struct AssetIngestor {
    avatar: Arc<dyn AvatarProvider>,
    speech: Option<Arc<dyn SpeechProvider>>,
    config: IngestConfig,
}

impl AssetIngestor {
    pub fn new(
        avatar: Arc<dyn AvatarProvider>,
        speech: Option<Arc<dyn SpeechProvider>>,
        config: IngestConfig,
    ) -> Self {
        Self {
            avatar,
            speech,
            config,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Whether voice cloning will be attempted for audio samples.
    pub fn clones_voices(&self) -> bool {
        self.speech.is_some() && self.config.clone_voice
    }

    /// Upload a photo and return its image key.
    pub async fn ingest_image(&self, photo: &MediaBlob) -> Result<AssetReference, IngestError> {
        if photo.is_empty() {
            return Err(IngestError::EmptyBlob("photo"));
        }
        if !photo.is_image() {
            return Err(IngestError::UnsupportedContentType {
                kind: "photo",
                content_type: photo.content_type.clone(),
            });
        }

        let uploaded = self.avatar.upload_asset(photo).await?;
        let image_key = AssetReference::new(uploaded.image_key())
            .ok_or(IngestError::EmptyIdentifier("photo"))?;

        info!("Uploaded photo: image_key='{}'", image_key);
        Ok(image_key)
    }

    /// Ingest a voice sample.
    ///
    /// Clones the voice when a speech provider is available, and uploads the
    /// raw audio asset when cloning is unavailable, fails, or the raw asset
    /// is configured to be kept.
    pub async fn ingest_audio(&self, sample: &MediaBlob) -> Result<AudioReference, IngestError> {
        if sample.is_empty() {
            return Err(IngestError::EmptyBlob("audio"));
        }
        if !sample.is_audio() {
            return Err(IngestError::UnsupportedContentType {
                kind: "audio",
                content_type: sample.content_type.clone(),
            });
        }

        let voice_id = match (&self.speech, self.config.clone_voice) {
            (Some(speech), true) => self.clone_voice(speech.as_ref(), sample).await,
            _ => None,
        };

        let audio_asset_id = if voice_id.is_none() || self.config.keep_audio_asset {
            Some(self.upload_audio_asset(sample).await?)
        } else {
            None
        };

        Ok(AudioReference {
            voice_id,
            audio_asset_id,
        })
    }

    /// Upload the raw recording to the avatar provider.
    pub async fn upload_audio_asset(
        &self,
        sample: &MediaBlob,
    ) -> Result<AssetReference, IngestError> {
        let uploaded = self.avatar.upload_asset(sample).await?;
        let id =
            AssetReference::new(uploaded.asset_id).ok_or(IngestError::EmptyIdentifier("audio"))?;
        info!("Uploaded audio asset: audio_asset_id='{}'", id);
        Ok(id)
    }

    async fn clone_voice(
        &self,
        speech: &dyn SpeechProvider,
        sample: &MediaBlob,
    ) -> Option<AssetReference> {
        let report = self.reclaim_with(speech, Utc::now().timestamp()).await;
        if !report.errors.is_empty() {
            warn!(
                "Voice reclamation finished with {} error(s), continuing",
                report.errors.len()
            );
        }

        let name = format!("Voice {}", Utc::now().timestamp_millis());
        match speech.clone_voice(sample, &name).await {
            Ok(id) => match AssetReference::new(id) {
                Some(id) => {
                    info!("Cloned voice: voice_id='{}'", id);
                    Some(id)
                }
                None => {
                    warn!("Voice cloning returned an empty id, falling back to audio asset");
                    metrics::VOICE_FALLBACKS
                        .with_label_values(&["clone_failed"])
                        .inc();
                    None
                }
            },
            Err(e) => {
                warn!("Voice cloning failed, falling back to audio asset: {}", e);
                metrics::VOICE_FALLBACKS
                    .with_label_values(&["clone_failed"])
                    .inc();
                None
            }
        }
    }

    /// Delete owned cloned voices older than the retention window.
    ///
    /// Never fails: listing and deletion errors are collected in the report.
    pub async fn reclaim_stale_voices(&self) -> CleanupReport {
        self.reclaim_stale_voices_at(Utc::now().timestamp()).await
    }

    /// Same as [`reclaim_stale_voices`](Self::reclaim_stale_voices) with an explicit clock.
    pub async fn reclaim_stale_voices_at(&self, now_unix: i64) -> CleanupReport {
        match &self.speech {
            Some(speech) => self.reclaim_with(speech.as_ref(), now_unix).await,
            None => CleanupReport::default(),
        }
    }

    async fn reclaim_with(&self, speech: &dyn SpeechProvider, now_unix: i64) -> CleanupReport {
        let voices = match speech.list_personal_voices().await {
            Ok(voices) => voices,
            Err(e) => {
                warn!("Failed to list voices for reclamation: {}", e);
                metrics::VOICE_CLEANUP.with_label_values(&["failed"]).inc();
                return CleanupReport {
                    deleted: 0,
                    errors: vec![format!("list voices: {}", e)],
                };
            }
        };

        let stale = select_stale_voices(&voices, now_unix, self.config.voice_retention_secs);
        if stale.is_empty() {
            debug!("No stale voices to reclaim ({} listed)", voices.len());
            return CleanupReport::default();
        }

        debug!("Reclaiming {} stale voices", stale.len());

        let results = join_all(stale.iter().map(|voice| async move {
            speech
                .delete_voice(&voice.voice_id)
                .await
                .map_err(|e| format!("delete {}: {}", voice.voice_id, e))
        }))
        .await;

        let mut report = CleanupReport::default();
        for result in results {
            match result {
                Ok(()) => report.deleted += 1,
                Err(e) => report.errors.push(e),
            }
        }

        metrics::VOICE_CLEANUP
            .with_label_values(&["deleted"])
            .inc_by(report.deleted as u64);
        metrics::VOICE_CLEANUP
            .with_label_values(&["failed"])
            .inc_by(report.errors.len() as u64);

        info!(
            "Voice reclamation: deleted={}, errors={}",
            report.deleted,
            report.errors.len()
        );
        report
    }
}
