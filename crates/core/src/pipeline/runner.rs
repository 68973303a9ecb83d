//! Pipeline runner.
//!
//! One [`GenerationPipeline`] is shared by every session; each call to
//! [`GenerationPipeline::run`] drives a single submission to completion.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::ingest::{AssetIngestor, AudioReference, IngestConfig};
use crate::metrics;
use crate::provider::{
    AssetReference, AvatarProvider, GenerateVideoRequest, MediaBlob, ProviderError,
    SpeechProvider, TrainingState, VideoJobState, VideoVoice,
};

use super::config::PipelineConfig;
use super::progress::ProgressTracker;
use super::types::{
    Artifact, GenerationMode, PipelineError, ProgressUpdate, SpeechClip, Stage, Submission,
    ValidationError,
};

/// Receives progress updates from a running pipeline.
#[async_trait]
pub trait SessionObserver: Send + Sync {
    async fn on_progress(&self, update: ProgressUpdate);
}

/// Observer that ignores every update.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

#[async_trait]
impl SessionObserver for NoopObserver {
    async fn on_progress(&self, _update: ProgressUpdate) {}
}

/// Drives submissions through the provider calls.
pub struct GenerationPipeline {
    avatar: Arc<dyn AvatarProvider>,
    speech: Option<Arc<dyn SpeechProvider>>,
    ingestor: AssetIngestor,
    config: PipelineConfig,
}

impl GenerationPipeline {
    pub fn new(
        avatar: Arc<dyn AvatarProvider>,
        speech: Option<Arc<dyn SpeechProvider>>,
        ingest_config: IngestConfig,
        config: PipelineConfig,
    ) -> Self {
        let ingestor = AssetIngestor::new(Arc::clone(&avatar), speech.clone(), ingest_config);
        Self {
            avatar,
            speech,
            ingestor,
            config,
        }
    }

    pub fn ingestor(&self) -> &AssetIngestor {
        &self.ingestor
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Whether speech-mode sessions can run at all.
    pub fn supports_speech(&self) -> bool {
        self.speech.is_some()
    }

    /// Validate a submission without contacting any provider.
    pub fn validate(&self, submission: &Submission) -> Result<(), ValidationError> {
        let result = submission.validate(self.ingestor.config().min_audio_secs);
        if let Err(e) = &result {
            debug!("Rejected submission: {}", e);
            metrics::VALIDATION_REJECTIONS.inc();
        }
        result
    }

    /// Run a submission to completion.
    ///
    /// Progress is reported to `observer` until the run finishes or `cancel`
    /// fires; after cancellation no further update is emitted and the run
    /// returns [`PipelineError::Cancelled`].
    pub async fn run(
        &self,
        submission: &Submission,
        observer: &dyn SessionObserver,
        cancel: &CancellationToken,
    ) -> Result<Artifact, PipelineError> {
        self.validate(submission)?;

        let mut run = Run {
            pipeline: self,
            observer,
            cancel,
            tracker: ProgressTracker::new(submission.mode),
        };

        match submission.mode {
            GenerationMode::Video => run.video(submission).await,
            GenerationMode::Speech => run.speech(submission).await,
        }
    }
}

/// State of one pipeline run.
struct Run<'a> {
    pipeline: &'a GenerationPipeline,
    observer: &'a dyn SessionObserver,
    cancel: &'a CancellationToken,
    tracker: ProgressTracker,
}

impl<'a> Run<'a> {
    async fn video(&mut self, submission: &Submission) -> Result<Artifact, PipelineError> {
        let pipeline: &'a GenerationPipeline = self.pipeline;
        let avatar = pipeline.avatar.as_ref();

        let photo = submission.photo.as_ref().ok_or(PipelineError::MissingAsset("photo"))?;
        let audio = submission.audio.as_ref().ok_or(PipelineError::MissingAsset("audio"))?;
        let script = submission
            .scripts
            .first()
            .map(|s| s.text.as_str())
            .ok_or(PipelineError::MissingAsset("script"))?;

        // Uploading
        self.enter(Stage::Uploading, "Uploading photo").await?;
        let image_key = self.call(pipeline.ingestor.ingest_image(photo)).await?;
        self.report_fraction(0.4, "Uploading voice sample").await;
        let audio_ref = self.call(pipeline.ingestor.ingest_audio(audio)).await?;
        self.report_fraction(0.8, "Assets uploaded").await;

        // Training
        self.enter(Stage::Training, "Creating avatar").await?;
        let group_name = format!("Avatar Group {}", Utc::now().timestamp_millis());
        let group_id = self
            .call(avatar.create_avatar_group(image_key.as_str(), &group_name))
            .await?;
        let group_id = AssetReference::new(group_id).ok_or_else(|| {
            ProviderError::UnexpectedResponse("empty avatar group id".to_string())
        })?;
        info!("Created avatar group: group_id='{}'", group_id);

        self.call(avatar.start_training(group_id.as_str())).await?;
        self.report_step(1, "Training avatar").await;

        let group = group_id.as_str();
        let max_training_polls = pipeline.config.max_training_polls;
        self.poll(Stage::Training, max_training_polls, || async move {
            let status = avatar.training_status(group).await?;
            match status.status {
                state if state.is_success() => Ok(Some(())),
                TrainingState::Failed => Err(PipelineError::TrainingFailed(
                    status
                        .error_msg
                        .unwrap_or_else(|| "Training failed".to_string()),
                )),
                _ => Ok(None),
            }
        })
        .await?;
        info!("Avatar training finished: group_id='{}'", group_id);

        // Voicing
        self.enter(Stage::Voicing, "Preparing voice").await?;
        let voice = self.resolve_voice(&audio_ref, audio, script).await?;
        debug!("Using {} voice for rendering", voice.kind());

        // Rendering
        self.enter(Stage::Rendering, "Generating video").await?;
        let request = GenerateVideoRequest {
            talking_photo_id: group_id.to_string(),
            voice,
        };
        let video_id = self.call(avatar.generate_video(&request)).await?;
        let video_id = AssetReference::new(video_id)
            .ok_or_else(|| ProviderError::UnexpectedResponse("empty video id".to_string()))?;
        info!("Video generation started: video_id='{}'", video_id);

        let video = video_id.as_str();
        let max_rendering_polls = pipeline.config.max_rendering_polls;
        let url = self
            .poll(Stage::Rendering, max_rendering_polls, || async move {
                let status = avatar.video_status(video).await?;
                match status.status {
                    VideoJobState::Completed => status
                        .video_url
                        .filter(|url| !url.trim().is_empty())
                        .map(Some)
                        .ok_or_else(|| {
                            PipelineError::RenderingFailed(
                                "video completed without a URL".to_string(),
                            )
                        }),
                    VideoJobState::Failed => Err(PipelineError::RenderingFailed(
                        status
                            .error_msg
                            .unwrap_or_else(|| "Video generation failed".to_string()),
                    )),
                    _ => Ok(None),
                }
            })
            .await?;

        self.finish().await?;
        info!("Video ready: url='{}'", url);
        Ok(Artifact::Video { url })
    }

    async fn speech(&mut self, submission: &Submission) -> Result<Artifact, PipelineError> {
        let pipeline: &'a GenerationPipeline = self.pipeline;
        let speech = pipeline
            .speech
            .as_deref()
            .ok_or(PipelineError::VoiceUnavailable)?;
        let audio = submission.audio.as_ref().ok_or(PipelineError::MissingAsset("audio"))?;

        // Uploading
        self.enter(Stage::Uploading, "Cloning voice").await?;
        let audio_ref = self.call(pipeline.ingestor.ingest_audio(audio)).await?;
        let voice_id = audio_ref.voice_id.ok_or(PipelineError::VoiceUnavailable)?;
        self.report_fraction(0.8, "Voice ready").await;

        // Voicing
        self.enter(Stage::Voicing, "Synthesizing speech").await?;
        let total = submission.scripts.len();
        let mut clips = Vec::with_capacity(total);
        for (index, script) in submission.scripts.iter().enumerate() {
            let synthesized = self
                .call(speech.synthesize(voice_id.as_str(), &script.text))
                .await?;
            if !synthesized.content_type.starts_with("audio/") {
                return Err(ProviderError::UnexpectedResponse(format!(
                    "expected audio for '{}', got '{}'",
                    script.label, synthesized.content_type
                ))
                .into());
            }

            debug!(
                "Synthesized clip {}/{}: label='{}', bytes={}",
                index + 1,
                total,
                script.label,
                synthesized.data.len()
            );
            clips.push(SpeechClip {
                label: script.label.clone(),
                text: script.text.clone(),
                content_type: synthesized.content_type,
                size_bytes: synthesized.data.len(),
                data: synthesized.data,
            });

            let message = format!("Synthesized {}/{}", index + 1, total);
            self.report_fraction((index + 1) as f32 / total as f32, &message)
                .await;
        }

        self.finish().await?;
        info!("Speech ready: {} clip(s)", clips.len());
        Ok(Artifact::Speech { clips })
    }

    /// Derive a provider-side voice, falling back to the recorded audio.
    async fn resolve_voice(
        &mut self,
        audio: &AudioReference,
        sample: &MediaBlob,
        script: &str,
    ) -> Result<VideoVoice, PipelineError> {
        let avatar = self.pipeline.avatar.as_ref();

        let derived = match (&audio.voice_id, &audio.audio_asset_id) {
            (Some(cloned), _) => self.call(avatar.link_voice(cloned.as_str())).await,
            (None, Some(asset)) => {
                let name = format!("Voice {}", Utc::now().timestamp_millis());
                self.call(avatar.create_voice(asset.as_str(), &name)).await
            }
            (None, None) => return Err(PipelineError::MissingAsset("voice sample")),
        };

        match derived {
            Ok(voice_id) if !voice_id.trim().is_empty() => {
                info!("Voice ready: voice_id='{}'", voice_id);
                return Ok(VideoVoice::Text {
                    voice_id,
                    input_text: script.to_string(),
                });
            }
            Ok(_) => warn!("Provider returned an empty voice id, using the recorded audio"),
            Err(PipelineError::Cancelled) => return Err(PipelineError::Cancelled),
            Err(e) => warn!("Voice creation failed, using the recorded audio: {}", e),
        }

        metrics::VOICE_FALLBACKS
            .with_label_values(&["voice_creation_failed"])
            .inc();

        // The raw recording is only uploaded up front when configured to be kept
        let asset = match &audio.audio_asset_id {
            Some(asset) => asset.clone(),
            None => {
                let ingestor = &self.pipeline.ingestor;
                self.call(ingestor.upload_audio_asset(sample)).await?
            }
        };
        Ok(VideoVoice::Audio {
            audio_asset_id: asset.to_string(),
        })
    }

    /// Poll `check` until it yields a value, fails, or the attempts run out.
    async fn poll<T, F, Fut>(
        &mut self,
        stage: Stage,
        max_attempts: u32,
        mut check: F,
    ) -> Result<T, PipelineError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>, PipelineError>>,
    {
        for attempt in 1..=max_attempts {
            metrics::PROVIDER_POLLS
                .with_label_values(&[stage.as_str()])
                .inc();

            if let Some(value) = self.call(check()).await? {
                debug!("{} finished after {} status check(s)", stage, attempt);
                return Ok(value);
            }

            let progress = self.tracker.step(attempt);
            self.emit(progress, None).await;

            if attempt < max_attempts {
                self.sleep().await?;
            }
        }

        warn!("{} still pending after {} status checks", stage, max_attempts);
        metrics::POLL_TIMEOUTS
            .with_label_values(&[stage.as_str()])
            .inc();
        Err(PipelineError::PollTimeout {
            stage,
            attempts: max_attempts,
        })
    }

    /// Await a provider call unless the run is cancelled first.
    async fn call<T, E, Fut>(&self, fut: Fut) -> Result<T, PipelineError>
    where
        E: Into<PipelineError>,
        Fut: Future<Output = Result<T, E>>,
    {
        self.check_cancelled()?;
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(PipelineError::Cancelled),
            result = fut => result.map_err(Into::into),
        }
    }

    async fn sleep(&self) -> Result<(), PipelineError> {
        let interval = Duration::from_millis(self.pipeline.config.poll_interval_ms);
        tokio::select! {
            _ = self.cancel.cancelled() => Err(PipelineError::Cancelled),
            _ = tokio::time::sleep(interval) => Ok(()),
        }
    }

    fn check_cancelled(&self) -> Result<(), PipelineError> {
        if self.cancel.is_cancelled() {
            Err(PipelineError::Cancelled)
        } else {
            Ok(())
        }
    }

    async fn enter(&mut self, stage: Stage, message: &str) -> Result<(), PipelineError> {
        self.check_cancelled()?;
        let progress = self.tracker.enter(stage);
        metrics::STAGE_TRANSITIONS
            .with_label_values(&[stage.as_str()])
            .inc();
        info!("Entering {} ({}%)", stage, progress);
        self.emit(progress, Some(message.to_string())).await;
        Ok(())
    }

    async fn finish(&mut self) -> Result<(), PipelineError> {
        self.check_cancelled()?;
        let progress = self.tracker.finish();
        metrics::STAGE_TRANSITIONS
            .with_label_values(&[Stage::Done.as_str()])
            .inc();
        self.emit(progress, Some("Done".to_string())).await;
        Ok(())
    }

    async fn report_step(&mut self, step: u32, message: &str) {
        let progress = self.tracker.step(step);
        self.emit(progress, Some(message.to_string())).await;
    }

    async fn report_fraction(&mut self, fraction: f32, message: &str) {
        let progress = self.tracker.fraction(fraction);
        self.emit(progress, Some(message.to_string())).await;
    }

    async fn emit(&self, progress: u8, message: Option<String>) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.observer
            .on_progress(ProgressUpdate {
                stage: self.tracker.stage(),
                progress,
                message,
            })
            .await;
    }
}
