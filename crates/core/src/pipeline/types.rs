//! Types for the generation pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ingest::IngestError;
use crate::provider::{MediaBlob, ProviderError};

/// What a session produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenerationMode {
    /// A talking-head video rendered by the avatar provider.
    Video,
    /// Audio clips synthesized by the speech provider.
    Speech,
}

impl GenerationMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Video => "video",
            Self::Speech => "speech",
        }
    }
}

impl std::fmt::Display for GenerationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GenerationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "video" => Ok(Self::Video),
            "speech" | "audio" => Ok(Self::Speech),
            other => Err(format!("unknown mode '{}'", other)),
        }
    }
}

/// Pipeline stage of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Idle,
    Uploading,
    Training,
    Voicing,
    Rendering,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Uploading => "uploading",
            Self::Training => "training",
            Self::Voicing => "voicing",
            Self::Rendering => "rendering",
            Self::Done => "done",
        }
    }

    /// Whether the pipeline is currently working in this stage.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::Idle | Self::Done)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A script to speak, with a label used for speech clips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Script {
    pub label: String,
    pub text: String,
}

impl Script {
    pub fn new(label: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            text: text.into(),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// Inputs of one generation session.
#[derive(Debug, Clone)]
pub struct Submission {
    pub mode: GenerationMode,
    /// Photo of the face to animate (video mode only).
    pub photo: Option<MediaBlob>,
    /// Voice sample.
    pub audio: Option<MediaBlob>,
    /// Duration of the voice sample as declared by the client (seconds).
    pub audio_duration_secs: Option<f32>,
    /// Scripts to speak. Video mode uses the first one.
    pub scripts: Vec<Script>,
}

impl Submission {
    /// A video submission speaking `script`.
    pub fn video(photo: MediaBlob, audio: MediaBlob, script: impl Into<String>) -> Self {
        Self {
            mode: GenerationMode::Video,
            photo: Some(photo),
            audio: Some(audio),
            audio_duration_secs: None,
            scripts: vec![Script::new("script", script)],
        }
    }

    /// A speech submission synthesizing every script.
    pub fn speech(audio: MediaBlob, scripts: Vec<Script>) -> Self {
        Self {
            mode: GenerationMode::Speech,
            photo: None,
            audio: Some(audio),
            audio_duration_secs: None,
            scripts,
        }
    }

    pub fn with_audio_duration(mut self, secs: f32) -> Self {
        self.audio_duration_secs = Some(secs);
        self
    }

    /// Check the inputs before any provider is contacted.
    pub fn validate(&self, min_audio_secs: f32) -> Result<(), ValidationError> {
        match &self.audio {
            None => return Err(ValidationError::MissingAudio),
            Some(audio) if audio.is_empty() => return Err(ValidationError::EmptyAudio),
            Some(_) => {}
        }

        if let Some(duration) = self.audio_duration_secs {
            if !duration.is_finite() || duration < 0.0 {
                return Err(ValidationError::InvalidAudioDuration);
            }
            if duration < min_audio_secs {
                return Err(ValidationError::AudioTooShort {
                    actual: duration,
                    min: min_audio_secs,
                });
            }
        }

        match self.mode {
            GenerationMode::Video => {
                match &self.photo {
                    None => return Err(ValidationError::MissingPhoto),
                    Some(photo) if photo.is_empty() => return Err(ValidationError::EmptyPhoto),
                    Some(_) => {}
                }
                match self.scripts.first() {
                    Some(script) if !script.is_blank() => {}
                    _ => return Err(ValidationError::MissingScript),
                }
            }
            GenerationMode::Speech => {
                if self.scripts.is_empty() || self.scripts.iter().any(Script::is_blank) {
                    return Err(ValidationError::MissingScript);
                }
            }
        }

        Ok(())
    }
}

/// Input validation failures. Raised before any network call.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("a photo is required")]
    MissingPhoto,

    #[error("the photo is empty")]
    EmptyPhoto,

    #[error("a voice recording is required")]
    MissingAudio,

    #[error("the voice recording is empty")]
    EmptyAudio,

    #[error("the voice recording is too short ({actual:.1}s, minimum {min:.0}s)")]
    AudioTooShort { actual: f32, min: f32 },

    #[error("the declared recording duration is not a valid number of seconds")]
    InvalidAudioDuration,

    #[error("a non-empty script is required")]
    MissingScript,

    #[error("unknown script template '{0}'")]
    UnknownTemplate(String),
}

/// One synthesized audio clip.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpeechClip {
    pub label: String,
    pub text: String,
    pub content_type: String,
    pub size_bytes: usize,
    /// Audio bytes, served separately from session snapshots.
    #[serde(skip)]
    pub data: Vec<u8>,
}

impl std::fmt::Debug for SpeechClip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpeechClip")
            .field("label", &self.label)
            .field("content_type", &self.content_type)
            .field("size_bytes", &self.size_bytes)
            .finish()
    }
}

/// Final product of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Artifact {
    Video { url: String },
    Speech { clips: Vec<SpeechClip> },
}

/// A progress report emitted by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub stage: Stage,
    /// 0-100, never decreasing within a run.
    pub progress: u8,
    /// Human-readable detail for the current step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Errors that abort a session.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid submission: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Upload(#[from] IngestError),

    #[error("avatar training failed: {0}")]
    TrainingFailed(String),

    #[error("video rendering failed: {0}")]
    RenderingFailed(String),

    #[error("no cloned voice available for speech synthesis")]
    VoiceUnavailable,

    #[error("missing {0}")]
    MissingAsset(&'static str),

    #[error("{stage} did not finish after {attempts} status checks")]
    PollTimeout { stage: Stage, attempts: u32 },

    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("session cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Text shown on the failed session. Provider job failures carry the
    /// provider's own message verbatim.
    pub fn session_message(&self) -> String {
        match self {
            Self::TrainingFailed(message) | Self::RenderingFailed(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn photo() -> MediaBlob {
        MediaBlob::new("face.jpg", "image/jpeg", vec![1, 2, 3])
    }

    fn audio() -> MediaBlob {
        MediaBlob::new("voice.webm", "audio/webm", vec![4, 5, 6])
    }

    #[test]
    fn test_video_submission_valid() {
        let submission = Submission::video(photo(), audio(), "Hello!").with_audio_duration(20.0);
        assert!(submission.validate(15.0).is_ok());
    }

    #[test]
    fn test_video_submission_requires_photo_and_script() {
        let mut submission = Submission::video(photo(), audio(), "  ");
        assert_eq!(submission.validate(15.0), Err(ValidationError::MissingScript));

        submission.scripts = vec![Script::new("script", "Hi")];
        submission.photo = None;
        assert_eq!(submission.validate(15.0), Err(ValidationError::MissingPhoto));
    }

    #[test]
    fn test_audio_checks() {
        let mut submission = Submission::video(photo(), audio(), "Hi");
        submission.audio = Some(MediaBlob::new("v.webm", "audio/webm", vec![]));
        assert_eq!(submission.validate(15.0), Err(ValidationError::EmptyAudio));

        submission.audio = None;
        assert_eq!(submission.validate(15.0), Err(ValidationError::MissingAudio));

        let short = Submission::video(photo(), audio(), "Hi").with_audio_duration(3.5);
        assert!(matches!(
            short.validate(15.0),
            Err(ValidationError::AudioTooShort { .. })
        ));
    }

    #[test]
    fn test_declared_duration_must_be_finite_and_non_negative() {
        for secs in [f32::NAN, f32::INFINITY, f32::NEG_INFINITY, -20.0] {
            let submission = Submission::video(photo(), audio(), "Hi").with_audio_duration(secs);
            assert_eq!(
                submission.validate(15.0),
                Err(ValidationError::InvalidAudioDuration),
                "duration {} should be rejected",
                secs
            );
        }
    }

    #[test]
    fn test_speech_submission_ignores_photo() {
        let submission = Submission::speech(audio(), vec![Script::new("a", "One")]);
        assert!(submission.validate(15.0).is_ok());

        let empty = Submission::speech(audio(), vec![]);
        assert_eq!(empty.validate(15.0), Err(ValidationError::MissingScript));
    }

    #[test]
    fn test_session_message_keeps_provider_text() {
        assert_eq!(
            PipelineError::TrainingFailed("no face detected".to_string()).session_message(),
            "no face detected"
        );
        assert_eq!(
            PipelineError::RenderingFailed("quota exceeded".to_string()).session_message(),
            "quota exceeded"
        );
        assert_eq!(
            PipelineError::MissingAsset("audio asset").session_message(),
            "missing audio asset"
        );
    }

    #[test]
    fn test_mode_parsing() {
        assert_eq!("video".parse::<GenerationMode>(), Ok(GenerationMode::Video));
        assert_eq!("Speech".parse::<GenerationMode>(), Ok(GenerationMode::Speech));
        assert!("gif".parse::<GenerationMode>().is_err());
    }

    #[test]
    fn test_stage_serialization() {
        assert_eq!(serde_json::to_string(&Stage::Voicing).unwrap(), "\"voicing\"");
        assert!(Stage::Training.is_active());
        assert!(!Stage::Done.is_active());
    }

    #[test]
    fn test_speech_clip_serialization_omits_bytes() {
        let clip = SpeechClip {
            label: "a".to_string(),
            text: "One".to_string(),
            content_type: "audio/mpeg".to_string(),
            size_bytes: 3,
            data: vec![1, 2, 3],
        };
        let json = serde_json::to_value(&clip).unwrap();
        assert!(json.get("data").is_none());
        assert_eq!(json["size_bytes"], 3);
    }
}
