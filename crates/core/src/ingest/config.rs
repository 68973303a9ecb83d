//! Ingestion configuration.

use serde::{Deserialize, Serialize};

/// Configuration for asset ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Try to clone the voice on the speech provider before falling back
    /// to a raw audio asset. Ignored when no speech provider is configured.
    #[serde(default = "default_true")]
    pub clone_voice: bool,

    /// Also upload the raw audio asset when cloning succeeds, so video
    /// sessions can fall back to the original recording.
    #[serde(default = "default_true")]
    pub keep_audio_asset: bool,

    /// Cloned voices older than this are reclaimed before a new clone (seconds).
    #[serde(default = "default_retention")]
    pub voice_retention_secs: u64,

    /// Minimum declared duration of a voice sample (seconds).
    #[serde(default = "default_min_audio_secs")]
    pub min_audio_secs: f32,
}

fn default_true() -> bool {
    true
}

fn default_retention() -> u64 {
    3600 // 1 hour
}

fn default_min_audio_secs() -> f32 {
    15.0
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            clone_voice: true,
            keep_audio_asset: true,
            voice_retention_secs: default_retention(),
            min_audio_secs: default_min_audio_secs(),
        }
    }
}
