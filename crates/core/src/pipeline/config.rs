//! Pipeline configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the generation pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Delay between two status polls (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Maximum training status polls before giving up.
    #[serde(default = "default_max_polls")]
    pub max_training_polls: u32,

    /// Maximum video status polls before giving up.
    #[serde(default = "default_max_polls")]
    pub max_rendering_polls: u32,
}

fn default_poll_interval() -> u64 {
    5000 // 5 seconds
}

fn default_max_polls() -> u32 {
    120 // 10 minutes at the default interval
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            max_training_polls: default_max_polls(),
            max_rendering_polls: default_max_polls(),
        }
    }
}
