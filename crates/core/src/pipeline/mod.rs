//! Generation pipeline: drives one submission through the provider calls.
//!
//! Video mode: `idle → uploading → training → voicing → rendering → done`.
//! Speech mode: `idle → uploading → voicing → done`.
//!
//! The pipeline reports every transition to a [`SessionObserver`] and stops
//! as soon as its cancellation token fires.

mod config;
mod progress;
mod runner;
mod types;

pub use config::PipelineConfig;
pub use progress::{stage_band, ProgressTracker};
pub use runner::{GenerationPipeline, NoopObserver, SessionObserver};
pub use types::{
    Artifact, GenerationMode, PipelineError, ProgressUpdate, Script, SpeechClip, Stage,
    Submission, ValidationError,
};
