pub mod config;
pub mod ingest;
pub mod metrics;
pub mod pipeline;
pub mod provider;
pub mod relay;
pub mod scripts;
pub mod session;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use ingest::{AssetIngestor, AudioReference, CleanupReport, IngestConfig, IngestError};
pub use pipeline::{
    Artifact, GenerationMode, GenerationPipeline, PipelineConfig, PipelineError,
    ProgressUpdate, Script, SessionObserver, SpeechClip, Stage, Submission, ValidationError,
};
pub use provider::{
    AssetReference, AvatarProvider, AvatarProviderConfig, ElevenLabsClient, HeyGenClient,
    MediaBlob, ProviderError, SpeechProvider, SpeechProviderConfig,
};
pub use relay::{CorsPolicy, Relay, RelayConfig, RelayError, RelayRequest, RelayResponse, RelayTarget};
pub use scripts::{ScriptSource, ScriptTemplate, SCRIPT_TEMPLATES};
pub use session::{SessionError, SessionManager, SessionSnapshot, SessionUpdateCallback};
