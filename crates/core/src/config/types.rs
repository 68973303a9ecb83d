use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::ingest::IngestConfig;
use crate::pipeline::PipelineConfig;
use crate::provider::{AvatarProviderConfig, SpeechProviderConfig};
use crate::relay::RelayConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    /// Avatar/video provider (required, every video session needs it).
    pub avatar: AvatarProviderConfig,
    /// Speech/voice provider. Voice cloning and speech sessions are
    /// unavailable without it.
    #[serde(default)]
    pub speech: Option<SpeechProviderConfig>,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub relay: RelayConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum accepted upload body in bytes (photo + audio).
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_upload_bytes: default_max_upload_bytes(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8080
}

fn default_max_upload_bytes() -> usize {
    25 * 1024 * 1024
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub avatar: SanitizedProviderConfig,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub speech: Option<SanitizedProviderConfig>,
    pub ingest: IngestConfig,
    pub pipeline: PipelineConfig,
    pub relay: RelayConfig,
}

/// Provider config with the API key hidden.
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProviderConfig {
    pub base_url: String,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            avatar: SanitizedProviderConfig {
                base_url: config.avatar.base_url.clone(),
                api_key_configured: !config.avatar.api_key.is_empty(),
                timeout_secs: config.avatar.timeout_secs,
            },
            speech: config.speech.as_ref().map(|s| SanitizedProviderConfig {
                base_url: s.base_url.clone(),
                api_key_configured: !s.api_key.is_empty(),
                timeout_secs: s.timeout_secs,
            }),
            ingest: config.ingest.clone(),
            pipeline: config.pipeline.clone(),
            relay: config.relay.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_config() {
        let toml = r#"
[avatar]
api_key = "hg-key"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.avatar.api_key, "hg-key");
        assert_eq!(config.avatar.base_url, "https://api.heygen.com");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
        assert!(config.speech.is_none());
        assert_eq!(config.pipeline.poll_interval_ms, 5000);
        assert_eq!(config.ingest.voice_retention_secs, 3600);
    }

    #[test]
    fn test_deserialize_missing_avatar_fails() {
        let toml = r#"
[server]
port = 8080
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[server]
host = "127.0.0.1"
port = 9000

[avatar]
api_key = "hg-key"
base_url = "http://localhost:8787/relay/avatar"
timeout_secs = 10

[speech]
api_key = "xi-key"
model_id = "eleven_multilingual_v2"

[ingest]
clone_voice = false
min_audio_secs = 5.0

[pipeline]
poll_interval_ms = 1000
max_training_polls = 10

[relay]
allowed_origins = ["http://localhost:3000"]
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.avatar.timeout_secs, 10);
        let speech = config.speech.as_ref().unwrap();
        assert_eq!(speech.api_key, "xi-key");
        assert_eq!(speech.model_id, "eleven_multilingual_v2");
        assert_eq!(speech.base_url, "https://api.elevenlabs.io");
        assert!(!config.ingest.clone_voice);
        assert_eq!(config.ingest.min_audio_secs, 5.0);
        assert_eq!(config.pipeline.poll_interval_ms, 1000);
        assert_eq!(config.pipeline.max_training_polls, 10);
        assert_eq!(config.pipeline.max_rendering_polls, 120);
        assert_eq!(config.relay.allowed_origins, vec!["http://localhost:3000"]);
    }

    #[test]
    fn test_sanitized_config_hides_keys() {
        let toml = r#"
[avatar]
api_key = "secret-avatar"

[speech]
api_key = ""
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let sanitized = SanitizedConfig::from(&config);
        assert!(sanitized.avatar.api_key_configured);
        assert!(!sanitized.speech.as_ref().unwrap().api_key_configured);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-avatar"));
    }
}
