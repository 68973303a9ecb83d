use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Provider API keys are present
/// - Polling parameters are non-zero
/// - Relay has at least one allowed origin
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    if config.avatar.api_key.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "avatar.api_key is required".to_string(),
        ));
    }

    if let Some(speech) = &config.speech {
        if speech.api_key.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "speech.api_key is required when [speech] is configured".to_string(),
            ));
        }
    }

    if config.pipeline.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.poll_interval_ms cannot be 0".to_string(),
        ));
    }

    if config.pipeline.max_training_polls == 0 || config.pipeline.max_rendering_polls == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline poll limits must be at least 1".to_string(),
        ));
    }

    if config.relay.allowed_origins.is_empty() {
        return Err(ConfigError::ValidationError(
            "relay.allowed_origins cannot be empty (use \"*\" to allow any)".to_string(),
        ));
    }

    Ok(())
}
