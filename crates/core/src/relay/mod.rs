//! Pass-through relay to the provider APIs.
//!
//! A browser client cannot call the providers directly (no CORS), so the
//! relay forwards its requests upstream, attaches the API key when needed,
//! and adds cross-origin headers to every response.

mod config;
mod cors;
mod forward;

pub use config::{RelayConfig, RelayUpstreams};
pub use cors::CorsPolicy;
pub use forward::{Relay, RelayRequest, RelayResponse};

use reqwest::StatusCode;
use thiserror::Error;

use crate::provider::{AVATAR_API_KEY_HEADER, SPEECH_API_KEY_HEADER};

/// Errors raised while relaying a request.
#[derive(Debug, Error)]
pub enum RelayError {
    /// No API key in the request nor in the configuration.
    #[error("Missing required parameters")]
    MissingParameters,

    /// The provider segment of the path is not a known target.
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),

    /// The upstream call failed before a response was received.
    #[error("{0}")]
    Upstream(#[from] reqwest::Error),
}

impl RelayError {
    /// HTTP status returned to the caller.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingParameters => StatusCode::BAD_REQUEST,
            Self::UnknownProvider(_) => StatusCode::NOT_FOUND,
            Self::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Upstream a relayed request is sent to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayTarget {
    /// Avatar provider JSON API.
    Avatar,
    /// Avatar provider binary upload host.
    AvatarUpload,
    /// Speech provider API.
    Speech,
}

impl RelayTarget {
    /// Parse the provider segment of a relay path.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "avatar" | "heygen" => Some(Self::Avatar),
            "avatar-upload" | "heygen-upload" | "upload" => Some(Self::AvatarUpload),
            "speech" | "elevenlabs" => Some(Self::Speech),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Avatar => "avatar",
            Self::AvatarUpload => "avatar-upload",
            Self::Speech => "speech",
        }
    }

    /// Header carrying the provider API key.
    pub fn api_key_header(&self) -> &'static str {
        match self {
            Self::Avatar | Self::AvatarUpload => AVATAR_API_KEY_HEADER,
            Self::Speech => SPEECH_API_KEY_HEADER,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_names() {
        assert_eq!(RelayTarget::from_name("heygen"), Some(RelayTarget::Avatar));
        assert_eq!(RelayTarget::from_name("Speech"), Some(RelayTarget::Speech));
        assert_eq!(
            RelayTarget::from_name("avatar-upload"),
            Some(RelayTarget::AvatarUpload)
        );
        assert_eq!(RelayTarget::from_name("openai"), None);
        assert_eq!(RelayTarget::Speech.api_key_header(), "xi-api-key");
    }

    #[test]
    fn test_error_status() {
        assert_eq!(RelayError::MissingParameters.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            RelayError::UnknownProvider("x".to_string()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            RelayError::MissingParameters.to_string(),
            "Missing required parameters"
        );
    }
}
