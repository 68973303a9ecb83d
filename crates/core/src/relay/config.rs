//! Relay configuration.

use serde::{Deserialize, Serialize};

/// Configuration for the provider relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayConfig {
    /// Origins allowed to call the relay. `"*"` allows any origin.
    /// With an explicit list, a matching request origin is echoed back and
    /// any other origin receives the first entry.
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,

    /// Value of `Access-Control-Allow-Methods`.
    #[serde(default = "default_allowed_methods")]
    pub allowed_methods: String,

    /// Value of `Access-Control-Allow-Headers`.
    #[serde(default = "default_allowed_headers")]
    pub allowed_headers: String,

    /// Value of `Access-Control-Max-Age` (seconds).
    #[serde(default = "default_max_age")]
    pub max_age_secs: u64,

    /// Attach the configured provider API key when the request carries none.
    #[serde(default = "default_true")]
    pub use_configured_keys: bool,

    /// Upstream request timeout in seconds (default: 120).
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,

    /// Where each relay target forwards to.
    #[serde(default)]
    pub upstreams: RelayUpstreams,
}

/// Upstream base URLs per relay target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayUpstreams {
    #[serde(default = "default_avatar_upstream")]
    pub avatar: String,
    #[serde(default = "default_avatar_upload_upstream")]
    pub avatar_upload: String,
    #[serde(default = "default_speech_upstream")]
    pub speech: String,
}

fn default_allowed_origins() -> Vec<String> {
    vec!["*".to_string()]
}

fn default_allowed_methods() -> String {
    "GET, POST, PUT, DELETE, OPTIONS".to_string()
}

fn default_allowed_headers() -> String {
    "Content-Type, Authorization, X-Api-Key, xi-api-key".to_string()
}

fn default_max_age() -> u64 {
    86400 // 1 day
}

fn default_true() -> bool {
    true
}

fn default_timeout() -> u32 {
    120
}

fn default_avatar_upstream() -> String {
    "https://api.heygen.com".to_string()
}

fn default_avatar_upload_upstream() -> String {
    "https://upload.heygen.com".to_string()
}

fn default_speech_upstream() -> String {
    "https://api.elevenlabs.io".to_string()
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            allowed_origins: default_allowed_origins(),
            allowed_methods: default_allowed_methods(),
            allowed_headers: default_allowed_headers(),
            max_age_secs: default_max_age(),
            use_configured_keys: true,
            timeout_secs: default_timeout(),
            upstreams: RelayUpstreams::default(),
        }
    }
}

impl Default for RelayUpstreams {
    fn default() -> Self {
        Self {
            avatar: default_avatar_upstream(),
            avatar_upload: default_avatar_upload_upstream(),
            speech: default_speech_upstream(),
        }
    }
}
