//! Cross-origin headers attached to every relay response.

use reqwest::header::{
    HeaderMap, HeaderValue, ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
    ACCESS_CONTROL_ALLOW_ORIGIN, ACCESS_CONTROL_MAX_AGE, VARY,
};

use super::RelayConfig;

/// CORS policy of the relay.
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
    allowed_methods: String,
    allowed_headers: String,
    max_age_secs: u64,
}

impl CorsPolicy {
    pub fn from_config(config: &RelayConfig) -> Self {
        Self {
            allowed_origins: config.allowed_origins.clone(),
            allowed_methods: config.allowed_methods.clone(),
            allowed_headers: config.allowed_headers.clone(),
            max_age_secs: config.max_age_secs,
        }
    }

    fn allows_any(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }

    /// Value of `Access-Control-Allow-Origin` for a request from `origin`.
    pub fn allow_origin(&self, origin: Option<&str>) -> String {
        if self.allows_any() {
            return "*".to_string();
        }
        match origin {
            Some(origin) if self.allowed_origins.iter().any(|o| o == origin) => origin.to_string(),
            _ => self.allowed_origins[0].clone(),
        }
    }

    /// Insert the CORS headers for a request from `origin`.
    pub fn apply(&self, origin: Option<&str>, headers: &mut HeaderMap) {
        if let Ok(value) = HeaderValue::from_str(&self.allow_origin(origin)) {
            headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, value);
        }
        if let Ok(value) = HeaderValue::from_str(&self.allowed_methods) {
            headers.insert(ACCESS_CONTROL_ALLOW_METHODS, value);
        }
        if let Ok(value) = HeaderValue::from_str(&self.allowed_headers) {
            headers.insert(ACCESS_CONTROL_ALLOW_HEADERS, value);
        }
        headers.insert(ACCESS_CONTROL_MAX_AGE, HeaderValue::from(self.max_age_secs));
        if !self.allows_any() {
            headers.insert(VARY, HeaderValue::from_static("Origin"));
        }
    }
}
