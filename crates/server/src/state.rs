use std::sync::Arc;
use talkinghead_core::{Config, Relay, SanitizedConfig, SessionManager};

use crate::api::WsBroadcaster;

/// Shared application state
pub struct AppState {
    config: Config,
    sessions: Arc<SessionManager>,
    relay: Arc<Relay>,
    ws_broadcaster: WsBroadcaster,
}

impl AppState {
    pub fn new(
        config: Config,
        sessions: Arc<SessionManager>,
        relay: Arc<Relay>,
        ws_broadcaster: WsBroadcaster,
    ) -> Self {
        Self {
            config,
            sessions,
            relay,
            ws_broadcaster,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn relay(&self) -> &Relay {
        self.relay.as_ref()
    }

    pub fn ws_broadcaster(&self) -> &WsBroadcaster {
        &self.ws_broadcaster
    }
}
