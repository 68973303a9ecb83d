//! In-memory session registry.
//!
//! Each submission becomes a session running on its own tokio task with
//! its own cancellation token. Sessions live until they are reset or the
//! process exits; nothing is persisted.

mod manager;

pub use manager::{SessionManager, SessionUpdateCallback};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::pipeline::{Artifact, GenerationMode, Stage, ValidationError};

/// Point-in-time view of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub id: Uuid,
    pub mode: GenerationMode,
    pub stage: Stage,
    /// 0-100.
    pub progress: u8,
    /// Detail of the current step.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub artifact: Option<Artifact>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SessionSnapshot {
    fn new(id: Uuid, mode: GenerationMode) -> Self {
        let now = Utc::now();
        Self {
            id,
            mode,
            stage: Stage::Idle,
            progress: 0,
            message: None,
            artifact: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the session has stopped (finished or failed).
    pub fn is_finished(&self) -> bool {
        self.stage == Stage::Done || self.error.is_some()
    }
}

/// Errors returned by the session manager.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session not found: {0}")]
    NotFound(Uuid),

    #[error("invalid submission: {0}")]
    Validation(#[from] ValidationError),

    #[error("session {id} has no clip {index}")]
    ClipNotFound { id: Uuid, index: usize },

    #[error("session manager is shut down")]
    ShutDown,
}
