//! Session manager implementation.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::{SessionError, SessionSnapshot};
use crate::metrics;
use crate::pipeline::{
    Artifact, GenerationPipeline, PipelineError, ProgressUpdate, SessionObserver, SpeechClip,
    Stage, Submission,
};

/// Callback invoked with the new snapshot after every session change.
pub type SessionUpdateCallback = Arc<dyn Fn(&SessionSnapshot) + Send + Sync>;

struct SessionEntry {
    snapshot: SessionSnapshot,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

type Sessions = Arc<RwLock<HashMap<Uuid, SessionEntry>>>;

/// Registry of running and finished sessions.
pub struct SessionManager {
    pipeline: Arc<GenerationPipeline>,
    sessions: Sessions,
    root_cancel: CancellationToken,
    update_callback: Option<SessionUpdateCallback>,
}

impl SessionManager {
    pub fn new(pipeline: Arc<GenerationPipeline>) -> Self {
        Self {
            pipeline,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            root_cancel: CancellationToken::new(),
            update_callback: None,
        }
    }

    /// Set a callback invoked after every session change.
    pub fn with_update_callback(mut self, callback: SessionUpdateCallback) -> Self {
        self.update_callback = Some(callback);
        self
    }

    pub fn pipeline(&self) -> &Arc<GenerationPipeline> {
        &self.pipeline
    }

    /// Validate a submission and start a session for it.
    ///
    /// Invalid submissions are rejected without creating a session.
    pub async fn submit(&self, submission: Submission) -> Result<SessionSnapshot, SessionError> {
        if self.root_cancel.is_cancelled() {
            return Err(SessionError::ShutDown);
        }
        self.pipeline.validate(&submission)?;

        let id = Uuid::new_v4();
        let mode = submission.mode;
        let snapshot = SessionSnapshot::new(id, mode);
        let cancel = self.root_cancel.child_token();

        self.sessions.write().await.insert(
            id,
            SessionEntry {
                snapshot: snapshot.clone(),
                cancel: cancel.clone(),
                handle: None,
            },
        );
        info!("Created session {} ({})", id, mode);
        self.notify(&snapshot);

        let observer = SessionProgress {
            id,
            sessions: Arc::clone(&self.sessions),
            callback: self.update_callback.clone(),
        };
        let pipeline = Arc::clone(&self.pipeline);
        let span = info_span!("session", id = %id, mode = %mode);

        let handle = tokio::spawn(
            async move {
                let started = Instant::now();
                let result = pipeline.run(&submission, &observer, &cancel).await;
                observer.complete(mode.as_str(), started, result).await;
            }
            .instrument(span),
        );

        if let Some(entry) = self.sessions.write().await.get_mut(&id) {
            entry.handle = Some(handle);
        }

        Ok(snapshot)
    }

    /// Snapshot of one session.
    pub async fn get(&self, id: Uuid) -> Result<SessionSnapshot, SessionError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .map(|entry| entry.snapshot.clone())
            .ok_or(SessionError::NotFound(id))
    }

    /// Snapshots of every session, newest first.
    pub async fn list(&self) -> Vec<SessionSnapshot> {
        let mut snapshots: Vec<_> = self
            .sessions
            .read()
            .await
            .values()
            .map(|entry| entry.snapshot.clone())
            .collect();
        snapshots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        snapshots
    }

    /// Number of sessions still running.
    pub async fn active_count(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|entry| !entry.snapshot.is_finished())
            .count()
    }

    /// Cancel a session and discard it.
    pub async fn reset(&self, id: Uuid) -> Result<(), SessionError> {
        let entry = self
            .sessions
            .write()
            .await
            .remove(&id)
            .ok_or(SessionError::NotFound(id))?;

        entry.cancel.cancel();
        info!("Reset session {}", id);
        Ok(())
    }

    /// Audio of a finished speech clip.
    pub async fn clip(&self, id: Uuid, index: usize) -> Result<SpeechClip, SessionError> {
        let sessions = self.sessions.read().await;
        let entry = sessions.get(&id).ok_or(SessionError::NotFound(id))?;
        match &entry.snapshot.artifact {
            Some(Artifact::Speech { clips }) => clips
                .get(index)
                .cloned()
                .ok_or(SessionError::ClipNotFound { id, index }),
            _ => Err(SessionError::ClipNotFound { id, index }),
        }
    }

    /// Cancel every running session and wait for their tasks to stop.
    pub async fn shutdown(&self) {
        self.root_cancel.cancel();

        let handles: Vec<_> = self
            .sessions
            .write()
            .await
            .values_mut()
            .filter_map(|entry| entry.handle.take())
            .collect();

        info!("Stopping {} session task(s)", handles.len());
        for result in join_all(handles).await {
            if let Err(e) = result {
                warn!("Session task ended abnormally: {}", e);
            }
        }
    }

    fn notify(&self, snapshot: &SessionSnapshot) {
        if let Some(callback) = &self.update_callback {
            callback(snapshot);
        }
    }
}

/// Applies pipeline updates to one session's snapshot.
struct SessionProgress {
    id: Uuid,
    sessions: Sessions,
    callback: Option<SessionUpdateCallback>,
}

impl SessionProgress {
    /// Apply `f` to the snapshot and publish the result, if the session still exists.
    async fn update(&self, f: impl FnOnce(&mut SessionSnapshot)) {
        let snapshot = {
            let mut sessions = self.sessions.write().await;
            let Some(entry) = sessions.get_mut(&self.id) else {
                return;
            };
            f(&mut entry.snapshot);
            entry.snapshot.updated_at = Utc::now();
            entry.snapshot.clone()
        };

        if let Some(callback) = &self.callback {
            callback(&snapshot);
        }
    }

    /// Record the outcome of the run.
    async fn complete(
        &self,
        mode: &str,
        started: Instant,
        result: Result<Artifact, PipelineError>,
    ) {
        let outcome = match &result {
            Ok(_) => "done",
            Err(PipelineError::Cancelled) => "cancelled",
            Err(_) => "failed",
        };
        metrics::SESSIONS_TOTAL
            .with_label_values(&[mode, outcome])
            .inc();
        metrics::SESSION_DURATION
            .with_label_values(&[mode, outcome])
            .observe(started.elapsed().as_secs_f64());

        match result {
            Ok(artifact) => {
                info!("Session {} finished", self.id);
                self.update(|s| {
                    s.stage = Stage::Done;
                    s.progress = 100;
                    s.artifact = Some(artifact);
                })
                .await;
            }
            Err(PipelineError::Cancelled) => {
                info!("Session {} cancelled", self.id);
            }
            Err(e) => {
                error!("Session {} failed: {}", self.id, e);
                let message = e.session_message();
                self.update(|s| {
                    s.stage = Stage::Idle;
                    s.message = None;
                    s.error = Some(message);
                })
                .await;
            }
        }
    }
}

#[async_trait]
impl SessionObserver for SessionProgress {
    async fn on_progress(&self, update: ProgressUpdate) {
        self.update(|s| {
            s.stage = update.stage;
            s.progress = s.progress.max(update.progress);
            if update.message.is_some() {
                s.message = update.message;
            }
        })
        .await;
    }
}
