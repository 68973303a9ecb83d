//! Session endpoints.

use axum::{
    extract::{Multipart, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use talkinghead_core::{
    GenerationMode, MediaBlob, Script, ScriptSource, SessionError, SessionSnapshot, Submission,
    ValidationError,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(status: StatusCode, error: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: error.into(),
        }),
    )
}

fn session_error(e: SessionError) -> ApiError {
    let status = match &e {
        SessionError::NotFound(_) | SessionError::ClipNotFound { .. } => StatusCode::NOT_FOUND,
        SessionError::Validation(_) => StatusCode::BAD_REQUEST,
        SessionError::ShutDown => StatusCode::SERVICE_UNAVAILABLE,
    };
    error_response(status, e.to_string())
}

#[derive(Serialize)]
pub struct ListSessionsResponse {
    pub sessions: Vec<SessionSnapshot>,
    pub total: usize,
}

/// Raw multipart fields of a submission.
#[derive(Debug, Default)]
pub struct SubmissionForm {
    pub mode: Option<String>,
    pub photo: Option<MediaBlob>,
    pub audio: Option<MediaBlob>,
    pub audio_duration_secs: Option<String>,
    pub script: Option<String>,
    pub scripts: Option<String>,
    pub template_id: Option<String>,
    pub vars: Option<String>,
}

impl SubmissionForm {
    /// Build a submission from the form.
    ///
    /// Script precedence: `scripts` (JSON list), then `template_id`, then
    /// `script`. Content checks are left to `Submission::validate`.
    pub fn into_submission(self) -> Result<Submission, String> {
        let mode = match self.mode.as_deref().map(str::trim) {
            None | Some("") => GenerationMode::Video,
            Some(mode) => mode.parse::<GenerationMode>()?,
        };

        let audio_duration_secs = match self.audio_duration_secs.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(value) => Some(
                value
                    .parse::<f32>()
                    .map_err(|_| format!("invalid audio_duration_secs '{}'", value))?,
            ),
        };

        let default_label = match mode {
            GenerationMode::Video => "script",
            GenerationMode::Speech => "clip-1",
        };

        let scripts = if let Some(raw) = self.scripts.as_deref() {
            let sources: Vec<ScriptSource> =
                serde_json::from_str(raw).map_err(|e| format!("invalid scripts: {}", e))?;
            sources
                .iter()
                .enumerate()
                .map(|(i, source)| source.resolve(&format!("clip-{}", i + 1)))
                .collect::<Result<Vec<Script>, ValidationError>>()
                .map_err(|e| e.to_string())?
        } else if let Some(template_id) = self.template_id.filter(|t| !t.trim().is_empty()) {
            let vars: HashMap<String, String> = match self.vars.as_deref() {
                Some(raw) if !raw.trim().is_empty() => {
                    serde_json::from_str(raw).map_err(|e| format!("invalid vars: {}", e))?
                }
                _ => HashMap::new(),
            };
            let source = ScriptSource::Template {
                template_id: template_id.trim().to_string(),
                vars,
            };
            vec![source.resolve(default_label).map_err(|e| e.to_string())?]
        } else if let Some(text) = self.script {
            vec![Script::new(default_label, text.trim())]
        } else {
            Vec::new()
        };

        Ok(Submission {
            mode,
            photo: self.photo,
            audio: self.audio,
            audio_duration_secs,
            scripts,
        })
    }
}

/// POST /api/v1/sessions
///
/// Multipart submission. Returns 202 with the new session, which then
/// progresses in the background.
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<SessionSnapshot>), ApiError> {
    let mut form = SubmissionForm::default();

    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "photo" | "audio" => {
                let file_name = field.file_name().unwrap_or(name.as_str()).to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let data = match field.bytes().await {
                    Ok(bytes) => bytes.to_vec(),
                    Err(e) => {
                        return Err(error_response(
                            StatusCode::BAD_REQUEST,
                            format!("Failed to read {}: {}", name, e),
                        ))
                    }
                };
                let blob = MediaBlob::new(file_name, content_type, data);
                if name == "photo" {
                    form.photo = Some(blob);
                } else {
                    form.audio = Some(blob);
                }
            }
            "mode" | "audio_duration_secs" | "script" | "scripts" | "template_id" | "vars" => {
                let text = match field.text().await {
                    Ok(text) => text,
                    Err(e) => {
                        return Err(error_response(
                            StatusCode::BAD_REQUEST,
                            format!("Failed to read {}: {}", name, e),
                        ))
                    }
                };
                let slot = match name.as_str() {
                    "mode" => &mut form.mode,
                    "audio_duration_secs" => &mut form.audio_duration_secs,
                    "script" => &mut form.script,
                    "scripts" => &mut form.scripts,
                    "template_id" => &mut form.template_id,
                    _ => &mut form.vars,
                };
                *slot = Some(text);
            }
            other => debug!("Ignoring multipart field '{}'", other),
        }
    }

    let submission = form
        .into_submission()
        .map_err(|e| error_response(StatusCode::BAD_REQUEST, e))?;

    match state.sessions().submit(submission).await {
        Ok(snapshot) => Ok((StatusCode::ACCEPTED, Json(snapshot))),
        Err(e) => Err(session_error(e)),
    }
}

/// GET /api/v1/sessions
pub async fn list_sessions(State(state): State<Arc<AppState>>) -> Json<ListSessionsResponse> {
    let sessions = state.sessions().list().await;
    Json(ListSessionsResponse {
        total: sessions.len(),
        sessions,
    })
}

/// GET /api/v1/sessions/{id}
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionSnapshot>, impl IntoResponse> {
    state
        .sessions()
        .get(id)
        .await
        .map(Json)
        .map_err(session_error)
}

/// DELETE /api/v1/sessions/{id}
///
/// Cancels the session and discards it.
pub async fn reset_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, impl IntoResponse> {
    match state.sessions().reset(id).await {
        Ok(()) => {
            info!("Session {} reset via API", id);
            state.ws_broadcaster().session_removed(id);
            Ok(StatusCode::NO_CONTENT)
        }
        Err(e) => Err(session_error(e)),
    }
}

/// GET /api/v1/sessions/{id}/clips/{index}
pub async fn get_clip(
    State(state): State<Arc<AppState>>,
    Path((id, index)): Path<(Uuid, usize)>,
) -> Result<impl IntoResponse, ApiError> {
    let clip = state
        .sessions()
        .clip(id, index)
        .await
        .map_err(session_error)?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, clip.content_type)],
        clip.data,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form() -> SubmissionForm {
        SubmissionForm {
            photo: Some(MediaBlob::new("face.jpg", "image/jpeg", vec![1, 2, 3])),
            audio: Some(MediaBlob::new("voice.webm", "audio/webm", vec![4, 5, 6])),
            audio_duration_secs: Some("20".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_to_video_with_literal_script() {
        let submission = SubmissionForm {
            script: Some("  Hello there  ".to_string()),
            ..form()
        }
        .into_submission()
        .unwrap();

        assert_eq!(submission.mode, GenerationMode::Video);
        assert_eq!(submission.audio_duration_secs, Some(20.0));
        assert_eq!(submission.scripts, vec![Script::new("script", "Hello there")]);
    }

    #[test]
    fn test_template_with_vars() {
        let submission = SubmissionForm {
            template_id: Some("script1".to_string()),
            vars: Some(r#"{"child_name": "Mia", "age": "7"}"#.to_string()),
            ..form()
        }
        .into_submission()
        .unwrap();

        assert_eq!(submission.scripts[0].label, "script1");
        assert!(submission.scripts[0].text.contains("My name is Mia!"));
        assert!(submission.scripts[0].text.contains("I am 7 years old"));
    }

    #[test]
    fn test_speech_scripts_list() {
        let submission = SubmissionForm {
            mode: Some("speech".to_string()),
            scripts: Some(r#"[{"text": "One"}, {"template_id": "script2"}]"#.to_string()),
            ..form()
        }
        .into_submission()
        .unwrap();

        assert_eq!(submission.mode, GenerationMode::Speech);
        assert_eq!(submission.scripts.len(), 2);
        assert_eq!(submission.scripts[0], Script::new("clip-1", "One"));
        assert_eq!(submission.scripts[1].label, "script2");
    }

    #[test]
    fn test_rejects_bad_fields() {
        let bad_mode = SubmissionForm {
            mode: Some("hologram".to_string()),
            ..form()
        };
        assert!(bad_mode.into_submission().is_err());

        let bad_duration = SubmissionForm {
            audio_duration_secs: Some("long".to_string()),
            ..form()
        };
        assert!(bad_duration
            .into_submission()
            .unwrap_err()
            .contains("audio_duration_secs"));

        let unknown_template = SubmissionForm {
            template_id: Some("script9".to_string()),
            ..form()
        };
        assert!(unknown_template.into_submission().is_err());
    }

    #[test]
    fn test_session_error_status() {
        let id = Uuid::new_v4();
        assert_eq!(
            session_error(SessionError::NotFound(id)).0,
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            session_error(SessionError::Validation(ValidationError::MissingPhoto)).0,
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            session_error(SessionError::ShutDown).0,
            StatusCode::SERVICE_UNAVAILABLE
        );
    }
}
