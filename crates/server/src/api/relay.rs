//! HTTP adapter for the provider relay.

use axum::{
    body::{Body, Bytes},
    extract::{Path, State},
    http::{HeaderMap, Method, Uri},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use talkinghead_core::RelayRequest;

use crate::state::AppState;

/// ANY /relay/{provider}/{*path}
///
/// Forwards the request to the provider's API and returns its answer.
pub async fn relay(
    State(state): State<Arc<AppState>>,
    Path((provider, path)): Path<(String, String)>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let request = RelayRequest {
        method,
        path: format!("/{}", path.trim_start_matches('/')),
        query: uri.query().map(str::to_string),
        headers,
        body: body.to_vec(),
    };

    let response = state.relay().handle(&provider, request).await;
    (response.status, response.headers, Body::from(response.body)).into_response()
}
