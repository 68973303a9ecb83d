//! Prometheus registry served at `/metrics`.
//!
//! Holds the server's own HTTP, WebSocket and session collectors next to the
//! pipeline, ingestion and relay collectors exported by `talkinghead_core`.

use once_cell::sync::Lazy;
use prometheus::core::Collector;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "talkinghead_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("talkinghead_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// Requests being handled right now.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "talkinghead_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

/// Active WebSocket connections.
pub static WS_CONNECTIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "talkinghead_ws_connections_active",
        "Number of active WebSocket connections",
    )
    .unwrap()
});

/// Total WebSocket connections (cumulative).
pub static WS_CONNECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "talkinghead_ws_connections_total",
        "Total WebSocket connections since startup",
    )
    .unwrap()
});

/// WebSocket messages sent by type.
pub static WS_MESSAGES_SENT: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("talkinghead_ws_messages_sent_total", "WebSocket messages sent"),
        &["type"],
    )
    .unwrap()
});

/// Broadcast messages dropped because a client fell behind.
pub static WS_LAG_EVENTS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "talkinghead_ws_lag_events_total",
        "WebSocket lag events (client fell behind)",
    )
    .unwrap()
});

/// Sessions currently held in memory.
pub static SESSIONS_STORED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "talkinghead_sessions_stored",
        "Number of sessions held in memory",
    )
    .unwrap()
});

/// Sessions still running.
pub static SESSIONS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "talkinghead_sessions_active",
        "Number of sessions still running",
    )
    .unwrap()
});

/// Collectors owned by the server crate.
fn server_metrics() -> Vec<Box<dyn Collector>> {
    vec![
        Box::new(HTTP_REQUEST_DURATION.clone()),
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()),
        Box::new(WS_CONNECTIONS_ACTIVE.clone()),
        Box::new(WS_CONNECTIONS_TOTAL.clone()),
        Box::new(WS_MESSAGES_SENT.clone()),
        Box::new(WS_LAG_EVENTS.clone()),
        Box::new(SESSIONS_STORED.clone()),
        Box::new(SESSIONS_ACTIVE.clone()),
    ]
}

fn register_metrics(registry: &Registry) {
    let collectors = server_metrics()
        .into_iter()
        .chain(talkinghead_core::metrics::all_metrics());
    for collector in collectors {
        registry.register(collector).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let mut buffer = Vec::new();
    if let Err(e) = TextEncoder::new().encode(&REGISTRY.gather(), &mut buffer) {
        tracing::warn!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
pub async fn collect_dynamic_metrics(state: &crate::state::AppState) {
    let sessions = state.sessions();
    SESSIONS_STORED.set(sessions.list().await.len() as i64);
    SESSIONS_ACTIVE.set(sessions.active_count().await as i64);
}

static UUID_SEGMENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}")
        .unwrap()
});

static NUMERIC_SEGMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d+(/|$)").unwrap());

/// Normalize a path for metric labels (replace IDs with placeholders).
///
/// Relay paths collapse to `/relay/{provider}/*` so upstream paths do not
/// explode label cardinality.
pub fn normalize_path(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("/relay/") {
        let provider = rest.split('/').next().unwrap_or_default();
        return format!("/relay/{}/*", provider);
    }

    let result = UUID_SEGMENT.replace_all(path, "{id}");
    let result = NUMERIC_SEGMENT.replace_all(&result, "/{id}$1");
    result.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_uuid() {
        let path = "/api/v1/sessions/550e8400-e29b-41d4-a716-446655440000";
        assert_eq!(normalize_path(path), "/api/v1/sessions/{id}");
    }

    #[test]
    fn test_normalize_path_clip_index() {
        let path = "/api/v1/sessions/550e8400-e29b-41d4-a716-446655440000/clips/2";
        assert_eq!(normalize_path(path), "/api/v1/sessions/{id}/clips/{id}");
    }

    #[test]
    fn test_normalize_path_relay() {
        assert_eq!(
            normalize_path("/relay/avatar/v1/video_status.get"),
            "/relay/avatar/*"
        );
        assert_eq!(normalize_path("/relay/speech/v1/voices/abc"), "/relay/speech/*");
    }

    #[test]
    fn test_normalize_path_no_ids() {
        let path = "/api/v1/health";
        assert_eq!(normalize_path(path), "/api/v1/health");
    }

    #[test]
    fn test_encode_metrics_returns_prometheus_format() {
        HTTP_REQUESTS_TOTAL
            .with_label_values(&["GET", "/test", "200"])
            .inc();

        let output = encode_metrics();
        assert!(output.contains("talkinghead_http_requests_total"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }

    #[test]
    fn test_server_and_core_metric_names_do_not_collide() {
        // Registration fails on duplicate descriptors
        let registry = Registry::new();
        register_metrics(&registry);
        SESSIONS_STORED.set(0);
        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"talkinghead_sessions_stored".to_string()));
        assert!(names.iter().all(|name| name.starts_with("talkinghead_")));
    }

    #[test]
    fn test_registry_contains_core_metrics() {
        // Prometheus only outputs metrics that have been accessed
        SESSIONS_ACTIVE.set(0);
        WS_CONNECTIONS_TOTAL.inc();
        talkinghead_core::metrics::STAGE_TRANSITIONS
            .with_label_values(&["uploading"])
            .inc_by(0);
        talkinghead_core::metrics::VALIDATION_REJECTIONS.inc_by(0);

        let output = encode_metrics();
        assert!(output.contains("talkinghead_sessions_active"));
        assert!(output.contains("talkinghead_ws_connections_total"));
        assert!(output.contains("talkinghead_stage_transitions_total"));
        assert!(output.contains("talkinghead_validation_rejections_total"));
    }
}
