//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Sessions (outcomes, stage transitions, duration)
//! - Provider polling and voice fallbacks
//! - Stale voice reclamation
//! - Relay traffic

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Session Metrics
// =============================================================================

/// Sessions finished total by mode and result.
pub static SESSIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("talkinghead_sessions_total", "Total finished sessions"),
        &["mode", "result"], // result: "done", "failed", "cancelled"
    )
    .unwrap()
});

/// Session duration in seconds.
pub static SESSION_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "talkinghead_session_duration_seconds",
            "Duration of a session from submission to terminal state",
        )
        .buckets(vec![5.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0, 1200.0, 1800.0]),
        &["mode", "result"],
    )
    .unwrap()
});

/// Stage transitions total.
pub static STAGE_TRANSITIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "talkinghead_stage_transitions_total",
            "Total pipeline stage transitions",
        ),
        &["stage"],
    )
    .unwrap()
});

/// Sessions rejected by input validation.
pub static VALIDATION_REJECTIONS: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "talkinghead_validation_rejections_total",
        "Total submissions rejected before any provider call",
    )
    .unwrap()
});

// =============================================================================
// Provider Metrics
// =============================================================================

/// Status polls issued by stage.
pub static PROVIDER_POLLS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("talkinghead_provider_polls_total", "Total status polls"),
        &["stage"], // "training", "rendering"
    )
    .unwrap()
});

/// Poll loops that gave up after the attempt limit.
pub static POLL_TIMEOUTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "talkinghead_poll_timeouts_total",
            "Total polling loops that exhausted their attempt limit",
        ),
        &["stage"],
    )
    .unwrap()
});

/// Voice fallbacks by reason.
pub static VOICE_FALLBACKS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "talkinghead_voice_fallbacks_total",
            "Total times a voice path fell back to the raw audio asset",
        ),
        &["reason"], // "clone_failed", "voice_creation_failed"
    )
    .unwrap()
});

// =============================================================================
// Voice Reclamation Metrics
// =============================================================================

/// Stale voice reclamation outcomes.
pub static VOICE_CLEANUP: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "talkinghead_voice_cleanup_total",
            "Stale cloned voices processed by reclamation",
        ),
        &["result"], // "deleted", "failed"
    )
    .unwrap()
});

// =============================================================================
// Relay Metrics
// =============================================================================

/// Relay requests by provider and upstream status.
pub static RELAY_REQUESTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("talkinghead_relay_requests_total", "Total relayed requests"),
        &["provider", "status"],
    )
    .unwrap()
});

/// Relay upstream latency.
pub static RELAY_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "talkinghead_relay_duration_seconds",
            "Duration of relayed upstream calls",
        )
        .buckets(vec![0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        &["provider"],
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Sessions
        Box::new(SESSIONS_TOTAL.clone()),
        Box::new(SESSION_DURATION.clone()),
        Box::new(STAGE_TRANSITIONS.clone()),
        Box::new(VALIDATION_REJECTIONS.clone()),
        // Providers
        Box::new(PROVIDER_POLLS.clone()),
        Box::new(POLL_TIMEOUTS.clone()),
        Box::new(VOICE_FALLBACKS.clone()),
        // Reclamation
        Box::new(VOICE_CLEANUP.clone()),
        // Relay
        Box::new(RELAY_REQUESTS.clone()),
        Box::new(RELAY_DURATION.clone()),
    ]
}
