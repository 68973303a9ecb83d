//! HTTP service for talking-head video and cloned-voice generation.

pub mod api;
pub mod metrics;
pub mod state;
