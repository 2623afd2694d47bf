//! Error types for telemetry setup and teardown.

use std::time::Duration;

use thiserror::Error;

/// Errors raised while installing or flushing telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("failed to build OTLP {signal} exporter: {reason}")]
    Exporter { signal: &'static str, reason: String },

    #[error("failed to install tracing subscriber: {0}")]
    Subscriber(String),

    #[error("telemetry shutdown failed: {0}")]
    Shutdown(String),

    #[error("telemetry shutdown did not finish within {0:?}")]
    ShutdownTimeout(Duration),
}
