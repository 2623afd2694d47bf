//! statebridge-telemetry — logging, tracing and metrics setup.
//!
//! [`init`] installs the global `tracing` subscriber and, when a collector
//! endpoint is configured, OTLP/HTTP trace and metric providers. It returns a
//! [`Telemetry`] guard whose [`Telemetry::shutdown`] flushes the exporters.
//!
//! ```text
//! tracing registry
//!   ├── EnvFilter (RUST_LOG, falls back to the configured default)
//!   ├── fmt layer (JSON or text, stdout)
//!   └── tracing-opentelemetry layer → SdkTracerProvider → OTLP /v1/traces
//! SdkMeterProvider (global) → periodic reader → OTLP /v1/metrics
//! ```
//!
//! Without an endpoint the OpenTelemetry globals stay no-op, so instruments
//! created elsewhere cost nothing.
//!
//! `init` builds blocking HTTP exporters; call it from a blocking context
//! (e.g. `tokio::task::spawn_blocking`) when running inside a runtime.

pub mod error;
pub mod otel;

use std::str::FromStr;
use std::time::Duration;

use opentelemetry::global;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::trace::SdkTracerProvider;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

pub use error::TelemetryError;

/// Output format for log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "text" | "pretty" => Ok(LogFormat::Text),
            other => Err(format!("unknown log format {other:?} (expected json or text)")),
        }
    }
}

/// Telemetry settings supplied by the daemon.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// `service.name` resource attribute.
    pub service_name: String,
    /// OTLP/HTTP collector endpoint; `None` or blank disables export.
    pub endpoint: Option<String>,
    pub log_format: LogFormat,
    /// Filter used when `RUST_LOG` is unset.
    pub default_filter: String,
}

/// Handle to the installed providers.
#[must_use = "telemetry must be shut down to flush exporters"]
#[derive(Debug, Default)]
pub struct Telemetry {
    tracer_provider: Option<SdkTracerProvider>,
    meter_provider: Option<SdkMeterProvider>,
}

impl Telemetry {
    /// A guard with no providers; shutdown is a no-op.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Whether any signal is being exported.
    pub fn is_exporting(&self) -> bool {
        self.tracer_provider.is_some() || self.meter_provider.is_some()
    }

    /// Flush and close the exporters, waiting at most `timeout`.
    ///
    /// Both providers are always shut down; the first failure is reported.
    pub async fn shutdown(self, timeout: Duration) -> Result<(), TelemetryError> {
        if !self.is_exporting() {
            return Ok(());
        }

        let Telemetry {
            tracer_provider,
            meter_provider,
        } = self;

        let flush = tokio::task::spawn_blocking(move || {
            let mut first_error = None;
            if let Some(tp) = tracer_provider {
                if let Err(e) = tp.shutdown() {
                    first_error.get_or_insert(TelemetryError::Shutdown(format!("tracer: {e}")));
                }
            }
            if let Some(mp) = meter_provider {
                if let Err(e) = mp.shutdown() {
                    first_error.get_or_insert(TelemetryError::Shutdown(format!("meter: {e}")));
                }
            }
            first_error.map_or(Ok(()), Err)
        });

        match tokio::time::timeout(timeout, flush).await {
            Ok(Ok(result)) => result,
            Ok(Err(join)) => Err(TelemetryError::Shutdown(join.to_string())),
            Err(_) => Err(TelemetryError::ShutdownTimeout(timeout)),
        }
    }
}

/// Install logging and (optionally) OTLP export.
///
/// Exporter construction failures are not fatal: the affected signal stays
/// no-op and a warning is logged once the subscriber is up.
pub fn init(config: &TelemetryConfig) -> Result<Telemetry, TelemetryError> {
    let endpoint = config.endpoint.as_deref().and_then(otel::normalize_endpoint);

    let mut telemetry = Telemetry::disabled();
    let mut deferred_warnings = Vec::new();

    if let Some(base) = endpoint.as_deref() {
        let resource = otel::resource(&config.service_name);

        match otel::tracer_provider(base, resource.clone()) {
            Ok(tp) => {
                global::set_tracer_provider(tp.clone());
                otel::install_propagator();
                telemetry.tracer_provider = Some(tp);
            }
            Err(e) => deferred_warnings.push(e),
        }

        match otel::meter_provider(base, resource) {
            Ok(mp) => {
                global::set_meter_provider(mp.clone());
                telemetry.meter_provider = Some(mp);
            }
            Err(e) => deferred_warnings.push(e),
        }
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.default_filter));

    let otel_layer = telemetry
        .tracer_provider
        .as_ref()
        .map(|tp| {
            tracing_opentelemetry::layer().with_tracer(tp.tracer(config.service_name.clone()))
        });

    let (json_layer, text_layer) = match config.log_format {
        LogFormat::Json => (
            Some(tracing_subscriber::fmt::layer().json().with_current_span(false)),
            None,
        ),
        LogFormat::Text => (None, Some(tracing_subscriber::fmt::layer())),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(json_layer)
        .with(text_layer)
        .with(otel_layer)
        .try_init()
        .map_err(|e| TelemetryError::Subscriber(e.to_string()))?;

    for e in deferred_warnings {
        warn!(error = %e, "telemetry signal disabled");
    }

    match endpoint {
        Some(base) => {
            info!(endpoint = %base, service = %config.service_name, "telemetry exporting")
        }
        None => info!("OTLP endpoint not set, using no-op telemetry"),
    }

    Ok(telemetry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_format_parses() {
        assert_eq!("json".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert_eq!(" Text ".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert_eq!("pretty".parse::<LogFormat>(), Ok(LogFormat::Text));
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn disabled_guard_exports_nothing() {
        assert!(!Telemetry::disabled().is_exporting());
    }

    #[tokio::test]
    async fn disabled_shutdown_is_ok() {
        Telemetry::disabled()
            .shutdown(Duration::from_millis(10))
            .await
            .unwrap();
    }
}
