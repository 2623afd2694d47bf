//! OpenTelemetry providers exporting over OTLP/HTTP.

use opentelemetry::global;
use opentelemetry::propagation::TextMapCompositePropagator;
use opentelemetry_otlp::{MetricExporter, SpanExporter, WithExportConfig};
use opentelemetry_sdk::Resource;
use opentelemetry_sdk::metrics::SdkMeterProvider;
use opentelemetry_sdk::propagation::{BaggagePropagator, TraceContextPropagator};
use opentelemetry_sdk::trace::SdkTracerProvider;

use crate::error::TelemetryError;

/// Normalize a configured collector endpoint into a base URL.
///
/// Returns `None` for a blank endpoint, which means "export nothing".
/// A missing scheme defaults to plain `http://`.
pub fn normalize_endpoint(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let with_scheme = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    Some(with_scheme.trim_end_matches('/').to_string())
}

/// Signal-specific OTLP/HTTP path under a normalized base URL.
pub fn signal_url(base: &str, signal: &str) -> String {
    format!("{base}/v1/{signal}")
}

pub(crate) fn resource(service_name: &str) -> Resource {
    Resource::builder()
        .with_service_name(service_name.to_string())
        .build()
}

pub(crate) fn tracer_provider(
    base: &str,
    resource: Resource,
) -> Result<SdkTracerProvider, TelemetryError> {
    let exporter = SpanExporter::builder()
        .with_http()
        .with_endpoint(signal_url(base, "traces"))
        .build()
        .map_err(|e| TelemetryError::Exporter {
            signal: "trace",
            reason: e.to_string(),
        })?;

    Ok(SdkTracerProvider::builder()
        .with_batch_exporter(exporter)
        .with_resource(resource)
        .build())
}

pub(crate) fn meter_provider(
    base: &str,
    resource: Resource,
) -> Result<SdkMeterProvider, TelemetryError> {
    let exporter = MetricExporter::builder()
        .with_http()
        .with_endpoint(signal_url(base, "metrics"))
        .build()
        .map_err(|e| TelemetryError::Exporter {
            signal: "metric",
            reason: e.to_string(),
        })?;

    Ok(SdkMeterProvider::builder()
        .with_periodic_exporter(exporter)
        .with_resource(resource)
        .build())
}

/// Install W3C trace-context and baggage propagation for inbound headers.
pub(crate) fn install_propagator() {
    global::set_text_map_propagator(TextMapCompositePropagator::new(vec![
        Box::new(TraceContextPropagator::new()),
        Box::new(BaggagePropagator::new()),
    ]));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_endpoint_disables_export() {
        assert_eq!(normalize_endpoint(""), None);
        assert_eq!(normalize_endpoint("   "), None);
    }

    #[test]
    fn host_port_gets_http_scheme() {
        assert_eq!(
            normalize_endpoint("otel-collector:4318").as_deref(),
            Some("http://otel-collector:4318")
        );
    }

    #[test]
    fn full_url_is_kept() {
        assert_eq!(
            normalize_endpoint(" https://collector.example.com:4318/ ").as_deref(),
            Some("https://collector.example.com:4318")
        );
    }

    #[test]
    fn signal_paths() {
        let base = "http://localhost:4318";
        assert_eq!(signal_url(base, "traces"), "http://localhost:4318/v1/traces");
        assert_eq!(signal_url(base, "metrics"), "http://localhost:4318/v1/metrics");
    }
}
