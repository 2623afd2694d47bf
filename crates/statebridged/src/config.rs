//! Daemon configuration.
//!
//! Every flag can also be supplied through its environment variable; a
//! `.env` file in the working directory is loaded before parsing and real
//! environment variables win over it. Empty variables count as unset.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use clap::Parser;
use statebridge_health::DEFAULT_SIDECAR_HTTP_PORT;
use statebridge_store::DEFAULT_STORE_NAME;
use statebridge_telemetry::{LogFormat, TelemetryConfig};

use crate::server::Timeouts;

/// Service name reported to the collector when none is configured.
pub const DEFAULT_SERVICE_NAME: &str = "statebridge";

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,statebridged=debug,statebridge=debug";

#[derive(Debug, Clone, Parser)]
#[command(
    name = "statebridged",
    version,
    about = "HTTP state API over a sidecar or in-memory store"
)]
pub struct Config {
    /// Port to listen on.
    #[arg(long, env = "APP_PORT", default_value_t = 8080, value_parser = or_default(8080u16))]
    pub port: u16,

    /// State store every request is routed to.
    #[arg(
        long,
        env = "STATESTORE_NAME",
        default_value = DEFAULT_STORE_NAME,
        value_parser = or_default(DEFAULT_STORE_NAME.to_string())
    )]
    pub store_name: String,

    /// OTLP/HTTP collector endpoint. Unset disables export.
    #[arg(long, env = "OTEL_EXPORTER_OTLP_ENDPOINT")]
    pub otel_endpoint: Option<String>,

    /// `service.name` attached to exported telemetry.
    #[arg(
        long,
        env = "OTEL_SERVICE_NAME",
        default_value = DEFAULT_SERVICE_NAME,
        value_parser = or_default(DEFAULT_SERVICE_NAME.to_string())
    )]
    pub otel_service_name: String,

    /// Sidecar gRPC port. Its presence signals that a sidecar is injected.
    #[arg(long, env = "DAPR_GRPC_PORT")]
    pub sidecar_grpc_port: Option<String>,

    /// Sidecar HTTP port (health and state API).
    #[arg(
        long,
        env = "DAPR_HTTP_PORT",
        default_value_t = DEFAULT_SIDECAR_HTTP_PORT,
        value_parser = or_default(DEFAULT_SIDECAR_HTTP_PORT)
    )]
    pub sidecar_http_port: u16,

    /// Seconds to wait for the sidecar before falling back to memory.
    #[arg(
        long = "sidecar-wait",
        env = "SIDECAR_WAIT_SECS",
        default_value_t = 15,
        value_parser = or_default(15u64)
    )]
    pub sidecar_wait_secs: u64,

    /// Seconds in-flight requests get to finish on shutdown.
    #[arg(
        long = "shutdown-timeout",
        env = "SHUTDOWN_TIMEOUT_SECS",
        default_value_t = 10,
        value_parser = or_default(10u64)
    )]
    pub shutdown_timeout_secs: u64,

    /// Seconds a client gets to send the complete request head.
    #[arg(
        long = "header-read-timeout",
        env = "HEADER_READ_TIMEOUT_SECS",
        default_value_t = 5,
        value_parser = or_default(5u64)
    )]
    pub header_read_timeout_secs: u64,

    /// Log line format: json or text.
    #[arg(
        long,
        env = "LOG_FORMAT",
        default_value = "json",
        value_parser = or_default(LogFormat::Json)
    )]
    pub log_format: LogFormat,
}

impl Config {
    pub fn sidecar_wait(&self) -> Duration {
        Duration::from_secs(self.sidecar_wait_secs)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_secs)
    }

    pub fn timeouts(&self) -> Timeouts {
        Timeouts {
            header_read: Duration::from_secs(self.header_read_timeout_secs),
            shutdown_grace: self.shutdown_timeout(),
        }
    }

    pub fn telemetry(&self) -> TelemetryConfig {
        TelemetryConfig {
            service_name: self.otel_service_name.clone(),
            endpoint: self.otel_endpoint.clone(),
            log_format: self.log_format,
            default_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

/// Value parser that treats a blank value as `default`.
///
/// clap hands empty environment variables to the parser, so this is what
/// makes `APP_PORT=` behave like an unset variable.
fn or_default<T>(
    default: T,
) -> impl Fn(&str) -> Result<T, String> + Clone + Send + Sync + 'static
where
    T: FromStr + Clone + Send + Sync + 'static,
    T::Err: Display,
{
    move |raw: &str| {
        let raw = raw.trim();
        if raw.is_empty() {
            Ok(default.clone())
        } else {
            raw.parse().map_err(|e: T::Err| e.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let config = Config::try_parse_from([
            "statebridged",
            "--port",
            "9090",
            "--store-name",
            "orders",
            "--otel-endpoint",
            "collector:4318",
            "--sidecar-grpc-port",
            "50001",
            "--sidecar-http-port",
            "3600",
            "--sidecar-wait",
            "3",
            "--shutdown-timeout",
            "1",
            "--log-format",
            "text",
        ])
        .unwrap();

        assert_eq!(config.port, 9090);
        assert_eq!(config.store_name, "orders");
        assert_eq!(config.sidecar_grpc_port.as_deref(), Some("50001"));
        assert_eq!(config.sidecar_http_port, 3600);
        assert_eq!(config.sidecar_wait(), Duration::from_secs(3));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(1));

        let telemetry = config.telemetry();
        assert_eq!(telemetry.endpoint.as_deref(), Some("collector:4318"));
        assert_eq!(telemetry.log_format, LogFormat::Text);
        assert_eq!(telemetry.service_name, DEFAULT_SERVICE_NAME);
    }

    #[test]
    fn invalid_log_format_is_rejected() {
        let result = Config::try_parse_from(["statebridged", "--log-format", "xml"]);
        assert!(result.is_err());
    }

    #[test]
    fn invalid_port_is_rejected() {
        let result = Config::try_parse_from(["statebridged", "--port", "http"]);
        assert!(result.is_err());
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = Config::try_parse_from([
            "statebridged",
            "--port",
            "",
            "--store-name",
            " ",
            "--otel-service-name",
            "",
            "--sidecar-http-port",
            "",
            "--sidecar-wait",
            "",
            "--shutdown-timeout",
            "",
            "--header-read-timeout",
            "",
            "--log-format",
            "",
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.store_name, DEFAULT_STORE_NAME);
        assert_eq!(config.otel_service_name, DEFAULT_SERVICE_NAME);
        assert_eq!(config.sidecar_http_port, DEFAULT_SIDECAR_HTTP_PORT);
        assert_eq!(config.sidecar_wait(), Duration::from_secs(15));
        assert_eq!(config.shutdown_timeout(), Duration::from_secs(10));
        assert_eq!(config.timeouts(), Timeouts::default());
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn blank_endpoint_disables_export() {
        let config = Config::try_parse_from(["statebridged", "--otel-endpoint", ""]).unwrap();
        let endpoint = config.telemetry().endpoint;
        assert_eq!(
            endpoint
                .as_deref()
                .and_then(statebridge_telemetry::otel::normalize_endpoint),
            None
        );
    }

    #[test]
    fn empty_environment_variable_uses_default() {
        // SAFETY: no other test sets or expects a value for APP_PORT.
        unsafe { std::env::set_var("APP_PORT", "") };
        let config = Config::try_parse_from(["statebridged"]);
        unsafe { std::env::remove_var("APP_PORT") };

        assert_eq!(config.unwrap().port, 8080);
    }

    #[test]
    fn blank_default_parser_keeps_real_values() {
        let parse = or_default(7u16);
        assert_eq!(parse(""), Ok(7));
        assert_eq!(parse("  "), Ok(7));
        assert_eq!(parse(" 42 "), Ok(42));
        assert!(parse("http").is_err());
    }
}
