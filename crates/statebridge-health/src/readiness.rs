//! Sidecar readiness — bounded polling before the backend is chosen.
//!
//! The daemon waits here once at startup. The outcome only decides which
//! state store gets constructed; it never affects request handling later.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::checker::{ProbeResult, http_probe};

/// Sidecar endpoint that answers 200 once outbound components are ready.
pub const SIDECAR_HEALTH_PATH: &str = "/v1.0/healthz/outbound";

/// Sidecar HTTP port used when none is configured.
pub const DEFAULT_SIDECAR_HTTP_PORT: u16 = 3500;

/// Delay between probe attempts.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Upper bound for a single probe attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);

/// Outcome of waiting for the sidecar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// No sidecar is injected; polling was skipped.
    Skipped,
    /// The sidecar answered its health endpoint.
    Ready,
    /// The deadline passed without a successful probe.
    TimedOut,
}

impl Readiness {
    pub fn is_ready(self) -> bool {
        self == Readiness::Ready
    }
}

/// Polls a sidecar health endpoint at a fixed interval.
#[derive(Debug, Clone)]
pub struct SidecarProbe {
    address: String,
    interval: Duration,
    attempt_timeout: Duration,
}

impl SidecarProbe {
    /// Probe `address` (`host:port`) on the sidecar health path.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            interval: DEFAULT_POLL_INTERVAL,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    /// Probe a sidecar on the loopback interface.
    pub fn local(http_port: u16) -> Self {
        Self::new(format!("127.0.0.1:{http_port}"))
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Poll until a probe succeeds or `deadline` elapses.
    pub async fn wait_ready(&self, deadline: Duration) -> bool {
        let poll = async {
            let mut attempt: u32 = 0;
            loop {
                attempt += 1;
                match http_probe(&self.address, SIDECAR_HEALTH_PATH, self.attempt_timeout).await {
                    ProbeResult::Ready => {
                        debug!(attempt, address = %self.address, "sidecar probe succeeded");
                        return true;
                    }
                    other => {
                        debug!(
                            attempt,
                            result = ?other,
                            address = %self.address,
                            "sidecar not ready yet"
                        );
                    }
                }
                tokio::time::sleep(self.interval).await;
            }
        };

        tokio::time::timeout(deadline, poll).await.unwrap_or(false)
    }
}

/// Wait for the sidecar when one is injected.
///
/// `grpc_port` is the sidecar's advertised gRPC port. When it is absent or
/// blank there is no sidecar and polling is skipped entirely.
pub async fn wait_for_sidecar(
    grpc_port: Option<&str>,
    probe: &SidecarProbe,
    deadline: Duration,
) -> Readiness {
    if grpc_port.is_none_or(|p| p.trim().is_empty()) {
        debug!("no sidecar advertised; skipping readiness wait");
        return Readiness::Skipped;
    }

    if probe.wait_ready(deadline).await {
        info!(address = %probe.address(), "sidecar ready");
        Readiness::Ready
    } else {
        warn!(address = %probe.address(), ?deadline, "sidecar not ready before deadline");
        Readiness::TimedOut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_probe(server: &MockServer) -> SidecarProbe {
        SidecarProbe::new(server.address().to_string())
            .with_interval(Duration::from_millis(20))
            .with_attempt_timeout(Duration::from_millis(200))
    }

    #[tokio::test]
    async fn skipped_without_grpc_port() {
        // Nothing listens here; a real poll would time out instead.
        let probe = SidecarProbe::local(1);
        assert_eq!(
            wait_for_sidecar(None, &probe, Duration::from_secs(5)).await,
            Readiness::Skipped
        );
        assert_eq!(
            wait_for_sidecar(Some("  "), &probe, Duration::from_secs(5)).await,
            Readiness::Skipped
        );
    }

    #[tokio::test]
    async fn ready_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SIDECAR_HEALTH_PATH))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let readiness =
            wait_for_sidecar(Some("50001"), &fast_probe(&server), Duration::from_secs(2)).await;
        assert!(readiness.is_ready());
    }

    #[tokio::test]
    async fn ready_after_transient_failures() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(SIDECAR_HEALTH_PATH))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(3)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(SIDECAR_HEALTH_PATH))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        assert!(fast_probe(&server).wait_ready(Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn times_out_when_never_ready() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let readiness =
            wait_for_sidecar(Some("50001"), &fast_probe(&server), Duration::from_millis(150)).await;
        assert_eq!(readiness, Readiness::TimedOut);
    }

    #[tokio::test]
    async fn times_out_when_unreachable() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let probe = SidecarProbe::local(port).with_interval(Duration::from_millis(20));
        assert!(!probe.wait_ready(Duration::from_millis(150)).await);
    }

    #[test]
    fn local_probe_targets_loopback() {
        let probe = SidecarProbe::local(DEFAULT_SIDECAR_HTTP_PORT);
        assert_eq!(probe.address(), "127.0.0.1:3500");
    }
}
