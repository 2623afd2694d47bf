//! Single-shot HTTP health probe.

use std::time::Duration;

use http::StatusCode;
use tracing::debug;

/// Result of a single health probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeResult {
    /// The endpoint answered `200 OK`.
    Ready,
    /// The endpoint answered with any other status.
    NotReady(StatusCode),
    /// The probe could not complete (connect error, handshake error, timeout).
    Failed,
}

impl ProbeResult {
    pub fn is_ready(self) -> bool {
        self == ProbeResult::Ready
    }
}

/// Perform an HTTP GET probe against `http://{address}{path}`.
///
/// Only an exact `200` counts as ready; the whole exchange is bounded by
/// `timeout`.
pub async fn http_probe(address: &str, path: &str, timeout: Duration) -> ProbeResult {
    let uri = format!("http://{address}{path}");

    let result = tokio::time::timeout(timeout, async {
        let stream = match tokio::net::TcpStream::connect(address).await {
            Ok(s) => s,
            Err(e) => {
                debug!(error = %e, %uri, "probe connection failed");
                return ProbeResult::Failed;
            }
        };

        let io = hyper_util::rt::TokioIo::new(stream);
        let (mut sender, conn) = match hyper::client::conn::http1::handshake(io).await {
            Ok(pair) => pair,
            Err(e) => {
                debug!(error = %e, %uri, "probe handshake failed");
                return ProbeResult::Failed;
            }
        };

        // Drive the connection in the background.
        tokio::spawn(async move {
            let _ = conn.await;
        });

        let req = match http::Request::builder()
            .method("GET")
            .uri(path)
            .header("host", address)
            .header("user-agent", concat!("statebridge-health/", env!("CARGO_PKG_VERSION")))
            .body(http_body_util::Empty::<bytes::Bytes>::new())
        {
            Ok(req) => req,
            Err(e) => {
                debug!(error = %e, %uri, "probe request invalid");
                return ProbeResult::Failed;
            }
        };

        match sender.send_request(req).await {
            Ok(resp) if resp.status() == StatusCode::OK => ProbeResult::Ready,
            Ok(resp) => {
                debug!(status = %resp.status(), %uri, "probe not ready");
                ProbeResult::NotReady(resp.status())
            }
            Err(e) => {
                debug!(error = %e, %uri, "probe request failed");
                ProbeResult::Failed
            }
        }
    })
    .await;

    match result {
        Ok(probe) => probe,
        Err(_) => {
            debug!(%uri, "probe timed out");
            ProbeResult::Failed
        }
    }
}
