//! HTTP serving with bounded graceful shutdown.
//!
//! Connections are served by hyper's HTTP/1 builder so the header read
//! timeout can be enforced; each accepted socket runs on its own task.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, anyhow};
use axum::Router;
use hyper::server::conn::http1;
use hyper_util::rt::{TokioIo, TokioTimer};
use hyper_util::server::graceful::GracefulShutdown;
use hyper_util::service::TowerToHyperService;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Time a client gets to send the complete request head.
pub const DEFAULT_HEADER_READ_TIMEOUT: Duration = Duration::from_secs(5);

/// Time in-flight requests get to finish once shutdown starts.
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Pause after a failed accept (e.g. file descriptor exhaustion).
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Server-side time limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub header_read: Duration,
    pub shutdown_grace: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            header_read: DEFAULT_HEADER_READ_TIMEOUT,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

/// Serve `router` on `listener` until `shutdown` resolves.
///
/// After the signal, in-flight requests get `timeouts.shutdown_grace` to
/// finish. Running out of grace, or the server stopping on its own, is an
/// error.
pub async fn serve<F>(
    listener: TcpListener,
    router: Router,
    shutdown: F,
    timeouts: Timeouts,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send,
{
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut server = tokio::spawn(accept_loop(
        listener,
        router,
        timeouts.header_read,
        shutdown_rx,
    ));

    tokio::select! {
        result = &mut server => {
            return match result {
                Ok(()) => Err(anyhow!("server stopped unexpectedly")),
                Err(e) => Err(anyhow!(e).context("server task panicked")),
            };
        }
        () = shutdown => info!("shutting down server"),
    }

    let _ = shutdown_tx.send(true);

    let grace = timeouts.shutdown_grace;
    match tokio::time::timeout(grace, server).await {
        Ok(Ok(())) => {
            info!("server stopped");
            Ok(())
        }
        Ok(Err(e)) => Err(anyhow!(e).context("server task panicked")),
        Err(_) => Err(anyhow!("in-flight requests still running after {grace:?}")
            .context("server shutdown failed")),
    }
}

/// Accept connections until `shutdown` flips, then drain open connections.
async fn accept_loop(
    listener: TcpListener,
    router: Router,
    header_read_timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut http = http1::Builder::new();
    http.timer(TokioTimer::new()).header_read_timeout(header_read_timeout);
    let graceful = GracefulShutdown::new();

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer_addr) = match accepted {
                    Ok(conn) => conn,
                    Err(e) => {
                        warn!(error = %e, "accept failed");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                        continue;
                    }
                };

                let svc = TowerToHyperService::new(router.clone());
                let conn = graceful.watch(http.serve_connection(TokioIo::new(stream), svc));
                tokio::spawn(async move {
                    if let Err(e) = conn.await {
                        debug!(%peer_addr, error = %e, "connection closed with error");
                    }
                });
            }
            _ = shutdown.changed() => break,
        }
    }

    drop(listener);
    graceful.shutdown().await;
}

/// Resolves on SIGINT or SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for SIGINT");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!(signal = "SIGINT", "shutdown signal received"),
        () = terminate => info!(signal = "SIGTERM", "shutdown signal received"),
    }
}

/// Bind all interfaces on `port`.
pub async fn bind(port: u16) -> anyhow::Result<TcpListener> {
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))
}
