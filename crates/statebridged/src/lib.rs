//! statebridged — the statebridge daemon.
//!
//! Assembles the HTTP state API:
//! - Sidecar readiness wait (skipped when no sidecar is advertised)
//! - State store (sidecar-backed, or in-memory for local dev)
//! - REST API with per-request tracing and metrics
//! - Graceful shutdown on SIGINT/SIGTERM
//!
//! # Usage
//!
//! ```text
//! APP_PORT=8080 STATESTORE_NAME=statestore statebridged
//! ```

pub mod backend;
pub mod config;
pub mod server;

use statebridge_api::{ApiState, build_router};
use tracing::info;

pub use config::Config;

/// Run the daemon until a shutdown signal arrives.
pub async fn run(config: Config) -> anyhow::Result<()> {
    info!("statebridge daemon starting");

    let store = backend::select_backend(&config).await;
    let backend = store.backend();
    let state = ApiState::new(store, &config.store_name);
    let store_name = state.store_name.clone();
    let router = build_router(state);

    let listener = server::bind(config.port).await?;
    info!(
        addr = %listener.local_addr()?,
        store = %store_name,
        backend,
        "API server starting"
    );

    server::serve(
        listener,
        router,
        server::shutdown_signal(),
        config.timeouts(),
    )
    .await?;

    info!("statebridge daemon stopped");
    Ok(())
}
