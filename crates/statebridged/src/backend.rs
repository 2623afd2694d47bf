//! State store selection.

use std::sync::Arc;

use statebridge_health::{Readiness, SidecarProbe, wait_for_sidecar};
use statebridge_store::{MemoryStore, SidecarStore, StateStore};
use tracing::info;

use crate::config::Config;

/// Wait for the sidecar (if one is advertised) and build the matching store.
pub async fn select_backend(config: &Config) -> Arc<dyn StateStore> {
    let probe = SidecarProbe::local(config.sidecar_http_port);
    let readiness = wait_for_sidecar(
        config.sidecar_grpc_port.as_deref(),
        &probe,
        config.sidecar_wait(),
    )
    .await;
    choose_store(readiness, config.sidecar_http_port)
}

/// Sidecar store when the sidecar is ready, in-memory store otherwise.
pub fn choose_store(readiness: Readiness, sidecar_http_port: u16) -> Arc<dyn StateStore> {
    if readiness.is_ready() {
        match SidecarStore::local(sidecar_http_port) {
            Ok(store) => {
                info!(base = %store.base_url(), "using sidecar state store");
                return Arc::new(store);
            }
            Err(e) => {
                info!(
                    error = %e,
                    "sidecar client unavailable, using in-memory store for local dev"
                );
            }
        }
    } else {
        info!(?readiness, "sidecar unavailable, using in-memory store for local dev");
    }
    Arc::new(MemoryStore::new())
}
