//! statebridge-api — HTTP façade over the state store capability.
//!
//! # API Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | GET | `/health` | Liveness, always `200 OK` |
//! | GET | `/state/{key}` | Raw value bytes, 404 when absent |
//! | POST | `/state/{key}` | Store the request body, 204 |
//! | DELETE | `/state/{key}` | Remove the key, 204 (idempotent) |
//!
//! Every route is wrapped by [`observe::observe`], which opens a server span
//! (parented on inbound W3C trace context) and records request metrics.

pub mod handlers;
pub mod observe;

use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use statebridge_store::{DEFAULT_STORE_NAME, StateStore};

pub use observe::HttpMetrics;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn StateStore>,
    /// Store every request is routed to.
    pub store_name: Arc<str>,
}

impl ApiState {
    /// Bind handlers to `store`. A blank `store_name` falls back to
    /// [`DEFAULT_STORE_NAME`].
    pub fn new(store: Arc<dyn StateStore>, store_name: &str) -> Self {
        let store_name = match store_name.trim() {
            "" => DEFAULT_STORE_NAME,
            name => name,
        };
        Self {
            store,
            store_name: Arc::from(store_name),
        }
    }
}

/// Build the complete router.
///
/// Request bodies are read in full with no size cap; payload limits are left
/// to the backing store.
pub fn build_router(state: ApiState) -> Router {
    let metrics = HttpMetrics::new();

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/state/",
            get(handlers::missing_key)
                .post(handlers::missing_key)
                .delete(handlers::missing_key),
        )
        .route(
            "/state/{key}",
            get(handlers::get_state)
                .post(handlers::save_state)
                .delete(handlers::delete_state),
        )
        .with_state(state)
        .layer(DefaultBodyLimit::disable())
        .layer(axum::middleware::from_fn_with_state(metrics, observe::observe))
}
