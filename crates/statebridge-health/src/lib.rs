//! statebridge-health — HTTP probes and sidecar readiness.
//!
//! # Architecture
//!
//! ```text
//! wait_for_sidecar(grpc_port, probe, deadline)
//!   ├── grpc_port unset → Readiness::Skipped
//!   └── SidecarProbe::wait_ready()
//!         └── http_probe() every 500ms until 200 or deadline
//! ```
//!
//! The result gates which state store the daemon constructs.

pub mod checker;
pub mod readiness;

pub use checker::{ProbeResult, http_probe};
pub use readiness::{
    DEFAULT_SIDECAR_HTTP_PORT, Readiness, SIDECAR_HEALTH_PATH, SidecarProbe, wait_for_sidecar,
};
