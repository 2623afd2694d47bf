//! statebridge-store — the state store capability and its backends.
//!
//! Every backend implements [`StateStore`]: get, save and delete keyed by a
//! store name and a string key, over opaque byte payloads.
//!
//! # Backends
//!
//! ```text
//! StateStore (trait, shared as Arc<dyn StateStore>)
//!   ├── SidecarStore  → sidecar HTTP state API (hyper client)
//!   └── MemoryStore   → RwLock<HashMap<String, Bytes>>, process lifetime
//! ```
//!
//! A zero-length or absent value means "not found" for every backend.

pub mod error;
pub mod memory;
pub mod sidecar;
pub mod store;
pub mod types;

pub use error::{StoreError, StoreResult};
pub use memory::MemoryStore;
pub use sidecar::SidecarStore;
pub use store::StateStore;
pub use types::*;
