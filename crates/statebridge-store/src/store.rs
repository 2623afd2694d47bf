//! The state store capability shared by every backend.

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::StoreResult;
use crate::types::{Metadata, SaveOptions, StateItem};

/// Key/value state operations keyed by store name and key.
///
/// Implementations must be safe to share across request tasks behind an
/// `Arc<dyn StateStore>`.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Fetch the item for `key`.
    ///
    /// A missing key is not an error: it yields an item whose value is
    /// absent (see [`StateItem::is_found`]). Errors are reserved for backend
    /// or communication faults.
    async fn get(&self, store: &str, key: &str, metadata: &Metadata) -> StoreResult<StateItem>;

    /// Insert or overwrite the value for `key`.
    async fn save(
        &self,
        store: &str,
        key: &str,
        data: Bytes,
        metadata: &Metadata,
        options: &SaveOptions,
    ) -> StoreResult<()>;

    /// Remove `key`. Removing a key that does not exist succeeds.
    async fn delete(&self, store: &str, key: &str, metadata: &Metadata) -> StoreResult<()>;

    /// Short backend name used in logs.
    fn backend(&self) -> &'static str;
}
