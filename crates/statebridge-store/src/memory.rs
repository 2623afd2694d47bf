//! MemoryStore — process-local fallback backend.
//!
//! Used when no sidecar is reachable. Data lives only as long as the
//! process; there is no eviction, TTL, or size bound, so this backend is
//! meant for development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::StoreResult;
use crate::store::StateStore;
use crate::types::{Metadata, SaveOptions, StateItem};

/// In-memory state store. All store names share one keyspace.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<HashMap<String, Bytes>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held (including empty values).
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn get(&self, _store: &str, key: &str, _metadata: &Metadata) -> StoreResult<StateItem> {
        let data = self.data.read().await;
        match data.get(key) {
            Some(value) if !value.is_empty() => Ok(StateItem::found(key, value.clone())),
            _ => Ok(StateItem::not_found(key)),
        }
    }

    async fn save(
        &self,
        _store: &str,
        key: &str,
        data: Bytes,
        _metadata: &Metadata,
        _options: &SaveOptions,
    ) -> StoreResult<()> {
        let len = data.len();
        self.data.write().await.insert(key.to_string(), data);
        debug!(%key, len, "state saved in memory");
        Ok(())
    }

    async fn delete(&self, _store: &str, key: &str, _metadata: &Metadata) -> StoreResult<()> {
        let existed = self.data.write().await.remove(key).is_some();
        debug!(%key, existed, "state deleted from memory");
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    const STORE: &str = "statestore";

    fn meta() -> Metadata {
        Metadata::new()
    }

    async fn save(store: &MemoryStore, key: &str, value: &'static [u8]) {
        store
            .save(STORE, key, Bytes::from_static(value), &meta(), &SaveOptions::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn save_and_get() {
        let store = MemoryStore::new();
        save(&store, "foo", b"bar").await;

        let item = store.get(STORE, "foo", &meta()).await.unwrap();
        assert_eq!(item.key, "foo");
        assert_eq!(item.value.as_deref(), Some(&b"bar"[..]));
    }

    #[tokio::test]
    async fn get_nonexistent_is_not_found() {
        let store = MemoryStore::new();
        let item = store.get(STORE, "nope", &meta()).await.unwrap();
        assert!(!item.is_found());
    }

    #[tokio::test]
    async fn empty_value_reads_as_not_found() {
        let store = MemoryStore::new();
        save(&store, "blank", b"").await;

        let item = store.get(STORE, "blank", &meta()).await.unwrap();
        assert!(!item.is_found());
        // The key itself is still held.
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn last_write_wins() {
        let store = MemoryStore::new();
        save(&store, "k", b"v1").await;
        save(&store, "k", b"v2").await;

        let item = store.get(STORE, "k", &meta()).await.unwrap();
        assert_eq!(item.value.as_deref(), Some(&b"v2"[..]));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn delete_removes_key() {
        let store = MemoryStore::new();
        save(&store, "k", b"v").await;

        store.delete(STORE, "k", &meta()).await.unwrap();
        assert!(!store.get(STORE, "k", &meta()).await.unwrap().is_found());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn delete_missing_key_is_ok() {
        let store = MemoryStore::new();
        store.delete(STORE, "never-saved", &meta()).await.unwrap();
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn store_name_is_ignored() {
        let store = MemoryStore::new();
        save(&store, "shared", b"x").await;

        let item = store.get("other", "shared", &meta()).await.unwrap();
        assert!(item.is_found());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_saves_keep_exactly_one_value() {
        let store = Arc::new(MemoryStore::new());
        let writers = 32;

        let handles: Vec<_> = (0..writers)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    store
                        .save(
                            STORE,
                            "contended",
                            Bytes::from(format!("value-{i}")),
                            &Metadata::new(),
                            &SaveOptions::default(),
                        )
                        .await
                        .unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        let candidates: HashSet<Vec<u8>> = (0..writers)
            .map(|i| format!("value-{i}").into_bytes())
            .collect();
        let item = store.get(STORE, "contended", &meta()).await.unwrap();
        let value = item.value.unwrap().to_vec();
        assert!(candidates.contains(&value));
        assert_eq!(store.len().await, 1);
    }

    #[test]
    fn backend_name() {
        assert_eq!(MemoryStore::new().backend(), "memory");
    }
}
