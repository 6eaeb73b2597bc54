//! In-memory key-value store.
//!
//! Entries live in a `BTreeMap` ordered by [`Key`], so a prefix scan is a single range walk.

use async_trait::async_trait;
use bson::Bson;
use mea::rwlock::RwLock;
use std::{collections::BTreeMap, sync::Arc};
use tracing::trace;

use kvdoc_core::{
    backend::{Key, KvStore, KvStoreBuilder},
    error::DocumentStoreResult,
};

/// Thread-safe ordered in-memory store.
///
/// `InMemoryKv` is cloneable and uses an `Arc`-wrapped map, so clones share the same
/// entries. Single-key operations are atomic; a scan observes one consistent snapshot.
///
/// # Example
///
/// ```ignore
/// use kvdoc_memory::InMemoryKv;
/// use kvdoc::backend::{Key, KvStore};
/// use bson::{Bson, doc};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = InMemoryKv::new();
///
///     store.set(Key::record("users", "a"), Bson::Document(doc! { "name": "Alice" })).await?;
///     assert_eq!(store.scan(&Key::collection("users")).await?.len(), 1);
///
///     Ok(())
/// }
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryKv {
    entries: Arc<RwLock<BTreeMap<Key, Bson>>>,
}

impl InMemoryKv {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> InMemoryKvBuilder {
        InMemoryKvBuilder
    }

    /// Number of entries across all collections.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KvStore for InMemoryKv {
    async fn get(&self, key: &Key) -> DocumentStoreResult<Option<Bson>> {
        trace!(key = %key, "get");

        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: Key, value: Bson) -> DocumentStoreResult<()> {
        trace!(key = %key, "set");

        self.entries.write().await.insert(key, value);

        Ok(())
    }

    async fn delete(&self, key: &Key) -> DocumentStoreResult<()> {
        trace!(key = %key, "delete");

        self.entries.write().await.remove(key);

        Ok(())
    }

    async fn scan(&self, prefix: &Key) -> DocumentStoreResult<Vec<(Key, Bson)>> {
        let entries = self.entries.read().await;

        let found: Vec<(Key, Bson)> = entries
            .range(prefix.clone()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        trace!(prefix = %prefix, count = found.len(), "scan");

        Ok(found)
    }
}

/// Builder for [`InMemoryKv`].
///
/// ```ignore
/// use kvdoc_memory::InMemoryKv;
/// use kvdoc::backend::KvStoreBuilder;
///
/// let store = InMemoryKv::builder().build().await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryKvBuilder;

#[async_trait]
impl KvStoreBuilder for InMemoryKvBuilder {
    type Store = InMemoryKv;

    /// Always succeeds with an empty store.
    async fn build(self) -> DocumentStoreResult<Self::Store> {
        Ok(InMemoryKv::new())
    }
}
