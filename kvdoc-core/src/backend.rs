//! Key-value store abstraction underneath the document layer.
//!
//! This module defines the ordered key-value contract the document layer is built on,
//! allowing collections to work with any store (in-memory, embedded, remote) that can
//! get, set, delete and prefix-scan tuple keys.
//!
//! # Overview
//!
//! The [`KvStore`] trait provides a unified async interface over four primitives. Records
//! are addressed by tuple [`Key`]s whose first part is the collection name, so a collection
//! is simply the range of keys sharing that prefix. Implementations are required to be
//! thread-safe (`Send + Sync`) and support concurrent access.
//!
//! # Traits
//!
//! - [`KvStore`]: The core trait for key-value backends
//! - [`KvStoreBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use kvdoc::backend::{Key, KvStore};
//! use bson::{Bson, doc};
//!
//! let store = MyKvStore::new();
//!
//! store.set(Key::record("users", "abc"), Bson::Document(doc! { "name": "Alice" })).await?;
//! let users = store.scan(&Key::collection("users")).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::Bson;
use std::{fmt, fmt::Debug, sync::Arc};

use crate::error::DocumentStoreResult;

/// An ordered tuple key.
///
/// Keys compare part by part, so every key that starts with a given prefix sorts into one
/// contiguous range. A record lives at `[collection, id]`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Key(Vec<String>);

impl Key {
    /// Creates a key from its parts.
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Key(parts.into_iter().map(Into::into).collect())
    }

    /// The prefix shared by every record of a collection.
    pub fn collection(name: &str) -> Self {
        Key(vec![name.to_string()])
    }

    /// The key of a single record.
    pub fn record(collection: &str, id: &str) -> Self {
        Key(vec![collection.to_string(), id.to_string()])
    }

    /// Returns the parts of this key.
    pub fn parts(&self) -> &[String] {
        &self.0
    }

    /// Returns the last part of this key (the record id for record keys).
    pub fn last(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    /// Returns `true` if `prefix` is a (non-strict) prefix of this key.
    pub fn starts_with(&self, prefix: &Key) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

/// Abstract interface for ordered key-value stores.
///
/// Implementers provide the four primitives the document layer needs. Each single-key
/// `get`, `set` and `delete` must be atomic; nothing else is assumed. In particular there
/// is no isolation between concurrent reads and writes on different keys.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks. Populate and truncate issue independent calls concurrently.
///
/// # Error Handling
///
/// Store failures should be reported as
/// [`DocumentStoreError::Backend`](crate::error::DocumentStoreError::Backend). The
/// document layer propagates them unchanged and never retries.
#[async_trait]
pub trait KvStore: Send + Sync + Debug {
    /// Fetches the value stored at `key`, or `None` if the key is absent.
    async fn get(&self, key: &Key) -> DocumentStoreResult<Option<Bson>>;

    /// Stores `value` at `key`, replacing any previous value.
    async fn set(&self, key: Key, value: Bson) -> DocumentStoreResult<()>;

    /// Removes `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &Key) -> DocumentStoreResult<()>;

    /// Returns every entry whose key starts with `prefix`, in ascending key order.
    async fn scan(&self, prefix: &Key) -> DocumentStoreResult<Vec<(Key, Bson)>>;

    /// Cleanly shuts down the store, releasing all resources.
    ///
    /// The default implementation is a no-op, but stores with persistent storage or
    /// external connections should override this.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> KvStore for &B
where
    B: KvStore + ?Sized,
{
    async fn get(&self, key: &Key) -> DocumentStoreResult<Option<Bson>> {
        (**self).get(key).await
    }

    async fn set(&self, key: Key, value: Bson) -> DocumentStoreResult<()> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &Key) -> DocumentStoreResult<()> {
        (**self).delete(key).await
    }

    async fn scan(&self, prefix: &Key) -> DocumentStoreResult<Vec<(Key, Bson)>> {
        (**self).scan(prefix).await
    }
}

#[async_trait]
impl<B> KvStore for Box<B>
where
    B: KvStore + ?Sized,
{
    async fn get(&self, key: &Key) -> DocumentStoreResult<Option<Bson>> {
        (**self).get(key).await
    }

    async fn set(&self, key: Key, value: Bson) -> DocumentStoreResult<()> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &Key) -> DocumentStoreResult<()> {
        (**self).delete(key).await
    }

    async fn scan(&self, prefix: &Key) -> DocumentStoreResult<Vec<(Key, Bson)>> {
        (**self).scan(prefix).await
    }
}

#[async_trait]
impl<B> KvStore for Arc<B>
where
    B: KvStore + ?Sized,
{
    async fn get(&self, key: &Key) -> DocumentStoreResult<Option<Bson>> {
        (**self).get(key).await
    }

    async fn set(&self, key: Key, value: Bson) -> DocumentStoreResult<()> {
        (**self).set(key, value).await
    }

    async fn delete(&self, key: &Key) -> DocumentStoreResult<()> {
        (**self).delete(key).await
    }

    async fn scan(&self, prefix: &Key) -> DocumentStoreResult<Vec<(Key, Bson)>> {
        (**self).scan(prefix).await
    }
}

#[async_trait]
pub trait KvStoreBuilder {
    type Store: KvStore;

    async fn build(self) -> DocumentStoreResult<Self::Store>;
}
