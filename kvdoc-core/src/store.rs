//! Main document store interface.
//!
//! [`DocumentStore`] is the configuration root of the document layer. It owns the key-value
//! backend together with everything collections share read-only: the relation registry,
//! the filter oracle and the clock. Collections borrow the store, so any number of them
//! can be used concurrently.
//!
//! # Example
//!
//! ```ignore
//! use kvdoc::{prelude::*, memory::InMemoryKv};
//!
//! let store = DocumentStore::builder(InMemoryKv::new())
//!     .relation("posts", "author", "users")
//!     .relation("users", "addresses.cityId", "cities")
//!     .build()?;
//!
//! let posts = store.collection("posts");
//! ```

use std::sync::Arc;

use crate::{
    backend::KvStore,
    collection::{Collection, TypedCollection},
    document::Document,
    error::DocumentStoreResult,
    matcher::{ExprMatcher, FilterMatcher},
    record::{Clock, SystemClock},
    relation::RelationRegistry,
};

/// A document store bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The key-value store implementation
#[derive(Debug)]
pub struct DocumentStore<B: KvStore> {
    pub(crate) backend: B,
    pub(crate) relations: Arc<RelationRegistry>,
    pub(crate) matcher: Arc<dyn FilterMatcher>,
    pub(crate) clock: Arc<dyn Clock>,
}

/// A document store over a type-erased backend.
pub type DynDocumentStore = DocumentStore<Box<dyn KvStore>>;

impl<B: KvStore> DocumentStore<B> {
    /// Creates a store with no relations, the default filter oracle and the system clock.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            relations: Arc::new(RelationRegistry::new()),
            matcher: Arc::new(ExprMatcher),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn builder(backend: B) -> DocumentStoreBuilder<B> {
        DocumentStoreBuilder::new(backend)
    }

    /// Gets an untyped collection with the given name.
    pub fn collection<'a>(&'a self, name: &str) -> Collection<'a, B> {
        Collection::new(name.to_string(), self)
    }

    /// Gets a typed collection for the specified document type.
    ///
    /// The collection name is determined by [`Document::collection_name`].
    pub fn typed_collection<'a, D: Document>(&'a self) -> TypedCollection<'a, B, D> {
        TypedCollection::new(self.collection(D::collection_name()))
    }

    /// Returns the relation registry used by population.
    pub fn relations(&self) -> &RelationRegistry {
        &self.relations
    }

    /// Returns the underlying key-value store.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Shuts down the store and releases backend resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to shut down.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await
    }
}

impl<B: KvStore + 'static> DocumentStore<B> {
    /// Erases the backend type, keeping the configuration.
    pub fn into_dyn(self) -> DynDocumentStore {
        DocumentStore {
            backend: Box::new(self.backend),
            relations: self.relations,
            matcher: self.matcher,
            clock: self.clock,
        }
    }
}

/// Builder for [`DocumentStore`].
#[derive(Debug)]
pub struct DocumentStoreBuilder<B: KvStore> {
    backend: B,
    relations: RelationRegistry,
    entries: Vec<(String, String, String)>,
    matcher: Arc<dyn FilterMatcher>,
    clock: Arc<dyn Clock>,
}

impl<B: KvStore> DocumentStoreBuilder<B> {
    fn new(backend: B) -> Self {
        Self {
            backend,
            relations: RelationRegistry::new(),
            entries: Vec::new(),
            matcher: Arc::new(ExprMatcher),
            clock: Arc::new(SystemClock),
        }
    }

    /// Uses `relations` as the base registry.
    pub fn relations(mut self, relations: RelationRegistry) -> Self {
        self.relations = relations;
        self
    }

    /// Declares that `field` of `collection` references records of `target`.
    pub fn relation(
        mut self,
        collection: impl Into<String>,
        field: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.entries
            .push((collection.into(), field.into(), target.into()));
        self
    }

    /// Replaces the filter oracle.
    pub fn matcher(mut self, matcher: impl FilterMatcher + 'static) -> Self {
        self.matcher = Arc::new(matcher);
        self
    }

    /// Replaces the clock used for `createdAt` and `updatedAt`.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    /// Builds the store.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Configuration`](crate::error::DocumentStoreError::Configuration)
    /// if a relation is declared with two different targets.
    pub fn build(self) -> DocumentStoreResult<DocumentStore<B>> {
        let relations = self
            .entries
            .into_iter()
            .fold(RelationRegistry::builder().extend(self.relations), |builder, (collection, field, target)| {
                builder.register(collection, field, target)
            })
            .build()?;

        Ok(DocumentStore {
            backend: self.backend,
            relations: Arc::new(relations),
            matcher: self.matcher,
            clock: self.clock,
        })
    }
}
