//! Collection accessors.
//!
//! A collection is the set of records stored under the key prefix `[name]`. This module
//! provides the two ways of working with one:
//!
//! - [`Collection`] - Untyped accessor working with [`Record`]s
//! - [`TypedCollection`] - Accessor for a specific [`Document`] type
//!
//! Operations that target a single record resolve it by id, by filter (the first match in
//! key order), or by both (the record fetched by id must also match the filter).
//!
//! # Example
//!
//! ```ignore
//! use kvdoc::prelude::*;
//!
//! let users = store.collection("users");
//!
//! let alice = users.create(doc! { "name": "Alice", "age": 30 }).await?;
//! let id = record_id(&alice).unwrap_or_default().to_string();
//!
//! let older = users
//!     .update(UpdateOptions::by_id(&id, Patch::new().set("age", 31)))
//!     .await?;
//!
//! let adults = users
//!     .list(ListOptions::builder().filter(Filter::gte("age", 18)).build())
//!     .await?;
//! ```

use bson::Bson;
use futures::future::{join_all, try_join_all};
use std::marker::PhantomData;
use tracing::{debug, trace, warn};

use crate::{
    backend::{Key, KvStore},
    document::{Document, DocumentExt},
    error::{DocumentStoreError, DocumentStoreResult},
    options::{
        DeleteOptions, FindOptions, ListOptions, PopulateSpec, ReplaceOptions, Selector,
        UpdateOptions,
    },
    populate::Populator,
    projection::project_record,
    query::Expr,
    record::{
        CREATED_AT_FIELD, ID_FIELD, Record, UPDATED_AT_FIELD, ensure_unprotected, into_record,
        new_record_id, strip_system_fields, timestamp,
    },
    store::DocumentStore,
};

/// An untyped collection bound to a document store.
#[derive(Debug)]
pub struct Collection<'a, B: KvStore> {
    name: String,
    store: &'a DocumentStore<B>,
}

impl<'a, B: KvStore> Collection<'a, B> {
    pub(crate) fn new(name: String, store: &'a DocumentStore<B>) -> Self {
        Self { name, store }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    fn prefix(&self) -> Key {
        Key::collection(&self.name)
    }

    fn key(&self, id: &str) -> Key {
        Key::record(&self.name, id)
    }

    fn matches(&self, filter: &Expr, record: &Record) -> DocumentStoreResult<bool> {
        self.store.matcher.matches(filter, record)
    }

    /// Creates a record from `payload`.
    ///
    /// A fresh `_id` and `createdAt` are assigned; a payload carrying either field has it
    /// overwritten. Returns the stored record.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn create(&self, payload: Record) -> DocumentStoreResult<Record> {
        let id = new_record_id();

        let mut record = payload;
        record.insert(ID_FIELD, id.clone());
        record.insert(CREATED_AT_FIELD, timestamp(self.store.clock.as_ref()));

        self.store
            .backend
            .set(self.key(&id), Bson::Document(record.clone()))
            .await?;

        debug!(collection = self.name.as_str(), id = id.as_str(), "created document");

        Ok(record)
    }

    /// Lists records in key order.
    ///
    /// `skip` and `limit` count records that passed the filter. Population and projection
    /// run on the selected records only.
    ///
    /// # Errors
    ///
    /// Propagates store, filter and population failures.
    pub async fn list(&self, options: ListOptions) -> DocumentStoreResult<Vec<Record>> {
        let ListOptions { filter, limit, skip, populate, select } = options;

        if limit == Some(0) {
            return Ok(Vec::new());
        }

        let mut to_skip = skip.unwrap_or(0);
        let mut selected = Vec::new();

        for (key, value) in self.store.backend.scan(&self.prefix()).await? {
            let record = into_record(&key, value)?;

            if let Some(filter) = &filter {
                if !self.matches(filter, &record)? {
                    trace!(collection = self.name.as_str(), key = %key, "filtered out");
                    continue;
                }
            }

            if to_skip > 0 {
                to_skip -= 1;
                continue;
            }

            selected.push(record);

            if limit.is_some_and(|limit| selected.len() >= limit) {
                break;
            }
        }

        try_join_all(
            selected
                .into_iter()
                .map(|record| self.shape(record, populate.as_ref(), select.as_deref())),
        )
        .await
    }

    /// Retrieves a single record.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DocumentNotFound`] if nothing matches,
    /// [`DocumentStoreError::Validation`] if neither an id nor a filter is given, and
    /// propagates store and population failures.
    pub async fn retrieve(&self, options: FindOptions) -> DocumentStoreResult<Record> {
        let (_, record) = self.resolve_required(options.selector()?).await?;

        self.shape(record, options.populate.as_ref(), options.select.as_deref())
            .await
    }

    /// Like [`retrieve`](Self::retrieve), but returns `None` when nothing matches.
    pub async fn find(&self, options: FindOptions) -> DocumentStoreResult<Option<Record>> {
        let Some((_, record)) = self.resolve(options.selector()?).await? else {
            return Ok(None);
        };

        Ok(Some(
            self.shape(record, options.populate.as_ref(), options.select.as_deref())
                .await?,
        ))
    }

    /// Shallow-merges the payload into the addressed record and sets `updatedAt`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Validation`] before touching the store if the payload
    /// mentions a system field, and [`DocumentStoreError::DocumentNotFound`] if nothing
    /// matches.
    pub async fn update(&self, options: UpdateOptions) -> DocumentStoreResult<Record> {
        let selector = options.selector()?;
        ensure_unprotected(options.payload.fields())?;

        let (id, mut record) = self.resolve_required(selector).await?;

        options.payload.apply_to(&mut record);
        record.insert(UPDATED_AT_FIELD, timestamp(self.store.clock.as_ref()));

        self.store
            .backend
            .set(self.key(&id), Bson::Document(record.clone()))
            .await?;

        debug!(collection = self.name.as_str(), id = id.as_str(), "updated document");

        Ok(record)
    }

    /// Overwrites the addressed record with the payload, keeping `_id` and `createdAt`.
    ///
    /// # Errors
    ///
    /// Same as [`update`](Self::update).
    pub async fn replace(&self, options: ReplaceOptions) -> DocumentStoreResult<Record> {
        let selector = options.selector()?;
        ensure_unprotected(options.payload.keys().map(String::as_str))?;

        let (id, existing) = self.resolve_required(selector).await?;

        let mut record = options.payload;
        record.insert(ID_FIELD, id.clone());
        if let Some(created_at) = existing.get(CREATED_AT_FIELD) {
            record.insert(CREATED_AT_FIELD, created_at.clone());
        }
        record.insert(UPDATED_AT_FIELD, timestamp(self.store.clock.as_ref()));

        self.store
            .backend
            .set(self.key(&id), Bson::Document(record.clone()))
            .await?;

        debug!(collection = self.name.as_str(), id = id.as_str(), "replaced document");

        Ok(record)
    }

    /// Deletes the addressed record and returns it as it was before deletion.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DocumentNotFound`] if nothing matches.
    pub async fn delete(&self, options: DeleteOptions) -> DocumentStoreResult<Record> {
        let (id, record) = self.resolve_required(options.selector()?).await?;

        self.store.backend.delete(&self.key(&id)).await?;

        debug!(collection = self.name.as_str(), id = id.as_str(), "deleted document");

        Ok(record)
    }

    /// Deletes every record of the collection and returns how many were deleted.
    ///
    /// All deletions are issued concurrently and each one is attempted regardless of the
    /// others.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::TruncateFailed`] listing every record that could not
    /// be deleted once all attempts have completed.
    pub async fn truncate(&self) -> DocumentStoreResult<usize> {
        let keys: Vec<Key> = self
            .store
            .backend
            .scan(&self.prefix())
            .await?
            .into_iter()
            .map(|(key, _)| key)
            .collect();

        let outcomes = join_all(keys.iter().map(|key| self.store.backend.delete(key))).await;

        let mut deleted = 0;
        let mut failures = Vec::new();

        for (key, outcome) in keys.iter().zip(outcomes) {
            match outcome {
                Ok(()) => deleted += 1,
                Err(err) => failures.push((key.last().unwrap_or_default().to_string(), err)),
            }
        }

        if !failures.is_empty() {
            warn!(
                collection = self.name.as_str(),
                deleted,
                failed = failures.len(),
                "truncate left documents behind"
            );

            return Err(DocumentStoreError::TruncateFailed {
                collection: self.name.clone(),
                deleted,
                failures,
            });
        }

        debug!(collection = self.name.as_str(), deleted, "truncated collection");

        Ok(deleted)
    }

    /// Finds the addressed record and its id.
    async fn resolve(&self, selector: Selector<'_>) -> DocumentStoreResult<Option<(String, Record)>> {
        if let Some(id) = selector.record_id {
            let key = self.key(id);

            let Some(value) = self.store.backend.get(&key).await? else {
                return Ok(None);
            };

            let record = into_record(&key, value)?;

            if let Some(filter) = selector.filter {
                if !self.matches(filter, &record)? {
                    trace!(collection = self.name.as_str(), id, "document does not match filter");
                    return Ok(None);
                }
            }

            return Ok(Some((id.to_string(), record)));
        }

        let Some(filter) = selector.filter else {
            return Ok(None);
        };

        for (key, value) in self.store.backend.scan(&self.prefix()).await? {
            let record = into_record(&key, value)?;

            if self.matches(filter, &record)? {
                let id = key.last().unwrap_or_default().to_string();
                return Ok(Some((id, record)));
            }
        }

        Ok(None)
    }

    async fn resolve_required(&self, selector: Selector<'_>) -> DocumentStoreResult<(String, Record)> {
        self.resolve(selector).await?.ok_or_else(|| {
            DocumentStoreError::DocumentNotFound(selector.describe(), self.name.clone())
        })
    }

    /// Populates, then projects, a record about to be returned.
    async fn shape(
        &self,
        record: Record,
        populate: Option<&PopulateSpec>,
        select: Option<&[String]>,
    ) -> DocumentStoreResult<Record> {
        let mut record = match populate {
            Some(spec) => {
                Populator::new(&self.store.backend, &self.store.relations)
                    .populate(&self.name, record, spec)
                    .await?
            }
            None => record,
        };

        if let Some(select) = select {
            project_record(&mut record, select);
        }

        Ok(record)
    }
}

/// A collection of a specific [`Document`] type.
///
/// Records are converted with `bson` serde on the way in and out. System fields set on a
/// typed payload are ignored by [`create`](Self::create) and [`replace`](Self::replace),
/// since the collection owns them.
#[derive(Debug)]
pub struct TypedCollection<'a, B: KvStore, D: Document> {
    inner: Collection<'a, B>,
    _marker: PhantomData<D>,
}

impl<'a, B: KvStore, D: Document> TypedCollection<'a, B, D> {
    pub(crate) fn new(inner: Collection<'a, B>) -> Self {
        Self { inner, _marker: PhantomData }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Returns the untyped accessor for the same collection.
    pub fn collection(&self) -> &Collection<'a, B> {
        &self.inner
    }

    /// Serializes `document` and stores it as a new record. System fields set on `document`
    /// are ignored.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if `document` does not convert to or from a record, and
    /// propagates the errors of [`Collection::create`].
    pub async fn create(&self, document: &D) -> DocumentStoreResult<D> {
        let mut payload = document.to_record()?;
        strip_system_fields(&mut payload);

        D::from_record(self.inner.create(payload).await?)
    }

    /// Lists the records of the collection as documents.
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if a record does not fit `D`, and propagates the
    /// errors of [`Collection::list`].
    pub async fn list(&self, options: ListOptions) -> DocumentStoreResult<Vec<D>> {
        self.inner
            .list(options)
            .await?
            .into_iter()
            .map(D::from_record)
            .collect()
    }

    /// Retrieves the addressed record as a document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DocumentNotFound`] if nothing matches, or a
    /// deserialization error if the record does not fit `D`.
    pub async fn retrieve(&self, options: FindOptions) -> DocumentStoreResult<D> {
        D::from_record(self.inner.retrieve(options).await?)
    }

    /// Like [`retrieve`](Self::retrieve), but returns `None` if nothing matches.
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the record does not fit `D`, and propagates the
    /// errors of [`Collection::find`].
    pub async fn find(&self, options: FindOptions) -> DocumentStoreResult<Option<D>> {
        self.inner
            .find(options)
            .await?
            .map(D::from_record)
            .transpose()
    }

    /// Applies a patch to the addressed record.
    ///
    /// # Errors
    ///
    /// Same as [`Collection::update`], plus a deserialization error if the updated record
    /// does not fit `D`.
    pub async fn update(&self, options: UpdateOptions) -> DocumentStoreResult<D> {
        D::from_record(self.inner.update(options).await?)
    }

    /// Overwrites the addressed record with the document in `options`, keeping `_id` and
    /// `createdAt`. System fields set on the document are ignored.
    ///
    /// # Errors
    ///
    /// Same as [`Collection::replace`], plus serialization errors of the document.
    pub async fn replace(&self, options: ReplaceOptions<D>) -> DocumentStoreResult<D> {
        let mut payload = options.payload.to_record()?;
        strip_system_fields(&mut payload);

        let options = ReplaceOptions {
            record_id: options.record_id,
            filter: options.filter,
            payload,
        };

        D::from_record(self.inner.replace(options).await?)
    }

    /// Deletes the addressed record and returns it as it was.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::DocumentNotFound`] if nothing matches.
    pub async fn delete(&self, options: DeleteOptions) -> DocumentStoreResult<D> {
        D::from_record(self.inner.delete(options).await?)
    }

    /// Deletes every record of the collection.
    ///
    /// # Errors
    ///
    /// Same as [`Collection::truncate`].
    pub async fn truncate(&self) -> DocumentStoreResult<usize> {
        self.inner.truncate().await
    }
}
