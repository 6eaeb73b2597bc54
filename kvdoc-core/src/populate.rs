//! Relation population.
//!
//! Population replaces relation fields, which hold the id or ids of records in another
//! collection, with the referenced records themselves. Which fields are populated is
//! decided by a [`PopulateSpec`]; where the ids point is decided by the
//! [`RelationRegistry`].
//!
//! A field listed in the [`PopulateSpec`] must have a relation, whatever it holds. For every
//! field of a record whose (prefixed) path is in scope:
//!
//! - a string is fetched from the target collection; a dangling id becomes `null`
//! - an array of ids is fetched concurrently, keeping input order and dropping ids that
//!   do not resolve
//! - an array of embedded documents is walked element by element, with the field name
//!   appended to the path prefix and the source collection unchanged
//! - anything else, including an empty array, is left untouched
//!
//! Fetched records are projected to the selection of their path and then populated with
//! the deeper paths of the populate spec. Each hop into a target collection strips one segment from
//! every path, so recursion is bounded by [`PopulateSpec::depth`] even when relations form
//! a cycle.

use bson::Bson;
use futures::future::{BoxFuture, FutureExt, try_join_all};
use tracing::{debug, trace, warn};

use crate::{
    backend::{Key, KvStore},
    error::DocumentStoreResult,
    options::{PATH_SEPARATOR, PopulateSpec, Selection},
    projection::project_record,
    record::{Record, into_record},
    relation::RelationRegistry,
};

/// Resolves relation fields of records against a key-value store.
#[derive(Debug)]
pub struct Populator<'a, B: KvStore> {
    store: &'a B,
    relations: &'a RelationRegistry,
}

impl<'a, B: KvStore> Populator<'a, B> {
    pub fn new(store: &'a B, relations: &'a RelationRegistry) -> Self {
        Self { store, relations }
    }

    /// Populates `record`, a record of `collection`, according to `spec`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::RelationNotRegistered`](crate::error::DocumentStoreError::RelationNotRegistered)
    /// if an id-valued field in scope has no relation, and propagates store failures.
    pub async fn populate(
        &self,
        collection: &str,
        record: Record,
        spec: &PopulateSpec,
    ) -> DocumentStoreResult<Record> {
        if spec.is_empty() {
            return Ok(record);
        }

        trace!(collection, depth = spec.depth(), "populating record");

        self.populate_level(collection, record, spec, String::new())
            .await
    }

    fn populate_level<'s>(
        &'s self,
        collection: &'s str,
        mut record: Record,
        spec: &'s PopulateSpec,
        prefix: String,
    ) -> BoxFuture<'s, DocumentStoreResult<Record>> {
        async move {
            let keys: Vec<String> = record.keys().cloned().collect();

            for key in keys {
                let path = format!("{prefix}{key}");

                if !spec.in_scope(&path) {
                    continue;
                }

                let Some(value) = record.get(&key).cloned() else {
                    continue;
                };

                trace!(collection, path = path.as_str(), "populating field");

                if let Some(populated) = self
                    .populate_field(collection, &path, value, spec)
                    .await?
                {
                    record.insert(key, populated);
                }
            }

            Ok(record)
        }
        .boxed()
    }

    /// Returns the new value of the field, or `None` to leave it untouched.
    ///
    /// A field listed in `spec` must have a relation whatever its value. A field that is only
    /// on the way to a deeper path is looked up when it turns out to hold ids.
    async fn populate_field(
        &self,
        collection: &str,
        path: &str,
        value: Bson,
        spec: &PopulateSpec,
    ) -> DocumentStoreResult<Option<Bson>> {
        let listed = match spec.get(path) {
            Some(_) => Some(self.target(collection, path)?),
            None => None,
        };

        match value {
            Bson::String(id) => {
                let target = match listed {
                    Some(target) => target,
                    None => self.target(collection, path)?,
                };
                let resolved = self
                    .resolve(target, &id, spec.get(path), &spec.descend(path))
                    .await?;

                Ok(Some(resolved.map(Bson::Document).unwrap_or(Bson::Null)))
            }
            Bson::Array(items) if items.is_empty() => Ok(None),
            Bson::Array(items) => match into_embedded(items) {
                Ok(elements) => {
                    let prefix = format!("{path}{PATH_SEPARATOR}");
                    let populated = try_join_all(elements.into_iter().map(|element| {
                        self.populate_level(collection, element, spec, prefix.clone())
                    }))
                    .await?;

                    Ok(Some(Bson::Array(
                        populated.into_iter().map(Bson::Document).collect(),
                    )))
                }
                Err(items) => {
                    let target = match listed {
                        Some(target) => target,
                        None => self.target(collection, path)?,
                    };
                    let selection = spec.get(path);
                    let sub_spec = spec.descend(path);
                    let resolved = try_join_all(
                        items
                            .iter()
                            .filter_map(Bson::as_str)
                            .map(|id| self.resolve(target, id, selection, &sub_spec)),
                    )
                    .await?;

                    Ok(Some(Bson::Array(
                        resolved
                            .into_iter()
                            .flatten()
                            .map(Bson::Document)
                            .collect(),
                    )))
                }
            },
            _ => Ok(None),
        }
    }

    /// Fetches one referenced record, projects it, then populates its own relations.
    async fn resolve(
        &self,
        target: &str,
        id: &str,
        selection: Option<&Selection>,
        sub_spec: &PopulateSpec,
    ) -> DocumentStoreResult<Option<Record>> {
        let key = Key::record(target, id);

        let Some(value) = self.store.get(&key).await? else {
            debug!(collection = target, id, "dangling reference");
            return Ok(None);
        };

        let mut record = into_record(&key, value)?;

        if let Some(fields) = selection.and_then(Selection::fields) {
            project_record(&mut record, fields);
        }

        if sub_spec.is_empty() {
            return Ok(Some(record));
        }

        Ok(Some(
            self.populate_level(target, record, sub_spec, String::new())
                .await?,
        ))
    }

    fn target(&self, collection: &str, path: &str) -> DocumentStoreResult<&'a str> {
        self.relations
            .require(collection, path)
            .inspect_err(|_| warn!(collection, path, "populate requested for a field without relation"))
    }
}

/// Splits arrays of embedded documents from arrays of ids (or mixed arrays, which are
/// treated as ids).
fn into_embedded(items: Vec<Bson>) -> Result<Vec<Record>, Vec<Bson>> {
    if !items.iter().all(|item| matches!(item, Bson::Document(_))) {
        return Err(items);
    }

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            Bson::Document(record) => Some(record),
            _ => None,
        })
        .collect())
}
