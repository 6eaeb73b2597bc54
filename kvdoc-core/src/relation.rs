//! Relation declarations used by population.
//!
//! A relation says that a field of one collection holds the id (or ids) of records in
//! another collection. Field paths may be dotted to reach fields of embedded documents
//! inside arrays, e.g. `addresses.cityId`.
//!
//! The registry is built once, before any population runs, and is read-only afterwards.
//!
//! # Example
//!
//! ```ignore
//! use kvdoc::relation::RelationRegistry;
//!
//! let relations = RelationRegistry::builder()
//!     .register("posts", "author", "users")
//!     .register("users", "addresses.cityId", "cities")
//!     .build()?;
//!
//! assert_eq!(relations.target("posts", "author"), Some("users"));
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Maps `(collection, field path)` to the target collection.
///
/// Deserializes from a nested map, which makes relation declarations loadable from
/// configuration files:
///
/// ```json
/// { "users": { "addresses.cityId": "cities" }, "posts": { "author": "users" } }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RelationRegistry {
    relations: BTreeMap<String, BTreeMap<String, String>>,
}

impl RelationRegistry {
    /// Creates a registry with no relations.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> RelationRegistryBuilder {
        RelationRegistryBuilder::default()
    }

    /// Parses a registry from its JSON representation.
    pub fn from_json(json: &str) -> DocumentStoreResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns the collection referenced by `field` of `collection`.
    pub fn target(&self, collection: &str, field: &str) -> Option<&str> {
        self.relations
            .get(collection)?
            .get(field)
            .map(String::as_str)
    }

    /// Like [`target`](Self::target), but a missing relation is an error.
    pub fn require(&self, collection: &str, field: &str) -> DocumentStoreResult<&str> {
        self.target(collection, field)
            .ok_or_else(|| DocumentStoreError::RelationNotRegistered {
                collection: collection.to_string(),
                field: field.to_string(),
            })
    }

    /// Iterates over every `(collection, field, target)` triple.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str, &str)> {
        self.relations.iter().flat_map(|(collection, fields)| {
            fields
                .iter()
                .map(move |(field, target)| (collection.as_str(), field.as_str(), target.as_str()))
        })
    }

    pub fn len(&self) -> usize {
        self.relations.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn insert(&mut self, collection: String, field: String, target: String) -> DocumentStoreResult<()> {
        let fields = self.relations.entry(collection.clone()).or_default();

        match fields.get(&field) {
            Some(existing) if *existing != target => Err(DocumentStoreError::Configuration(format!(
                "relation {collection}.{field} already targets {existing}, cannot retarget to {target}"
            ))),
            Some(_) => Ok(()),
            None => {
                fields.insert(field, target);
                Ok(())
            }
        }
    }
}

/// Collects relation declarations; conflicts are reported by [`build`](Self::build).
#[derive(Debug, Clone, Default)]
pub struct RelationRegistryBuilder {
    entries: Vec<(String, String, String)>,
    base: RelationRegistry,
}

impl RelationRegistryBuilder {
    /// Declares that `field` of `collection` references records of `target`.
    pub fn register(
        mut self,
        collection: impl Into<String>,
        field: impl Into<String>,
        target: impl Into<String>,
    ) -> Self {
        self.entries
            .push((collection.into(), field.into(), target.into()));
        self
    }

    /// Starts from an existing registry (e.g. one loaded with
    /// [`RelationRegistry::from_json`]).
    pub fn extend(mut self, registry: RelationRegistry) -> Self {
        self.base = registry;
        self
    }

    /// Builds the registry.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Configuration`] if one field is registered with two
    /// different targets. Registering the same relation twice is accepted.
    pub fn build(self) -> DocumentStoreResult<RelationRegistry> {
        let mut registry = self.base;

        for (collection, field, target) in self.entries {
            registry.insert(collection, field, target)?;
        }

        Ok(registry)
    }
}
