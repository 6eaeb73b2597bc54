//! Options accepted by collection operations.
//!
//! Every operation that targets a single record takes an addressing mode: a record id, a
//! filter, or both (in which case the record fetched by id must also satisfy the filter).
//! Query operations additionally accept a [`PopulateSpec`] and a `select` list.
//!
//! # Example
//!
//! ```ignore
//! use kvdoc::options::{FindOptions, ListOptions, PopulateSpec};
//! use kvdoc::query::Filter;
//!
//! let page = ListOptions::builder()
//!     .filter(Filter::eq("status", "active"))
//!     .skip(20)
//!     .limit(10)
//!     .select(["name", "author"])
//!     .populate(PopulateSpec::new().fields("author", ["name"]))
//!     .build();
//!
//! let one = FindOptions::by_id(user_id).populate(PopulateSpec::new().all("addresses.cityId"));
//! ```

use std::collections::BTreeMap;

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    query::Expr,
    record::{Patch, Record},
};

/// Separator between the segments of a populate path.
pub const PATH_SEPARATOR: char = '.';

/// What to keep of a populated record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Embed the whole referenced record.
    All,
    /// Embed only these top-level fields of the referenced record.
    Fields(Vec<String>),
}

impl Selection {
    pub fn fields(&self) -> Option<&[String]> {
        match self {
            Selection::All => None,
            Selection::Fields(fields) => Some(fields),
        }
    }
}

/// Which relation fields to populate, keyed by dotted field path.
///
/// A path such as `author.cityId` populates `author` and then `cityId` of the embedded
/// author. A path into an array of embedded documents (`addresses.cityId`) populates
/// `cityId` of every element. Recursion never goes deeper than the longest path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulateSpec {
    paths: BTreeMap<String, Selection>,
}

impl PopulateSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Populates `path` with the whole referenced record.
    pub fn all(mut self, path: impl Into<String>) -> Self {
        self.paths.insert(path.into(), Selection::All);
        self
    }

    /// Populates `path`, keeping only `fields` of the referenced record.
    pub fn fields<I, S>(mut self, path: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.paths.insert(
            path.into(),
            Selection::Fields(fields.into_iter().map(Into::into).collect()),
        );
        self
    }

    /// Returns the selection registered directly for `path`.
    pub fn get(&self, path: &str) -> Option<&Selection> {
        self.paths.get(path)
    }

    /// Returns `true` if `path` is populated itself or lies on the way to a deeper path.
    pub fn in_scope(&self, path: &str) -> bool {
        self.paths.contains_key(path) || self.paths.keys().any(|key| is_below(key, path))
    }

    /// The populate spec that applies inside the record referenced by `path`: every deeper path
    /// with the `path.` prefix stripped.
    pub fn descend(&self, path: &str) -> PopulateSpec {
        PopulateSpec {
            paths: self
                .paths
                .iter()
                .filter(|(key, _)| is_below(key, path))
                .map(|(key, selection)| (key[path.len() + 1..].to_string(), selection.clone()))
                .collect(),
        }
    }

    /// Length in segments of the longest path; bounds the depth of population.
    pub fn depth(&self) -> usize {
        self.paths
            .keys()
            .map(|key| key.split(PATH_SEPARATOR).count())
            .max()
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

fn is_below(key: &str, path: &str) -> bool {
    key.len() > path.len()
        && key.starts_with(path)
        && key[path.len()..].starts_with(PATH_SEPARATOR)
}

/// Borrowed addressing mode of a single-record operation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Selector<'a> {
    pub record_id: Option<&'a str>,
    pub filter: Option<&'a Expr>,
}

impl<'a> Selector<'a> {
    pub fn new(record_id: Option<&'a str>, filter: Option<&'a Expr>) -> DocumentStoreResult<Self> {
        if record_id.is_none() && filter.is_none() {
            return Err(DocumentStoreError::Validation(
                "either a record id or a filter is required".to_string(),
            ));
        }

        Ok(Self { record_id, filter })
    }

    /// Human readable description used in not-found errors.
    pub fn describe(&self) -> String {
        match (self.record_id, self.filter) {
            (Some(id), None) => id.to_string(),
            (Some(id), Some(_)) => format!("{id} matching filter"),
            _ => "matching filter".to_string(),
        }
    }
}

/// Options of [`Collection::list`](crate::collection::Collection::list).
///
/// `skip` and `limit` count records that passed the filter, in key order.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    pub filter: Option<Expr>,
    pub limit: Option<usize>,
    pub skip: Option<usize>,
    pub populate: Option<PopulateSpec>,
    pub select: Option<Vec<String>>,
}

impl ListOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> ListOptionsBuilder {
        ListOptionsBuilder::default()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ListOptionsBuilder {
    options: ListOptions,
}

impl ListOptionsBuilder {
    pub fn filter(mut self, filter: impl Into<Expr>) -> Self {
        self.options.filter = Some(filter.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.options.limit = Some(limit);
        self
    }

    pub fn skip(mut self, skip: usize) -> Self {
        self.options.skip = Some(skip);
        self
    }

    pub fn populate(mut self, populate: PopulateSpec) -> Self {
        self.options.populate = Some(populate);
        self
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.select = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn build(self) -> ListOptions {
        self.options
    }
}

/// Options of [`Collection::retrieve`](crate::collection::Collection::retrieve) and
/// [`Collection::find`](crate::collection::Collection::find).
#[derive(Debug, Clone, Default)]
pub struct FindOptions {
    pub record_id: Option<String>,
    pub filter: Option<Expr>,
    pub populate: Option<PopulateSpec>,
    pub select: Option<Vec<String>>,
}

impl FindOptions {
    /// Addresses the record with this id.
    pub fn by_id(record_id: impl Into<String>) -> Self {
        Self { record_id: Some(record_id.into()), ..Self::default() }
    }

    /// Addresses the first record, in key order, matching `filter`.
    pub fn by_filter(filter: impl Into<Expr>) -> Self {
        Self { filter: Some(filter.into()), ..Self::default() }
    }

    /// Adds a filter the addressed record must also satisfy.
    pub fn filter(mut self, filter: impl Into<Expr>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub fn populate(mut self, populate: PopulateSpec) -> Self {
        self.populate = Some(populate);
        self
    }

    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.select = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub(crate) fn selector(&self) -> DocumentStoreResult<Selector<'_>> {
        Selector::new(self.record_id.as_deref(), self.filter.as_ref())
    }
}

/// Options of [`Collection::update`](crate::collection::Collection::update).
#[derive(Debug, Clone, Default)]
pub struct UpdateOptions {
    pub record_id: Option<String>,
    pub filter: Option<Expr>,
    pub payload: Patch,
}

impl UpdateOptions {
    pub fn by_id(record_id: impl Into<String>, payload: impl Into<Patch>) -> Self {
        Self { record_id: Some(record_id.into()), filter: None, payload: payload.into() }
    }

    pub fn by_filter(filter: impl Into<Expr>, payload: impl Into<Patch>) -> Self {
        Self { record_id: None, filter: Some(filter.into()), payload: payload.into() }
    }

    pub fn filter(mut self, filter: impl Into<Expr>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub(crate) fn selector(&self) -> DocumentStoreResult<Selector<'_>> {
        Selector::new(self.record_id.as_deref(), self.filter.as_ref())
    }
}

/// Options of [`Collection::replace`](crate::collection::Collection::replace).
///
/// The payload is a [`Record`] for untyped collections and a document for
/// [`TypedCollection::replace`](crate::collection::TypedCollection::replace).
#[derive(Debug, Clone, Default)]
pub struct ReplaceOptions<P = Record> {
    pub record_id: Option<String>,
    pub filter: Option<Expr>,
    pub payload: P,
}

impl<P> ReplaceOptions<P> {
    pub fn by_id(record_id: impl Into<String>, payload: P) -> Self {
        Self { record_id: Some(record_id.into()), filter: None, payload }
    }

    pub fn by_filter(filter: impl Into<Expr>, payload: P) -> Self {
        Self { record_id: None, filter: Some(filter.into()), payload }
    }

    pub fn filter(mut self, filter: impl Into<Expr>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub(crate) fn selector(&self) -> DocumentStoreResult<Selector<'_>> {
        Selector::new(self.record_id.as_deref(), self.filter.as_ref())
    }
}

/// Options of [`Collection::delete`](crate::collection::Collection::delete).
#[derive(Debug, Clone, Default)]
pub struct DeleteOptions {
    pub record_id: Option<String>,
    pub filter: Option<Expr>,
}

impl DeleteOptions {
    pub fn by_id(record_id: impl Into<String>) -> Self {
        Self { record_id: Some(record_id.into()), filter: None }
    }

    pub fn by_filter(filter: impl Into<Expr>) -> Self {
        Self { record_id: None, filter: Some(filter.into()) }
    }

    pub fn filter(mut self, filter: impl Into<Expr>) -> Self {
        self.filter = Some(filter.into());
        self
    }

    pub(crate) fn selector(&self) -> DocumentStoreResult<Selector<'_>> {
        Selector::new(self.record_id.as_deref(), self.filter.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_covers_direct_and_intermediate_paths() {
        let spec = PopulateSpec::new()
            .all("author")
            .fields("addresses.cityId", ["name"]);

        assert!(spec.in_scope("author"));
        assert!(spec.in_scope("addresses"));
        assert!(spec.in_scope("addresses.cityId"));
        assert!(!spec.in_scope("address"));
        assert!(!spec.in_scope("addresses.city"));
        assert!(!spec.in_scope("title"));
    }

    #[test]
    fn descend_strips_the_matched_prefix() {
        let spec = PopulateSpec::new()
            .all("author")
            .fields("author.cityId", ["name"])
            .all("author.cityId.countryId")
            .all("authors.x");

        let sub = spec.descend("author");
        assert_eq!(
            sub,
            PopulateSpec::new()
                .fields("cityId", ["name"])
                .all("cityId.countryId")
        );
        assert_eq!(sub.descend("cityId"), PopulateSpec::new().all("countryId"));
        assert!(spec.descend("title").is_empty());
    }

    #[test]
    fn depth_is_the_longest_path() {
        let spec = PopulateSpec::new().all("a").all("a.b.c");

        assert_eq!(spec.depth(), 3);
        assert_eq!(spec.descend("a").depth(), 2);
        assert_eq!(PopulateSpec::new().depth(), 0);
    }

    #[test]
    fn selectors_require_an_addressing_mode() {
        assert!(matches!(
            FindOptions::default().selector(),
            Err(DocumentStoreError::Validation(_))
        ));
        assert!(FindOptions::by_id("abc").selector().is_ok());
        assert_eq!(
            DeleteOptions::by_id("abc").selector().unwrap().describe(),
            "abc"
        );
    }
}
