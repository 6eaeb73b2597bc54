//! The record model shared by every collection.
//!
//! A [`Record`] is an ordered BSON document. Every persisted record carries three system
//! fields owned by the document layer: [`ID_FIELD`], [`CREATED_AT_FIELD`] and, after the
//! first mutation, [`UPDATED_AT_FIELD`]. Callers never write them directly.

use bson::{Bson, oid::ObjectId};
use chrono::{DateTime, Utc};
use std::fmt::Debug;

use crate::{
    backend::Key,
    error::{DocumentStoreError, DocumentStoreResult},
};

/// A stored document: an ordered mapping of field names to BSON values.
pub type Record = bson::Document;

/// Unique identifier assigned at creation.
pub const ID_FIELD: &str = "_id";
/// Creation timestamp assigned at creation.
pub const CREATED_AT_FIELD: &str = "createdAt";
/// Timestamp of the last update or replace.
pub const UPDATED_AT_FIELD: &str = "updatedAt";

/// Fields no mutation payload may carry.
pub const PROTECTED_FIELDS: [&str; 3] = [ID_FIELD, CREATED_AT_FIELD, UPDATED_AT_FIELD];

/// Source of the timestamps written into system fields.
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// The wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Generates a fresh record id.
///
/// Ids are hex encoded object ids. They embed the creation second and a process-wide
/// counter, so records created by one process sort in creation order.
pub fn new_record_id() -> String {
    ObjectId::new().to_hex()
}

pub(crate) fn timestamp(clock: &dyn Clock) -> Bson {
    Bson::DateTime(bson::DateTime::from_millis(clock.now().timestamp_millis()))
}

/// Returns the `_id` of a record, if it has a string id.
pub fn record_id(record: &Record) -> Option<&str> {
    record.get(ID_FIELD).and_then(Bson::as_str)
}

/// Unwraps a stored value into a record.
pub(crate) fn into_record(key: &Key, value: Bson) -> DocumentStoreResult<Record> {
    match value {
        Bson::Document(record) => Ok(record),
        other => Err(DocumentStoreError::InvalidDocument(format!(
            "value at {key} is a {:?}, not a document",
            other.element_type()
        ))),
    }
}

/// Rejects any protected system field among `fields`.
pub(crate) fn ensure_unprotected<'a>(
    fields: impl IntoIterator<Item = &'a str>,
) -> DocumentStoreResult<()> {
    for field in fields {
        if PROTECTED_FIELDS.contains(&field) {
            return Err(DocumentStoreError::Validation(format!(
                "payload cannot contain {ID_FIELD}, {CREATED_AT_FIELD} or {UPDATED_AT_FIELD} (found {field})"
            )));
        }
    }

    Ok(())
}

/// Removes every system field from a record.
pub(crate) fn strip_system_fields(record: &mut Record) {
    for field in PROTECTED_FIELDS {
        record.remove(field);
    }
}

/// What an update does to a single field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    /// Store this value (an explicit `Bson::Null` is stored as null).
    Set(Bson),
    /// Remove the field from the record.
    Unset,
}

/// A partial update payload.
///
/// Distinguishes the three states a field can be in: not mentioned (absent from the patch,
/// left untouched), [`FieldUpdate::Unset`] (cleared) and [`FieldUpdate::Set`].
///
/// # Example
///
/// ```ignore
/// use kvdoc::record::Patch;
///
/// let patch = Patch::new()
///     .set("name", "Alice")
///     .set("age", 31)
///     .unset("address");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Patch {
    fields: Vec<(String, FieldUpdate)>,
}

impl Patch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `field` to `value`.
    pub fn set(self, field: impl Into<String>, value: impl Into<Bson>) -> Self {
        self.with(field.into(), FieldUpdate::Set(value.into()))
    }

    /// Clears `field`.
    pub fn unset(self, field: impl Into<String>) -> Self {
        self.with(field.into(), FieldUpdate::Unset)
    }

    fn with(mut self, field: String, update: FieldUpdate) -> Self {
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, existing)) => *existing = update,
            None => self.fields.push((field, update)),
        }
        self
    }

    /// Returns the update for `field`, or `None` if the patch does not mention it.
    pub fn get(&self, field: &str) -> Option<&FieldUpdate> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, update)| update)
    }

    /// Names of every mentioned field, in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Shallow-merges this patch into `record`.
    pub fn apply_to(&self, record: &mut Record) {
        for (field, update) in &self.fields {
            match update {
                FieldUpdate::Set(value) => {
                    record.insert(field.clone(), value.clone());
                }
                FieldUpdate::Unset => {
                    record.remove(field);
                }
            }
        }
    }
}

impl From<Record> for Patch {
    fn from(record: Record) -> Self {
        Patch {
            fields: record
                .into_iter()
                .map(|(field, value)| (field, FieldUpdate::Set(value)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn patch_preserves_unmentioned_fields() {
        let mut record = doc! { "name": "Yoones", "age": 26, "address": { "street": "Mantegh" } };

        Patch::new()
            .set("name", "Yoones7")
            .unset("address")
            .set("nickname", Bson::Null)
            .apply_to(&mut record);

        assert_eq!(record, doc! { "name": "Yoones7", "age": 26, "nickname": Bson::Null });
    }

    #[test]
    fn later_mentions_of_a_field_win() {
        let patch = Patch::new().set("a", 1).unset("a");

        assert_eq!(patch.get("a"), Some(&FieldUpdate::Unset));
        assert_eq!(patch.fields().count(), 1);
        assert_eq!(patch.get("b"), None);
    }

    #[test]
    fn protected_fields_are_rejected() {
        for field in PROTECTED_FIELDS {
            let patch = Patch::new().set("name", "x").unset(field);
            let err = ensure_unprotected(patch.fields()).unwrap_err();
            assert!(matches!(err, DocumentStoreError::Validation(_)));
        }

        assert!(ensure_unprotected(["name", "age"]).is_ok());
    }

    #[test]
    fn record_ids_are_unique_and_ordered() {
        let first = new_record_id();
        let second = new_record_id();

        assert_eq!(first.len(), 24);
        assert_ne!(first, second);
        assert!(first < second);
    }
}
