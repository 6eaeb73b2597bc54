//! Typed documents.
//!
//! Any serde type can be stored through a [`TypedCollection`](crate::collection::TypedCollection)
//! once it names its collection. System fields are owned by the document layer, so a typed
//! document that wants to read them back declares them as optional renamed fields.

use bson::{Bson, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, to_value};

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    record::Record,
};

/// A type stored in a collection.
///
/// # Example
///
/// ```ignore
/// use kvdoc::document::Document;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct User {
///     #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
///     pub id: Option<String>,
///     pub name: String,
///     #[serde(default)]
///     pub city_id: Option<String>,
/// }
///
/// impl Document for User {
///     fn collection_name() -> &'static str {
///         "users"
///     }
/// }
/// ```
pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    /// Returns the name of the collection this document belongs to.
    fn collection_name() -> &'static str;
}

/// Conversions between documents and their stored and JSON forms.
///
/// Implemented for every [`Document`].
pub trait DocumentExt: Document {
    /// Serializes this document into a record.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidDocument`] if the type does not serialize to a
    /// map, and [`DocumentStoreError::Serialization`] if serialization fails.
    fn to_record(&self) -> DocumentStoreResult<Record>;

    /// Deserializes a document from a record.
    fn from_record(record: Record) -> DocumentStoreResult<Self>;

    fn to_json(&self) -> DocumentStoreResult<Value>;

    fn from_json(value: Value) -> DocumentStoreResult<Self>;
}

impl<D: Document> DocumentExt for D {
    fn to_record(&self) -> DocumentStoreResult<Record> {
        match serialize_to_bson(self)? {
            Bson::Document(record) => Ok(record),
            other => Err(DocumentStoreError::InvalidDocument(format!(
                "{} serializes to a {:?}, not a document",
                D::collection_name(),
                other.element_type()
            ))),
        }
    }

    fn from_record(record: Record) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_bson(Bson::Document(record))?)
    }

    fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> DocumentStoreResult<Self> {
        Ok(from_value(value)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use serde::Deserialize;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct City {
        #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        name: String,
    }

    impl Document for City {
        fn collection_name() -> &'static str {
            "cities"
        }
    }

    #[derive(Debug, Serialize, Deserialize)]
    struct Scalar(i32);

    impl Document for Scalar {
        fn collection_name() -> &'static str {
            "scalars"
        }
    }

    #[test]
    fn converts_to_and_from_records() {
        let city = City { id: None, name: "Tehran".to_string() };

        assert_eq!(city.to_record().unwrap(), doc! { "name": "Tehran" });

        let stored = City::from_record(doc! { "_id": "abc", "name": "Tehran", "createdAt": 1 }).unwrap();
        assert_eq!(stored.id.as_deref(), Some("abc"));
        assert_eq!(stored.to_json().unwrap()["_id"], "abc");
    }

    #[test]
    fn non_map_types_are_not_records() {
        assert!(matches!(
            Scalar(3).to_record(),
            Err(DocumentStoreError::InvalidDocument(_))
        ));
    }
}
