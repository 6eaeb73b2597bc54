//! Error types and result types for document store operations.
//!
//! This module provides comprehensive error handling for all document store operations.
//! Use [`DocumentStoreResult<T>`] as the return type for fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a document store.
///
/// This enum covers malformed call options, record resolution failures, relation
/// configuration defects, serialization issues and failures of the underlying key-value store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// The call options are malformed: no addressing mode was given, or a mutation payload
    /// carries one of the protected system fields. Always raised before any store access.
    #[error("Validation error: {0}")]
    Validation(String),
    /// No record satisfies the addressing options.
    /// The first argument describes the selector (id or filter), the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// Population was requested for a field that has no declared relation target.
    #[error("No relation registered for field {field} of collection {collection}")]
    RelationNotRegistered {
        /// The collection the populated record belongs to.
        collection: String,
        /// The dotted field path that was requested.
        field: String,
    },
    /// The store configuration is inconsistent (e.g. a relation registered twice with
    /// different targets).
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// A stored value does not have the shape of a record.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// An error occurred in the underlying key-value store.
    #[error("Backend error: {0}")]
    Backend(String),
    /// One or more deletions issued by a truncate failed. Every deletion was attempted.
    #[error(
        "Truncate of collection {collection} failed for {} document(s) ({deleted} deleted)",
        .failures.len()
    )]
    TruncateFailed {
        /// The truncated collection.
        collection: String,
        /// Number of records that were deleted successfully.
        deleted: usize,
        /// The id of every record that could not be deleted, with the cause.
        failures: Vec<(String, DocumentStoreError)>,
    },
}

/// A specialized `Result` type for document store operations.
///
/// This type alias is used throughout the crate to indicate operations that may fail
/// with a [`DocumentStoreError`].
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl DocumentStoreError {
    /// Returns `true` if this error reports that no record matched.
    pub fn is_not_found(&self) -> bool {
        matches!(self, DocumentStoreError::DocumentNotFound(..))
    }
}

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
