//! Convenient re-exports of commonly used types from kvdoc.
//!
//! ```ignore
//! use kvdoc::prelude::*;
//! ```

pub use bson::{Bson, doc};

pub use kvdoc_core::{
    backend::{Key, KvStore, KvStoreBuilder},
    collection::{Collection, TypedCollection},
    document::{Document, DocumentExt},
    error::{DocumentStoreError, DocumentStoreResult},
    matcher::{ExprMatcher, FilterMatcher},
    options::{
        DeleteOptions, FindOptions, ListOptions, PopulateSpec, ReplaceOptions, Selection,
        UpdateOptions,
    },
    query::{Expr, FieldOp, Filter, QueryVisitor},
    record::{Clock, FieldUpdate, Patch, Record, SystemClock, record_id},
    relation::RelationRegistry,
    store::{DocumentStore, DocumentStoreBuilder, DynDocumentStore},
};
