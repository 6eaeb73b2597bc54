//! Main kvdoc crate providing a document access layer over ordered key-value stores.
//!
//! This crate is the primary entry point for users of kvdoc. It re-exports the core types
//! and functionality from the sub-crates and provides access to the bundled backends.
//!
//! # Features
//!
//! - **Collections over any ordered key-value store** - Create, list, retrieve, find, update, replace, delete and truncate
//! - **Relation population** - Replace stored ids with the records they reference, recursively and across collections
//! - **Field projection** - Return only the selected top-level keys
//! - **Typed documents** - Work with Serde types instead of raw records
//!
//! # Quick Start
//!
//! ```ignore
//! use kvdoc::{prelude::*, memory::InMemoryKv};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = DocumentStore::builder(InMemoryKv::new())
//!         .relation("users", "addresses.cityId", "cities")
//!         .build()
//!         .unwrap();
//!
//!     let tehran = store
//!         .collection("cities")
//!         .create(doc! { "name": "Tehran", "population": 9_000_000 })
//!         .await
//!         .unwrap();
//!
//!     let user = store
//!         .collection("users")
//!         .create(doc! {
//!             "name": "Yoones",
//!             "addresses": [{ "street": "Mantegh", "cityId": tehran.get_str("_id").unwrap() }],
//!         })
//!         .await
//!         .unwrap();
//!
//!     // addresses[0].cityId becomes { "name": "Tehran" }
//!     let populated = store
//!         .collection("users")
//!         .retrieve(
//!             FindOptions::by_id(user.get_str("_id").unwrap())
//!                 .populate(PopulateSpec::new().fields("addresses.cityId", ["name"])),
//!         )
//!         .await
//!         .unwrap();
//!
//!     println!("{populated}");
//!
//!     store.shutdown().await.unwrap();
//! }
//! ```
//!
//! # Dynamic Dispatch
//!
//! A store can be converted into a [`DynDocumentStore`](store::DynDocumentStore) with
//! `into_dyn`, erasing the backend type while keeping relations, filter oracle and clock.
//!
//! ```ignore
//! let store: DynDocumentStore = DocumentStore::new(InMemoryKv::new()).into_dyn();
//! let users = store.collection("users");
//! ```
//!
//! # Backends
//!
//! - [`memory`] - Ordered in-memory storage for development and testing

pub mod prelude;

pub use kvdoc_core::{
    backend, collection, document, error, matcher, options, populate, projection, query, record,
    relation, store,
};

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use kvdoc_memory::{InMemoryKv, InMemoryKvBuilder};
}
