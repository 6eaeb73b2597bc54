//! A document access layer over ordered key-value stores.
//!
//! This crate is the core of the kvdoc project and provides:
//!
//! - **Store abstraction** ([`backend`]) - Tuple keys and the key-value trait backends implement
//! - **Records** ([`record`]) - The stored value model, system fields and update patches
//! - **Filtering** ([`query`], [`matcher`]) - Filter expressions and the oracle that evaluates them
//! - **Relations** ([`relation`], [`populate`]) - Relation declarations and population of references
//! - **Projection** ([`projection`]) - Pruning records down to selected keys
//! - **Collections interface** ([`collection`]) - Create, list, retrieve, update, replace and delete
//! - **Document store** ([`store`]) - The configuration root handing out collections
//! - **Error handling** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use kvdoc_core::{options::{FindOptions, PopulateSpec}, store::DocumentStore};
//! use bson::doc;
//!
//! let store = DocumentStore::builder(backend)
//!     .relation("posts", "author", "users")
//!     .build()?;
//!
//! let author = store.collection("users").create(doc! { "name": "Alice" }).await?;
//! let post = store
//!     .collection("posts")
//!     .create(doc! { "title": "Hello", "author": author.get_str("_id")? })
//!     .await?;
//!
//! let populated = store
//!     .collection("posts")
//!     .retrieve(
//!         FindOptions::by_id(post.get_str("_id")?)
//!             .populate(PopulateSpec::new().fields("author", ["name"])),
//!     )
//!     .await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as kvdoc_core;

pub mod backend;
pub mod collection;
pub mod document;
pub mod error;
pub mod matcher;
pub mod options;
pub mod populate;
pub mod projection;
pub mod query;
pub mod record;
pub mod relation;
pub mod store;
