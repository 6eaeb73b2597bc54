//! In-memory key-value backend for kvdoc.
//!
//! This crate provides a thread-safe, ordered, in-memory implementation of the `KvStore`
//! trait. It uses an async-aware read-write lock for concurrent access and is ideal for
//! development, testing, and workloads that need no durability.
//!
//! # Quick Start
//!
//! ```ignore
//! use kvdoc::{prelude::*, memory::InMemoryKv};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryKv::builder().build().await?);
//!     let users = store.collection("users");
//!
//!     let alice = users.create(doc! { "name": "Alice" }).await?;
//!     println!("created {alice}");
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as kvdoc_memory;

pub mod store;

pub use store::{InMemoryKv, InMemoryKvBuilder};
