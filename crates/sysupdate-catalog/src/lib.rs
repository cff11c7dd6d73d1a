//! sysupdate-catalog is a persistent catalog of pending and installed updates.
//!
//! Backed by [redb](https://docs.rs/redb), provides durable and in-memory
//! storage for update [`Record`]s coming from application packages and
//! device image updates, plus the named [`Filter`] views over them.
//!
//! # Architecture
//!
//! Records are JSON-serialized into redb's `&[u8]` value column under the
//! composite key `(identifier, revision)`. Every query runs inside a single
//! read transaction, so callers always see one consistent snapshot.
//!
//! The `CatalogStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared between the model and the collaborators feeding it.

pub mod error;
pub mod filter;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{CatalogError, CatalogResult};
pub use filter::Filter;
pub use store::CatalogStore;
pub use types::*;
