//! sysupdate-model reconciles catalog views for a presentation layer.
//!
//! The [`UpdateModel`] holds the last materialized view for its active
//! [`Filter`](sysupdate_catalog::Filter). On every refresh it re-queries the
//! catalog, computes the minimal [`EditScript`] between the old and new
//! views, hands it to an [`Observer`] and keeps the new view as baseline.
//!
//! # Architecture
//!
//! ```text
//! UpdateModel
//!   ├── CatalogStore (authoritative rows, one snapshot per query)
//!   ├── previous view (ordered records, owned snapshot)
//!   ├── diff() (pure: removals → moves → insertions → changes)
//!   └── Observer (receives each script whole, in order)
//! ```

pub mod diff;
pub mod error;
pub mod model;
pub mod observer;

pub use diff::{EditScript, RowOp, diff};
pub use error::{ModelError, ModelResult};
pub use model::UpdateModel;
pub use observer::{ChannelObserver, NullObserver, Observer};
