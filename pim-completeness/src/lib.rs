//! # Catalog completeness scoring
//!
//! Computes how completely a catalog product is populated, globally, per
//! sales channel and per language, and stores the percentages on the product.
//!
//! **Scoring pass:** load snapshot (one read) -> collect requirement items ->
//! aggregate scores -> persist (one write)
//!
//! # Components
//! - [`exclusion`]: attributes waived for configurable products
//! - [`channels`]: effective channels (variants inherit from their parent)
//! - [`emptiness`]: populated-or-not decisions for fields and attribute values
//! - [`collector`]: requirement items partitioned by dimension
//! - [`aggregator`]: percentages and result composition
//! - [`service`]: read / compute / write orchestration, bulk recalculation
//! - [`lifecycle`]: score columns follow channel and language changes
//! - [`catalog`]: SQLite implementation of the [`repository`] traits

pub mod aggregator;
pub mod catalog;
pub mod channels;
pub mod collector;
pub mod emptiness;
pub mod error;
pub mod exclusion;
pub mod lifecycle;
pub mod repository;
pub mod service;
pub mod types;

pub use aggregator::{calculate, score};
pub use catalog::SqliteCatalog;
pub use error::{CompletenessError, Result};
pub use lifecycle::ChannelFieldLifecycle;
pub use service::{BulkReport, CompletenessService};
pub use types::*;
