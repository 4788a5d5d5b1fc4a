//! # moq-catalog
//!
//! Parses and publishes the catalog track that describes which tracks a [`moq_core`] broadcast
//! currently offers.
//!
//! Two JSON shapes are accepted on the consuming side (see [`parse::parse`]); this crate only
//! ever publishes the standard shape. [`CatalogProducer`]/[`CatalogConsumer`] wrap the catalog
//! track itself as a producer/consumer pair, following the same shape as every other `moq_core`
//! handle.
mod error;
mod model;
mod parse;
mod produce;

pub use error::*;
pub use model::*;
pub use parse::{parse, serialize};
pub use produce::{CatalogConsumer, CatalogGuard, CatalogProducer};
