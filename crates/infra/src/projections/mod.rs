//! Read models built from committed listing records.
//!
//! Projections are rebuildable from the event store and idempotent under the
//! bus's at-least-once delivery.

pub mod catalog;

pub use catalog::{CatalogEntry, CatalogProjection, CatalogProjectionError};
