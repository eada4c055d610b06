//! Append-only event store boundary.
//!
//! Listing streams are the system of record: each accepted command appends
//! exactly one record, and state is rebuilt by replaying the stream.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryEventStore;
pub use postgres::PostgresEventStore;
pub use r#trait::{EventStore, EventStoreError, StoredEvent, UncommittedEvent};
