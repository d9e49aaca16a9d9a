//! Durable, append-only storage for per-height block metadata.
//!
//! The store is an ordered sequence of [`BlockRecord`]s keyed by height,
//! backed by a single CSV file. Heights form a contiguous run starting at 1;
//! [`CsvStore::append`] enforces the contiguity invariant and makes every
//! accepted row durable before returning, so a crash immediately after a
//! successful append never loses the record.

mod record;
pub use record::{BlockRecord, FIELD_NAMES};

mod error;
pub use error::StoreError;

mod store;
pub use store::{CsvStore, RecordStorage, Records};
