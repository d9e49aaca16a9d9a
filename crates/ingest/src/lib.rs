//! The incremental ingestion loop.
//!
//! This crate drives the monitor's only stateful process: a single
//! sequential worker that determines which heights are missing from the
//! record store, fetches them from the node, derives the inter-block time,
//! and commits them durably — tolerating restarts, partial writes, and
//! transient RPC failures without ever skipping or duplicating a height.
//!
//! The loop moves between three states: `RESUMING` once at startup (the
//! cursor is recovered from the store), then `CATCHING_UP` and `IDLE`
//! forever. See [`Ingestor::run`].

mod source;
pub use source::{BlockSource, NodeBlockSource};

mod error;
pub use error::IngestError;

mod ingestor;
pub use ingestor::{Ingestor, IngestorConfig};
