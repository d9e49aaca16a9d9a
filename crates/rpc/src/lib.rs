//! Read-only client for a CometBFT-style node RPC.
//!
//! Three operations are exposed, matching the endpoints the monitor
//! observes: `/status` for the chain tip, `/block` for one block's payload,
//! and the paginated `/validators` endpoint for the active set size.
//!
//! The client performs no retries of its own; retry policy belongs to the
//! ingestion loop driving it. Failures are classified into the taxonomy the
//! loop's policy is written against: [`RpcError::Network`] for transport
//! faults, [`RpcError::Protocol`] for unparseable responses, and
//! [`RpcError::NotFound`] for heights the node has not produced yet.

mod error;
pub use error::RpcError;

mod types;
pub use types::RawBlock;

mod client;
pub use client::NodeClient;
