use blockwatch_rpc::RpcError;
use blockwatch_store::StoreError;
use thiserror::Error;

/// Fatal conditions that halt the ingestion loop.
///
/// Transient fetch failures never surface here; they are absorbed by the
/// loop's retry policy. What remains is invariant violations from the store
/// and heights that kept failing with non-transient errors.
#[derive(Debug, Error)]
pub enum IngestError {
    /// The store rejected an operation. Ordering violations land here and
    /// indicate a logic defect, not an external condition.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// A height kept failing with a non-transient error after the bounded
    /// retries were exhausted. Operator intervention is implied; skipping
    /// the height would break the store's contiguity.
    #[error("giving up on height {height}: {source}")]
    HeightFailed {
        /// The height that could not be ingested.
        height: u64,
        /// The terminal fetch error.
        #[source]
        source: RpcError,
    },

    /// The status endpoint kept returning malformed responses after the
    /// bounded retries were exhausted.
    #[error("status query failed: {source}")]
    StatusFailed {
        /// The terminal status error.
        #[source]
        source: RpcError,
    },
}
