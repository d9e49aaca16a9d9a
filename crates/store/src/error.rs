use thiserror::Error;

/// Errors that may occur while interacting with the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying file I/O failure.
    #[error("store i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// A row could not be encoded or decoded.
    #[error("store row codec error: {0}")]
    Csv(#[from] csv::Error),

    /// The on-disk header does not match the expected schema.
    ///
    /// Raised at open time; fatal and requires operator action.
    #[error("store schema mismatch: expected header `{expected}`, found `{found}`")]
    Schema {
        /// The header this version of the store expects.
        expected: String,
        /// The header actually present in the file.
        found: String,
    },

    /// Append was called with a non-contiguous height.
    ///
    /// This is an invariant violation inside the process, not an external
    /// condition; callers must treat it as fatal rather than correct it.
    #[error("out-of-order append: expected height {expected}, got {got}")]
    Ordering {
        /// The only height the store would accept.
        expected: u64,
        /// The height that was offered.
        got: u64,
    },
}
