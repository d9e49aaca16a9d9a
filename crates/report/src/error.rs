use blockwatch_store::StoreError;
use thiserror::Error;

/// Errors that may occur while assembling a report.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Failed to read the record store.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Failed to write a report artifact.
    #[error("report i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Chart rendering failed.
    #[error("chart rendering error: {0}")]
    Chart(String),
}
