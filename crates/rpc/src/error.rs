use thiserror::Error;

/// Errors surfaced by the node RPC client.
///
/// The variants carry the loop-facing classification: the ingestion loop
/// retries [`Network`](Self::Network) indefinitely, retries
/// [`Protocol`](Self::Protocol) a bounded number of times before giving up
/// on the height, and treats [`NotFound`](Self::NotFound) as "not yet
/// caught up" rather than a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RpcError {
    /// Transport or connection failure; the request may never have reached
    /// the node.
    #[error("network error: {0}")]
    Network(String),

    /// A response arrived but could not be parsed into the expected shape.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// The node reports no block at the requested height yet.
    #[error("no block at height {0} yet")]
    NotFound(u64),
}

impl RpcError {
    /// Classifies a `reqwest` failure: body-decoding errors mean the node
    /// responded with something unparseable, everything else is transport.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Protocol(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }

    /// Whether the error is a transient transport fault.
    pub const fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
