//! The fetch seam between the ingestion loop and the node RPC.

use async_trait::async_trait;
use blockwatch_rpc::{NodeClient, RpcError};
use blockwatch_store::BlockRecord;
use std::fmt::Debug;

/// Where the ingestion loop gets blocks from, abstracting the actual node.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlockSource: Debug + Send + Sync {
    /// The chain tip height the node currently reports.
    async fn latest_height(&self) -> Result<u64, RpcError>;

    /// Fetches everything needed to build the record for `height`.
    ///
    /// Fails atomically: if any sub-call fails no partial record is
    /// returned. The returned record carries
    /// `time_since_prev_block: None`; the loop fills it in from the stored
    /// predecessor.
    async fn fetch(&self, height: u64) -> Result<BlockRecord, RpcError>;
}

/// [`BlockSource`] implementation that composes the node RPC calls.
#[derive(Debug, Clone)]
pub struct NodeBlockSource {
    client: NodeClient,
}

impl NodeBlockSource {
    /// Wraps a [`NodeClient`].
    pub const fn new(client: NodeClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl BlockSource for NodeBlockSource {
    async fn latest_height(&self) -> Result<u64, RpcError> {
        self.client.latest_height().await
    }

    async fn fetch(&self, height: u64) -> Result<BlockRecord, RpcError> {
        let block = self.client.block(height).await?;
        let num_validators = self.client.validator_count(height).await?;
        let block_time = block.block_time()?;
        let block_size = block.canonical_size()?;

        Ok(BlockRecord {
            height,
            block_time,
            block_size,
            num_txs: block.num_txs(),
            num_validators,
            time_since_prev_block: None,
        })
    }
}
