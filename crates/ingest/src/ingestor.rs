//! The polling state machine that keeps the record store caught up.

use crate::{BlockSource, IngestError};
use backon::{ExponentialBuilder, Retryable};
use blockwatch_rpc::RpcError;
use blockwatch_store::{BlockRecord, RecordStorage};
use chrono::{DateTime, Utc};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Tuning knobs for the ingestion loop.
#[derive(Debug, Clone, Copy)]
pub struct IngestorConfig {
    /// How long to idle between catch-up passes.
    pub poll_interval: Duration,
    /// Retries per fetch within one pass, on top of the first attempt.
    pub max_retries: usize,
    /// First backoff delay between retries.
    pub backoff_min: Duration,
    /// Ceiling for the exponential backoff.
    pub backoff_max: Duration,
}

impl Default for IngestorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            max_retries: 4,
            backoff_min: Duration::from_millis(500),
            backoff_max: Duration::from_secs(8),
        }
    }
}

/// The ingestion loop: one sequential worker driving a [`BlockSource`] and
/// a [`RecordStorage`] in lock-step.
///
/// The loop never advances past a failed height and never skips one; the
/// store's contiguity invariant does the final enforcement. Network faults
/// are retried with backoff and, if persistent, parked until the next poll
/// cycle; malformed responses for a height are retried a bounded number of
/// times and then halt the process.
#[derive(Debug)]
pub struct Ingestor<S, R> {
    source: S,
    store: R,
    config: IngestorConfig,
    cancellation: CancellationToken,
    /// Highest committed height; the resume cursor.
    cursor: u64,
    /// Block time of the record at `cursor`, cached so the derived field is
    /// computed from what was actually persisted without re-reading.
    prev_time: Option<DateTime<Utc>>,
}

impl<S, R> Ingestor<S, R>
where
    S: BlockSource,
    R: RecordStorage,
{
    /// Creates the loop and resumes its cursor from the store.
    pub fn new(
        source: S,
        store: R,
        config: IngestorConfig,
        cancellation: CancellationToken,
    ) -> Self {
        let cursor = store.last_height();
        let prev_time = store.last_record().map(|record| record.block_time);
        Self { source, store, config, cancellation, cursor, prev_time }
    }

    /// Runs until cancelled, alternating between catching up to the node's
    /// tip and idling for the poll interval.
    ///
    /// Returns `Ok(())` only on cancellation. Invariant violations from the
    /// store and permanently failed heights return the error instead.
    pub async fn run(mut self) -> Result<(), IngestError> {
        info!(target: "ingest", cursor = self.cursor, "resuming ingestion");
        loop {
            self.catch_up().await?;
            if self.cancellation.is_cancelled() {
                info!(target: "ingest", "shutdown requested, stopping");
                return Ok(());
            }
            tokio::select! {
                _ = self.cancellation.cancelled() => {
                    info!(target: "ingest", "shutdown requested, stopping");
                    return Ok(());
                }
                _ = tokio::time::sleep(self.config.poll_interval) => {}
            }
        }
    }

    /// One catch-up pass: fetch and commit every height from the cursor up
    /// to the node's current tip, advancing by exactly one per commit.
    ///
    /// Returning `Ok(())` with the cursor short of the tip means "park and
    /// retry next cycle" (node unreachable or the height not served yet).
    async fn catch_up(&mut self) -> Result<(), IngestError> {
        let Some(latest) = self.latest_with_retry().await? else {
            return Ok(());
        };

        if self.cursor < latest {
            info!(target: "ingest", cursor = self.cursor, latest, "catching up");
        }
        while self.cursor < latest {
            if self.cancellation.is_cancelled() {
                return Ok(());
            }
            let height = self.cursor + 1;
            let mut record = match self.fetch_with_retry(height).await {
                Ok(record) => record,
                Err(RpcError::NotFound(_)) => {
                    debug!(target: "ingest", height, "height not served yet, idling");
                    return Ok(());
                }
                Err(err) if err.is_network() => {
                    warn!(target: "ingest", height, %err, "node unreachable, retrying next cycle");
                    return Ok(());
                }
                Err(err) => return Err(IngestError::HeightFailed { height, source: err }),
            };

            record.time_since_prev_block =
                self.prev_time.map(|prev| record.elapsed_since(prev));
            let block_time = record.block_time;

            self.store.append(record)?;
            self.prev_time = Some(block_time);
            self.cursor = height;
            info!(target: "ingest", height, "committed block record");
        }
        Ok(())
    }

    /// Queries the tip with bounded retries.
    ///
    /// `None` means the node was unreachable and the pass should be parked;
    /// a persistently malformed status response is fatal.
    async fn latest_with_retry(&self) -> Result<Option<u64>, IngestError> {
        let result = (|| self.source.latest_height())
            .retry(self.backoff())
            .notify(|err: &RpcError, delay: Duration| {
                warn!(target: "ingest", %err, ?delay, "status query failed, backing off");
            })
            .await;
        match result {
            Ok(latest) => Ok(Some(latest)),
            Err(err) if err.is_network() => {
                warn!(target: "ingest", %err, "node unreachable, retrying next cycle");
                Ok(None)
            }
            Err(err) => Err(IngestError::StatusFailed { source: err }),
        }
    }

    /// Fetches one height with bounded exponential backoff.
    ///
    /// [`RpcError::NotFound`] is not retried; it is the node saying the
    /// height does not exist yet, which only the next poll can change.
    async fn fetch_with_retry(&self, height: u64) -> Result<BlockRecord, RpcError> {
        (|| self.source.fetch(height))
            .retry(self.backoff())
            .when(|err: &RpcError| !matches!(err, RpcError::NotFound(_)))
            .notify(|err: &RpcError, delay: Duration| {
                warn!(target: "ingest", height, %err, ?delay, "fetch failed, backing off");
            })
            .await
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.config.backoff_min)
            .with_max_delay(self.config.backoff_max)
            .with_max_times(self.config.max_retries)
    }
}
