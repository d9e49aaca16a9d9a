//! The per-height record persisted by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Column names of the on-disk store, in persisted order.
///
/// The header row of an existing store file must match this list exactly;
/// see [`crate::CsvStore::open`].
pub const FIELD_NAMES: [&str; 6] =
    ["height", "block_time", "block_size", "num_txs", "num_validators", "time_since_prev_block"];

/// Metadata derived from one block, immutable once committed to the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRecord {
    /// Chain height of the block. Positive; the store's primary ordering key.
    pub height: u64,
    /// Timestamp from the block header, parsed from the node's wire format.
    pub block_time: DateTime<Utc>,
    /// Byte length of the canonical serialized block payload.
    pub block_size: u64,
    /// Number of transactions in the block.
    pub num_txs: u64,
    /// Size of the active validator set at this height.
    pub num_validators: u64,
    /// Seconds elapsed since the previous *stored* block.
    ///
    /// `None` for height 1 and whenever the predecessor is unavailable. The
    /// absent case is deliberately not collapsed to `0.0`: zero elapsed time
    /// and "unknown" are different facts, and conflating them skews the
    /// downstream statistics.
    pub time_since_prev_block: Option<f64>,
}

impl BlockRecord {
    /// Seconds between `prev_time` and this block's header time.
    ///
    /// Sub-second precision is preserved; the result is negative if the node
    /// reported a header time earlier than its predecessor's.
    pub fn elapsed_since(&self, prev_time: DateTime<Utc>) -> f64 {
        let delta = self.block_time.signed_duration_since(prev_time);
        delta
            .num_microseconds()
            .map(|us| us as f64 / 1e6)
            .unwrap_or_else(|| delta.num_milliseconds() as f64 / 1e3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64, nanos: u32) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, nanos).unwrap()
    }

    #[test]
    fn elapsed_since_preserves_subsecond_precision() {
        let record = BlockRecord {
            height: 2,
            block_time: at(1_000, 500_000_000),
            block_size: 10,
            num_txs: 0,
            num_validators: 1,
            time_since_prev_block: None,
        };
        assert_eq!(record.elapsed_since(at(999, 0)), 1.5);
    }

    #[test]
    fn elapsed_since_can_be_negative() {
        let record = BlockRecord {
            height: 2,
            block_time: at(999, 0),
            block_size: 10,
            num_txs: 0,
            num_validators: 1,
            time_since_prev_block: None,
        };
        assert_eq!(record.elapsed_since(at(1_000, 0)), -1.0);
    }
}
