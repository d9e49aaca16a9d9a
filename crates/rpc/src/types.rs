//! Wire-format types for the node's RPC responses.

use crate::RpcError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// The JSON-RPC response envelope every endpoint wraps its payload in.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub(crate) result: Option<Value>,
    #[serde(default)]
    pub(crate) error: Option<ErrorObject>,
}

/// The error member of a JSON-RPC response.
#[derive(Debug, Deserialize)]
pub(crate) struct ErrorObject {
    #[serde(default)]
    pub(crate) code: i64,
    #[serde(default)]
    pub(crate) message: String,
    #[serde(default)]
    pub(crate) data: Option<String>,
}

impl ErrorObject {
    /// Whether the node is reporting a height beyond its current tip.
    ///
    /// CometBFT phrases this as `height H must be less than or equal to the
    /// current blockchain height C` in the error data.
    pub(crate) fn is_height_out_of_range(&self) -> bool {
        let text = match &self.data {
            Some(data) => format!("{} {data}", self.message),
            None => self.message.clone(),
        };
        let text = text.to_ascii_lowercase();
        text.contains("must be less than or equal to") || text.contains("not found")
    }

    pub(crate) fn to_protocol(&self, endpoint: &str) -> RpcError {
        RpcError::Protocol(format!(
            "{endpoint} returned error {}: {}{}",
            self.code,
            self.message,
            self.data.as_deref().map(|d| format!(" ({d})")).unwrap_or_default(),
        ))
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatusResult {
    pub(crate) sync_info: SyncInfo,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SyncInfo {
    pub(crate) latest_block_height: String,
}

/// One page of the `/validators` endpoint. `count` and `total` are decimal
/// strings on the wire; only `total` and the page length are needed.
#[derive(Debug, Deserialize)]
pub(crate) struct ValidatorsResult {
    #[serde(default)]
    pub(crate) validators: Vec<Value>,
    pub(crate) total: String,
}

/// Typed projection of the fields the monitor reads out of a block payload.
#[derive(Debug, Deserialize)]
struct BlockResult {
    block: BlockBody,
}

#[derive(Debug, Deserialize)]
struct BlockBody {
    header: BlockHeader,
    data: BlockData,
}

#[derive(Debug, Deserialize)]
struct BlockHeader {
    height: String,
    time: String,
}

#[derive(Debug, Deserialize)]
struct BlockData {
    /// Null on the wire when the block is empty.
    #[serde(default)]
    txs: Option<Vec<Value>>,
}

/// A block payload as returned by the node, with the monitor's projections
/// (header time, tx count) pre-validated at construction.
///
/// The full `result` value is kept so the payload size can be measured on
/// the canonical serialization rather than estimated.
#[derive(Debug, Clone)]
pub struct RawBlock {
    height: u64,
    payload: Value,
    header_time: String,
    num_txs: u64,
}

impl RawBlock {
    pub(crate) fn from_result(height: u64, payload: Value) -> Result<Self, RpcError> {
        let projected = BlockResult::deserialize(&payload)
            .map_err(|err| RpcError::Protocol(format!("malformed block payload: {err}")))?;

        let header_height: u64 = projected
            .block
            .header
            .height
            .parse()
            .map_err(|err| RpcError::Protocol(format!("unparseable block height: {err}")))?;
        if header_height != height {
            return Err(RpcError::Protocol(format!(
                "requested block {height} but the node returned {header_height}"
            )));
        }

        let num_txs = projected.block.data.txs.map_or(0, |txs| txs.len() as u64);
        Ok(Self { height, payload, header_time: projected.block.header.time, num_txs })
    }

    /// The height this block was fetched at.
    pub const fn height(&self) -> u64 {
        self.height
    }

    /// Number of transaction entries in the payload.
    pub const fn num_txs(&self) -> u64 {
        self.num_txs
    }

    /// The header timestamp, parsed permissively as RFC 3339.
    ///
    /// Nodes emit fractional seconds of varying precision with a trailing
    /// UTC marker; all of those shapes are accepted.
    pub fn block_time(&self) -> Result<DateTime<Utc>, RpcError> {
        DateTime::parse_from_rfc3339(&self.header_time)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|err| {
                RpcError::Protocol(format!(
                    "unparseable header time `{}`: {err}",
                    self.header_time
                ))
            })
    }

    /// Byte length of the canonical serialized payload.
    ///
    /// `serde_json` maps deserialize into sorted-key objects, so the same
    /// payload always serializes to the same length regardless of the key
    /// order the node happened to emit.
    pub fn canonical_size(&self) -> Result<u64, RpcError> {
        serde_json::to_vec(&self.payload)
            .map(|bytes| bytes.len() as u64)
            .map_err(|err| RpcError::Protocol(format!("unserializable block payload: {err}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block_payload(height: &str, time: &str, txs: Value) -> Value {
        json!({
            "block_id": { "hash": "AA" },
            "block": {
                "header": { "height": height, "time": time, "chain_id": "test-1" },
                "data": { "txs": txs },
            }
        })
    }

    #[test]
    fn status_result_parses_decimal_height() {
        let value = json!({ "sync_info": { "latest_block_height": "12345", "catching_up": false } });
        let status: StatusResult = serde_json::from_value(value).expect("parse");
        assert_eq!(status.sync_info.latest_block_height, "12345");
    }

    #[test]
    fn raw_block_projects_txs_and_time() {
        let payload =
            block_payload("7", "2023-10-05T14:30:00.123456789Z", json!(["dHgx", "dHgy"]));
        let block = RawBlock::from_result(7, payload).expect("project");
        assert_eq!(block.height(), 7);
        assert_eq!(block.num_txs(), 2);

        let time = block.block_time().expect("time");
        assert_eq!(time.timestamp(), 1_696_516_200);
        assert_eq!(time.timestamp_subsec_nanos(), 123_456_789);
    }

    #[test]
    fn raw_block_treats_null_txs_as_empty() {
        let payload = block_payload("1", "2023-10-05T14:30:00Z", Value::Null);
        let block = RawBlock::from_result(1, payload).expect("project");
        assert_eq!(block.num_txs(), 0);
    }

    #[test]
    fn raw_block_rejects_height_mismatch() {
        let payload = block_payload("8", "2023-10-05T14:30:00Z", json!([]));
        let err = RawBlock::from_result(7, payload).unwrap_err();
        assert!(matches!(err, RpcError::Protocol(_)));
    }

    #[test]
    fn raw_block_rejects_garbage_time_lazily() {
        let payload = block_payload("1", "yesterday at noon", json!([]));
        let block = RawBlock::from_result(1, payload).expect("shape is still valid");
        assert!(matches!(block.block_time().unwrap_err(), RpcError::Protocol(_)));
    }

    #[test]
    fn canonical_size_is_reproducible_across_key_order() {
        let a = RawBlock::from_result(
            1,
            block_payload("1", "2023-10-05T14:30:00Z", json!(["dHgx"])),
        )
        .expect("a");
        // Same payload, different construction order of the header map.
        let b = RawBlock::from_result(
            1,
            serde_json::from_str(
                r#"{"block":{"data":{"txs":["dHgx"]},"header":{"time":"2023-10-05T14:30:00Z","chain_id":"test-1","height":"1"}},"block_id":{"hash":"AA"}}"#,
            )
            .expect("json"),
        )
        .expect("b");
        assert_eq!(a.canonical_size().unwrap(), b.canonical_size().unwrap());
    }

    #[test]
    fn error_object_classifies_beyond_tip() {
        let beyond: ErrorObject = serde_json::from_value(json!({
            "code": -32603,
            "message": "Internal error",
            "data": "height 50 must be less than or equal to the current blockchain height 42"
        }))
        .expect("parse");
        assert!(beyond.is_height_out_of_range());

        let other: ErrorObject = serde_json::from_value(json!({
            "code": -32700,
            "message": "Parse error"
        }))
        .expect("parse");
        assert!(!other.is_height_out_of_range());
    }
}
