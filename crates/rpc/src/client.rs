//! HTTP client for the node's read-only RPC surface.

use crate::{
    RawBlock, RpcError,
    types::{Envelope, StatusResult, ValidatorsResult},
};
use serde::Deserialize;
use serde_json::Value;
use std::{ops::ControlFlow, time::Duration};
use tracing::trace;

/// Validators requested per page. The set size is still correct for larger
/// sets because [`NodeClient::validator_count`] walks every page.
const VALIDATOR_PAGE_SIZE: u64 = 100;

/// A read-only client for one node RPC endpoint.
///
/// The base URL is supplied at construction; nothing is read from
/// process-wide state. Every call is bounded by the configured timeout and
/// performs no retries of its own.
#[derive(Debug, Clone)]
pub struct NodeClient {
    http: reqwest::Client,
    base_url: String,
}

impl NodeClient {
    /// Creates a client for `base_url` with a per-call `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RpcError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RpcError::from_transport)?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    /// The chain tip height reported by `GET /status`.
    pub async fn latest_height(&self) -> Result<u64, RpcError> {
        let envelope = self.get("status", &[]).await?;
        let result = match envelope.error {
            Some(err) => return Err(err.to_protocol("/status")),
            None => envelope
                .result
                .ok_or_else(|| RpcError::Protocol("/status response had no result".into()))?,
        };
        let status = StatusResult::deserialize(&result)
            .map_err(|err| RpcError::Protocol(format!("malformed /status result: {err}")))?;
        status
            .sync_info
            .latest_block_height
            .parse()
            .map_err(|err| RpcError::Protocol(format!("unparseable latest height: {err}")))
    }

    /// The block payload at `height` from `GET /block?height=H`.
    ///
    /// Returns [`RpcError::NotFound`] when the node reports the height is
    /// beyond its current tip.
    pub async fn block(&self, height: u64) -> Result<RawBlock, RpcError> {
        let envelope = self.get("block", &[("height", height.to_string())]).await?;
        let result = match envelope.error {
            Some(err) if err.is_height_out_of_range() => return Err(RpcError::NotFound(height)),
            Some(err) => return Err(err.to_protocol("/block")),
            None => envelope
                .result
                .ok_or_else(|| RpcError::Protocol("/block response had no result".into()))?,
        };
        RawBlock::from_result(height, result)
    }

    /// The full validator-set size at `height`.
    ///
    /// The `/validators` endpoint is paginated; pages are walked until the
    /// node's reported total is covered, so sets larger than one page are
    /// never undercounted.
    pub async fn validator_count(&self, height: u64) -> Result<u64, RpcError> {
        let mut counted: u64 = 0;
        let mut page: u64 = 1;
        loop {
            let envelope = self
                .get(
                    "validators",
                    &[
                        ("height", height.to_string()),
                        ("page", page.to_string()),
                        ("per_page", VALIDATOR_PAGE_SIZE.to_string()),
                    ],
                )
                .await?;
            let result = match envelope.error {
                Some(err) if err.is_height_out_of_range() => {
                    return Err(RpcError::NotFound(height));
                }
                Some(err) => return Err(err.to_protocol("/validators")),
                None => envelope.result.ok_or_else(|| {
                    RpcError::Protocol("/validators response had no result".into())
                })?,
            };
            let validators = ValidatorsResult::deserialize(&result)
                .map_err(|err| RpcError::Protocol(format!("malformed /validators result: {err}")))?;
            let total: u64 = validators
                .total
                .parse()
                .map_err(|err| RpcError::Protocol(format!("unparseable validator total: {err}")))?;

            match tally_validator_page(counted, validators.validators.len(), total, page)? {
                ControlFlow::Break(final_count) => {
                    trace!(target: "rpc", height, pages = page, final_count, "validator set counted");
                    return Ok(final_count);
                }
                ControlFlow::Continue(running) => counted = running,
            }
            page += 1;
        }
    }

    /// Issues one GET and decodes the JSON-RPC envelope.
    ///
    /// Error bodies are served with non-2xx statuses by some nodes, so the
    /// status code is ignored and the envelope alone decides the outcome.
    async fn get(&self, path: &str, query: &[(&str, String)]) -> Result<Envelope, RpcError> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .http
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(RpcError::from_transport)?;
        let body: Value = response.json().await.map_err(RpcError::from_transport)?;
        Envelope::deserialize(&body)
            .map_err(|err| RpcError::Protocol(format!("malformed rpc envelope: {err}")))
    }
}

/// Folds one `/validators` page into the running count.
///
/// Breaks with the final count once the node's reported total is covered.
/// An empty page while still short of the total means the node is not
/// serving what it advertised; walking further would loop forever.
fn tally_validator_page(
    counted: u64,
    page_len: usize,
    total: u64,
    page: u64,
) -> Result<ControlFlow<u64, u64>, RpcError> {
    let counted = counted + page_len as u64;
    if counted >= total {
        return Ok(ControlFlow::Break(counted));
    }
    if page_len == 0 {
        return Err(RpcError::Protocol(format!(
            "/validators page {page} was empty with only {counted} of {total} counted"
        )));
    }
    Ok(ControlFlow::Continue(counted))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validator_tally_walks_past_one_page() {
        // 145 validators served as 100 + 45.
        let running = match tally_validator_page(0, 100, 145, 1).expect("first page") {
            ControlFlow::Continue(running) => running,
            ControlFlow::Break(n) => panic!("stopped early at {n}"),
        };
        assert_eq!(running, 100);
        assert_eq!(
            tally_validator_page(running, 45, 145, 2).expect("second page"),
            ControlFlow::Break(145)
        );
    }

    #[test]
    fn validator_tally_rejects_short_feed() {
        let err = tally_validator_page(100, 0, 145, 2).unwrap_err();
        assert!(matches!(err, RpcError::Protocol(_)));
    }

    #[test]
    fn validator_tally_handles_empty_set() {
        assert_eq!(tally_validator_page(0, 0, 0, 1).expect("empty"), ControlFlow::Break(0));
    }

    #[test]
    fn new_strips_trailing_slash() {
        let client = NodeClient::new("http://localhost:26657/", Duration::from_secs(5))
            .expect("build client");
        assert_eq!(client.base_url, "http://localhost:26657");
    }
}
