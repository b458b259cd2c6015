use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use moka::sync::Cache;
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tracing::warn;

use super::types::{parse_hex_u64, RawBlock, RawLog, RawReceipt, RawTransaction, RpcRequest, RpcResponse};
use super::Error;

const MAX_RETRIES_PER_CALL: usize = 4;
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Round-robins JSON-RPC 2.0 requests over a fixed endpoint list, bounding
/// total concurrent in-flight HTTP calls with a semaphore rather than
/// per-endpoint connection pools ("Shared resources: a bounded
/// pool of upstream RPC connections").
///
/// Deliberately an injected `Arc`-held value rather than process-global
/// state: workers and the API server each hold their own handle to the
/// same pool, there is no hidden singleton to initialize out of order.
pub struct RpcClientPool {
    endpoints: Arc<[String]>,
    next: AtomicUsize,
    http: reqwest::Client,
    semaphore: Arc<Semaphore>,
    block_timestamps: Cache<u64, DateTime<Utc>>,
}

impl RpcClientPool {
    pub fn new(endpoints: Vec<String>, max_concurrent: usize) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(20))
            .build()
            .expect("reqwest client builder with static config never fails");
        Self {
            endpoints: endpoints.into(),
            next: AtomicUsize::new(0),
            http,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            block_timestamps: Cache::builder().max_capacity(100_000).build(),
        }
    }

    fn endpoint_at(&self, offset: usize) -> &str {
        let idx = (self.next.load(Ordering::Relaxed) + offset) % self.endpoints.len();
        &self.endpoints[idx]
    }

    fn advance(&self) {
        self.next.fetch_add(1, Ordering::Relaxed);
    }

    async fn call_raw(&self, body: &Value) -> Result<Value, Error> {
        let _permit = self.semaphore.acquire().await.expect("semaphore never closed");
        let mut backoff = INITIAL_BACKOFF;
        let mut last_err = None;
        for attempt in 0..self.endpoints.len().max(1) * MAX_RETRIES_PER_CALL {
            let endpoint = self.endpoint_at(attempt).to_string();
            let result = self.http.post(&endpoint).json(body).send().await;
            match result {
                Ok(resp) if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => {
                    warn!(endpoint, "rpc endpoint rate limited, rotating");
                    self.advance();
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    last_err = Some(Error::JsonRpc { code: 429, message: "rate limited".into() });
                }
                Ok(resp) => match resp.json::<Value>().await {
                    Ok(value) => return Ok(value),
                    Err(e) => {
                        last_err = Some(Error::Transport(e));
                        self.advance();
                    }
                },
                Err(e) if e.is_timeout() || e.is_connect() => {
                    warn!(endpoint, error = %e, "rpc endpoint unreachable, rotating");
                    self.advance();
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                    last_err = Some(Error::Transport(e));
                }
                Err(e) => return Err(Error::Transport(e)),
            }
        }
        Err(last_err.unwrap_or(Error::EndpointsExhausted))
    }

    pub async fn call(&self, method: &'static str, params: Value) -> Result<Value, Error> {
        let request = RpcRequest::new(1, method, params);
        let body = serde_json::to_value(&request).expect("RpcRequest always serializes");
        let raw = self.call_raw(&body).await?;
        let response: RpcResponse = serde_json::from_value(raw)
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;
        if let Some(error) = response.error {
            return Err(Error::JsonRpc { code: error.code, message: error.message });
        }
        response.result.ok_or_else(|| Error::InvalidResponse("missing result".into()))
    }

    /// Sends a JSON-RPC batch (a JSON array of request objects) and returns
    /// results in request order, matching each response back to its `id`
    /// rather than assuming array order is preserved.
    pub async fn batch_call(
        &self,
        requests: Vec<(&'static str, Value)>,
    ) -> Result<Vec<Result<Value, Error>>, Error> {
        if requests.is_empty() {
            return Ok(Vec::new());
        }
        let batch: Vec<RpcRequest> = requests
            .iter()
            .enumerate()
            .map(|(i, (method, params))| RpcRequest::new(i as u64, method, params.clone()))
            .collect();
        let body = serde_json::to_value(&batch).expect("batch always serializes");
        let raw = self.call_raw(&body).await?;
        let responses: Vec<RpcResponse> = serde_json::from_value(raw)
            .map_err(|e| Error::InvalidResponse(e.to_string()))?;
        let mut by_id: std::collections::HashMap<u64, RpcResponse> =
            responses.into_iter().map(|r| (r.id, r)).collect();
        let mut out = Vec::with_capacity(batch.len());
        for req in &batch {
            let result = match by_id.remove(&req.id) {
                Some(resp) => match resp.error {
                    Some(e) => Err(Error::JsonRpc { code: e.code, message: e.message }),
                    None => resp.result.ok_or_else(|| Error::InvalidResponse("missing result".into())),
                },
                None => Err(Error::InvalidResponse(format!("no response for request id {}", req.id))),
            };
            out.push(result);
        }
        Ok(out)
    }

    pub async fn block_number(&self) -> Result<u64, Error> {
        let value = self.call("eth_blockNumber", json!([])).await?;
        let s = value.as_str().ok_or_else(|| Error::InvalidResponse("blockNumber not a string".into()))?;
        parse_hex_u64(s)
    }

    pub async fn chain_id(&self) -> Result<u64, Error> {
        let value = self.call("eth_chainId", json!([])).await?;
        let s = value.as_str().ok_or_else(|| Error::InvalidResponse("chainId not a string".into()))?;
        parse_hex_u64(s)
    }

    /// Binary-searches `[low, high]` for the earliest block whose timestamp
    /// is `>= timestamp`. Used to translate the admin API's `fromDate`/
    /// `toDate` backfill bounds into the block range discovery
    /// actually operates over; there is no `eth_getBlockByTimestamp` method
    /// to rely on, just `eth_getBlockByNumber`, so this walks the binary
    /// search manually over `get_block_timestamp`'s cache.
    pub async fn block_at_or_after(
        &self,
        timestamp: DateTime<Utc>,
        low: u64,
        high: u64,
    ) -> Result<u64, Error> {
        let (mut lo, mut hi) = (low, high);
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            let mid_ts = self.get_block_timestamp(mid).await?;
            if mid_ts < timestamp {
                lo = mid + 1;
            } else {
                hi = mid;
            }
        }
        Ok(lo)
    }

    /// Fetches logs for one contract over an inclusive block window. The
    /// caller (`discovery::event_mode`) owns window-size adaptation; this
    /// method performs exactly one `eth_getLogs` call.
    pub async fn get_logs(
        &self,
        address: &str,
        from_block: u64,
        to_block: u64,
    ) -> Result<Vec<RawLog>, Error> {
        let params = json!([{
            "address": address,
            "fromBlock": format!("0x{:x}", from_block),
            "toBlock": format!("0x{:x}", to_block),
        }]);
        let value = self.call("eth_getLogs", params).await?;
        serde_json::from_value(value).map_err(|e| Error::InvalidResponse(e.to_string()))
    }

    pub async fn get_transaction_by_hash(&self, hash: &str) -> Result<Option<RawTransaction>, Error> {
        let value = self.call("eth_getTransactionByHash", json!([hash])).await?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| Error::InvalidResponse(e.to_string()))
    }

    pub async fn get_transaction_receipt(&self, hash: &str) -> Result<Option<RawReceipt>, Error> {
        let value = self.call("eth_getTransactionReceipt", json!([hash])).await?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| Error::InvalidResponse(e.to_string()))
    }

    /// Resolves a block's timestamp, cached so a window of transactions that
    /// share the same block only pays the RPC round-trip once.
    pub async fn get_block_timestamp(&self, block_number: u64) -> Result<DateTime<Utc>, Error> {
        if let Some(ts) = self.block_timestamps.get(&block_number) {
            return Ok(ts);
        }
        let value = self
            .call("eth_getBlockByNumber", json!([format!("0x{:x}", block_number), false]))
            .await?;
        if value.is_null() {
            return Err(Error::InvalidResponse(format!("no block at height {block_number}")));
        }
        let block: RawBlock =
            serde_json::from_value(value).map_err(|e| Error::InvalidResponse(e.to_string()))?;
        let secs = parse_hex_u64(&block.timestamp)? as i64;
        let ts = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| Error::InvalidResponse(format!("timestamp out of range: {secs}")))?;
        self.block_timestamps.insert(block_number, ts);
        Ok(ts)
    }

    /// Batches receipt lookups for realtime enrichment, grouped by the
    /// caller per contract ("batched receipt fetch").
    pub async fn get_transaction_receipts(
        &self,
        hashes: &[String],
    ) -> Result<Vec<Option<RawReceipt>>, Error> {
        let requests = hashes
            .iter()
            .map(|h| ("eth_getTransactionReceipt", json!([h])))
            .collect();
        let results = self.batch_call(requests).await?;
        results
            .into_iter()
            .map(|r| match r {
                Ok(value) if value.is_null() => Ok(None),
                Ok(value) => {
                    serde_json::from_value(value).map(Some).map_err(|e| Error::InvalidResponse(e.to_string()))
                }
                Err(e) => Err(e),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_robins_across_endpoints() {
        let pool = RpcClientPool::new(
            vec!["https://a.example".into(), "https://b.example".into()],
            4,
        );
        assert_eq!(pool.endpoint_at(0), "https://a.example");
        assert_eq!(pool.endpoint_at(1), "https://b.example");
        pool.advance();
        assert_eq!(pool.endpoint_at(0), "https://b.example");
    }
}
