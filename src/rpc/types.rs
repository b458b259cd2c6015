use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, Serialize)]
pub struct RpcRequest {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'static str,
    pub params: Value,
}

impl RpcRequest {
    pub fn new(id: u64, method: &'static str, params: Value) -> Self {
        Self { jsonrpc: "2.0", id, method, params }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct RpcResponseError {
    pub code: i64,
    pub message: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RpcResponse {
    pub id: u64,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<RpcResponseError>,
}

/// `eth_getLogs` result entry, shaped exactly as the node returns it (hex
/// quantities left undecoded until the caller needs the numeric value).
#[derive(Clone, Debug, Deserialize)]
pub struct RawLog {
    pub address: String,
    pub topics: Vec<String>,
    pub data: String,
    #[serde(rename = "blockNumber")]
    pub block_number: String,
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    #[serde(rename = "logIndex")]
    pub log_index: String,
    #[serde(default, rename = "removed")]
    pub removed: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawTransaction {
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub value: String,
    pub input: String,
    #[serde(rename = "blockNumber")]
    pub block_number: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct RawReceipt {
    #[serde(rename = "transactionHash")]
    pub transaction_hash: String,
    pub status: Option<String>,
    #[serde(rename = "gasUsed")]
    pub gas_used: String,
    pub logs: Vec<RawLog>,
}

/// Block header fields discovery needs to stamp `block_timestamp`,
/// fetched via `eth_getBlockByNumber(number, false)` and cached per block
/// to avoid refetching it once per transaction in the same block.
#[derive(Clone, Debug, Deserialize)]
pub struct RawBlock {
    pub number: String,
    pub timestamp: String,
}

/// Parses a `0x`-prefixed hex quantity. Panics are avoided entirely;
/// malformed input yields an error the caller can classify as permanent.
pub fn parse_hex_u64(s: &str) -> Result<u64, super::Error> {
    let stripped = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(stripped, 16)
        .map_err(|_| super::Error::InvalidResponse(format!("not a hex u64: {s}")))
}
