use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Address;

/// One decoded event log entry, persisted as part of the enrichment's
/// `logs` JSON column. `topics` is 0..4 entries per the EVM log format.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Log {
    pub index: u32,
    pub address: Address,
    pub topics: Vec<String>,
    pub data: String,
}

/// Raw per-transaction facts, written once by discovery and never mutated
/// except to correct `status` on receipt reconfirmation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionDetail {
    pub tx_hash: String,
    pub contract_address: Address,
    pub wallet_address: Address,
    pub block_number: i64,
    pub block_timestamp: DateTime<Utc>,
    pub status: i16,
    pub eth_value: BigDecimal,
    pub input_selector: Option<String>,
    pub gas_used: i64,
}

/// Decoded call/log data + fiat valuation, written exactly once per tx
/// (idempotent upserts thereafter).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionEnrichment {
    pub tx_hash: String,
    pub function_name: Option<String>,
    pub logs: Vec<Log>,
    pub usd_value: Option<BigDecimal>,
    pub eth_value_derived: Option<BigDecimal>,
    pub enriched_at: DateTime<Utc>,
}
