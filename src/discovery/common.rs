use std::str::FromStr;

use alloy_primitives::U256;
use bigdecimal::BigDecimal;
use tracing::warn;

use crate::domain::{Address, TransactionDetail};
use crate::rpc::{parse_hex_u64, RawReceipt, RawTransaction, RpcClientPool};

use super::Error;

/// Resolves a batch of tx hashes to canonical [`TransactionDetail`] rows via
/// one JSON-RPC batch call (tx + receipt per hash). A hash the node can't
/// answer, or whose payload doesn't parse, is logged and skipped rather
/// than failing the whole batch. A transient transport error for one pair
/// fails the whole call so the caller retries the batch.
pub async fn materialize_batch(
    rpc: &RpcClientPool,
    contract_address: &Address,
    hashes: &[String],
) -> Result<Vec<TransactionDetail>, Error> {
    if hashes.is_empty() {
        return Ok(Vec::new());
    }
    let mut requests = Vec::with_capacity(hashes.len() * 2);
    for hash in hashes {
        requests.push(("eth_getTransactionByHash", serde_json::json!([hash])));
        requests.push(("eth_getTransactionReceipt", serde_json::json!([hash])));
    }
    let mut results = rpc.batch_call(requests).await?.into_iter();

    let mut details = Vec::with_capacity(hashes.len());
    for hash in hashes {
        let tx_result = results.next().expect("one tx response per hash");
        let receipt_result = results.next().expect("one receipt response per hash");

        let tx_value = match transient_or_skip(tx_result, hash)? {
            Some(v) => v,
            None => continue,
        };
        let receipt_value = match transient_or_skip(receipt_result, hash)? {
            Some(v) => v,
            None => continue,
        };

        match build_detail(rpc, contract_address, hash, tx_value, receipt_value).await? {
            Some(detail) => details.push(detail),
            None => warn!(tx_hash = %hash, "skipping malformed transaction or receipt"),
        }
    }
    Ok(details)
}

/// Classifies one RPC result: `Ok(None)` means "skip this hash" (not
/// found, or a permanent application error), `Err` propagates a transient
/// failure so the caller retries the whole batch.
fn transient_or_skip(
    result: Result<serde_json::Value, crate::rpc::Error>,
    hash: &str,
) -> Result<Option<serde_json::Value>, Error> {
    match result {
        Ok(v) if v.is_null() => Ok(None),
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_transient() => Err(Error::Rpc(e)),
        Err(e) => {
            warn!(tx_hash = %hash, error = %e, "skipping tx: permanent rpc error");
            Ok(None)
        }
    }
}

async fn build_detail(
    rpc: &RpcClientPool,
    contract_address: &Address,
    hash: &str,
    tx_value: serde_json::Value,
    receipt_value: serde_json::Value,
) -> Result<Option<TransactionDetail>, Error> {
    let Ok(tx) = serde_json::from_value::<RawTransaction>(tx_value) else { return Ok(None) };
    let Ok(receipt) = serde_json::from_value::<RawReceipt>(receipt_value) else { return Ok(None) };

    let Some(block_number_hex) = tx.block_number.as_deref() else { return Ok(None) };
    let Ok(block_number) = parse_hex_u64(block_number_hex) else { return Ok(None) };
    let block_timestamp = rpc.get_block_timestamp(block_number).await?;

    let Ok(wallet_address) = Address::parse(&tx.from) else { return Ok(None) };

    let status: i16 = match receipt.status.as_deref().and_then(|s| parse_hex_u64(s).ok()) {
        Some(1) => 1,
        _ => 0,
    };

    let eth_value = U256::from_str_radix(tx.value.trim_start_matches("0x"), 16).unwrap_or(U256::ZERO);
    let eth_value = BigDecimal::from_str(&eth_value.to_string()).unwrap_or_default();

    let gas_used = parse_hex_u64(&receipt.gas_used).unwrap_or(0) as i64;
    let input_selector = (tx.input.len() >= 10).then(|| tx.input[..10].to_string());

    Ok(Some(TransactionDetail {
        tx_hash: hash.to_string(),
        contract_address: *contract_address,
        wallet_address,
        block_number: block_number as i64,
        block_timestamp,
        status,
        eth_value,
        input_selector,
        gas_used,
    }))
}
