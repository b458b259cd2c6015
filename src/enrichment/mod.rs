//! Decodes logs/function names and prices `usd_value`/`eth_value_derived`
//! for already-discovered transactions.

mod error;
mod valuation;
pub mod worker;

pub use error::Error;
pub use valuation::{compute_usd_value, derive_eth_value};

use sqlx::PgPool;

use crate::abi;
use crate::db;
use crate::domain::{Address, Log, TransactionDetail, TransactionEnrichment};
use crate::oracle::PriceOracle;
use crate::rpc::RpcClientPool;

/// Enriches one batch of already-discovered transactions: fetches their
/// receipts for logs, decodes the function name and `Transfer` legs, prices
/// `usd_value`/`eth_value_derived`, and upserts `transaction_enrichment`
/// rows. Shared by the realtime worker, the `enrich` job executor, and
/// gap-fill — none of them re-implement the pricing chain.
pub async fn enrich_batch(
    pool: &PgPool,
    rpc: &RpcClientPool,
    oracle: &dyn PriceOracle,
    stablecoins: &[Address],
    details: &[TransactionDetail],
) -> Result<usize, Error> {
    if details.is_empty() {
        return Ok(0);
    }
    let hashes: Vec<String> = details.iter().map(|d| d.tx_hash.clone()).collect();
    let receipts = rpc.get_transaction_receipts(&hashes).await?;

    let mut enrichments = Vec::with_capacity(details.len());
    for (detail, receipt) in details.iter().zip(receipts) {
        let Some(receipt) = receipt else { continue };
        let logs: Vec<Log> = receipt
            .logs
            .into_iter()
            .enumerate()
            .filter_map(|(i, raw)| {
                Address::parse(&raw.address).ok().map(|address| Log {
                    index: i as u32,
                    address,
                    topics: raw.topics,
                    data: raw.data,
                })
            })
            .collect();

        let contract = db::contracts::get_by_address(pool, &detail.contract_address).await?;
        let function_name = match (&contract, detail.input_selector.as_deref()) {
            (Some(c), Some(input)) => match &c.abi {
                Some(abi_json) => abi::decode_function_name(abi_json, input).unwrap_or(None),
                None => None,
            },
            _ => None,
        };

        let usd_value = compute_usd_value(oracle, stablecoins, detail, &logs).await?;
        let eth_value_derived = derive_eth_value(oracle, usd_value.as_ref(), detail.block_timestamp).await?;

        enrichments.push(TransactionEnrichment {
            tx_hash: detail.tx_hash.clone(),
            function_name,
            logs,
            usd_value,
            eth_value_derived,
            enriched_at: chrono::Utc::now(),
        });
    }
    db::transactions::upsert_enrichment_batch(pool, &enrichments).await?;
    Ok(enrichments.len())
}
