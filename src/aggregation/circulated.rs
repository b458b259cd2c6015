//! Circulated volume aggregation ("Circulated volume: sum of
//! incoming + outgoing native + ERC-20 transfers touching the wallet, in
//! both ETH and USD").
//!
//! Outgoing volume is every tx the wallet sent (native value + the tx's
//! already-computed USD valuation). Incoming volume is every *other*
//! wallet's enriched tx whose logs contain a `Transfer` naming this wallet
//! as the recipient — reusing the enrichment pipeline's per-tx
//! `usd_value`/`eth_value_derived` rather than re-deriving a per-log price,
//! since those already represent the full value moved by that tx.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::Serialize;
use sqlx::{PgPool, Row};

use crate::abi;
use crate::domain::Address;

use super::Error;

fn wei_to_eth(wei: &BigDecimal) -> BigDecimal {
    wei / BigDecimal::from_str("1000000000000000000").expect("constant divisor parses")
}

#[derive(Clone, Debug, Serialize)]
pub struct CirculatedVolume {
    pub incoming_eth: BigDecimal,
    pub outgoing_eth: BigDecimal,
    pub incoming_usd: BigDecimal,
    pub outgoing_usd: BigDecimal,
    pub total_eth: BigDecimal,
    pub total_usd: BigDecimal,
}

pub async fn circulated_volume(pool: &PgPool, wallet: &Address) -> Result<CirculatedVolume, Error> {
    let outgoing = sqlx::query(
        "SELECT COALESCE(SUM(td.eth_value), 0) AS eth_sum, COALESCE(SUM(te.usd_value), 0) AS usd_sum
         FROM transaction_details td
         LEFT JOIN transaction_enrichment te ON te.tx_hash = td.tx_hash
         WHERE td.wallet_address = $1 AND td.status = 1",
    )
    .bind(wallet.as_lowercase())
    .fetch_one(pool)
    .await?;
    let outgoing_eth_wei: BigDecimal = outgoing.try_get("eth_sum")?;
    let outgoing_usd: BigDecimal = outgoing.try_get("usd_sum")?;

    let wallet_suffix = wallet.as_lowercase()[2..].to_string();
    let incoming = sqlx::query(
        "SELECT COALESCE(SUM(te.eth_value_derived), 0) AS eth_sum, COALESCE(SUM(te.usd_value), 0) AS usd_sum
         FROM transaction_details td
         JOIN transaction_enrichment te ON te.tx_hash = td.tx_hash
         WHERE td.wallet_address <> $1
           AND td.status = 1
           AND EXISTS (
               SELECT 1 FROM jsonb_array_elements(te.logs) AS log
               WHERE log -> 'topics' ->> 0 = $2
                 AND jsonb_array_length(log -> 'topics') >= 3
                 AND lower(right(log -> 'topics' ->> 2, 40)) = $3
           )",
    )
    .bind(wallet.as_lowercase())
    .bind(abi::transfer_topic0())
    .bind(&wallet_suffix)
    .fetch_one(pool)
    .await?;
    let incoming_eth: BigDecimal = incoming.try_get("eth_sum")?;
    let incoming_usd: BigDecimal = incoming.try_get("usd_sum")?;

    let outgoing_eth = wei_to_eth(&outgoing_eth_wei);

    Ok(CirculatedVolume {
        total_eth: &incoming_eth + &outgoing_eth,
        total_usd: &incoming_usd + &outgoing_usd,
        incoming_eth,
        outgoing_eth,
        incoming_usd,
        outgoing_usd,
    })
}
