//! Bridge volume aggregation ("Bridge volume (specialized)",
//! §8 scenario 3).
//!
//! Bridge contracts are identified by platform membership (`platforms.slug
//! = 'bridge'`) rather than a separate curated hot-wallet table — the
//! schema has no such table, and contract-platform linkage already plays
//! that role for every other aggregate. Direction is read directly off the
//! event kind (`OFTSent` always leaves this chain, `OFTReceived` always
//! arrives), and `sub_platform` is the decoded function name rather than a
//! per-hot-wallet method-selector table. Both are documented simplifications
//! — see DESIGN.md.

use std::collections::BTreeMap;
use std::str::FromStr;

use alloy_primitives::{hex, keccak256, U256};
use bigdecimal::BigDecimal;
use serde::Serialize;
use sqlx::{PgPool, Row};

use crate::abi;
use crate::domain::{Address, Log};

use super::Error;

const OFT_SENT_SIG: &str = "OFTSent(bytes32,uint32,address,uint256,uint256)";
const OFT_RECEIVED_SIG: &str = "OFTReceived(bytes32,uint32,address,uint256)";
const BRIDGE_AMOUNT_DECIMALS: u32 = 6;

enum Direction {
    In,
    Out,
}

fn topic0(sig: &str) -> String {
    format!("0x{}", hex::encode(keccak256(sig.as_bytes())))
}

fn classify(log: &Log) -> Option<Direction> {
    let t0 = log.topics.first()?.to_lowercase();
    if t0 == topic0(OFT_SENT_SIG) {
        Some(Direction::Out)
    } else if t0 == topic0(OFT_RECEIVED_SIG) {
        Some(Direction::In)
    } else {
        None
    }
}

fn scaled_amount(word: [u8; 32]) -> BigDecimal {
    let raw = U256::from_be_bytes(word);
    let raw_decimal = BigDecimal::from_str(&raw.to_string()).unwrap_or_default();
    let divisor = BigDecimal::from_str(&format!("1{}", "0".repeat(BRIDGE_AMOUNT_DECIMALS as usize)))
        .expect("constant divisor parses");
    raw_decimal / divisor
}

fn wei_to_eth(wei: &BigDecimal) -> BigDecimal {
    wei / BigDecimal::from_str("1000000000000000000").expect("constant divisor parses")
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgePlatformBreakdown {
    pub platform: String,
    pub sub_platform: Option<String>,
    pub eth_value: BigDecimal,
    pub usd_value: BigDecimal,
    pub tx_count: i64,
    pub logo: Option<String>,
    pub url: Option<String>,
    pub bridged_in_usd: BigDecimal,
    pub bridged_in_count: i64,
    pub bridged_out_usd: BigDecimal,
    pub bridged_out_count: i64,
}

impl BridgePlatformBreakdown {
    fn new(platform: String, sub_platform: Option<String>, logo: Option<String>, url: Option<String>) -> Self {
        Self {
            platform,
            sub_platform,
            eth_value: BigDecimal::from(0),
            usd_value: BigDecimal::from(0),
            tx_count: 0,
            logo,
            url,
            bridged_in_usd: BigDecimal::from(0),
            bridged_in_count: 0,
            bridged_out_usd: BigDecimal::from(0),
            bridged_out_count: 0,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BridgeSummary {
    pub total_eth: BigDecimal,
    pub total_usd: BigDecimal,
    pub tx_count: i64,
    pub bridged_in_usd: BigDecimal,
    pub bridged_in_count: i64,
    pub bridged_out_usd: BigDecimal,
    pub bridged_out_count: i64,
    pub by_platform: Vec<BridgePlatformBreakdown>,
}

/// Computes bridge volume for one wallet, per spec.md §8 scenario 3:
/// `bridgedInUsd + bridgedOutUsd = totalUsd`,
/// `bridgedInCount + bridgedOutCount = txCount` per platform (§8 invariant 5).
pub async fn bridge_summary(pool: &PgPool, wallet: &Address) -> Result<BridgeSummary, Error> {
    let rows = sqlx::query(
        "SELECT td.tx_hash, td.eth_value, te.logs, te.function_name,
                p.id AS platform_id, p.name AS platform_name, p.logo_url, p.website_url
         FROM transaction_details td
         JOIN contracts c ON c.address = td.contract_address
         JOIN contract_platforms cp ON cp.contract_id = c.id
         JOIN platforms p ON p.id = cp.platform_id
         LEFT JOIN transaction_enrichment te ON te.tx_hash = td.tx_hash
         WHERE p.slug = 'bridge' AND td.wallet_address = $1 AND td.status = 1",
    )
    .bind(wallet.as_lowercase())
    .fetch_all(pool)
    .await?;

    let mut by_platform: BTreeMap<i64, BridgePlatformBreakdown> = BTreeMap::new();
    let mut total_in_usd = BigDecimal::from(0);
    let mut total_out_usd = BigDecimal::from(0);
    let mut total_in_count = 0i64;
    let mut total_out_count = 0i64;
    let mut total_eth = BigDecimal::from(0);
    let mut tx_seen = std::collections::HashSet::new();

    for row in rows {
        let tx_hash: String = row.try_get("tx_hash")?;
        let eth_value: BigDecimal = row.try_get("eth_value")?;
        let logs_json: Option<serde_json::Value> = row.try_get("logs")?;
        let function_name: Option<String> = row.try_get("function_name")?;
        let platform_id: i64 = row.try_get("platform_id")?;
        let platform_name: String = row.try_get("platform_name")?;
        let logo_url: Option<String> = row.try_get("logo_url")?;
        let website_url: Option<String> = row.try_get("website_url")?;

        let logs: Vec<Log> = logs_json.and_then(|v| serde_json::from_value(v).ok()).unwrap_or_default();

        let entry = by_platform
            .entry(platform_id)
            .or_insert_with(|| BridgePlatformBreakdown::new(platform_name, function_name, logo_url, website_url));

        let mut tx_contributed = false;
        for log in &logs {
            let Some(direction) = classify(log) else { continue };
            let Ok(word) = abi::decode_word_at(&log.data, 1) else { continue };
            let amount = scaled_amount(word);
            tx_contributed = true;
            match direction {
                Direction::In => {
                    entry.bridged_in_usd += &amount;
                    entry.bridged_in_count += 1;
                    total_in_usd += &amount;
                    total_in_count += 1;
                }
                Direction::Out => {
                    entry.bridged_out_usd += &amount;
                    entry.bridged_out_count += 1;
                    total_out_usd += &amount;
                    total_out_count += 1;
                }
            }
            entry.usd_value += &amount;
        }
        if tx_contributed {
            let eth = wei_to_eth(&eth_value);
            entry.eth_value += &eth;
            entry.tx_count += 1;
            total_eth += &eth;
            tx_seen.insert(tx_hash);
        }
    }

    Ok(BridgeSummary {
        total_eth,
        total_usd: &total_in_usd + &total_out_usd,
        tx_count: tx_seen.len() as i64,
        bridged_in_usd: total_in_usd,
        bridged_in_count: total_in_count,
        bridged_out_usd: total_out_usd,
        bridged_out_count: total_out_count,
        by_platform: by_platform.into_values().collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u8) -> Address {
        Address::parse(&format!("0x{:040x}", n)).unwrap()
    }

    fn oft_log(sig: &str, raw_amount: u64) -> Log {
        Log {
            index: 0,
            address: addr(0xBB),
            topics: vec![topic0(sig)],
            data: format!("0x{:064x}{:064x}", 0u64, raw_amount),
        }
    }

    #[test]
    fn scenario_3_bridge_amounts_scale_by_six_decimals() {
        let sent_a = classify(&oft_log(OFT_SENT_SIG, 0));
        assert!(matches!(sent_a, Some(Direction::Out)));
        let word = abi::decode_word_at(&oft_log(OFT_SENT_SIG, 100_000).data, 1).unwrap();
        assert_eq!(scaled_amount(word), BigDecimal::from_str("0.1").unwrap());

        let word = abi::decode_word_at(&oft_log(OFT_SENT_SIG, 50_000).data, 1).unwrap();
        assert_eq!(scaled_amount(word), BigDecimal::from_str("0.05").unwrap());

        let word = abi::decode_word_at(&oft_log(OFT_RECEIVED_SIG, 1_000_000).data, 1).unwrap();
        assert!(matches!(classify(&oft_log(OFT_RECEIVED_SIG, 0)), Some(Direction::In)));
        assert_eq!(scaled_amount(word), BigDecimal::from_str("1.00").unwrap());
    }

    #[test]
    fn unrecognized_topic_is_not_classified() {
        let log = Log { index: 0, address: addr(0xBB), topics: vec!["0xdead".into()], data: "0x".into() };
        assert!(classify(&log).is_none());
    }
}
