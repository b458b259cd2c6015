//! Lending position replay ("Tydro-like lending: derived by
//! replaying deposit/withdraw/borrow/repay events for the wallet").
//!
//! Lending contracts are identified by platform membership
//! (`platforms.slug = 'lending'`), matching the approach taken for
//! [`super::bridge`]. Canonical event signatures assume a single indexed
//! `user` topic and one `uint256 amount` data word, the common shape for
//! this class of protocol.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::Serialize;
use sqlx::{PgPool, Row};

use crate::abi;
use crate::domain::{Address, Log};

use super::Error;

const DEPOSIT_SIG: &str = "Deposit(address,uint256)";
const WITHDRAW_SIG: &str = "Withdraw(address,uint256)";
const BORROW_SIG: &str = "Borrow(address,uint256)";
const REPAY_SIG: &str = "Repay(address,uint256)";
const LENDING_AMOUNT_DECIMALS: u32 = 18;

enum EventKind {
    Deposit,
    Withdraw,
    Borrow,
    Repay,
}

fn topic0(sig: &str) -> String {
    format!("0x{}", alloy_primitives::hex::encode(alloy_primitives::keccak256(sig.as_bytes())))
}

fn classify(log: &Log) -> Option<EventKind> {
    let t0 = log.topics.first()?.to_lowercase();
    if t0 == topic0(DEPOSIT_SIG) {
        Some(EventKind::Deposit)
    } else if t0 == topic0(WITHDRAW_SIG) {
        Some(EventKind::Withdraw)
    } else if t0 == topic0(BORROW_SIG) {
        Some(EventKind::Borrow)
    } else if t0 == topic0(REPAY_SIG) {
        Some(EventKind::Repay)
    } else {
        None
    }
}

fn scaled_amount(word: [u8; 32]) -> BigDecimal {
    let raw = alloy_primitives::U256::from_be_bytes(word);
    let raw_decimal = BigDecimal::from_str(&raw.to_string()).unwrap_or_default();
    let divisor = BigDecimal::from_str(&format!("1{}", "0".repeat(LENDING_AMOUNT_DECIMALS as usize)))
        .expect("constant divisor parses");
    raw_decimal / divisor
}

#[derive(Clone, Debug, Serialize)]
pub struct LendingPosition {
    pub current_supply: BigDecimal,
    pub current_borrow: BigDecimal,
    pub total_deposited: BigDecimal,
    pub total_withdrawn: BigDecimal,
    pub total_borrowed: BigDecimal,
    pub total_repaid: BigDecimal,
    pub deposit_count: i64,
    pub withdraw_count: i64,
    pub borrow_count: i64,
    pub repay_count: i64,
}

impl Default for LendingPosition {
    fn default() -> Self {
        Self {
            current_supply: BigDecimal::from(0),
            current_borrow: BigDecimal::from(0),
            total_deposited: BigDecimal::from(0),
            total_withdrawn: BigDecimal::from(0),
            total_borrowed: BigDecimal::from(0),
            total_repaid: BigDecimal::from(0),
            deposit_count: 0,
            withdraw_count: 0,
            borrow_count: 0,
            repay_count: 0,
        }
    }
}

/// Replays deposit/withdraw/borrow/repay events for `wallet` across every
/// contract tagged `lending`, yielding current supply/borrow as
/// `deposits − withdrawals` / `borrows − repayments` plus lifetime totals.
pub async fn lending_position(pool: &PgPool, wallet: &Address) -> Result<LendingPosition, Error> {
    let rows = sqlx::query(
        "SELECT te.logs FROM transaction_details td
         JOIN contracts c ON c.address = td.contract_address
         JOIN contract_platforms cp ON cp.contract_id = c.id
         JOIN platforms p ON p.id = cp.platform_id
         JOIN transaction_enrichment te ON te.tx_hash = td.tx_hash
         WHERE p.slug = 'lending' AND td.wallet_address = $1 AND td.status = 1",
    )
    .bind(wallet.as_lowercase())
    .fetch_all(pool)
    .await?;

    let mut position = LendingPosition::default();
    for row in rows {
        let logs_json: Option<serde_json::Value> = row.try_get("logs")?;
        let logs: Vec<Log> = logs_json.and_then(|v| serde_json::from_value(v).ok()).unwrap_or_default();
        for log in &logs {
            let Some(kind) = classify(log) else { continue };
            let Ok(word) = abi::decode_word_at(&log.data, 0) else { continue };
            let amount = scaled_amount(word);
            match kind {
                EventKind::Deposit => {
                    position.total_deposited += amount;
                    position.deposit_count += 1;
                }
                EventKind::Withdraw => {
                    position.total_withdrawn += amount;
                    position.withdraw_count += 1;
                }
                EventKind::Borrow => {
                    position.total_borrowed += amount;
                    position.borrow_count += 1;
                }
                EventKind::Repay => {
                    position.total_repaid += amount;
                    position.repay_count += 1;
                }
            }
        }
    }
    position.current_supply = &position.total_deposited - &position.total_withdrawn;
    position.current_borrow = &position.total_borrowed - &position.total_repaid;
    Ok(position)
}
