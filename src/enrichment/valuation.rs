use std::str::FromStr;

use alloy_primitives::Address as AlloyAddress;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};

use crate::abi;
use crate::domain::{Address, Log, TransactionDetail};
use crate::oracle::PriceOracle;

use super::Error;

const STABLECOIN_DECIMALS: u32 = 6;
const DEFAULT_TOKEN_DECIMALS: u32 = 18;
const WEI_DECIMALS: u32 = 18;

/// Sentinel used to look up the native coin's price from the oracle, which
/// only knows ERC-20 token addresses otherwise.
fn native_token() -> Address {
    Address::from(AlloyAddress::ZERO)
}

fn scale_down(raw_decimal: &str, decimals: u32) -> BigDecimal {
    let value = BigDecimal::from_str(raw_decimal).unwrap_or_default();
    let divisor =
        BigDecimal::from_str(&format!("1{}", "0".repeat(decimals as usize))).expect("constant divisor parses");
    value / divisor
}

/// First strategy: sum every decoded `Transfer` whose
/// token is a configured stablecoin. Assumes 6-decimal stablecoins
/// (USDC/USDT, the common case on most chains this crate targets) — a
/// chain whose stablecoin uses 18 decimals would need a per-token decimals
/// table this crate doesn't carry.
fn stablecoin_leg_sum(stablecoins: &[Address], logs: &[Log]) -> Option<BigDecimal> {
    let mut total = BigDecimal::from(0);
    let mut matched = false;
    for log in logs {
        let Some(transfer) = abi::decode_transfer_log(log) else { continue };
        if !stablecoins.iter().any(|s| *s == transfer.token) {
            continue;
        }
        total += scale_down(&transfer.amount.to_string(), STABLECOIN_DECIMALS);
        matched = true;
    }
    matched.then_some(total)
}

/// Second strategy: price the first non-stablecoin outgoing `Transfer` leg
/// at the oracle's rate for `block_timestamp`. A `NotFound` from the oracle
/// just means this leg can't be priced, not that enrichment failed — the
/// caller falls through to the next strategy.
async fn token_out_leg_via_oracle(
    oracle: &dyn PriceOracle,
    wallet: Address,
    stablecoins: &[Address],
    logs: &[Log],
    block_timestamp: DateTime<Utc>,
) -> Result<Option<BigDecimal>, Error> {
    for log in logs {
        let Some(transfer) = abi::decode_transfer_log(log) else { continue };
        if transfer.from != wallet || stablecoins.iter().any(|s| *s == transfer.token) {
            continue;
        }
        match oracle.price_of(transfer.token, block_timestamp).await {
            Ok(price) => {
                let amount = scale_down(&transfer.amount.to_string(), DEFAULT_TOKEN_DECIMALS);
                return Ok(Some(amount * price));
            }
            Err(crate::oracle::Error::NotFound) => continue,
            Err(e) => return Err(Error::Oracle(e)),
        }
    }
    Ok(None)
}

/// Third (final) strategy: the raw transaction value priced at its block's
/// timestamp.
async fn eth_value_fallback(oracle: &dyn PriceOracle, detail: &TransactionDetail) -> Result<Option<BigDecimal>, Error> {
    match oracle.price_of(native_token(), detail.block_timestamp).await {
        Ok(price) => Ok(Some(scale_down(&detail.eth_value.to_string(), WEI_DECIMALS) * price)),
        Err(crate::oracle::Error::NotFound) => Ok(None),
        Err(e) => Err(Error::Oracle(e)),
    }
}

/// USD valuation fallback chain: stablecoin transfer
/// sum, then a priced non-stablecoin token-out leg, then the raw
/// transaction value priced at the block timestamp. `None` only when every
/// strategy has nothing to price (e.g. no relevant logs and the oracle has
/// no price for that hour), never an error for that case alone.
pub async fn compute_usd_value(
    oracle: &dyn PriceOracle,
    stablecoins: &[Address],
    detail: &TransactionDetail,
    logs: &[Log],
) -> Result<Option<BigDecimal>, Error> {
    if let Some(v) = stablecoin_leg_sum(stablecoins, logs) {
        return Ok(Some(v));
    }
    if let Some(v) =
        token_out_leg_via_oracle(oracle, detail.wallet_address, stablecoins, logs, detail.block_timestamp).await?
    {
        return Ok(Some(v));
    }
    eth_value_fallback(oracle, detail).await
}

/// Re-expresses the computed USD value in native-coin terms at the same
/// block's price. Can legitimately exceed `details.eth_value` when the USD
/// value came from a logged token flow larger than the outer transaction's
/// value (spec.md §3: "may exceed `details.eth_value` when value is
/// conveyed via internal transfers or token flows").
pub async fn derive_eth_value(
    oracle: &dyn PriceOracle,
    usd_value: Option<&BigDecimal>,
    block_timestamp: DateTime<Utc>,
) -> Result<Option<BigDecimal>, Error> {
    let Some(usd) = usd_value else { return Ok(None) };
    match oracle.price_of(native_token(), block_timestamp).await {
        Ok(price) if price > BigDecimal::from(0) => Ok(Some(usd / price)),
        Ok(_) => Ok(None),
        Err(crate::oracle::Error::NotFound) => Ok(None),
        Err(e) => Err(Error::Oracle(e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn addr(n: u8) -> Address {
        Address::parse(&format!("0x{:040x}", n)).unwrap()
    }

    fn topic_for(addr: Address) -> String {
        format!("0x{:0>64}", &addr.as_lowercase()[2..])
    }

    fn transfer_log(token: Address, from: Address, to: Address, amount: u64) -> Log {
        Log {
            index: 0,
            address: token,
            topics: vec![abi::transfer_topic0().to_string(), topic_for(from), topic_for(to)],
            data: format!("0x{amount:064x}"),
        }
    }

    struct StubOracle {
        prices: Mutex<std::collections::HashMap<Address, BigDecimal>>,
    }

    #[async_trait]
    impl PriceOracle for StubOracle {
        async fn price_of(&self, token: Address, _at: DateTime<Utc>) -> Result<BigDecimal, crate::oracle::Error> {
            self.prices
                .lock()
                .unwrap()
                .get(&token)
                .cloned()
                .ok_or(crate::oracle::Error::NotFound)
        }
    }

    #[tokio::test]
    async fn stablecoin_leg_wins_over_other_strategies() {
        let stablecoin = addr(0xAA);
        let wallet = addr(0x11);
        let logs = vec![transfer_log(stablecoin, wallet, addr(0x22), 50_000_000)];
        let detail = TransactionDetail {
            tx_hash: "0xabc".into(),
            contract_address: addr(0x99),
            wallet_address: wallet,
            block_number: 1,
            block_timestamp: Utc::now(),
            status: 1,
            eth_value: BigDecimal::from(0),
            input_selector: None,
            gas_used: 21_000,
        };
        let oracle = StubOracle { prices: Mutex::new(Default::default()) };
        let value = compute_usd_value(&oracle, &[stablecoin], &detail, &logs).await.unwrap();
        assert_eq!(value, Some(BigDecimal::from_str("50").unwrap()));
    }

    #[tokio::test]
    async fn falls_back_to_eth_value_when_no_logs_match() {
        let wallet = addr(0x11);
        let detail = TransactionDetail {
            tx_hash: "0xabc".into(),
            contract_address: addr(0x99),
            wallet_address: wallet,
            block_number: 1,
            block_timestamp: Utc::now(),
            status: 1,
            eth_value: BigDecimal::from_str("1000000000000000000").unwrap(),
            input_selector: None,
            gas_used: 21_000,
        };
        let mut prices = std::collections::HashMap::new();
        prices.insert(native_token(), BigDecimal::from_str("300").unwrap());
        let oracle = StubOracle { prices: Mutex::new(prices) };
        let value = compute_usd_value(&oracle, &[], &detail, &[]).await.unwrap();
        assert_eq!(value, Some(BigDecimal::from_str("300").unwrap()));
    }

    #[tokio::test]
    async fn no_strategy_priced_yields_none() {
        let wallet = addr(0x11);
        let detail = TransactionDetail {
            tx_hash: "0xabc".into(),
            contract_address: addr(0x99),
            wallet_address: wallet,
            block_number: 1,
            block_timestamp: Utc::now(),
            status: 1,
            eth_value: BigDecimal::from(0),
            input_selector: None,
            gas_used: 21_000,
        };
        let oracle = StubOracle { prices: Mutex::new(Default::default()) };
        let value = compute_usd_value(&oracle, &[], &detail, &[]).await.unwrap();
        assert_eq!(value, None);
    }
}
