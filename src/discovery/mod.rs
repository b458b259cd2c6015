//! Contract-driven transaction discovery and backfill.
//!
//! Two execution modes share one idempotent write path
//! ([`common::materialize_batch`] + `db::transactions::insert_details_batch`):
//! [`event_mode`] walks `eth_getLogs` windows for event-only contracts,
//! [`fulltx_mode`] pages the scanner API for full-tx contracts. [`worker`]
//! schedules both across all enabled contracts.

mod common;
mod error;
mod event_mode;
mod fulltx_mode;
pub mod worker;
mod window;

pub use error::Error;
pub use window::WindowSizer;

use std::time::Duration;

use sqlx::PgPool;

use crate::domain::Contract;
use crate::rpc::RpcClientPool;
use crate::scanner::ScannerClient;

/// Re-ingest this many blocks behind the last watermark on every pass, to
/// idempotently heal short reorgs ("resumes from that block
/// minus a small reorg safety margin").
pub const REORG_SAFETY_MARGIN: u64 = 16;

#[derive(Clone, Copy, Debug, Default)]
pub struct DiscoveryStats {
    pub txs_added: u64,
    pub duration: Duration,
}

impl DiscoveryStats {
    pub fn txs_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs <= 0.0 {
            0.0
        } else {
            self.txs_added as f64 / secs
        }
    }
}

/// Runs one discovery pass for `contract`, from its resumed watermark
/// through `head`, using the mode its `fetch_transactions` flag selects.
pub async fn run_contract_discovery(
    pool: &PgPool,
    rpc: &RpcClientPool,
    scanner: Option<&ScannerClient>,
    contract: &Contract,
    head: u64,
) -> Result<DiscoveryStats, Error> {
    if contract.fetch_transactions {
        let scanner = scanner.ok_or_else(|| {
            Error::Malformed("contract requires fetch_transactions mode but no scanner is configured".into())
        })?;
        fulltx_mode::run(pool, rpc, scanner, contract).await
    } else {
        let watermark = db::indexed_through_block_or_deploy(pool, contract).await?;
        let from_block = watermark.saturating_sub(REORG_SAFETY_MARGIN);
        if from_block > head {
            return Ok(DiscoveryStats::default());
        }
        event_mode::run(pool, rpc, contract, from_block, head).await
    }
}

/// Runs an explicit-range backfill (`job_type = 'backfill'`, payload
/// `{contractId, fromBlock, toBlock}`). Always uses the `eth_getLogs`
/// window walker: a backfill names an exact block range, and logs-by-
/// address is the one discovery path that accepts one.
pub async fn run_backfill(
    pool: &PgPool,
    rpc: &RpcClientPool,
    contract: &Contract,
    from_block: u64,
    to_block: u64,
) -> Result<DiscoveryStats, Error> {
    event_mode::run(pool, rpc, contract, from_block, to_block).await
}

mod db {
    use sqlx::PgPool;

    use crate::domain::Contract;

    use super::Error;

    pub async fn indexed_through_block_or_deploy(pool: &PgPool, contract: &Contract) -> Result<u64, Error> {
        let watermark = crate::db::contracts::indexed_through_block(pool, contract.id).await?;
        Ok(if watermark > 0 { watermark as u64 } else { contract.deploy_block.max(0) as u64 })
    }
}
