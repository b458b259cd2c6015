//! Periodic gap scan: closes two independent classes of
//! history holes that realtime discovery/enrichment never revisit —
//! un-queried block ranges per contract, and old transaction rows that
//! never got an enrichment row. Both are surfaced as queued jobs rather
//! than executed inline, so a single gap-fill pass stays cheap and the
//! actual work is load-balanced across dispatcher workers like any other
//! job.

use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::domain::JobType;
use crate::rpc::RpcClientPool;
use crate::{db, queue};

use super::{intervals, Error};

const SCAN_INTERVAL: Duration = Duration::from_secs(300);
const BACKFILL_PRIORITY: i16 = 2;
const ENRICH_PRIORITY: i16 = 3;
const ENRICH_BATCH_SIZE: i64 = 200;
const ENRICHMENT_MIN_AGE: chrono::Duration = chrono::Duration::minutes(5);

/// Gap-fill stops enqueuing `enrich` jobs once the pending queue is this
/// deep, so a slow backlog of old transactions never starves realtime
/// enrichment of worker capacity.
const ENRICH_HIGH_WATER_MARK: i64 = 5_000;

/// Runs the periodic scan loop until `cancel` fires. In `dry_run` mode gaps
/// are only logged, never enqueued — used by the admin-facing "what would
/// gap-fill do" check.
pub async fn run(
    pool: PgPool,
    rpc: RpcClientPool,
    cancel: CancellationToken,
    dry_run: bool,
) -> Result<(), Error> {
    info!(dry_run, "gap-fill worker started");
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                info!("gap-fill worker shutting down");
                break;
            }

            _ = tokio::time::sleep(SCAN_INTERVAL) => {
                if let Err(e) = scan_once(&pool, &rpc, dry_run).await {
                    warn!(error = %e, "gap-fill scan pass failed");
                }
            }
        }
    }
    Ok(())
}

async fn scan_once(pool: &PgPool, rpc: &RpcClientPool, dry_run: bool) -> Result<(), Error> {
    fill_discovery_gaps(pool, rpc, dry_run).await?;
    fill_enrichment_gaps(pool, dry_run).await?;
    Ok(())
}

async fn fill_discovery_gaps(pool: &PgPool, rpc: &RpcClientPool, dry_run: bool) -> Result<(), Error> {
    let head = rpc.block_number().await?;
    let contracts = db::contracts::list_enabled(pool).await?;
    let mut gaps_found = 0u32;
    let mut jobs_enqueued = 0u32;

    for contract in contracts {
        if !contract.fetch_transactions {
            continue;
        }
        let queried = db::contracts::discovery_windows(pool, contract.id).await?;
        let gaps = intervals::missing_ranges(contract.deploy_block as u64, head, &queried);
        if gaps.is_empty() {
            continue;
        }
        gaps_found += gaps.len() as u32;
        for (from, to) in gaps {
            if dry_run {
                info!(contract = %contract.address, from, to, "dry-run: would enqueue backfill");
                continue;
            }
            match queue::enqueue_backfill(pool, contract.id, from as i64, to as i64, None, None, BACKFILL_PRIORITY).await {
                Ok(Some(_)) => jobs_enqueued += 1,
                Ok(None) => {}
                Err(e) => warn!(contract = %contract.address, from, to, error = %e, "failed to enqueue backfill gap"),
            }
        }
    }
    if gaps_found > 0 {
        info!(gaps_found, jobs_enqueued, dry_run, "discovery gap scan complete");
    }
    Ok(())
}

async fn fill_enrichment_gaps(pool: &PgPool, dry_run: bool) -> Result<(), Error> {
    let pending = db::jobs::count_pending(pool, JobType::Enrich).await?;
    if pending >= ENRICH_HIGH_WATER_MARK {
        info!(pending, "enrichment gap scan skipped: queue above high-water mark");
        return Ok(());
    }

    let before = Utc::now() - ENRICHMENT_MIN_AGE;
    let details = db::transactions::enrichment_gaps(pool, before, ENRICH_BATCH_SIZE).await?;
    if details.is_empty() {
        return Ok(());
    }

    use std::collections::HashMap;
    let mut by_contract: HashMap<String, (Option<i64>, Vec<String>)> = HashMap::new();
    for detail in details {
        let contract = db::contracts::get_by_address(pool, &detail.contract_address).await?;
        let entry = by_contract
            .entry(detail.contract_address.to_string())
            .or_insert_with(|| (contract.map(|c| c.id), Vec::new()));
        entry.1.push(detail.tx_hash);
    }

    let mut jobs_enqueued = 0u32;
    let mut txs = 0u32;
    for (_, (contract_id, tx_hashes)) in by_contract {
        txs += tx_hashes.len() as u32;
        if dry_run {
            info!(contract_id = ?contract_id, count = tx_hashes.len(), "dry-run: would enqueue enrich");
            continue;
        }
        match queue::enqueue_enrich(pool, contract_id, tx_hashes, ENRICH_PRIORITY).await {
            Ok(Some(_)) => jobs_enqueued += 1,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "failed to enqueue enrich gap"),
        }
    }
    info!(txs, jobs_enqueued, dry_run, "enrichment gap scan complete");
    Ok(())
}
