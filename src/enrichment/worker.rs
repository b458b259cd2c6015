//! Realtime enrichment worker: single instance, 30s
//! poll, batches `transaction_details` rows from the last 5 minutes that
//! still lack a `transaction_enrichment` row.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::db;
use crate::domain::Address;
use crate::oracle::PriceOracle;
use crate::rpc::RpcClientPool;

use super::Error;

const POLL_INTERVAL: Duration = Duration::from_secs(30);
const REALTIME_WINDOW: chrono::Duration = chrono::Duration::minutes(5);
const CANDIDATE_LIMIT: i64 = 500;

/// Single fixed key for the `pg_try_advisory_lock` guarding this worker —
/// there is exactly one logical lock to take, no per-resource keying needed
/// (spec.md §5: "at most one realtime worker instance may be active").
const ADVISORY_LOCK_KEY: i64 = 0x6368_6169_6e64_7830;

/// Runs the realtime enrichment loop until `cancel` fires, draining its
/// in-flight batch before returning. Returns immediately, without polling
/// at all, if another instance already holds the advisory lock.
pub async fn run(
    pool: PgPool,
    rpc: Arc<RpcClientPool>,
    oracle: Arc<dyn PriceOracle>,
    stablecoins: Vec<Address>,
    cancel: CancellationToken,
) -> Result<(), Error> {
    let mut conn = pool.acquire().await?;
    let acquired: bool = sqlx::query_scalar("SELECT pg_try_advisory_lock($1)")
        .bind(ADVISORY_LOCK_KEY)
        .fetch_one(&mut *conn)
        .await?;
    if !acquired {
        info!("realtime enrichment worker already running elsewhere, exiting");
        return Ok(());
    }

    info!("realtime enrichment worker started");
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                info!("realtime enrichment worker draining in-flight batch before shutdown");
                if let Err(e) = poll_once(&pool, &rpc, oracle.as_ref(), &stablecoins).await {
                    warn!(error = %e, "final enrichment pass before shutdown failed");
                }
                break;
            }

            _ = tokio::time::sleep(POLL_INTERVAL) => {
                if let Err(e) = poll_once(&pool, &rpc, oracle.as_ref(), &stablecoins).await {
                    warn!(error = %e, "realtime enrichment pass failed, retrying next tick");
                }
            }
        }
    }

    sqlx::query("SELECT pg_advisory_unlock($1)")
        .bind(ADVISORY_LOCK_KEY)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

async fn poll_once(
    pool: &PgPool,
    rpc: &RpcClientPool,
    oracle: &dyn PriceOracle,
    stablecoins: &[Address],
) -> Result<(), Error> {
    let since = chrono::Utc::now() - REALTIME_WINDOW;
    let candidates = db::transactions::enrichment_candidates(pool, since, CANDIDATE_LIMIT).await?;
    if candidates.is_empty() {
        return Ok(());
    }

    let mut by_contract: BTreeMap<Address, Vec<_>> = BTreeMap::new();
    for detail in candidates {
        by_contract.entry(detail.contract_address).or_default().push(detail);
    }

    let mut total = 0usize;
    for (contract, details) in by_contract {
        match super::enrich_batch(pool, rpc, oracle, stablecoins, &details).await {
            Ok(n) => total += n,
            Err(e) => warn!(%contract, error = %e, "enrichment batch failed for contract"),
        }
    }
    info!(enriched = total, "realtime enrichment pass complete");
    Ok(())
}
