//! Discovery scheduling: one instance per indexable contract, scheduled
//! via the queue. This worker never talks to RPC or the scanner directly;
//! it periodically enqueues one `discover`
//! job per enabled contract and lets [`crate::queue::Dispatcher`] execute
//! the actual pass. Re-enqueuing a contract whose previous pass is still
//! `pending`/`processing` is a no-op — the job queue's dedup constraint
//! absorbs it.

use std::time::Duration;

use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::db;

use super::Error;

const SCHEDULE_INTERVAL: Duration = Duration::from_secs(30);
const DEFAULT_PRIORITY: i16 = 5;

/// Runs the scheduling loop until `cancel` fires.
pub async fn run(pool: PgPool, cancel: CancellationToken) -> Result<(), Error> {
    info!("discovery scheduler started");
    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                info!("discovery scheduler shutting down");
                break;
            }

            _ = tokio::time::sleep(SCHEDULE_INTERVAL) => {
                if let Err(e) = schedule_once(&pool).await {
                    warn!(error = %e, "discovery scheduling pass failed");
                }
            }
        }
    }
    Ok(())
}

async fn schedule_once(pool: &PgPool) -> Result<(), Error> {
    let contracts = db::contracts::list_enabled(pool).await?;
    let mut scheduled = 0u32;
    for contract in contracts {
        match crate::queue::enqueue_discover(pool, contract.id, DEFAULT_PRIORITY).await {
            Ok(Some(_)) => scheduled += 1,
            Ok(None) => {}
            Err(e) => warn!(contract = %contract.address, error = %e, "failed to enqueue discover job"),
        }
    }
    if scheduled > 0 {
        info!(scheduled, "discovery scheduling pass enqueued jobs");
    }
    Ok(())
}
