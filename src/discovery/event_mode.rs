use sqlx::PgPool;
use tracing::{info, warn};

use crate::db;
use crate::domain::Contract;
use crate::rpc::RpcClientPool;

use super::common::materialize_batch;
use super::window::WindowSizer;
use super::{DiscoveryStats, Error};

/// Event-mode discovery: `eth_getLogs` over a rolling,
/// adaptive block window, for contracts where only event-driven
/// transactions matter (`fetch_transactions = false`).
pub async fn run(
    pool: &PgPool,
    rpc: &RpcClientPool,
    contract: &Contract,
    from_block: u64,
    head: u64,
) -> Result<DiscoveryStats, Error> {
    let start = std::time::Instant::now();
    let mut sizer = WindowSizer::new();
    let mut cursor = from_block;
    let mut txs_added = 0u64;

    while cursor <= head {
        let to_block = (cursor + sizer.size() - 1).min(head);
        let logs = match rpc.get_logs(&contract.address.as_lowercase(), cursor, to_block).await {
            Ok(logs) => logs,
            Err(e) => {
                let e = Error::from(e);
                if e.is_too_many_results() {
                    sizer.on_too_many_results();
                    warn!(contract = %contract.address, window = sizer.size(), "eth_getLogs window too large, halving");
                    continue;
                }
                return Err(e);
            }
        };

        let mut hashes: Vec<String> = Vec::new();
        for log in logs.iter().filter(|l| !l.removed) {
            if !hashes.contains(&log.transaction_hash) {
                hashes.push(log.transaction_hash.clone());
            }
        }

        let details = materialize_batch(rpc, &contract.address, &hashes).await?;
        let added = db::transactions::insert_details_batch(pool, &details).await?;
        txs_added += added;

        db::contracts::record_discovery_window(pool, contract.id, cursor as i64, to_block as i64).await?;
        db::contracts::set_indexed_through_block(pool, contract.id, to_block as i64).await?;

        sizer.on_success();
        cursor = to_block + 1;
    }

    let duration = start.elapsed();
    info!(
        contract = %contract.address,
        txs_added,
        duration_ms = duration.as_millis(),
        "event-mode discovery pass complete"
    );
    Ok(DiscoveryStats { txs_added, duration })
}
