use sqlx::PgPool;
use tracing::info;

use crate::db;
use crate::domain::Contract;
use crate::rpc::RpcClientPool;
use crate::scanner::ScannerClient;

use super::common::materialize_batch;
use super::{DiscoveryStats, Error};

const PAGE_SIZE: u32 = 100;
/// Safety backstop so a scanner that never reports a caught-up page
/// can't wedge a discovery pass forever; the next scheduled pass resumes
/// from the persisted cursor.
const MAX_PAGES_PER_PASS: usize = 500;

/// Full-tx-mode discovery: scanner pagination over
/// transactions addressed to the contract, for `fetch_transactions = true`
/// contracts. Pagination is opaque; the scanner's `nextToken` is persisted
/// verbatim as the resume cursor.
pub async fn run(
    pool: &PgPool,
    rpc: &RpcClientPool,
    scanner: &ScannerClient,
    contract: &Contract,
) -> Result<DiscoveryStats, Error> {
    let start = std::time::Instant::now();
    let mut cursor = db::contracts::scanner_cursor(pool, contract.id).await?;
    let mut txs_added = 0u64;
    let mut max_block_seen: i64 = db::contracts::indexed_through_block(pool, contract.id).await?;

    for _ in 0..MAX_PAGES_PER_PASS {
        let page = scanner
            .list_transactions(&contract.address.as_lowercase(), cursor.as_deref(), PAGE_SIZE)
            .await?;

        let details = materialize_batch(rpc, &contract.address, &page.tx_hashes).await?;
        let added = db::transactions::insert_details_batch(pool, &details).await?;
        txs_added += added;
        max_block_seen = details.iter().map(|d| d.block_number).fold(max_block_seen, i64::max);

        db::contracts::set_scanner_cursor(pool, contract.id, page.next_token.as_deref()).await?;
        cursor = page.next_token;
        if cursor.is_none() {
            break;
        }
    }

    db::contracts::set_indexed_through_block(pool, contract.id, max_block_seen).await?;

    let duration = start.elapsed();
    info!(
        contract = %contract.address,
        txs_added,
        duration_ms = duration.as_millis(),
        "full-tx-mode discovery pass complete"
    );
    Ok(DiscoveryStats { txs_added, duration })
}
