use std::sync::Arc;
use std::time::Duration;

use moka::sync::Cache;
use sqlx::PgPool;

use crate::domain::Address;
use crate::oracle::PriceOracle;
use crate::rpc::RpcClientPool;
use crate::scanner::ScannerClient;

/// Minimum spacing between two force-refresh requests for the same wallet
/// ("the core enforces a minimum 30s cooldown per wallet to
/// avoid amplification"). There is no materialized dashboard cache to
/// invalidate in this core — every read already hits Postgres live — so the
/// cooldown gates repeat `?refresh=true` calls themselves rather than a
/// cache entry.
const REFRESH_COOLDOWN: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub rpc: Arc<RpcClientPool>,
    pub scanner: Option<Arc<ScannerClient>>,
    pub oracle: Arc<dyn PriceOracle>,
    refresh_cooldown: Cache<Address, ()>,
}

impl AppState {
    pub fn new(
        pool: PgPool,
        rpc: Arc<RpcClientPool>,
        scanner: Option<Arc<ScannerClient>>,
        oracle: Arc<dyn PriceOracle>,
    ) -> Self {
        Self {
            pool,
            rpc,
            scanner,
            oracle,
            refresh_cooldown: Cache::builder().time_to_live(REFRESH_COOLDOWN).build(),
        }
    }

    /// Returns `true` and starts a fresh cooldown window if `wallet` is not
    /// already within one; `false` if a force refresh for this wallet
    /// happened less than [`REFRESH_COOLDOWN`] ago.
    pub fn try_begin_refresh(&self, wallet: &Address) -> bool {
        if self.refresh_cooldown.contains_key(wallet) {
            return false;
        }
        self.refresh_cooldown.insert(*wallet, ());
        true
    }
}
