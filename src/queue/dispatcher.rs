//! Leases jobs of all three kinds and executes the work each one names,
//! translating discovery/enrichment outcomes into `complete`/`fail` calls
//!. One [`Dispatcher`] is constructed per process; `run`
//! spawns `concurrency` worker loops plus a janitor sweep for stuck leases.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use sqlx::PgPool;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::db;
use crate::discovery;
use crate::domain::{Address, Job, JobType};
use crate::enrichment;
use crate::oracle::PriceOracle;
use crate::rpc::RpcClientPool;
use crate::scanner::ScannerClient;

use super::Error;

const POLL_INTERVAL: Duration = Duration::from_millis(500);
const JANITOR_INTERVAL: Duration = Duration::from_secs(60);
/// A lease older than this with no heartbeat is assumed abandoned by a
/// crashed worker ("stuck processing jobs ... reclaimed").
const MAX_LEASE_DURATION: chrono::Duration = chrono::Duration::minutes(15);
const JOB_TYPES: [JobType; 3] = [JobType::Discover, JobType::Backfill, JobType::Enrich];

#[derive(Clone)]
pub struct Dispatcher {
    pool: PgPool,
    rpc: Arc<RpcClientPool>,
    scanner: Option<Arc<ScannerClient>>,
    oracle: Arc<dyn PriceOracle>,
    stablecoins: Arc<[Address]>,
}

impl Dispatcher {
    pub fn new(
        pool: PgPool,
        rpc: Arc<RpcClientPool>,
        scanner: Option<Arc<ScannerClient>>,
        oracle: Arc<dyn PriceOracle>,
        stablecoins: Vec<Address>,
    ) -> Self {
        Self { pool, rpc, scanner, oracle, stablecoins: stablecoins.into() }
    }

    /// Runs `concurrency` worker loops and a janitor sweep until `cancel`
    /// fires; each loop drains whatever it is mid-executing before exiting.
    pub async fn run(self: Arc<Self>, concurrency: usize, cancel: CancellationToken) {
        let mut handles = Vec::with_capacity(concurrency + 1);

        for worker_id in 0..concurrency.max(1) {
            let this = self.clone();
            let cancel = cancel.clone();
            handles.push(tokio::spawn(async move { this.worker_loop(worker_id, cancel).await }));
        }

        let janitor = self.clone();
        let janitor_cancel = cancel.clone();
        handles.push(tokio::spawn(async move { janitor.janitor_loop(janitor_cancel).await }));

        cancel.cancelled().await;
        info!("dispatcher shutting down, waiting for in-flight work to drain");
        for h in handles {
            let _ = h.await;
        }
    }

    async fn worker_loop(&self, worker_id: usize, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                break;
            }
            match self.try_lease_and_execute().await {
                Ok(true) => continue,
                Ok(false) => {
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(POLL_INTERVAL) => {}
                    }
                }
                Err(e) => {
                    warn!(worker_id, error = %e, "dispatcher worker iteration failed");
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        _ = tokio::time::sleep(POLL_INTERVAL) => {}
                    }
                }
            }
        }
    }

    async fn janitor_loop(&self, cancel: CancellationToken) {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(JANITOR_INTERVAL) => {
                    let threshold = chrono::Utc::now() - MAX_LEASE_DURATION;
                    match db::jobs::reclaim_stuck(&self.pool, threshold).await {
                        Ok(0) => {}
                        Ok(n) => info!(reclaimed = n, "janitor reclaimed stuck job leases"),
                        Err(e) => warn!(error = %e, "janitor sweep failed"),
                    }
                }
            }
        }
    }

    /// Leases and runs one job of whichever type has work pending, trying
    /// each type in turn. Returns `Ok(true)` if a job ran (so the caller
    /// loops immediately instead of sleeping).
    async fn try_lease_and_execute(&self) -> Result<bool, Error> {
        for job_type in JOB_TYPES {
            let Some(job) = db::jobs::lease(&self.pool, job_type).await? else { continue };
            self.execute(&job).await;
            return Ok(true);
        }
        Ok(false)
    }

    async fn execute(&self, job: &Job) {
        let result = match job.job_type {
            JobType::Discover => self.execute_discover(job).await,
            JobType::Backfill => self.execute_backfill(job).await,
            JobType::Enrich => self.execute_enrich(job).await,
        };
        match result {
            Ok(()) => {
                if let Err(e) = db::jobs::complete(&self.pool, job.id).await {
                    warn!(job_id = job.id, error = %e, "failed to mark job completed");
                }
            }
            Err(e) => {
                warn!(job_id = job.id, job_type = ?job.job_type, error = %e, "job execution failed");
                if let Err(e) = db::jobs::fail(&self.pool, job.id, &e.to_string()).await {
                    warn!(job_id = job.id, error = %e, "failed to record job failure");
                }
            }
        }
    }

    async fn execute_discover(&self, job: &Job) -> Result<(), Error> {
        let contract_id = job.contract_id.ok_or(Error::MissingContract(job.id))?;
        let contract = db::contracts::get(&self.pool, contract_id).await?.ok_or(Error::MissingContract(job.id))?;
        let head = self.rpc.block_number().await.map_err(discovery::Error::from)?;
        let outcome = discovery::run_contract_discovery(
            &self.pool,
            &self.rpc,
            self.scanner.as_deref(),
            &contract,
            head,
        )
        .await;
        match outcome {
            Ok(stats) => {
                db::contracts::record_discovery_success(&self.pool, contract_id).await?;
                info!(contract = %contract.address, txs_added = stats.txs_added, "discover job completed");
                Ok(())
            }
            Err(e) => {
                let failures = db::contracts::record_discovery_failure(&self.pool, contract_id).await?;
                if failures >= 5 {
                    match crate::queue::enqueue_discover(&self.pool, contract_id, 1).await {
                        Ok(Some(job)) => {
                            warn!(contract = %contract.address, failures, job_id = job.id, "contract promoted to failed state, queued for human attention")
                        }
                        Ok(None) => {}
                        Err(e) => warn!(contract = %contract.address, error = %e, "failed to enqueue human-attention discover job"),
                    }
                }
                Err(Error::from(e))
            }
        }
    }

    async fn execute_backfill(&self, job: &Job) -> Result<(), Error> {
        #[derive(Deserialize)]
        struct Payload {
            #[serde(rename = "fromBlock")]
            from_block: i64,
            #[serde(rename = "toBlock")]
            to_block: i64,
        }
        let contract_id = job.contract_id.ok_or(Error::MissingContract(job.id))?;
        let contract = db::contracts::get(&self.pool, contract_id).await?.ok_or(Error::MissingContract(job.id))?;
        let payload: Payload = serde_json::from_value(job.payload.clone())
            .map_err(|e| Error::MalformedPayload(job.id, e.to_string()))?;
        discovery::run_backfill(&self.pool, &self.rpc, &contract, payload.from_block as u64, payload.to_block as u64)
            .await?;
        Ok(())
    }

    async fn execute_enrich(&self, job: &Job) -> Result<(), Error> {
        #[derive(Deserialize)]
        struct Payload {
            #[serde(rename = "txHashes")]
            tx_hashes: Vec<String>,
        }
        let payload: Payload = serde_json::from_value(job.payload.clone())
            .map_err(|e| Error::MalformedPayload(job.id, e.to_string()))?;
        let details = db::transactions::get_details_by_hashes(&self.pool, &payload.tx_hashes).await?;
        enrichment::enrich_batch(&self.pool, &self.rpc, self.oracle.as_ref(), &self.stablecoins, &details).await?;
        Ok(())
    }
}
