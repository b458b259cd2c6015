use serde_json::json;
use sqlx::PgPool;

use crate::db;
use crate::domain::{Job, JobStatus, JobType};

use super::Error;

const DEFAULT_MAX_ATTEMPTS: i32 = 5;

/// Typed enqueue helpers over `db::jobs`, one per job shape, so callers
/// never hand-build a payload whose shape the executor doesn't expect.
/// Returns `None` when a matching job is already pending/processing (the
/// dedup constraint suppressed the insert).
pub async fn enqueue_discover(pool: &PgPool, contract_id: i64, priority: i16) -> Result<Option<Job>, Error> {
    let new = db::jobs::NewJob {
        job_type: JobType::Discover,
        contract_id: Some(contract_id),
        priority,
        payload: json!({}),
        max_attempts: DEFAULT_MAX_ATTEMPTS,
    };
    Ok(db::jobs::enqueue(pool, new).await?)
}

pub async fn enqueue_backfill(
    pool: &PgPool,
    contract_id: i64,
    from_block: i64,
    to_block: i64,
    from_date: Option<String>,
    to_date: Option<String>,
    priority: i16,
) -> Result<Option<Job>, Error> {
    let new = db::jobs::NewJob {
        job_type: JobType::Backfill,
        contract_id: Some(contract_id),
        priority,
        payload: json!({
            "fromBlock": from_block,
            "toBlock": to_block,
            "fromDate": from_date,
            "toDate": to_date,
        }),
        max_attempts: DEFAULT_MAX_ATTEMPTS,
    };
    Ok(db::jobs::enqueue(pool, new).await?)
}

pub async fn enqueue_enrich(
    pool: &PgPool,
    contract_id: Option<i64>,
    tx_hashes: Vec<String>,
    priority: i16,
) -> Result<Option<Job>, Error> {
    let new = db::jobs::NewJob {
        job_type: JobType::Enrich,
        contract_id,
        priority,
        payload: json!({ "txHashes": tx_hashes }),
        max_attempts: DEFAULT_MAX_ATTEMPTS,
    };
    Ok(db::jobs::enqueue(pool, new).await?)
}

pub async fn get(pool: &PgPool, id: i64) -> Result<Option<Job>, Error> {
    Ok(db::jobs::get(pool, id).await?)
}

pub async fn list(pool: &PgPool, status: Option<JobStatus>, limit: i64) -> Result<Vec<Job>, Error> {
    Ok(db::jobs::list(pool, status, limit).await?)
}

/// Admin cancel: valid only in `pending`/`failed`.
pub async fn cancel(pool: &PgPool, id: i64) -> Result<Job, Error> {
    let job = db::jobs::get(pool, id).await?.ok_or(crate::db::Error::NotFound)?;
    if !matches!(job.status, JobStatus::Pending | JobStatus::Failed) {
        return Err(crate::db::Error::NotFound.into());
    }
    db::jobs::cancel(pool, id).await?;
    Ok(db::jobs::get(pool, id).await?.ok_or(crate::db::Error::NotFound)?)
}

/// Admin retry: valid only in `failed`.
pub async fn retry(pool: &PgPool, id: i64) -> Result<Job, Error> {
    let job = db::jobs::get(pool, id).await?.ok_or(crate::db::Error::NotFound)?;
    if job.status != JobStatus::Failed {
        return Err(crate::db::Error::NotFound.into());
    }
    db::jobs::retry(pool, id).await?;
    Ok(db::jobs::get(pool, id).await?.ok_or(crate::db::Error::NotFound)?)
}
