use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use sqlx::PgPool;
use sqlx::Row;

use crate::domain::{Job, JobStatus, JobType};

use super::Error;

fn row_to_job(row: sqlx::postgres::PgRow) -> Result<Job, Error> {
    Ok(Job {
        id: row.try_get("id")?,
        job_type: row.try_get("job_type")?,
        contract_id: row.try_get("contract_id")?,
        priority: row.try_get("priority")?,
        status: row.try_get("status")?,
        payload: row.try_get("payload")?,
        attempts: row.try_get("attempts")?,
        max_attempts: row.try_get("max_attempts")?,
        created_at: row.try_get("created_at")?,
        started_at: row.try_get("started_at")?,
        completed_at: row.try_get("completed_at")?,
        next_retry_at: row.try_get("next_retry_at")?,
        error_message: row.try_get("error_message")?,
    })
}

/// Deterministic dedup key: `job_type || contract_id || canonical payload`,
/// hashed so the partial unique index on `job_queue` stays narrow
/// ("never enqueue a duplicate of a pending/processing job").
pub fn fingerprint(job_type: JobType, contract_id: Option<i64>, payload: &serde_json::Value) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{job_type:?}").as_bytes());
    hasher.update(contract_id.map(|c| c.to_string()).unwrap_or_default().as_bytes());
    hasher.update(payload.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

pub struct NewJob {
    pub job_type: JobType,
    pub contract_id: Option<i64>,
    pub priority: i16,
    pub payload: serde_json::Value,
    pub max_attempts: i32,
}

/// Enqueues a job unless a pending/processing duplicate already exists
/// (enforced by `job_queue_dedupe_idx`). Returns `None` when the insert was
/// suppressed by the dedup constraint rather than an error.
pub async fn enqueue(pool: &PgPool, new: NewJob) -> Result<Option<Job>, Error> {
    let fp = fingerprint(new.job_type, new.contract_id, &new.payload);
    let row = sqlx::query(
        "INSERT INTO job_queue
            (job_type, contract_id, priority, status, payload, payload_fingerprint, attempts, max_attempts, created_at)
         VALUES ($1, $2, $3, 'pending', $4, $5, 0, $6, now())
         ON CONFLICT (job_type, contract_id, payload_fingerprint)
             WHERE status IN ('pending', 'processing')
         DO NOTHING
         RETURNING *",
    )
    .bind(new.job_type)
    .bind(new.contract_id)
    .bind(new.priority)
    .bind(&new.payload)
    .bind(&fp)
    .bind(new.max_attempts)
    .fetch_optional(pool)
    .await?;
    row.map(row_to_job).transpose()
}

/// Leases the highest-priority eligible job for a worker, skipping rows
/// locked by a concurrent leaser ("job queue row locks").
pub async fn lease(pool: &PgPool, job_type: JobType) -> Result<Option<Job>, Error> {
    let mut tx = pool.begin().await?;
    let row = sqlx::query(
        "SELECT * FROM job_queue
         WHERE job_type = $1
           AND status = 'pending'
           AND (next_retry_at IS NULL OR next_retry_at <= now())
         ORDER BY priority ASC, created_at ASC
         FOR UPDATE SKIP LOCKED
         LIMIT 1",
    )
    .bind(job_type)
    .fetch_optional(&mut *tx)
    .await?;
    let Some(row) = row else {
        tx.commit().await?;
        return Ok(None);
    };
    let id: i64 = row.try_get("id")?;
    let leased = sqlx::query(
        "UPDATE job_queue SET status = 'processing', started_at = now(), attempts = attempts + 1
         WHERE id = $1 RETURNING *",
    )
    .bind(id)
    .fetch_one(&mut *tx)
    .await?;
    tx.commit().await?;
    Ok(Some(row_to_job(leased)?))
}

pub async fn complete(pool: &PgPool, id: i64) -> Result<(), Error> {
    sqlx::query(
        "UPDATE job_queue SET status = 'completed', completed_at = now(), error_message = NULL
         WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Base-30s exponential backoff, capped at 30 minutes.
pub fn backoff_for(attempts: i32) -> std::time::Duration {
    let capped_exp = attempts.min(6) as u32;
    let secs = 30u64.saturating_mul(1u64 << capped_exp);
    std::time::Duration::from_secs(secs.min(1800))
}

/// Records a failed attempt. `attempts` was already stamped by `lease()` for
/// the try that just failed, so this only decides the resulting state: if
/// attempts remain, the job is returned to `pending` with a backoff-delayed
/// `next_retry_at`; otherwise it is marked terminally `failed`.
pub async fn fail(pool: &PgPool, id: i64, error_message: &str) -> Result<JobStatus, Error> {
    let mut tx = pool.begin().await?;
    let row = sqlx::query("SELECT attempts, max_attempts FROM job_queue WHERE id = $1 FOR UPDATE")
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;
    let attempts: i32 = row.try_get("attempts")?;
    let max_attempts: i32 = row.try_get("max_attempts")?;
    let status = if attempts >= max_attempts {
        sqlx::query(
            "UPDATE job_queue
             SET status = 'failed', error_message = $2, completed_at = now()
             WHERE id = $1",
        )
        .bind(id)
        .bind(error_message)
        .execute(&mut *tx)
        .await?;
        JobStatus::Failed
    } else {
        let delay = backoff_for(attempts);
        let next_retry_at: DateTime<Utc> = Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default();
        sqlx::query(
            "UPDATE job_queue
             SET status = 'pending', error_message = $2, next_retry_at = $3
             WHERE id = $1",
        )
        .bind(id)
        .bind(error_message)
        .bind(next_retry_at)
        .execute(&mut *tx)
        .await?;
        JobStatus::Pending
    };
    tx.commit().await?;
    Ok(status)
}

/// Admin cancellation. Represented as a terminal `failed` row with a marker
/// message rather than a distinct status, to preserve history without
/// widening the `JobStatus` enum.
pub async fn cancel(pool: &PgPool, id: i64) -> Result<(), Error> {
    sqlx::query(
        "UPDATE job_queue
         SET status = 'failed', error_message = 'cancelled by admin', completed_at = now()
         WHERE id = $1 AND status IN ('pending', 'failed')",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Resets a terminally failed job back to pending with a fresh attempt
/// budget, used by the admin retry endpoint.
pub async fn retry(pool: &PgPool, id: i64) -> Result<(), Error> {
    sqlx::query(
        "UPDATE job_queue
         SET status = 'pending', attempts = 0, error_message = NULL, next_retry_at = NULL
         WHERE id = $1 AND status = 'failed'",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Sweeps jobs stuck in `processing` past a staleness threshold (a worker
/// crashed mid-lease) back to `pending` so they are picked up again.
pub async fn reclaim_stuck(pool: &PgPool, older_than: DateTime<Utc>) -> Result<u64, Error> {
    let result = sqlx::query(
        "UPDATE job_queue SET status = 'pending', next_retry_at = NULL
         WHERE status = 'processing' AND started_at < $1",
    )
    .bind(older_than)
    .execute(pool)
    .await?;
    Ok(result.rows_affected())
}

/// Looks up a pending/processing job sharing the same dedup fingerprint,
/// used by the admin backfill endpoint to report `existingJobId` on a `409`
/// ("returns 409 when a duplicate ... is already pending or
/// processing").
pub async fn find_duplicate(
    pool: &PgPool,
    job_type: JobType,
    contract_id: Option<i64>,
    payload: &serde_json::Value,
) -> Result<Option<Job>, Error> {
    let fp = fingerprint(job_type, contract_id, payload);
    let row = sqlx::query(
        "SELECT * FROM job_queue
         WHERE job_type = $1 AND payload_fingerprint = $2 AND status IN ('pending', 'processing')
         LIMIT 1",
    )
    .bind(job_type)
    .bind(&fp)
    .fetch_optional(pool)
    .await?;
    row.map(row_to_job).transpose()
}

pub async fn get(pool: &PgPool, id: i64) -> Result<Option<Job>, Error> {
    let row = sqlx::query("SELECT * FROM job_queue WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(row_to_job).transpose()
}

/// Pending-queue depth for one job type, used by gap-fill's backpressure
/// high-water mark ("if pending `enrich` jobs exceed a
/// configurable high-water mark, gap-fill stops enqueuing").
pub async fn count_pending(pool: &PgPool, job_type: JobType) -> Result<i64, Error> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM job_queue WHERE job_type = $1 AND status = 'pending'")
        .bind(job_type)
        .fetch_one(pool)
        .await?;
    Ok(row.try_get("n")?)
}

pub async fn list(pool: &PgPool, status: Option<JobStatus>, limit: i64) -> Result<Vec<Job>, Error> {
    let rows = match status {
        Some(status) => {
            sqlx::query("SELECT * FROM job_queue WHERE status = $1 ORDER BY created_at DESC LIMIT $2")
                .bind(status)
                .bind(limit)
                .fetch_all(pool)
                .await?
        }
        None => {
            sqlx::query("SELECT * FROM job_queue ORDER BY created_at DESC LIMIT $1")
                .bind(limit)
                .fetch_all(pool)
                .await?
        }
    };
    rows.into_iter().map(row_to_job).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_and_caps_at_thirty_minutes() {
        assert_eq!(backoff_for(1), std::time::Duration::from_secs(60));
        assert_eq!(backoff_for(2), std::time::Duration::from_secs(120));
        assert_eq!(backoff_for(10), std::time::Duration::from_secs(1800));
    }

    #[test]
    fn fingerprint_is_stable_for_identical_input() {
        let payload = serde_json::json!({"from_block": 1, "to_block": 2});
        let a = fingerprint(JobType::Backfill, Some(7), &payload);
        let b = fingerprint(JobType::Backfill, Some(7), &payload);
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_differs_by_contract() {
        let payload = serde_json::json!({"from_block": 1, "to_block": 2});
        let a = fingerprint(JobType::Backfill, Some(7), &payload);
        let b = fingerprint(JobType::Backfill, Some(8), &payload);
        assert_ne!(a, b);
    }
}
