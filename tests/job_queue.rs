//! Job queue dedup and cancel/retry semantics against a real Postgres
//! instance (spec.md §8 invariant 2, "cancel then retry ... same terminal
//! outcome as a single successful run").

use chainidx::db;
use chainidx::domain::{JobStatus, JobType};
use sqlx::PgPool;

#[sqlx::test]
async fn duplicate_enqueue_is_suppressed(pool: PgPool) {
    let payload = serde_json::json!({ "fromBlock": 1, "toBlock": 100 });

    let first = db::jobs::enqueue(
        &pool,
        db::jobs::NewJob {
            job_type: JobType::Backfill,
            contract_id: None,
            priority: 5,
            payload: payload.clone(),
            max_attempts: 5,
        },
    )
    .await
    .unwrap();
    assert!(first.is_some());

    let second = db::jobs::enqueue(
        &pool,
        db::jobs::NewJob {
            job_type: JobType::Backfill,
            contract_id: None,
            priority: 5,
            payload: payload.clone(),
            max_attempts: 5,
        },
    )
    .await
    .unwrap();
    assert!(second.is_none(), "duplicate pending job must not be inserted twice");

    let duplicate = db::jobs::find_duplicate(&pool, JobType::Backfill, None, &payload).await.unwrap();
    assert_eq!(duplicate.unwrap().id, first.unwrap().id);
}

#[sqlx::test]
async fn lease_picks_lowest_priority_first(pool: PgPool) {
    let urgent = db::jobs::enqueue(
        &pool,
        db::jobs::NewJob {
            job_type: JobType::Discover,
            contract_id: None,
            priority: 1,
            payload: serde_json::json!({ "tag": "urgent" }),
            max_attempts: 5,
        },
    )
    .await
    .unwrap()
    .unwrap();
    db::jobs::enqueue(
        &pool,
        db::jobs::NewJob {
            job_type: JobType::Discover,
            contract_id: None,
            priority: 9,
            payload: serde_json::json!({ "tag": "routine" }),
            max_attempts: 5,
        },
    )
    .await
    .unwrap()
    .unwrap();

    let leased = db::jobs::lease(&pool, JobType::Discover).await.unwrap().unwrap();
    assert_eq!(leased.id, urgent.id, "lower priority value must be leased first");
}

#[sqlx::test]
async fn cancel_then_retry_reaches_pending_like_a_fresh_job(pool: PgPool) {
    let job = db::jobs::enqueue(
        &pool,
        db::jobs::NewJob {
            job_type: JobType::Enrich,
            contract_id: None,
            priority: 5,
            payload: serde_json::json!({ "txHashes": ["0xabc"] }),
            max_attempts: 5,
        },
    )
    .await
    .unwrap()
    .unwrap();

    db::jobs::cancel(&pool, job.id).await.unwrap();
    let cancelled = db::jobs::get(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(cancelled.status, JobStatus::Failed);

    db::jobs::retry(&pool, job.id).await.unwrap();
    let retried = db::jobs::get(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(retried.status, JobStatus::Pending);
    assert_eq!(retried.attempts, 0);
    assert!(retried.error_message.is_none());
}

#[sqlx::test]
async fn successful_job_on_first_try_reports_one_attempt(pool: PgPool) {
    let job = db::jobs::enqueue(
        &pool,
        db::jobs::NewJob {
            job_type: JobType::Backfill,
            contract_id: None,
            priority: 5,
            payload: serde_json::json!({ "fromBlock": 1, "toBlock": 2 }),
            max_attempts: 5,
        },
    )
    .await
    .unwrap()
    .unwrap();

    let leased = db::jobs::lease(&pool, JobType::Backfill).await.unwrap().unwrap();
    assert_eq!(leased.attempts, 1);

    db::jobs::complete(&pool, job.id).await.unwrap();
    let completed = db::jobs::get(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(completed.status, JobStatus::Completed);
    assert_eq!(completed.attempts, 1, "one lease must report exactly one attempt");
}

#[sqlx::test]
async fn retry_storm_then_success_reports_three_attempts(pool: PgPool) {
    let job = db::jobs::enqueue(
        &pool,
        db::jobs::NewJob {
            job_type: JobType::Backfill,
            contract_id: None,
            priority: 5,
            payload: serde_json::json!({ "fromBlock": 1, "toBlock": 2 }),
            max_attempts: 5,
        },
    )
    .await
    .unwrap()
    .unwrap();

    db::jobs::lease(&pool, JobType::Backfill).await.unwrap().unwrap();
    let status = db::jobs::fail(&pool, job.id, "429").await.unwrap();
    assert_eq!(status, JobStatus::Pending);
    let after_first = db::jobs::get(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(after_first.attempts, 1);

    sqlx::query("UPDATE job_queue SET next_retry_at = NULL WHERE id = $1")
        .bind(job.id)
        .execute(&pool)
        .await
        .unwrap();
    db::jobs::lease(&pool, JobType::Backfill).await.unwrap().unwrap();
    let status = db::jobs::fail(&pool, job.id, "429").await.unwrap();
    assert_eq!(status, JobStatus::Pending);
    let after_second = db::jobs::get(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(after_second.attempts, 2, "spec.md §8 scenario 5: attempts:2 after two 429s");

    sqlx::query("UPDATE job_queue SET next_retry_at = NULL WHERE id = $1")
        .bind(job.id)
        .execute(&pool)
        .await
        .unwrap();
    db::jobs::lease(&pool, JobType::Backfill).await.unwrap().unwrap();
    db::jobs::complete(&pool, job.id).await.unwrap();
    let completed = db::jobs::get(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(completed.status, JobStatus::Completed);
    assert_eq!(completed.attempts, 3, "spec.md §8 scenario 5: attempts:3 after the eventual success");
}

#[sqlx::test]
async fn retry_after_real_failures_resets_attempts_for_a_fresh_budget(pool: PgPool) {
    let job = db::jobs::enqueue(
        &pool,
        db::jobs::NewJob {
            job_type: JobType::Enrich,
            contract_id: None,
            priority: 5,
            payload: serde_json::json!({ "txHashes": ["0xdead"] }),
            max_attempts: 2,
        },
    )
    .await
    .unwrap()
    .unwrap();

    db::jobs::lease(&pool, JobType::Enrich).await.unwrap().unwrap();
    assert_eq!(db::jobs::fail(&pool, job.id, "rpc timeout").await.unwrap(), JobStatus::Pending);

    sqlx::query("UPDATE job_queue SET next_retry_at = NULL WHERE id = $1")
        .bind(job.id)
        .execute(&pool)
        .await
        .unwrap();
    db::jobs::lease(&pool, JobType::Enrich).await.unwrap().unwrap();
    assert_eq!(db::jobs::fail(&pool, job.id, "rpc timeout").await.unwrap(), JobStatus::Failed);

    let exhausted = db::jobs::get(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(exhausted.attempts, exhausted.max_attempts);

    db::jobs::retry(&pool, job.id).await.unwrap();
    let retried = db::jobs::get(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(retried.status, JobStatus::Pending);
    assert_eq!(retried.attempts, 0, "admin retry must grant a full fresh attempt budget, not one extra try");
    assert_eq!(retried.max_attempts, 2, "retry resets attempts, it does not widen max_attempts");
    assert!(retried.error_message.is_none());

    let leased_again = db::jobs::lease(&pool, JobType::Enrich).await.unwrap().unwrap();
    assert_eq!(leased_again.attempts, 1);
    db::jobs::complete(&pool, job.id).await.unwrap();
    let completed = db::jobs::get(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(completed.status, JobStatus::Completed);
}

#[sqlx::test]
async fn exhausted_job_fails_without_auto_retry(pool: PgPool) {
    let job = db::jobs::enqueue(
        &pool,
        db::jobs::NewJob {
            job_type: JobType::Enrich,
            contract_id: None,
            priority: 5,
            payload: serde_json::json!({}),
            max_attempts: 1,
        },
    )
    .await
    .unwrap()
    .unwrap();

    db::jobs::lease(&pool, JobType::Enrich).await.unwrap();
    let status = db::jobs::fail(&pool, job.id, "rpc timeout").await.unwrap();
    assert_eq!(status, JobStatus::Failed);

    let final_job = db::jobs::get(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(final_job.status, JobStatus::Failed);
    assert_eq!(final_job.attempts, final_job.max_attempts);
    assert!(final_job.is_exhausted());
}
