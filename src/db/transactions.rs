use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::Row;

use crate::domain::{Address, Log, TransactionDetail, TransactionEnrichment};

use super::Error;

fn row_to_detail(row: sqlx::postgres::PgRow) -> Result<TransactionDetail, Error> {
    let contract_address: String = row.try_get("contract_address")?;
    let wallet_address: String = row.try_get("wallet_address")?;
    Ok(TransactionDetail {
        tx_hash: row.try_get("tx_hash")?,
        contract_address: Address::parse(&contract_address)?,
        wallet_address: Address::parse(&wallet_address)?,
        block_number: row.try_get("block_number")?,
        block_timestamp: row.try_get("block_timestamp")?,
        status: row.try_get("status")?,
        eth_value: row.try_get("eth_value")?,
        input_selector: row.try_get("input_selector")?,
        gas_used: row.try_get("gas_used")?,
    })
}

fn row_to_enrichment(row: sqlx::postgres::PgRow) -> Result<TransactionEnrichment, Error> {
    let logs_json: serde_json::Value = row.try_get("logs")?;
    let logs: Vec<Log> = serde_json::from_value(logs_json).unwrap_or_default();
    Ok(TransactionEnrichment {
        tx_hash: row.try_get("tx_hash")?,
        function_name: row.try_get("function_name")?,
        logs,
        usd_value: row.try_get("usd_value")?,
        eth_value_derived: row.try_get("eth_value_derived")?,
        enriched_at: row.try_get("enriched_at")?,
    })
}

/// Idempotent bulk insert for discovery (`INSERT ... ON CONFLICT (tx_hash)
/// DO NOTHING`). Also used to "heal" reorgs: re-ingesting an
/// already-present tx_hash changes zero rows.
pub async fn insert_details_batch(
    pool: &PgPool,
    details: &[TransactionDetail],
) -> Result<u64, Error> {
    if details.is_empty() {
        return Ok(0);
    }
    let mut tx = pool.begin().await?;
    let mut affected = 0u64;
    for d in details {
        let result = sqlx::query(
            "INSERT INTO transaction_details
                (tx_hash, contract_address, wallet_address, block_number, block_timestamp,
                 status, eth_value, input_selector, gas_used)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (tx_hash) DO NOTHING",
        )
        .bind(&d.tx_hash)
        .bind(d.contract_address.as_lowercase())
        .bind(d.wallet_address.as_lowercase())
        .bind(d.block_number)
        .bind(d.block_timestamp)
        .bind(d.status)
        .bind(&d.eth_value)
        .bind(&d.input_selector)
        .bind(d.gas_used)
        .execute(&mut *tx)
        .await?;
        affected += result.rows_affected();
    }
    tx.commit().await?;
    Ok(affected)
}

/// Corrects `status` on receipt reconfirmation; the only mutation allowed
/// on an existing `transaction_details` row.
pub async fn reconfirm_status(pool: &PgPool, tx_hash: &str, status: i16) -> Result<(), Error> {
    sqlx::query("UPDATE transaction_details SET status = $2 WHERE tx_hash = $1")
        .bind(tx_hash)
        .bind(status)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn get_detail(pool: &PgPool, tx_hash: &str) -> Result<Option<TransactionDetail>, Error> {
    let row = sqlx::query("SELECT * FROM transaction_details WHERE tx_hash = $1")
        .bind(tx_hash)
        .fetch_optional(pool)
        .await?;
    row.map(row_to_detail).transpose()
}

/// Batch lookup used by the `enrich` job executor, which is handed an
/// explicit list of tx hashes rather than a time window.
pub async fn get_details_by_hashes(pool: &PgPool, hashes: &[String]) -> Result<Vec<TransactionDetail>, Error> {
    if hashes.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query("SELECT * FROM transaction_details WHERE tx_hash = ANY($1)")
        .bind(hashes)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(row_to_detail).collect()
}

/// Enrichment candidates: rows newer than `since`, joined to volume
/// contracts only, missing an enrichment row, newest first.
pub async fn enrichment_candidates(
    pool: &PgPool,
    since: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<TransactionDetail>, Error> {
    let rows = sqlx::query(
        "SELECT td.* FROM transaction_details td
         JOIN contracts c ON c.address = td.contract_address
         LEFT JOIN transaction_enrichment te ON te.tx_hash = td.tx_hash
         WHERE td.block_timestamp >= $1
           AND c.kind = 'volume'
           AND te.tx_hash IS NULL
         ORDER BY td.block_timestamp DESC
         LIMIT $2",
    )
    .bind(since)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(row_to_detail).collect()
}

/// Enrichment gaps: rows older than `before`, missing an enrichment row.
/// Ordered newest-first, then by the contract's lifetime tx volume
/// descending.
pub async fn enrichment_gaps(
    pool: &PgPool,
    before: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<TransactionDetail>, Error> {
    let rows = sqlx::query(
        "SELECT td.* FROM transaction_details td
         JOIN contracts c ON c.address = td.contract_address
         LEFT JOIN transaction_enrichment te ON te.tx_hash = td.tx_hash
         LEFT JOIN (
             SELECT contract_address, COUNT(*) AS volume
             FROM transaction_details GROUP BY contract_address
         ) v ON v.contract_address = td.contract_address
         WHERE td.block_timestamp < $1
           AND c.kind = 'volume'
           AND te.tx_hash IS NULL
         ORDER BY td.block_timestamp DESC, v.volume DESC NULLS LAST
         LIMIT $2",
    )
    .bind(before)
    .bind(limit)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(row_to_detail).collect()
}

/// Idempotent upsert: a row is never enriched twice except to
/// correct `usd_value` after a price backfill, which this call also serves.
pub async fn upsert_enrichment(pool: &PgPool, enrichment: &TransactionEnrichment) -> Result<(), Error> {
    let logs_json = serde_json::to_value(&enrichment.logs).unwrap_or(serde_json::json!([]));
    sqlx::query(
        "INSERT INTO transaction_enrichment
            (tx_hash, function_name, logs, usd_value, eth_value_derived, enriched_at)
         VALUES ($1, $2, $3, $4, $5, $6)
         ON CONFLICT (tx_hash) DO UPDATE SET
            function_name = EXCLUDED.function_name,
            logs = EXCLUDED.logs,
            usd_value = EXCLUDED.usd_value,
            eth_value_derived = EXCLUDED.eth_value_derived,
            enriched_at = EXCLUDED.enriched_at",
    )
    .bind(&enrichment.tx_hash)
    .bind(&enrichment.function_name)
    .bind(logs_json)
    .bind(&enrichment.usd_value)
    .bind(&enrichment.eth_value_derived)
    .bind(enrichment.enriched_at)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn upsert_enrichment_batch(
    pool: &PgPool,
    enrichments: &[TransactionEnrichment],
) -> Result<(), Error> {
    let mut tx = pool.begin().await?;
    for e in enrichments {
        let logs_json = serde_json::to_value(&e.logs).unwrap_or(serde_json::json!([]));
        sqlx::query(
            "INSERT INTO transaction_enrichment
                (tx_hash, function_name, logs, usd_value, eth_value_derived, enriched_at)
             VALUES ($1, $2, $3, $4, $5, $6)
             ON CONFLICT (tx_hash) DO UPDATE SET
                function_name = EXCLUDED.function_name,
                logs = EXCLUDED.logs,
                usd_value = EXCLUDED.usd_value,
                eth_value_derived = EXCLUDED.eth_value_derived,
                enriched_at = EXCLUDED.enriched_at",
        )
        .bind(&e.tx_hash)
        .bind(&e.function_name)
        .bind(logs_json)
        .bind(&e.usd_value)
        .bind(&e.eth_value_derived)
        .bind(e.enriched_at)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

pub async fn get_enrichment(pool: &PgPool, tx_hash: &str) -> Result<Option<TransactionEnrichment>, Error> {
    let row = sqlx::query("SELECT * FROM transaction_enrichment WHERE tx_hash = $1")
        .bind(tx_hash)
        .fetch_optional(pool)
        .await?;
    row.map(row_to_enrichment).transpose()
}

pub async fn count_for_wallet_and_contracts(
    pool: &PgPool,
    wallet: &Address,
    contract_ids: &[i64],
) -> Result<i64, Error> {
    let row = sqlx::query(
        "SELECT COUNT(*) AS n FROM transaction_details td
         JOIN contracts c ON c.address = td.contract_address
         WHERE td.wallet_address = $1 AND td.status = 1 AND c.id = ANY($2)",
    )
    .bind(wallet.as_lowercase())
    .bind(contract_ids)
    .fetch_one(pool)
    .await?;
    Ok(row.try_get("n")?)
}

pub async fn usd_sum_for_wallet_and_contracts(
    pool: &PgPool,
    wallet: &Address,
    contract_ids: &[i64],
) -> Result<BigDecimal, Error> {
    let row = sqlx::query(
        "SELECT COALESCE(SUM(te.usd_value), 0) AS total FROM transaction_details td
         JOIN contracts c ON c.address = td.contract_address
         JOIN transaction_enrichment te ON te.tx_hash = td.tx_hash
         WHERE td.wallet_address = $1 AND td.status = 1 AND c.id = ANY($2)",
    )
    .bind(wallet.as_lowercase())
    .bind(contract_ids)
    .fetch_one(pool)
    .await?;
    Ok(row.try_get("total")?)
}
