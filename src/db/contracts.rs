use chrono::{DateTime, Utc};
use sqlx::PgPool;
use sqlx::Row;

use crate::domain::{Address, Contract, ContractKind};

use super::Error;

fn row_to_contract(row: sqlx::postgres::PgRow) -> Result<Contract, Error> {
    let address: String = row.try_get("address")?;
    Ok(Contract {
        id: row.try_get("id")?,
        address: Address::parse(&address)?,
        name: row.try_get("name")?,
        deploy_block: row.try_get("deploy_block")?,
        kind: row.try_get("kind")?,
        indexing_enabled: row.try_get("indexing_enabled")?,
        fetch_transactions: row.try_get("fetch_transactions")?,
        creation_date: row.try_get("creation_date")?,
        abi: row.try_get("abi")?,
        consecutive_failures: row.try_get("consecutive_failures")?,
        failed_at: row.try_get("failed_at")?,
    })
}

pub async fn get(pool: &PgPool, id: i64) -> Result<Option<Contract>, Error> {
    let row = sqlx::query("SELECT * FROM contracts WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(row_to_contract).transpose()
}

pub async fn get_by_address(pool: &PgPool, address: &Address) -> Result<Option<Contract>, Error> {
    let row = sqlx::query("SELECT * FROM contracts WHERE address = $1")
        .bind(address.as_lowercase())
        .fetch_optional(pool)
        .await?;
    row.map(row_to_contract).transpose()
}

pub async fn list_enabled(pool: &PgPool) -> Result<Vec<Contract>, Error> {
    let rows = sqlx::query("SELECT * FROM contracts WHERE indexing_enabled = true ORDER BY id")
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(row_to_contract).collect()
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<Contract>, Error> {
    let rows = sqlx::query("SELECT * FROM contracts ORDER BY id")
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(row_to_contract).collect()
}

pub struct NewContract {
    pub address: Address,
    pub name: String,
    pub deploy_block: i64,
    pub kind: ContractKind,
    pub indexing_enabled: bool,
    pub fetch_transactions: bool,
    pub creation_date: DateTime<Utc>,
    pub abi: Option<serde_json::Value>,
}

pub async fn create(pool: &PgPool, new: NewContract) -> Result<Contract, Error> {
    let row = sqlx::query(
        "INSERT INTO contracts
            (address, name, deploy_block, kind, indexing_enabled, fetch_transactions, creation_date, abi)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING *",
    )
    .bind(new.address.as_lowercase())
    .bind(new.name)
    .bind(new.deploy_block)
    .bind(new.kind)
    .bind(new.indexing_enabled)
    .bind(new.fetch_transactions)
    .bind(new.creation_date)
    .bind(new.abi)
    .fetch_one(pool)
    .await?;
    row_to_contract(row)
}

pub struct ContractUpdate {
    pub name: Option<String>,
    pub indexing_enabled: Option<bool>,
    pub fetch_transactions: Option<bool>,
    pub abi: Option<Option<serde_json::Value>>,
}

/// Partial update for the admin `PUT /api/admin/contracts/{id}` endpoint;
/// only fields present in the request body are touched.
pub async fn update(pool: &PgPool, id: i64, update: ContractUpdate) -> Result<Option<Contract>, Error> {
    if let Some(name) = update.name {
        sqlx::query("UPDATE contracts SET name = $2 WHERE id = $1").bind(id).bind(name).execute(pool).await?;
    }
    if let Some(enabled) = update.indexing_enabled {
        sqlx::query("UPDATE contracts SET indexing_enabled = $2 WHERE id = $1")
            .bind(id)
            .bind(enabled)
            .execute(pool)
            .await?;
    }
    if let Some(fetch) = update.fetch_transactions {
        sqlx::query("UPDATE contracts SET fetch_transactions = $2 WHERE id = $1")
            .bind(id)
            .bind(fetch)
            .execute(pool)
            .await?;
    }
    if let Some(abi) = update.abi {
        sqlx::query("UPDATE contracts SET abi = $2 WHERE id = $1").bind(id).bind(abi).execute(pool).await?;
    }
    get(pool, id).await
}

pub async fn set_indexing_enabled(pool: &PgPool, id: i64, enabled: bool) -> Result<(), Error> {
    sqlx::query("UPDATE contracts SET indexing_enabled = $2 WHERE id = $1")
        .bind(id)
        .bind(enabled)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<(), Error> {
    sqlx::query("DELETE FROM contracts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

/// Called after a successful discovery pass for a contract; resets the
/// consecutive-failure counter.
pub async fn record_discovery_success(pool: &PgPool, id: i64) -> Result<(), Error> {
    sqlx::query(
        "UPDATE contracts SET consecutive_failures = 0, failed_at = NULL WHERE id = $1",
    )
    .bind(id)
    .execute(pool)
    .await?;
    Ok(())
}

/// Called after a failed discovery pass. Returns the post-increment failure
/// count so the caller can decide whether to promote the contract and
/// enqueue a human-attention job (≥5 consecutive failures).
pub async fn record_discovery_failure(pool: &PgPool, id: i64) -> Result<i32, Error> {
    let row = sqlx::query(
        "UPDATE contracts
         SET consecutive_failures = consecutive_failures + 1
         WHERE id = $1
         RETURNING consecutive_failures",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;
    let failures: i32 = row.try_get("consecutive_failures")?;
    if failures >= 5 {
        sqlx::query("UPDATE contracts SET failed_at = now() WHERE id = $1 AND failed_at IS NULL")
            .bind(id)
            .execute(pool)
            .await?;
    }
    Ok(failures)
}

pub async fn indexed_through_block(pool: &PgPool, contract_id: i64) -> Result<i64, Error> {
    let row = sqlx::query(
        "SELECT indexed_through_block FROM contract_scan_cursors WHERE contract_id = $1",
    )
    .bind(contract_id)
    .fetch_optional(pool)
    .await?;
    Ok(row.map(|r| r.try_get::<i64, _>("indexed_through_block")).transpose()?.unwrap_or(0))
}

pub async fn set_indexed_through_block(
    pool: &PgPool,
    contract_id: i64,
    block: i64,
) -> Result<(), Error> {
    sqlx::query(
        "INSERT INTO contract_scan_cursors (contract_id, indexed_through_block, updated_at)
         VALUES ($1, $2, now())
         ON CONFLICT (contract_id)
         DO UPDATE SET indexed_through_block = EXCLUDED.indexed_through_block, updated_at = now()",
    )
    .bind(contract_id)
    .bind(block)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn scanner_cursor(pool: &PgPool, contract_id: i64) -> Result<Option<String>, Error> {
    let row = sqlx::query("SELECT next_token FROM contract_scan_cursors WHERE contract_id = $1")
        .bind(contract_id)
        .fetch_optional(pool)
        .await?;
    Ok(row.and_then(|r| r.try_get::<Option<String>, _>("next_token").ok().flatten()))
}

pub async fn set_scanner_cursor(
    pool: &PgPool,
    contract_id: i64,
    next_token: Option<&str>,
) -> Result<(), Error> {
    sqlx::query(
        "INSERT INTO contract_scan_cursors (contract_id, next_token, updated_at)
         VALUES ($1, $2, now())
         ON CONFLICT (contract_id)
         DO UPDATE SET next_token = EXCLUDED.next_token, updated_at = now()",
    )
    .bind(contract_id)
    .bind(next_token)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn record_discovery_window(
    pool: &PgPool,
    contract_id: i64,
    from_block: i64,
    to_block: i64,
) -> Result<(), Error> {
    sqlx::query(
        "INSERT INTO contract_discovery_windows (contract_id, from_block, to_block)
         VALUES ($1, $2, $3)",
    )
    .bind(contract_id)
    .bind(from_block)
    .bind(to_block)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn discovery_windows(pool: &PgPool, contract_id: i64) -> Result<Vec<(i64, i64)>, Error> {
    let rows = sqlx::query(
        "SELECT from_block, to_block FROM contract_discovery_windows
         WHERE contract_id = $1 ORDER BY from_block",
    )
    .bind(contract_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter()
        .map(|r| Ok((r.try_get("from_block")?, r.try_get("to_block")?)))
        .collect()
}
