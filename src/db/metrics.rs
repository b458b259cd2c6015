use sqlx::PgPool;
use sqlx::Row;

use crate::domain::{Metric, MetricPredicate, WalletRole};

use super::Error;

fn parse_wallet_role(s: &str) -> WalletRole {
    match s {
        "sender" => WalletRole::Sender,
        "recipient" => WalletRole::Recipient,
        _ => WalletRole::Either,
    }
}

fn wallet_role_str(role: WalletRole) -> &'static str {
    match role {
        WalletRole::Sender => "sender",
        WalletRole::Recipient => "recipient",
        WalletRole::Either => "either",
    }
}

async fn load_predicate(pool: &PgPool, metric_id: i64) -> Result<MetricPredicate, Error> {
    let contract_ids: Vec<i64> = sqlx::query(
        "SELECT contract_id FROM metric_contracts WHERE metric_id = $1 ORDER BY contract_id",
    )
    .bind(metric_id)
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|r| r.try_get::<i64, _>("contract_id"))
    .collect::<Result<_, _>>()?;

    let row = sqlx::query(
        "SELECT function_names, event_signatures, wallet_role FROM analytics_metrics WHERE id = $1",
    )
    .bind(metric_id)
    .fetch_one(pool)
    .await?;
    let function_names: Option<Vec<String>> = row.try_get("function_names")?;
    let event_signatures: Option<Vec<String>> = row.try_get("event_signatures")?;
    let wallet_role: String = row.try_get("wallet_role")?;

    Ok(MetricPredicate {
        contract_ids,
        function_names,
        event_signatures,
        wallet_role: parse_wallet_role(&wallet_role),
    })
}

async fn row_to_metric(pool: &PgPool, row: sqlx::postgres::PgRow) -> Result<Metric, Error> {
    let id: i64 = row.try_get("id")?;
    Ok(Metric {
        id,
        slug: row.try_get("slug")?,
        name: row.try_get("name")?,
        currency: row.try_get("currency")?,
        aggregation: row.try_get("aggregation_type")?,
        predicate: load_predicate(pool, id).await?,
    })
}

pub async fn list(pool: &PgPool) -> Result<Vec<Metric>, Error> {
    let rows = sqlx::query("SELECT * FROM analytics_metrics ORDER BY id").fetch_all(pool).await?;
    let mut metrics = Vec::with_capacity(rows.len());
    for row in rows {
        metrics.push(row_to_metric(pool, row).await?);
    }
    Ok(metrics)
}

pub async fn get(pool: &PgPool, id: i64) -> Result<Option<Metric>, Error> {
    let row = sqlx::query("SELECT * FROM analytics_metrics WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => Ok(Some(row_to_metric(pool, row).await?)),
        None => Ok(None),
    }
}

pub async fn get_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Metric>, Error> {
    let row = sqlx::query("SELECT * FROM analytics_metrics WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => Ok(Some(row_to_metric(pool, row).await?)),
        None => Ok(None),
    }
}

pub async fn metrics_for_contract(pool: &PgPool, contract_id: i64) -> Result<Vec<Metric>, Error> {
    let rows = sqlx::query(
        "SELECT m.* FROM analytics_metrics m
         JOIN metric_contracts mc ON mc.metric_id = m.id
         WHERE mc.contract_id = $1
         ORDER BY m.id",
    )
    .bind(contract_id)
    .fetch_all(pool)
    .await?;
    let mut metrics = Vec::with_capacity(rows.len());
    for row in rows {
        metrics.push(row_to_metric(pool, row).await?);
    }
    Ok(metrics)
}

pub struct NewMetric {
    pub slug: String,
    pub name: String,
    pub currency: crate::domain::Currency,
    pub aggregation: crate::domain::AggregationKind,
    pub predicate: MetricPredicate,
}

pub async fn create(pool: &PgPool, new: NewMetric) -> Result<Metric, Error> {
    let mut tx = pool.begin().await?;
    let row = sqlx::query(
        "INSERT INTO analytics_metrics
            (slug, name, currency, aggregation_type, function_names, event_signatures, wallet_role)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING id",
    )
    .bind(&new.slug)
    .bind(&new.name)
    .bind(new.currency)
    .bind(new.aggregation)
    .bind(&new.predicate.function_names)
    .bind(&new.predicate.event_signatures)
    .bind(wallet_role_str(new.predicate.wallet_role))
    .fetch_one(&mut *tx)
    .await?;
    let id: i64 = row.try_get("id")?;
    for contract_id in &new.predicate.contract_ids {
        sqlx::query("INSERT INTO metric_contracts (metric_id, contract_id) VALUES ($1, $2)")
            .bind(id)
            .bind(contract_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    get(pool, id).await?.ok_or(Error::NotFound)
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<(), Error> {
    sqlx::query("DELETE FROM analytics_metrics WHERE id = $1").bind(id).execute(pool).await?;
    Ok(())
}
