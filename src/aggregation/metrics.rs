//! Generic metric evaluation (spec.md §4.5 count/USD/ETH rules, §6
//! `GET /api/analytics/{wallet}`).

use std::collections::BTreeMap;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use serde::Serialize;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};

use crate::domain::{AggregationKind, Address, Currency, Metric};

use super::predicate::append_where;
use super::Error;

const WEI_PER_ETH: &str = "1000000000000000000";

fn wei_to_eth(wei: &BigDecimal) -> BigDecimal {
    wei / BigDecimal::from_str(WEI_PER_ETH).expect("constant divisor parses")
}

#[derive(Clone, Debug, Serialize)]
pub struct FunctionCount {
    pub count: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct MetricSubAggregate {
    pub contract_address: String,
    pub contract_name: Option<String>,
    pub count: i64,
    pub usd_value: BigDecimal,
    pub by_function: Option<BTreeMap<String, FunctionCount>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct MetricResult {
    pub slug: String,
    pub name: String,
    pub currency: Currency,
    pub total_value: BigDecimal,
    pub total_count: i64,
    pub sub_aggregates: Vec<MetricSubAggregate>,
}

struct Totals {
    count: i64,
    usd_sum: BigDecimal,
    eth_sum: BigDecimal,
}

async fn totals(pool: &PgPool, metric: &Metric, wallet: &Address) -> Result<Totals, Error> {
    if metric.predicate.contract_ids.is_empty() {
        return Ok(Totals { count: 0, usd_sum: BigDecimal::from(0), eth_sum: BigDecimal::from(0) });
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT COUNT(DISTINCT td.tx_hash) AS cnt,
                COALESCE(SUM(te.usd_value), 0) AS usd_sum,
                COALESCE(SUM(td.eth_value), 0) AS eth_sum
         FROM transaction_details td
         JOIN contracts c ON c.address = td.contract_address
         LEFT JOIN transaction_enrichment te ON te.tx_hash = td.tx_hash",
    );
    append_where(&mut qb, &metric.predicate, wallet);
    let row = qb.build().fetch_one(pool).await?;
    Ok(Totals {
        count: row.try_get("cnt")?,
        usd_sum: row.try_get("usd_sum")?,
        eth_sum: row.try_get("eth_sum")?,
    })
}

async fn sub_aggregates(pool: &PgPool, metric: &Metric, wallet: &Address) -> Result<Vec<MetricSubAggregate>, Error> {
    if metric.predicate.contract_ids.is_empty() {
        return Ok(Vec::new());
    }
    let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT c.address AS contract_address, c.name AS contract_name,
                COUNT(DISTINCT td.tx_hash) AS cnt,
                COALESCE(SUM(te.usd_value), 0) AS usd_sum
         FROM transaction_details td
         JOIN contracts c ON c.address = td.contract_address
         LEFT JOIN transaction_enrichment te ON te.tx_hash = td.tx_hash",
    );
    append_where(&mut qb, &metric.predicate, wallet);
    qb.push(" GROUP BY c.address, c.name ORDER BY usd_sum DESC, cnt DESC");
    let rows = qb.build().fetch_all(pool).await?;

    let mut out = Vec::with_capacity(rows.len());
    for row in rows {
        let contract_address: String = row.try_get("contract_address")?;
        out.push(MetricSubAggregate {
            contract_address,
            contract_name: row.try_get("contract_name")?,
            count: row.try_get("cnt")?,
            usd_value: row.try_get("usd_sum")?,
            by_function: None,
        });
    }

    let mut fn_qb: QueryBuilder<Postgres> = QueryBuilder::new(
        "SELECT c.address AS contract_address, te.function_name,
                COUNT(DISTINCT td.tx_hash) AS cnt
         FROM transaction_details td
         JOIN contracts c ON c.address = td.contract_address
         LEFT JOIN transaction_enrichment te ON te.tx_hash = td.tx_hash",
    );
    append_where(&mut fn_qb, &metric.predicate, wallet);
    fn_qb.push(" AND te.function_name IS NOT NULL GROUP BY c.address, te.function_name");
    let fn_rows = fn_qb.build().fetch_all(pool).await?;

    let mut by_contract: BTreeMap<String, BTreeMap<String, FunctionCount>> = BTreeMap::new();
    for row in fn_rows {
        let contract_address: String = row.try_get("contract_address")?;
        let function_name: String = row.try_get("function_name")?;
        let count: i64 = row.try_get("cnt")?;
        by_contract.entry(contract_address).or_default().insert(function_name, FunctionCount { count });
    }

    for sub in &mut out {
        if let Some(by_function) = by_contract.remove(&sub.contract_address) {
            sub.by_function = Some(by_function);
        }
    }
    Ok(out)
}

/// Evaluates one metric for one wallet: totals plus a per-contract,
/// per-function breakdown (spec.md §6 `GET /api/analytics/{wallet}`).
pub async fn metric_result(pool: &PgPool, metric: &Metric, wallet: &Address) -> Result<MetricResult, Error> {
    let totals = totals(pool, metric, wallet).await?;
    let total_value = match metric.aggregation {
        AggregationKind::SumUsd => totals.usd_sum,
        AggregationKind::SumEth => wei_to_eth(&totals.eth_sum),
        AggregationKind::Count | AggregationKind::CountDistinctTx => BigDecimal::from(totals.count),
    };
    let sub_aggregates = sub_aggregates(pool, metric, wallet).await?;

    Ok(MetricResult {
        slug: metric.slug.clone(),
        name: metric.name.clone(),
        currency: metric.currency,
        total_value,
        total_count: totals.count,
        sub_aggregates,
    })
}

/// Evaluates every registered metric for one wallet (spec.md §6
/// `GET /api/analytics/{wallet}` returns `{metrics: [...]}`).
pub async fn all_metrics(pool: &PgPool, wallet: &Address) -> Result<Vec<MetricResult>, Error> {
    let metrics = crate::db::metrics::list(pool).await?;
    let mut results = Vec::with_capacity(metrics.len());
    for metric in &metrics {
        results.push(metric_result(pool, metric, wallet).await?);
    }
    Ok(results)
}
