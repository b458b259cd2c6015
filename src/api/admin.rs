//! Admin API handlers: CRUD over contracts, metrics, dashboard cards, and
//! backfill jobs. Every handler validates inputs up front and returns
//! `ApiError::BadRequest` with a specific message, rather than letting a
//! constraint violation bubble up as a generic 500.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::db;
use crate::domain::{
    Address, AggregationKind, CardRow, CardType, ContractKind, Currency, Job, JobStatus, MetricPredicate,
    WalletRole,
};
use crate::queue;

use super::error::ApiError;
use super::state::AppState;

fn parse_iso8601(field: &'static str, s: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|_| ApiError::BadRequest(format!("{field} must be a valid ISO-8601 date")))
}

fn parse_address(field: &'static str, s: &str) -> Result<Address, ApiError> {
    Address::parse(s).map_err(|e| ApiError::BadRequest(format!("{field}: {e}")))
}

// ---------------------------------------------------------------- contracts

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateContractRequest {
    pub address: String,
    pub name: String,
    pub deploy_block: i64,
    pub kind: ContractKind,
    #[serde(default = "default_true")]
    pub indexing_enabled: bool,
    #[serde(default)]
    pub fetch_transactions: bool,
    pub creation_date: String,
    #[serde(default)]
    pub abi: Option<serde_json::Value>,
    #[serde(default)]
    pub platform_ids: Vec<i64>,
}

fn default_true() -> bool {
    true
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateContractRequest {
    pub name: Option<String>,
    pub indexing_enabled: Option<bool>,
    pub fetch_transactions: Option<bool>,
}

pub async fn list_contracts(State(state): State<AppState>) -> Result<Json<Vec<crate::domain::Contract>>, ApiError> {
    Ok(Json(db::contracts::list_all(&state.pool).await?))
}

pub async fn get_contract(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<crate::domain::Contract>, ApiError> {
    db::contracts::get(&state.pool, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("contract not found".into()))
}

pub async fn create_contract(
    State(state): State<AppState>,
    Json(req): Json<CreateContractRequest>,
) -> Result<(StatusCode, Json<crate::domain::Contract>), ApiError> {
    let address = parse_address("address", &req.address)?;
    if db::contracts::get_by_address(&state.pool, &address).await?.is_some() {
        return Err(ApiError::BadRequest("a contract with this address already exists".into()));
    }
    for platform_id in &req.platform_ids {
        if !db::platforms::exists(&state.pool, *platform_id).await? {
            return Err(ApiError::BadRequest(format!("platform {platform_id} does not exist")));
        }
    }
    let creation_date = parse_iso8601("creationDate", &req.creation_date)?;

    let contract = db::contracts::create(
        &state.pool,
        db::contracts::NewContract {
            address,
            name: req.name,
            deploy_block: req.deploy_block,
            kind: req.kind,
            indexing_enabled: req.indexing_enabled,
            fetch_transactions: req.fetch_transactions,
            creation_date,
            abi: req.abi,
        },
    )
    .await?;
    for platform_id in &req.platform_ids {
        db::platforms::link_contract(&state.pool, contract.id, *platform_id).await?;
    }
    Ok((StatusCode::CREATED, Json(contract)))
}

pub async fn update_contract(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateContractRequest>,
) -> Result<Json<crate::domain::Contract>, ApiError> {
    let updated = db::contracts::update(
        &state.pool,
        id,
        db::contracts::ContractUpdate {
            name: req.name,
            indexing_enabled: req.indexing_enabled,
            fetch_transactions: req.fetch_transactions,
            abi: None,
        },
    )
    .await?;
    updated.map(Json).ok_or_else(|| ApiError::NotFound("contract not found".into()))
}

pub async fn delete_contract(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    db::contracts::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ------------------------------------------------------------------ metrics

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMetricRequest {
    pub slug: String,
    pub name: String,
    pub currency: Currency,
    pub aggregation: AggregationKind,
    pub contract_ids: Vec<i64>,
    #[serde(default)]
    pub function_names: Option<Vec<String>>,
    #[serde(default)]
    pub event_signatures: Option<Vec<String>>,
    #[serde(default = "default_wallet_role")]
    pub wallet_role: WalletRole,
}

fn default_wallet_role() -> WalletRole {
    WalletRole::Either
}

pub async fn list_metrics(State(state): State<AppState>) -> Result<Json<Vec<crate::domain::Metric>>, ApiError> {
    Ok(Json(db::metrics::list(&state.pool).await?))
}

pub async fn get_metric(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<crate::domain::Metric>, ApiError> {
    db::metrics::get(&state.pool, id).await?.map(Json).ok_or_else(|| ApiError::NotFound("metric not found".into()))
}

pub async fn create_metric(
    State(state): State<AppState>,
    Json(req): Json<CreateMetricRequest>,
) -> Result<(StatusCode, Json<crate::domain::Metric>), ApiError> {
    if db::metrics::get_by_slug(&state.pool, &req.slug).await?.is_some() {
        return Err(ApiError::BadRequest("a metric with this slug already exists".into()));
    }
    for contract_id in &req.contract_ids {
        if db::contracts::get(&state.pool, *contract_id).await?.is_none() {
            return Err(ApiError::BadRequest(format!("contract {contract_id} does not exist")));
        }
    }
    let metric = db::metrics::create(
        &state.pool,
        db::metrics::NewMetric {
            slug: req.slug,
            name: req.name,
            currency: req.currency,
            aggregation: req.aggregation,
            predicate: MetricPredicate {
                contract_ids: req.contract_ids,
                function_names: req.function_names,
                event_signatures: req.event_signatures,
                wallet_role: req.wallet_role,
            },
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(metric)))
}

pub async fn delete_metric(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    db::metrics::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ------------------------------------------------------------ dashboard cards

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCardRequest {
    pub row: CardRow,
    #[serde(default = "default_card_type")]
    pub card_type: CardType,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub color: String,
    #[serde(default)]
    pub display_order: i32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub metric_ids: Vec<i64>,
    pub platform_ids: Vec<i64>,
}

fn default_card_type() -> CardType {
    CardType::Aggregate
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCardRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub subtitle: Option<Option<String>>,
    pub color: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

pub async fn list_cards(State(state): State<AppState>) -> Result<Json<Vec<crate::domain::DashboardCard>>, ApiError> {
    Ok(Json(db::dashboard::list_all(&state.pool).await?))
}

pub async fn get_card(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<crate::domain::DashboardCard>, ApiError> {
    db::dashboard::get(&state.pool, id).await?.map(Json).ok_or_else(|| ApiError::NotFound("card not found".into()))
}

pub async fn create_card(
    State(state): State<AppState>,
    Json(req): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<crate::domain::DashboardCard>), ApiError> {
    for platform_id in &req.platform_ids {
        if !db::platforms::exists(&state.pool, *platform_id).await? {
            return Err(ApiError::BadRequest(format!("platform {platform_id} does not exist")));
        }
    }
    for metric_id in &req.metric_ids {
        if db::metrics::get(&state.pool, *metric_id).await?.is_none() {
            return Err(ApiError::BadRequest(format!("metric {metric_id} does not exist")));
        }
    }
    let card = db::dashboard::create(
        &state.pool,
        db::dashboard::NewDashboardCard {
            row: req.row,
            card_type: req.card_type,
            title: req.title,
            subtitle: req.subtitle,
            color: req.color,
            display_order: req.display_order,
            is_active: req.is_active,
            metric_ids: req.metric_ids,
            platform_ids: req.platform_ids,
        },
    )
    .await?;
    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn update_card(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(req): Json<UpdateCardRequest>,
) -> Result<Json<crate::domain::DashboardCard>, ApiError> {
    let updated = db::dashboard::update(
        &state.pool,
        id,
        db::dashboard::CardUpdate {
            title: req.title,
            subtitle: req.subtitle,
            color: req.color,
            display_order: req.display_order,
            is_active: req.is_active,
        },
    )
    .await?;
    updated.map(Json).ok_or_else(|| ApiError::NotFound("card not found".into()))
}

pub async fn delete_card(State(state): State<AppState>, Path(id): Path<i64>) -> Result<StatusCode, ApiError> {
    db::dashboard::delete(&state.pool, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --------------------------------------------------------------- backfill jobs

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBackfillRequest {
    pub contract_address: String,
    pub from_date: String,
    pub to_date: String,
    #[serde(default = "default_priority")]
    pub priority: i16,
}

fn default_priority() -> i16 {
    5
}

#[derive(Deserialize)]
pub struct JobListQuery {
    pub status: Option<String>,
}

fn parse_status(s: &str) -> Result<JobStatus, ApiError> {
    match s {
        "pending" => Ok(JobStatus::Pending),
        "processing" => Ok(JobStatus::Processing),
        "completed" => Ok(JobStatus::Completed),
        "failed" => Ok(JobStatus::Failed),
        other => Err(ApiError::BadRequest(format!("unknown job status: {other}"))),
    }
}

pub async fn list_backfill_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobListQuery>,
) -> Result<Json<Vec<Job>>, ApiError> {
    let status = query.status.as_deref().map(parse_status).transpose()?;
    Ok(Json(queue::list(&state.pool, status, 100).await?))
}

/// `POST /api/admin/backfill` (spec.md §8 scenario 1, 2): validates the
/// date range, resolves it to a block range via the chain, and enqueues a
/// `backfill` job — or reports the already-pending/processing duplicate as
/// a `409` with `existingJobId` (scenario 2).
pub async fn create_backfill_job(
    State(state): State<AppState>,
    Json(req): Json<CreateBackfillRequest>,
) -> Result<(StatusCode, Json<Job>), ApiError> {
    let address = parse_address("contractAddress", &req.contract_address)?;
    let contract =
        db::contracts::get_by_address(&state.pool, &address).await?.ok_or_else(|| ApiError::NotFound("Contract not found".into()))?;

    let from_date = parse_iso8601("fromDate", &req.from_date)?;
    let to_date = parse_iso8601("toDate", &req.to_date)?;
    if from_date >= to_date {
        return Err(ApiError::BadRequest("fromDate must be before toDate".into()));
    }

    let head = state.rpc.block_number().await.map_err(ApiError::from)?;
    let from_block = state.rpc.block_at_or_after(from_date, contract.deploy_block.max(0) as u64, head).await.map_err(ApiError::from)?;
    let to_block = state.rpc.block_at_or_after(to_date, from_block, head).await.map_err(ApiError::from)?;

    let payload = serde_json::json!({
        "fromBlock": from_block as i64,
        "toBlock": to_block as i64,
        "fromDate": req.from_date,
        "toDate": req.to_date,
    });
    if let Some(existing) =
        db::jobs::find_duplicate(&state.pool, crate::domain::JobType::Backfill, Some(contract.id), &payload).await?
    {
        return Err(ApiError::Conflict {
            message: "A job with the same parameters already exists".into(),
            existing_job_id: existing.id,
        });
    }

    let job = match queue::enqueue_backfill(
        &state.pool,
        contract.id,
        from_block as i64,
        to_block as i64,
        Some(req.from_date.clone()),
        Some(req.to_date.clone()),
        req.priority,
    )
    .await?
    {
        Some(job) => job,
        None => {
            let existing = db::jobs::find_duplicate(&state.pool, crate::domain::JobType::Backfill, Some(contract.id), &payload)
                .await?
                .ok_or_else(|| ApiError::BadRequest("job could not be enqueued".into()))?;
            return Err(ApiError::Conflict {
                message: "A job with the same parameters already exists".into(),
                existing_job_id: existing.id,
            });
        }
    };

    Ok((StatusCode::CREATED, Json(job)))
}

pub async fn get_backfill_job(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Job>, ApiError> {
    db::jobs::get(&state.pool, id).await?.map(Json).ok_or_else(|| ApiError::NotFound("Invalid job ID".into()))
}

/// `DELETE /api/admin/backfill/{id}` — admin cancel, valid only while
/// `pending`/`failed`.
pub async fn cancel_backfill_job(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Job>, ApiError> {
    Ok(Json(queue::cancel(&state.pool, id).await.map_err(|_| ApiError::BadRequest("job is not cancellable".into()))?))
}

/// `POST /api/admin/backfill/{id}` — admin retry, valid only while `failed`
///.
pub async fn retry_backfill_job(State(state): State<AppState>, Path(id): Path<i64>) -> Result<Json<Job>, ApiError> {
    Ok(Json(queue::retry(&state.pool, id).await.map_err(|_| ApiError::BadRequest("job is not retryable".into()))?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_rfc3339_dates() {
        assert!(parse_iso8601("fromDate", "2024-01-01").is_err());
        assert!(parse_iso8601("fromDate", "2024-01-01T00:00:00Z").is_ok());
    }

    #[test]
    fn rejects_malformed_address() {
        assert!(parse_address("contractAddress", "not-an-address").is_err());
        assert!(parse_address("contractAddress", "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa").is_ok());
    }

    #[test]
    fn parses_known_job_statuses_only() {
        assert_eq!(parse_status("pending").unwrap(), JobStatus::Pending);
        assert_eq!(parse_status("failed").unwrap(), JobStatus::Failed);
        assert!(parse_status("bogus").is_err());
    }
}
