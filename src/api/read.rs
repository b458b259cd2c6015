//! Read API handlers ("HTTP read API (selected)").

use axum::extract::{Query, State};
use axum::response::Json;
use serde::{Deserialize, Serialize};

use crate::aggregation;
use crate::db;

use super::error::ApiError;
use super::state::AppState;
use super::wallet::WalletAddress;

#[derive(Deserialize)]
pub struct DashboardQuery {
    #[serde(default)]
    refresh: bool,
}

/// `GET /api/{wallet}/dashboard` — one JSON object composing every
/// sub-aggregate the UI needs; missing pieces are `null` with an entry in
/// `errors[]` rather than failing the whole response.
pub async fn dashboard(
    State(state): State<AppState>,
    WalletAddress(wallet): WalletAddress,
    Query(query): Query<DashboardQuery>,
) -> Result<Json<aggregation::Dashboard>, ApiError> {
    if query.refresh && !state.try_begin_refresh(&wallet) {
        return Err(ApiError::RateLimited(
            "force refresh is rate limited to once per 30s per wallet".into(),
        ));
    }
    Ok(Json(aggregation::dashboard(&state.pool, &wallet).await))
}

/// `GET /api/analytics/{wallet}` — every registered metric evaluated for
/// one wallet.
#[derive(Serialize)]
pub struct AnalyticsResponse {
    pub metrics: Vec<aggregation::MetricResult>,
}

pub async fn analytics(
    State(state): State<AppState>,
    WalletAddress(wallet): WalletAddress,
) -> Result<Json<AnalyticsResponse>, ApiError> {
    let metrics = aggregation::all_metrics(&state.pool, &wallet).await?;
    Ok(Json(AnalyticsResponse { metrics }))
}

/// `GET /api/wallet/{wallet}/bridge` — bridge volume breakdown.
pub async fn bridge(
    State(state): State<AppState>,
    WalletAddress(wallet): WalletAddress,
) -> Result<Json<aggregation::BridgeSummary>, ApiError> {
    Ok(Json(aggregation::bridge_summary(&state.pool, &wallet).await?))
}

#[derive(Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_page")]
    page: i64,
}

fn default_page() -> i64 {
    1
}

const LEADERBOARD_PAGE_SIZE: i64 = 50;

#[derive(Serialize)]
pub struct LeaderboardEntry {
    pub wallet_address: String,
    pub token_id: String,
    pub score: i64,
    pub rank: i64,
    pub nft_image_url: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardResponse {
    pub leaderboard: Vec<LeaderboardEntry>,
    pub total: i64,
    pub limit: i64,
    pub current_page: i64,
    pub total_pages: i64,
    pub has_more: bool,
}

/// `GET /api/nft/leaderboard?page=N` — paginated wallet-score leaderboard.
///
/// Two leaderboard response shapes exist in the wild, with and without
/// `minted_at`/`updated_at`. This adopts the narrower shape; see
/// DESIGN.md for the decision.
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<LeaderboardResponse>, ApiError> {
    let page = query.page.max(1);
    let offset = (page - 1) * LEADERBOARD_PAGE_SIZE;
    let records = db::nft::leaderboard(&state.pool, LEADERBOARD_PAGE_SIZE, offset).await?;
    let total = db::nft::count(&state.pool).await?;
    let total_pages = if total == 0 { 1 } else { (total + LEADERBOARD_PAGE_SIZE - 1) / LEADERBOARD_PAGE_SIZE };

    let leaderboard = records
        .into_iter()
        .map(|r| LeaderboardEntry {
            wallet_address: r.wallet_address.to_string(),
            token_id: r.token_id,
            score: r.score,
            rank: r.rank,
            nft_image_url: r.image_url,
        })
        .collect();

    Ok(Json(LeaderboardResponse {
        leaderboard,
        total,
        limit: LEADERBOARD_PAGE_SIZE,
        current_page: page,
        total_pages,
        has_more: page < total_pages,
    }))
}
