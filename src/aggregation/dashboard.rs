//! Consolidated dashboard endpoint, composing every other aggregate in one
//! response.
//!
//! Every sub-aggregate is an independent, side-effect-free read; they run
//! concurrently via `tokio::join!` (grounded in cowprotocol-services'
//! `Maintenance::update`, which runs independent update tasks the same way
//! before a final dependent step). A failed sub-aggregate becomes a `null`
//! field plus an entry in `errors[]` rather than failing the whole response.
//! The platform-specific fields (`marvk`, `nado`, `gmCount`,
//! `inkypumpCreatedTokens`, ...) are pure views over whichever metric is
//! registered under the matching slug, rather than one hardcoded query per
//! platform; see DESIGN.md.

use bigdecimal::BigDecimal;
use serde::Serialize;
use sqlx::PgPool;

use crate::domain::{Address, CardRow, NftRecord};

use super::bridge::{bridge_summary, BridgeSummary};
use super::cards::{cards_for_row, CardResult};
use super::circulated::{circulated_volume, CirculatedVolume};
use super::lending::{lending_position, LendingPosition};
use super::metrics::{all_metrics, metric_result, MetricResult};
use super::Error;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub tx_count: i64,
    pub usd_value: BigDecimal,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardsByRow {
    pub row3: Vec<CardResult>,
    pub row4: Vec<CardResult>,
}

#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Dashboard {
    pub stats: Option<DashboardStats>,
    pub bridge: Option<BridgeSummary>,
    pub swap: Option<MetricResult>,
    pub volume: Option<CirculatedVolume>,
    pub score: Option<NftRecord>,
    pub analytics: Option<Vec<MetricResult>>,
    pub cards: CardsByRow,
    pub marvk: Option<i64>,
    pub nado: Option<i64>,
    pub copink: Option<i64>,
    pub nft2me: Option<i64>,
    pub tydro: Option<LendingPosition>,
    pub gm_count: Option<i64>,
    pub inkypump_created_tokens: Option<i64>,
    pub inkypump_buy_volume: Option<BigDecimal>,
    pub inkypump_sell_volume: Option<BigDecimal>,
    pub nft_traded: Option<i64>,
    pub zns: Option<i64>,
    pub shellies_joined_raffles: Option<i64>,
    pub shellies_pay_to_play: Option<i64>,
    pub shellies_staking: Option<i64>,
    pub opensea_buy_count: Option<i64>,
    pub mint_count: Option<i64>,
    pub opensea_sale_count: Option<i64>,
    pub errors: Vec<String>,
}

fn take<T>(errors: &mut Vec<String>, tag: &'static str, result: Result<T, Error>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            errors.push(format!("{tag}: {}", e.tag()));
            None
        }
    }
}

fn take_opt<T>(errors: &mut Vec<String>, tag: &'static str, result: Result<Option<T>, Error>) -> Option<T> {
    match result {
        Ok(v) => v,
        Err(e) => {
            errors.push(format!("{tag}: {}", e.tag()));
            None
        }
    }
}

async fn stats(pool: &PgPool, wallet: &Address) -> Result<DashboardStats, Error> {
    let contracts = crate::db::contracts::list_enabled(pool).await?;
    let contract_ids: Vec<i64> = contracts.iter().map(|c| c.id).collect();
    let tx_count = crate::db::transactions::count_for_wallet_and_contracts(pool, wallet, &contract_ids).await?;
    let usd_value = crate::db::transactions::usd_sum_for_wallet_and_contracts(pool, wallet, &contract_ids).await?;
    Ok(DashboardStats { tx_count, usd_value })
}

async fn metric_by_slug(pool: &PgPool, slug: &str, wallet: &Address) -> Result<Option<MetricResult>, Error> {
    let Some(metric) = crate::db::metrics::get_by_slug(pool, slug).await? else { return Ok(None) };
    Ok(Some(metric_result(pool, &metric, wallet).await?))
}

async fn metric_count(pool: &PgPool, slug: &str, wallet: &Address) -> Result<Option<i64>, Error> {
    Ok(metric_by_slug(pool, slug, wallet).await?.map(|m| m.total_count))
}

async fn metric_usd(pool: &PgPool, slug: &str, wallet: &Address) -> Result<Option<BigDecimal>, Error> {
    Ok(metric_by_slug(pool, slug, wallet).await?.map(|m| m.total_value))
}

/// Assembles the full consolidated dashboard for `wallet`. Never fails: a
/// sub-aggregate's own error is folded into `errors[]` and its field is
/// left `null` instead.
pub async fn dashboard(pool: &PgPool, wallet: &Address) -> Dashboard {
    let (
        stats_r,
        bridge_r,
        swap_r,
        volume_r,
        score_r,
        analytics_r,
        row3_r,
        row4_r,
        marvk_r,
        nado_r,
        copink_r,
        nft2me_r,
        tydro_r,
        gm_count_r,
        inkypump_created_r,
        inkypump_buy_r,
        inkypump_sell_r,
        nft_traded_r,
        zns_r,
        shellies_raffles_r,
        shellies_pay_r,
        shellies_staking_r,
        opensea_buy_r,
        mint_count_r,
        opensea_sale_r,
    ) = tokio::join!(
        stats(pool, wallet),
        bridge_summary(pool, wallet),
        metric_by_slug(pool, "swap", wallet),
        circulated_volume(pool, wallet),
        async { crate::db::nft::get_for_wallet(pool, wallet).await.map_err(Error::from) },
        all_metrics(pool, wallet),
        cards_for_row(pool, CardRow::Row3, wallet),
        cards_for_row(pool, CardRow::Row4, wallet),
        metric_count(pool, "marvk", wallet),
        metric_count(pool, "nado", wallet),
        metric_count(pool, "copink", wallet),
        metric_count(pool, "nft2me", wallet),
        lending_position(pool, wallet),
        metric_count(pool, "gm-count", wallet),
        metric_count(pool, "inkypump-created-tokens", wallet),
        metric_usd(pool, "inkypump-buy-volume", wallet),
        metric_usd(pool, "inkypump-sell-volume", wallet),
        metric_count(pool, "nft-traded", wallet),
        metric_count(pool, "zns", wallet),
        metric_count(pool, "shellies-joined-raffles", wallet),
        metric_count(pool, "shellies-pay-to-play", wallet),
        metric_count(pool, "shellies-staking", wallet),
        metric_count(pool, "opensea-buy-count", wallet),
        metric_count(pool, "mint-count", wallet),
        metric_count(pool, "opensea-sale-count", wallet),
    );

    let mut errors = Vec::new();

    let dashboard = Dashboard {
        stats: take(&mut errors, "stats", stats_r),
        bridge: take(&mut errors, "bridge", bridge_r),
        swap: take_opt(&mut errors, "swap", swap_r),
        volume: take(&mut errors, "volume", volume_r),
        score: take_opt(&mut errors, "score", score_r),
        analytics: take(&mut errors, "analytics", analytics_r),
        cards: CardsByRow {
            row3: take(&mut errors, "cards.row3", row3_r).unwrap_or_default(),
            row4: take(&mut errors, "cards.row4", row4_r).unwrap_or_default(),
        },
        marvk: take_opt(&mut errors, "marvk", marvk_r),
        nado: take_opt(&mut errors, "nado", nado_r),
        copink: take_opt(&mut errors, "copink", copink_r),
        nft2me: take_opt(&mut errors, "nft2me", nft2me_r),
        tydro: take(&mut errors, "tydro", tydro_r),
        gm_count: take_opt(&mut errors, "gmCount", gm_count_r),
        inkypump_created_tokens: take_opt(&mut errors, "inkypumpCreatedTokens", inkypump_created_r),
        inkypump_buy_volume: take_opt(&mut errors, "inkypumpBuyVolume", inkypump_buy_r),
        inkypump_sell_volume: take_opt(&mut errors, "inkypumpSellVolume", inkypump_sell_r),
        nft_traded: take_opt(&mut errors, "nftTraded", nft_traded_r),
        zns: take_opt(&mut errors, "zns", zns_r),
        shellies_joined_raffles: take_opt(&mut errors, "shelliesJoinedRaffles", shellies_raffles_r),
        shellies_pay_to_play: take_opt(&mut errors, "shelliesPayToPlay", shellies_pay_r),
        shellies_staking: take_opt(&mut errors, "shelliesStaking", shellies_staking_r),
        opensea_buy_count: take_opt(&mut errors, "openseaBuyCount", opensea_buy_r),
        mint_count: take_opt(&mut errors, "mintCount", mint_count_r),
        opensea_sale_count: take_opt(&mut errors, "openseaSaleCount", opensea_sale_r),
        errors: Vec::new(),
    };

    Dashboard { errors, ..dashboard }
}
