//! Dashboard card rollup ("Dashboard cards: for each active
//! card, the engine computes `totalValue` and `totalCount` by summing the
//! card's metric values over the card's platform set, then returns a
//! `byPlatform` breakdown ordered by descending value").

use bigdecimal::BigDecimal;
use serde::Serialize;
use sqlx::PgPool;

use crate::db;
use crate::domain::{Address, CardType, DashboardCard, Metric};

use super::metrics::metric_result;
use super::Error;

/// Cards with a single platform render as `single` regardless of their
/// configured `card_type`. Cards with more than one platform
/// keep whatever `card_type` the admin configured.
pub fn effective_card_type(card: &DashboardCard) -> CardType {
    if card.platform_ids.len() <= 1 {
        CardType::Single
    } else {
        card.card_type
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CardPlatformBreakdown {
    pub platform: String,
    pub value: BigDecimal,
    pub count: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct CardResult {
    pub id: i64,
    pub title: String,
    pub subtitle: Option<String>,
    pub color: String,
    pub card_type: CardType,
    pub total_value: BigDecimal,
    pub total_count: i64,
    pub by_platform: Vec<CardPlatformBreakdown>,
}

fn restricted_to(metric: &Metric, contract_ids: &[i64]) -> Metric {
    let mut restricted = metric.clone();
    restricted.predicate.contract_ids =
        restricted.predicate.contract_ids.iter().copied().filter(|id| contract_ids.contains(id)).collect();
    restricted
}

async fn load_metrics(pool: &PgPool, metric_ids: &[i64]) -> Result<Vec<Metric>, Error> {
    let mut metrics = Vec::with_capacity(metric_ids.len());
    for id in metric_ids {
        if let Some(metric) = db::metrics::get(pool, *id).await? {
            metrics.push(metric);
        }
    }
    Ok(metrics)
}

/// Computes one card's rollup for `wallet`: total value/count across every
/// metric on the card, restricted per platform to that platform's
/// contracts, ordered by descending value.
pub async fn card_result(pool: &PgPool, card: &DashboardCard, wallet: &Address) -> Result<CardResult, Error> {
    let metrics = load_metrics(pool, &card.metric_ids).await?;

    let mut by_platform = Vec::with_capacity(card.platform_ids.len());
    let mut total_value = BigDecimal::from(0);
    let mut total_count = 0i64;

    for platform_id in &card.platform_ids {
        let Some(platform) = db::platforms::get(pool, *platform_id).await? else { continue };
        let contract_ids = db::platforms::contract_ids_for_platform(pool, *platform_id).await?;

        let mut value = BigDecimal::from(0);
        let mut count = 0i64;
        for metric in &metrics {
            let result = metric_result(pool, &restricted_to(metric, &contract_ids), wallet).await?;
            value += result.total_value;
            count += result.total_count;
        }

        total_value += &value;
        total_count += count;
        by_platform.push(CardPlatformBreakdown { platform: platform.name, value, count });
    }

    by_platform.sort_by(|a, b| b.value.cmp(&a.value));

    Ok(CardResult {
        id: card.id,
        title: card.title.clone(),
        subtitle: card.subtitle.clone(),
        color: card.color.clone(),
        card_type: effective_card_type(card),
        total_value,
        total_count,
        by_platform,
    })
}

/// Computes every active card in one row for the dashboard's `cards.row3`
/// / `cards.row4` fields.
pub async fn cards_for_row(pool: &PgPool, row: crate::domain::CardRow, wallet: &Address) -> Result<Vec<CardResult>, Error> {
    let all = db::dashboard::list_active(pool).await?;
    let mut results = Vec::new();
    for card in all.into_iter().filter(|c| c.row == row) {
        results.push(card_result(pool, &card, wallet).await?);
    }
    Ok(results)
}
