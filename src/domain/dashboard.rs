use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CardRow {
    Row3,
    Row4,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CardType {
    Aggregate,
    Single,
}

/// Admin-defined grouping of metrics + platforms rendered as one UI tile.
///
/// `card_type` is stored as configured by the admin, but the read API
/// additionally derives the effective variant from `platform_ids.len()`:
/// cards with only one platform always render as the `single` variant.
/// See `aggregation::cards::effective_card_type`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DashboardCard {
    pub id: i64,
    pub row: CardRow,
    pub card_type: CardType,
    pub title: String,
    pub subtitle: Option<String>,
    pub color: String,
    pub display_order: i32,
    pub is_active: bool,
    pub metric_ids: Vec<i64>,
    pub platform_ids: Vec<i64>,
}
