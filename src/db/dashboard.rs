use sqlx::PgPool;
use sqlx::Row;

use crate::domain::{CardRow, CardType, DashboardCard};

use super::Error;

async fn load_metric_ids(pool: &PgPool, card_id: i64) -> Result<Vec<i64>, Error> {
    let rows = sqlx::query("SELECT metric_id FROM dashboard_card_metrics WHERE card_id = $1 ORDER BY metric_id")
        .bind(card_id)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(|r| Ok(r.try_get("metric_id")?)).collect()
}

async fn load_platform_ids(pool: &PgPool, card_id: i64) -> Result<Vec<i64>, Error> {
    let rows = sqlx::query("SELECT platform_id FROM dashboard_card_platforms WHERE card_id = $1 ORDER BY platform_id")
        .bind(card_id)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(|r| Ok(r.try_get("platform_id")?)).collect()
}

async fn row_to_card(pool: &PgPool, row: sqlx::postgres::PgRow) -> Result<DashboardCard, Error> {
    let id: i64 = row.try_get("id")?;
    Ok(DashboardCard {
        id,
        row: row.try_get("row")?,
        card_type: row.try_get("card_type")?,
        title: row.try_get("title")?,
        subtitle: row.try_get("subtitle")?,
        color: row.try_get("color")?,
        display_order: row.try_get("display_order")?,
        is_active: row.try_get("is_active")?,
        metric_ids: load_metric_ids(pool, id).await?,
        platform_ids: load_platform_ids(pool, id).await?,
    })
}

pub async fn list_active(pool: &PgPool) -> Result<Vec<DashboardCard>, Error> {
    let rows = sqlx::query("SELECT * FROM dashboard_cards WHERE is_active = true ORDER BY row, display_order")
        .fetch_all(pool)
        .await?;
    let mut cards = Vec::with_capacity(rows.len());
    for row in rows {
        cards.push(row_to_card(pool, row).await?);
    }
    Ok(cards)
}

pub async fn list_all(pool: &PgPool) -> Result<Vec<DashboardCard>, Error> {
    let rows = sqlx::query("SELECT * FROM dashboard_cards ORDER BY row, display_order")
        .fetch_all(pool)
        .await?;
    let mut cards = Vec::with_capacity(rows.len());
    for row in rows {
        cards.push(row_to_card(pool, row).await?);
    }
    Ok(cards)
}

pub async fn get(pool: &PgPool, id: i64) -> Result<Option<DashboardCard>, Error> {
    let row = sqlx::query("SELECT * FROM dashboard_cards WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    match row {
        Some(row) => Ok(Some(row_to_card(pool, row).await?)),
        None => Ok(None),
    }
}

pub struct NewDashboardCard {
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

pub async fn create(pool: &PgPool, new: NewDashboardCard) -> Result<DashboardCard, Error> {
    let mut tx = pool.begin().await?;
    let row = sqlx::query(
        "INSERT INTO dashboard_cards
            (row, card_type, title, subtitle, color, display_order, is_active)
         VALUES ($1, $2, $3, $4, $5, $6, $7)
         RETURNING id",
    )
    .bind(new.row)
    .bind(new.card_type)
    .bind(&new.title)
    .bind(&new.subtitle)
    .bind(&new.color)
    .bind(new.display_order)
    .bind(new.is_active)
    .fetch_one(&mut *tx)
    .await?;
    let id: i64 = row.try_get("id")?;
    for metric_id in &new.metric_ids {
        sqlx::query("INSERT INTO dashboard_card_metrics (card_id, metric_id) VALUES ($1, $2)")
            .bind(id)
            .bind(metric_id)
            .execute(&mut *tx)
            .await?;
    }
    for platform_id in &new.platform_ids {
        sqlx::query("INSERT INTO dashboard_card_platforms (card_id, platform_id) VALUES ($1, $2)")
            .bind(id)
            .bind(platform_id)
            .execute(&mut *tx)
            .await?;
    }
    tx.commit().await?;
    get(pool, id).await?.ok_or(Error::NotFound)
}

pub struct CardUpdate {
    pub title: Option<String>,
    pub subtitle: Option<Option<String>>,
    pub color: Option<String>,
    pub display_order: Option<i32>,
    pub is_active: Option<bool>,
}

/// Partial update for the admin `PUT /api/admin/dashboard/cards/{id}`
/// endpoint. Metric/platform membership is fixed at creation and not
/// settable here; only the fields below are mutable post-creation.
pub async fn update(pool: &PgPool, id: i64, update: CardUpdate) -> Result<Option<DashboardCard>, Error> {
    if let Some(title) = update.title {
        sqlx::query("UPDATE dashboard_cards SET title = $2 WHERE id = $1").bind(id).bind(title).execute(pool).await?;
    }
    if let Some(subtitle) = update.subtitle {
        sqlx::query("UPDATE dashboard_cards SET subtitle = $2 WHERE id = $1")
            .bind(id)
            .bind(subtitle)
            .execute(pool)
            .await?;
    }
    if let Some(color) = update.color {
        sqlx::query("UPDATE dashboard_cards SET color = $2 WHERE id = $1").bind(id).bind(color).execute(pool).await?;
    }
    if let Some(order) = update.display_order {
        sqlx::query("UPDATE dashboard_cards SET display_order = $2 WHERE id = $1")
            .bind(id)
            .bind(order)
            .execute(pool)
            .await?;
    }
    if let Some(active) = update.is_active {
        sqlx::query("UPDATE dashboard_cards SET is_active = $2 WHERE id = $1")
            .bind(id)
            .bind(active)
            .execute(pool)
            .await?;
    }
    get(pool, id).await
}

pub async fn set_active(pool: &PgPool, id: i64, is_active: bool) -> Result<(), Error> {
    sqlx::query("UPDATE dashboard_cards SET is_active = $2 WHERE id = $1")
        .bind(id)
        .bind(is_active)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn delete(pool: &PgPool, id: i64) -> Result<(), Error> {
    sqlx::query("DELETE FROM dashboard_cards WHERE id = $1").bind(id).execute(pool).await?;
    Ok(())
}
