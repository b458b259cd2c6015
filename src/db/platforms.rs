use sqlx::PgPool;
use sqlx::Row;

use crate::domain::Platform;

use super::Error;

fn row_to_platform(row: sqlx::postgres::PgRow) -> Result<Platform, Error> {
    Ok(Platform {
        id: row.try_get("id")?,
        slug: row.try_get("slug")?,
        name: row.try_get("name")?,
        logo_url: row.try_get("logo_url")?,
        website_url: row.try_get("website_url")?,
    })
}

pub async fn list(pool: &PgPool) -> Result<Vec<Platform>, Error> {
    let rows = sqlx::query("SELECT * FROM platforms ORDER BY id").fetch_all(pool).await?;
    rows.into_iter().map(row_to_platform).collect()
}

pub async fn get(pool: &PgPool, id: i64) -> Result<Option<Platform>, Error> {
    let row = sqlx::query("SELECT * FROM platforms WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.map(row_to_platform).transpose()
}

pub async fn get_by_slug(pool: &PgPool, slug: &str) -> Result<Option<Platform>, Error> {
    let row = sqlx::query("SELECT * FROM platforms WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    row.map(row_to_platform).transpose()
}

pub async fn exists(pool: &PgPool, id: i64) -> Result<bool, Error> {
    let row = sqlx::query("SELECT EXISTS(SELECT 1 FROM platforms WHERE id = $1) AS present")
        .bind(id)
        .fetch_one(pool)
        .await?;
    Ok(row.try_get("present")?)
}

pub struct NewPlatform {
    pub slug: String,
    pub name: String,
    pub logo_url: Option<String>,
    pub website_url: Option<String>,
}

pub async fn create(pool: &PgPool, new: NewPlatform) -> Result<Platform, Error> {
    let row = sqlx::query(
        "INSERT INTO platforms (slug, name, logo_url, website_url)
         VALUES ($1, $2, $3, $4) RETURNING *",
    )
    .bind(new.slug)
    .bind(new.name)
    .bind(new.logo_url)
    .bind(new.website_url)
    .fetch_one(pool)
    .await?;
    row_to_platform(row)
}

pub async fn platforms_for_contract(pool: &PgPool, contract_id: i64) -> Result<Vec<Platform>, Error> {
    let rows = sqlx::query(
        "SELECT p.* FROM platforms p
         JOIN contract_platforms cp ON cp.platform_id = p.id
         WHERE cp.contract_id = $1
         ORDER BY p.id",
    )
    .bind(contract_id)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(row_to_platform).collect()
}

/// Contract ids linked to a platform, used by the dashboard card aggregate
/// to restrict a metric's contract set to one platform at a time
/// ("by-platform breakdown").
pub async fn contract_ids_for_platform(pool: &PgPool, platform_id: i64) -> Result<Vec<i64>, Error> {
    let rows = sqlx::query("SELECT contract_id FROM contract_platforms WHERE platform_id = $1")
        .bind(platform_id)
        .fetch_all(pool)
        .await?;
    rows.into_iter().map(|r| Ok(r.try_get("contract_id")?)).collect()
}

pub async fn link_contract(pool: &PgPool, contract_id: i64, platform_id: i64) -> Result<(), Error> {
    sqlx::query(
        "INSERT INTO contract_platforms (contract_id, platform_id)
         VALUES ($1, $2) ON CONFLICT DO NOTHING",
    )
    .bind(contract_id)
    .bind(platform_id)
    .execute(pool)
    .await?;
    Ok(())
}
