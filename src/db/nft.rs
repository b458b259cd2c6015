use sqlx::PgPool;
use sqlx::Row;

use crate::domain::{Address, NftRecord};

use super::Error;

fn row_to_record(row: sqlx::postgres::PgRow) -> Result<NftRecord, Error> {
    let wallet_address: String = row.try_get("wallet_address")?;
    Ok(NftRecord {
        wallet_address: Address::parse(&wallet_address)?,
        token_id: row.try_get("token_id")?,
        score: row.try_get("score")?,
        rank: row.try_get("rank")?,
        image_url: row.try_get("image_url")?,
        minted_at: row.try_get("minted_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Paginated leaderboard, ordered by the precomputed `rank` column (rank
/// assignment belongs to the mint-authorization collaborator, not this crate).
pub async fn leaderboard(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<NftRecord>, Error> {
    let rows = sqlx::query(
        "SELECT * FROM wallet_nft_records ORDER BY rank ASC LIMIT $1 OFFSET $2",
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    rows.into_iter().map(row_to_record).collect()
}

pub async fn get_for_wallet(pool: &PgPool, wallet: &Address) -> Result<Option<NftRecord>, Error> {
    let row = sqlx::query("SELECT * FROM wallet_nft_records WHERE wallet_address = $1")
        .bind(wallet.as_lowercase())
        .fetch_optional(pool)
        .await?;
    row.map(row_to_record).transpose()
}

pub async fn count(pool: &PgPool) -> Result<i64, Error> {
    let row = sqlx::query("SELECT COUNT(*) AS n FROM wallet_nft_records").fetch_one(pool).await?;
    Ok(row.try_get("n")?)
}
