use sqlx::postgres::{PgPool, PgPoolOptions};

use super::Error;

/// Opens a bounded connection pool and applies pending migrations.
///
/// Connection count is bounded the way §5's "Shared resources: connection
/// pool (bounded)" requires; workers and the API server share one pool per
/// process rather than opening ad-hoc connections.
pub async fn connect(database_url: &str) -> Result<PgPool, Error> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(database_url)
        .await?;
    Ok(pool)
}

pub async fn migrate(pool: &PgPool) -> Result<(), Error> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
