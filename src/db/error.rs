use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
    #[error("row not found")]
    NotFound,
    #[error("invalid address: {0}")]
    Address(#[from] crate::domain::AddressParseError),
}

impl Error {
    /// Transient-vs-terminal classification. Pool exhaustion
    /// and connection-level errors are worth retrying; a genuine constraint
    /// violation is not.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Sqlx(sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::PoolClosed)
        )
    }
}
