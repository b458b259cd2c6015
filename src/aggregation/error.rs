use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error(transparent)]
    Db(#[from] crate::db::Error),
    #[error(transparent)]
    Oracle(#[from] crate::oracle::Error),
}

impl Error {
    /// Short machine-readable tag for the consolidated dashboard's
    /// `errors[]` array.
    pub fn tag(&self) -> &'static str {
        match self {
            Error::Sqlx(_) | Error::Db(_) => "db_error",
            Error::Oracle(_) => "oracle_timeout",
        }
    }
}
