use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Db(#[from] crate::db::Error),
    #[error(transparent)]
    Discovery(#[from] crate::discovery::Error),
    #[error(transparent)]
    Enrichment(#[from] crate::enrichment::Error),
    #[error("job {0} references a contract that no longer exists")]
    MissingContract(i64),
    #[error("job {0} has a malformed payload: {1}")]
    MalformedPayload(i64, String),
}
