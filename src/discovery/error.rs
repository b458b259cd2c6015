use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Rpc(#[from] crate::rpc::Error),
    #[error(transparent)]
    Scanner(#[from] crate::scanner::Error),
    #[error(transparent)]
    Db(#[from] crate::db::Error),
    #[error("malformed chain data: {0}")]
    Malformed(String),
}

impl Error {
    /// Transient-vs-terminal classification, consulted by the
    /// worker/dispatcher to decide retry wording; the job queue's own
    /// attempts/backoff bookkeeping drives the actual state machine.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Rpc(e) => e.is_transient(),
            Error::Scanner(e) => e.is_transient(),
            Error::Db(e) => e.is_transient(),
            Error::Malformed(_) => false,
        }
    }

    /// `eth_getLogs` "too many results" is surfaced by nodes as an
    /// application-level JSON-RPC error with a variety of vendor-specific
    /// messages; we match loosely on substrings rather than a fixed code.
    pub fn is_too_many_results(&self) -> bool {
        match self {
            Error::Rpc(crate::rpc::Error::JsonRpc { message, .. }) => {
                let m = message.to_ascii_lowercase();
                m.contains("too many") || m.contains("query returned more than") || m.contains("limit exceeded")
            }
            _ => false,
        }
    }
}
