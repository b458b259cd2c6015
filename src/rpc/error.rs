use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("rpc transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rpc error {code}: {message}")]
    JsonRpc { code: i64, message: String },
    #[error("rpc request timed out")]
    Timeout,
    #[error("malformed rpc response: {0}")]
    InvalidResponse(String),
    #[error("all rpc endpoints exhausted")]
    EndpointsExhausted,
}

impl Error {
    /// Transient-vs-terminal classification. Rate limiting,
    /// timeouts, and connection failures are worth retrying on another
    /// endpoint; a malformed response or an application-level JSON-RPC
    /// error (e.g. invalid params) is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transport(e) => e.is_timeout() || e.is_connect() || e.status().is_none(),
            Error::Timeout => true,
            Error::JsonRpc { code, .. } => *code == -32005 || *code == -32603,
            Error::InvalidResponse(_) => false,
            Error::EndpointsExhausted => true,
        }
    }
}
