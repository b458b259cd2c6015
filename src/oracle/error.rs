use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("oracle transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("oracle returned status {0}")]
    Status(u16),
    #[error("no price available for token at requested time")]
    NotFound,
    #[error("malformed oracle response: {0}")]
    InvalidResponse(String),
}

impl Error {
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Transport(e) => e.is_timeout() || e.is_connect(),
            Error::Status(code) => *code >= 500 || *code == 429,
            Error::NotFound | Error::InvalidResponse(_) => false,
        }
    }
}
