use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Rpc(#[from] crate::rpc::Error),
    #[error(transparent)]
    Oracle(#[from] crate::oracle::Error),
    #[error(transparent)]
    Db(#[from] crate::db::Error),
    #[error(transparent)]
    Abi(#[from] crate::abi::Error),
}

impl Error {
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Rpc(e) => e.is_transient(),
            Error::Oracle(e) => e.is_transient(),
            Error::Db(e) => e.is_transient(),
            Error::Abi(_) => false,
        }
    }
}
