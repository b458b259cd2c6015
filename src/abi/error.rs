use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("stored ABI is not valid JSON ABI: {0}")]
    InvalidAbiJson(String),
    #[error("log data too short to contain word {0}")]
    TruncatedData(usize),
    #[error("malformed hex: {0}")]
    InvalidHex(String),
}
