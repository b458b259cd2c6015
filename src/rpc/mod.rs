mod client;
mod error;
mod types;

pub use client::RpcClientPool;
pub use error::Error;
pub use types::{parse_hex_u64, RawLog, RawReceipt, RawTransaction};
