pub mod contracts;
pub mod dashboard;
pub mod error;
pub mod jobs;
pub mod metrics;
pub mod nft;
pub mod platforms;
pub mod pool;
pub mod transactions;

pub use error::Error;
pub use pool::{connect, migrate};
