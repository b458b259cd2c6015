//! Core value types shared by storage, workers, and the read/admin APIs.
//!
//! Nothing in here talks to Postgres or the network; these are the plain
//! Rust shapes every other module agrees on.

mod address;
mod contract;
mod dashboard;
mod job;
mod metric;
mod nft;
mod platform;
mod transaction;

pub use address::{Address, AddressParseError};
pub use contract::{Contract, ContractKind};
pub use dashboard::{CardRow, CardType, DashboardCard};
pub use job::{Job, JobStatus, JobType};
pub use metric::{AggregationKind, Currency, Metric, MetricPredicate, WalletRole};
pub use nft::NftRecord;
pub use platform::Platform;
pub use transaction::{Log, TransactionDetail, TransactionEnrichment};
