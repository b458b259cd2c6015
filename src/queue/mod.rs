//! Priority + retry + lease-based job dispatcher.
//!
//! [`engine`] exposes typed enqueue/admin helpers over `db::jobs`;
//! [`dispatcher`] leases and executes jobs of all three kinds, translating
//! discovery/enrichment outcomes into `complete`/`fail` calls.

pub mod dispatcher;
mod engine;
mod error;

pub use dispatcher::Dispatcher;
pub use engine::*;
pub use error::Error;
