//! Aggregation engine: pure read-side rollups over
//! `transaction_details ⨝ transaction_enrichment ⨝ contracts ⨝ platforms`.
//! Every function here is a side-effect-free `fn(&PgPool, ...) ->
//! Result<T, Error>`; the dashboard handler composes them concurrently
//! rather than any of them calling another.

mod bridge;
mod cards;
mod circulated;
mod dashboard;
mod error;
mod lending;
mod metrics;
mod predicate;

pub use bridge::{bridge_summary, BridgePlatformBreakdown, BridgeSummary};
pub use cards::{card_result, cards_for_row, effective_card_type, CardPlatformBreakdown, CardResult};
pub use circulated::{circulated_volume, CirculatedVolume};
pub use dashboard::{dashboard, CardsByRow, Dashboard, DashboardStats};
pub use error::Error;
pub use lending::{lending_position, LendingPosition};
pub use metrics::{all_metrics, metric_result, FunctionCount, MetricResult, MetricSubAggregate};
