use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Address;

/// `count | volume` classification for a contract.
///
/// `Count` contracts only need tx counts; `Volume` contracts additionally
/// need enrichment (decoded function name, logs, USD value).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContractKind {
    Count,
    Volume,
}

/// A contract targeted for indexing, identified by its (lowercase, unique)
/// address. `name` is for display only — §9 Open Questions notes several
/// platforms reuse the same contract name, so callers must key on
/// `address`, never `name`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Contract {
    pub id: i64,
    pub address: Address,
    pub name: String,
    pub deploy_block: i64,
    pub kind: ContractKind,
    pub indexing_enabled: bool,
    pub fetch_transactions: bool,
    pub creation_date: DateTime<Utc>,
    /// Typed ABI fragment, only needed to decode function names for volume
    /// contracts. Stored as the raw JSON of an `alloy_json_abi::JsonAbi`.
    pub abi: Option<serde_json::Value>,
    pub consecutive_failures: i32,
    pub failed_at: Option<DateTime<Utc>>,
}

impl Contract {
    pub fn is_failed(&self) -> bool {
        self.failed_at.is_some()
    }
}
