use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Eth,
    Count,
}

/// Tagged union replacing a duck-typed "look up an attribute by name"
/// aggregation config.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AggregationKind {
    SumEth,
    SumUsd,
    Count,
    CountDistinctTx,
}

/// Which side of the transaction the wallet must be on for a predicate to
/// match.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WalletRole {
    Sender,
    Recipient,
    Either,
}

/// A conjunction over contract set, optional function-name whitelist,
/// optional event-signature whitelist, and sender/recipient role.
///
/// Explicit predicate struct in place of runtime attribute lookups —
/// `aggregation::predicate` compiles one of these into a SQL fragment.
#[derive(Clone, Debug)]
pub struct MetricPredicate {
    pub contract_ids: Vec<i64>,
    pub function_names: Option<Vec<String>>,
    pub event_signatures: Option<Vec<String>>,
    pub wallet_role: WalletRole,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Metric {
    pub id: i64,
    pub slug: String,
    pub name: String,
    pub currency: Currency,
    pub aggregation: AggregationKind,
    #[serde(skip)]
    pub predicate: MetricPredicate,
}
