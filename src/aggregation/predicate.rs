//! Compiles a [`MetricPredicate`] into a SQL `WHERE` fragment.
//!
//! spec.md §9 "Duck-typed aggregation over metric configs: replace runtime
//! attribute lookups with a tagged union for metric kind ... and an
//! explicit predicate struct" — this module is the compiler for that
//! struct. Built with `sqlx::QueryBuilder` rather than string
//! concatenation so every bound value still goes through the driver's
//! parameter encoding.

use alloy_primitives::{hex, keccak256};
use sqlx::{Postgres, QueryBuilder};

use crate::domain::{Address, MetricPredicate, WalletRole};

/// `keccak256` of an event's canonical signature, the topic0 an indexed
/// event-signature whitelist entry must match.
pub fn event_topic0(signature: &str) -> String {
    format!("0x{}", hex::encode(keccak256(signature.as_bytes())))
}

/// Best-effort "wallet received a token here" match: the predicate schema
/// has no recipient column, so this scans decoded `Transfer` logs for one
/// whose `to` topic (the 3rd topic, 0-indexed 2) resolves to `wallet`. A
/// documented simplification — see DESIGN.md.
fn push_recipient_match<'a>(qb: &mut QueryBuilder<'a, Postgres>, wallet: &Address) {
    let suffix = wallet.as_lowercase()[2..].to_string();
    qb.push(
        "EXISTS (SELECT 1 FROM jsonb_array_elements(COALESCE(te.logs, '[]'::jsonb)) AS log \
         WHERE jsonb_array_length(log -> 'topics') >= 3 \
         AND lower(right(log -> 'topics' ->> 2, 40)) = ",
    );
    qb.push_bind(suffix);
    qb.push(")");
}

/// Appends `WHERE ...` predicate clauses to a query already selecting from
/// `transaction_details td JOIN contracts c ON c.address = td.contract_address
/// LEFT JOIN transaction_enrichment te ON te.tx_hash = td.tx_hash`.
pub fn append_where(qb: &mut QueryBuilder<'_, Postgres>, predicate: &MetricPredicate, wallet: &Address) {
    qb.push(" WHERE td.status = 1 AND c.id = ANY(");
    qb.push_bind(predicate.contract_ids.clone());
    qb.push(")");

    match predicate.wallet_role {
        WalletRole::Sender => {
            qb.push(" AND td.wallet_address = ");
            qb.push_bind(wallet.as_lowercase());
        }
        WalletRole::Recipient => {
            qb.push(" AND ");
            push_recipient_match(qb, wallet);
        }
        WalletRole::Either => {
            qb.push(" AND (td.wallet_address = ");
            qb.push_bind(wallet.as_lowercase());
            qb.push(" OR ");
            push_recipient_match(qb, wallet);
            qb.push(")");
        }
    }

    if let Some(names) = &predicate.function_names {
        qb.push(" AND te.function_name = ANY(");
        qb.push_bind(names.clone());
        qb.push(")");
    }

    if let Some(sigs) = &predicate.event_signatures {
        let topics: Vec<String> = sigs.iter().map(|s| event_topic0(s)).collect();
        qb.push(
            " AND EXISTS (SELECT 1 FROM jsonb_array_elements(COALESCE(te.logs, '[]'::jsonb)) AS log \
             WHERE log -> 'topics' ->> 0 = ANY(",
        );
        qb.push_bind(topics);
        qb.push("))");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_topic0_matches_known_transfer_signature() {
        assert_eq!(event_topic0("Transfer(address,address,uint256)"), crate::abi::transfer_topic0());
    }
}
