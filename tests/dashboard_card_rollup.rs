//! Dashboard card rollup against a real Postgres instance (spec.md §8
//! scenario 4: an aggregate card bound to two metrics and two platforms).

use chainidx::aggregation::{card_result, cards_for_row};
use chainidx::db;
use chainidx::domain::{
    AggregationKind, Currency, CardRow, CardType, MetricPredicate, WalletRole,
};
use sqlx::PgPool;

const WALLET: &str = "0x1111111111111111111111111111111111111111";

async fn seed_platform(pool: &PgPool, slug: &str) -> i64 {
    db::platforms::create(
        pool,
        db::platforms::NewPlatform { slug: slug.into(), name: slug.into(), logo_url: None, website_url: None },
    )
    .await
    .unwrap()
    .id
}

async fn seed_contract(pool: &PgPool, address: &str, platform_id: i64) -> i64 {
    let contract = db::contracts::create(
        pool,
        db::contracts::NewContract {
            address: chainidx::domain::Address::parse(address).unwrap(),
            name: address.into(),
            deploy_block: 0,
            kind: chainidx::domain::ContractKind::Volume,
            indexing_enabled: true,
            fetch_transactions: false,
            creation_date: chrono::Utc::now(),
            abi: None,
        },
    )
    .await
    .unwrap();
    db::platforms::link_contract(pool, contract.id, platform_id).await.unwrap();
    contract.id
}

async fn seed_metric(pool: &PgPool, slug: &str, contract_id: i64) -> i64 {
    db::metrics::create(
        pool,
        db::metrics::NewMetric {
            slug: slug.into(),
            name: slug.into(),
            currency: Currency::Usd,
            aggregation: AggregationKind::SumUsd,
            predicate: MetricPredicate {
                contract_ids: vec![contract_id],
                function_names: None,
                event_signatures: None,
                wallet_role: WalletRole::Either,
            },
        },
    )
    .await
    .unwrap()
    .id
}

async fn seed_tx(pool: &PgPool, tx_hash: &str, contract_address: &str, usd_value: &str) {
    sqlx::query(
        "INSERT INTO transaction_details
            (tx_hash, contract_address, wallet_address, block_number, block_timestamp, status, eth_value, gas_used)
         VALUES ($1, $2, $3, 1, now(), 1, 0, 21000)",
    )
    .bind(tx_hash)
    .bind(contract_address)
    .bind(WALLET)
    .execute(pool)
    .await
    .unwrap();

    sqlx::query("INSERT INTO transaction_enrichment (tx_hash, usd_value) VALUES ($1, $2::numeric)")
        .bind(tx_hash)
        .bind(usd_value)
        .execute(pool)
        .await
        .unwrap();
}

#[sqlx::test]
async fn card_rollup_sums_across_platforms(pool: PgPool) {
    let p1 = seed_platform(&pool, "p1").await;
    let p2 = seed_platform(&pool, "p2").await;
    let c1 = seed_contract(&pool, "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", p1).await;
    let c2 = seed_contract(&pool, "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb", p2).await;
    let m1 = seed_metric(&pool, "m1", c1).await;
    let m2 = seed_metric(&pool, "m2", c2).await;

    seed_tx(&pool, "0x01", "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "6").await;
    seed_tx(&pool, "0x02", "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "4").await;
    seed_tx(&pool, "0x03", "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb", "5").await;

    let card = db::dashboard::create(
        &pool,
        db::dashboard::NewDashboardCard {
            row: CardRow::Row3,
            card_type: CardType::Aggregate,
            title: "Total volume".into(),
            subtitle: None,
            color: "#000".into(),
            display_order: 0,
            is_active: true,
            metric_ids: vec![m1, m2],
            platform_ids: vec![p1, p2],
        },
    )
    .await
    .unwrap();

    let wallet = chainidx::domain::Address::parse(WALLET).unwrap();
    let result = card_result(&pool, &card, &wallet).await.unwrap();

    assert_eq!(result.total_value, bigdecimal::BigDecimal::from(15));
    assert_eq!(result.total_count, 3);
    assert_eq!(result.by_platform.len(), 2);
    assert_eq!(result.by_platform[0].value, bigdecimal::BigDecimal::from(10));
    assert_eq!(result.by_platform[0].count, 2);
    assert_eq!(result.by_platform[1].value, bigdecimal::BigDecimal::from(5));
    assert_eq!(result.by_platform[1].count, 1);

    let row3 = cards_for_row(&pool, CardRow::Row3, &wallet).await.unwrap();
    assert_eq!(row3.len(), 1);
    assert_eq!(row3[0].id, card.id);
}
