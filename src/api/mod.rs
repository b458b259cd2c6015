//! Read and admin HTTP surfaces, built on `axum`.
//!
//! Every wallet-scoped route shares the [`wallet::WalletAddress`] extractor
//! so the `0x` + 40-hex-lowercase invariant is enforced exactly once.

mod admin;
pub mod error;
mod read;
pub mod state;
mod wallet;

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::AppState;

pub fn router(state: AppState) -> Router {
    let read_routes = Router::new()
        .route("/api/{wallet}/dashboard", get(read::dashboard))
        .route("/api/analytics/{wallet}", get(read::analytics))
        .route("/api/wallet/{wallet}/bridge", get(read::bridge))
        .route("/api/nft/leaderboard", get(read::leaderboard));

    let admin_contracts = Router::new()
        .route("/api/admin/contracts", get(admin::list_contracts).post(admin::create_contract))
        .route(
            "/api/admin/contracts/{id}",
            get(admin::get_contract).put(admin::update_contract).delete(admin::delete_contract),
        );

    let admin_metrics = Router::new()
        .route("/api/admin/metrics", get(admin::list_metrics).post(admin::create_metric))
        .route("/api/admin/metrics/{id}", get(admin::get_metric).delete(admin::delete_metric));

    let admin_cards = Router::new()
        .route("/api/admin/dashboard/cards", get(admin::list_cards).post(admin::create_card))
        .route(
            "/api/admin/dashboard/cards/{id}",
            get(admin::get_card).put(admin::update_card).delete(admin::delete_card),
        );

    let admin_backfill = Router::new()
        .route("/api/admin/backfill", get(admin::list_backfill_jobs).post(admin::create_backfill_job))
        .route(
            "/api/admin/backfill/{id}",
            get(admin::get_backfill_job).post(admin::retry_backfill_job).delete(admin::cancel_backfill_job),
        );

    Router::new()
        .merge(read_routes)
        .merge(admin_contracts)
        .merge(admin_metrics)
        .merge(admin_cards)
        .merge(admin_backfill)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
