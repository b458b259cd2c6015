use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use chainidx::api::{self, AppState};
use chainidx::cli::{Cli, Command, WorkerRole};
use chainidx::config::Config;
use chainidx::oracle::HttpPriceOracle;
use chainidx::queue::Dispatcher;
use chainidx::rpc::RpcClientPool;
use chainidx::scanner::ScannerClient;
use chainidx::{db, discovery, enrichment, gapfill, telemetry};

const MAX_RPC_CONCURRENT: usize = 16;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = Cli::parse_args();
    telemetry::init(cli.json_logs);

    match cli.command {
        Command::Migrate => {
            let config = Config::from_env()?;
            let pool = db::pool::connect(&config.database_url).await?;
            db::pool::migrate(&pool).await?;
            info!("migrations applied");
        }
        Command::Serve(args) => {
            let config = Config::from_env()?;
            let pool = db::pool::connect(&config.database_url).await?;
            let rpc = Arc::new(RpcClientPool::new(config.rpc_urls.clone(), MAX_RPC_CONCURRENT));
            let scanner = config.scanner_base_url.clone().map(|url| Arc::new(ScannerClient::new(url)));
            let oracle = build_oracle(&config)?;

            let state = AppState::new(pool, rpc, scanner, oracle);
            let router = api::router(state);

            let listener = tokio::net::TcpListener::bind(&args.bind_addr).await?;
            info!(addr = %args.bind_addr, "serving read + admin API");

            let cancel = shutdown_token();
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { cancel.cancelled().await })
                .await?;
        }
        Command::Worker(args) => {
            let config = Config::from_env()?;
            let pool = db::pool::connect(&config.database_url).await?;
            let cancel = shutdown_token();

            match args.role {
                WorkerRole::Discovery => {
                    discovery::worker::run(pool, cancel).await?;
                }
                WorkerRole::Enrichment => {
                    let rpc = Arc::new(RpcClientPool::new(config.rpc_urls.clone(), MAX_RPC_CONCURRENT));
                    let oracle = build_oracle(&config)?;
                    enrichment::worker::run(pool, rpc, oracle, config.stablecoins.clone(), cancel).await?;
                }
                WorkerRole::GapFill { dry_run } => {
                    let rpc = RpcClientPool::new(config.rpc_urls.clone(), MAX_RPC_CONCURRENT);
                    gapfill::worker::run(pool, rpc, cancel, dry_run).await?;
                }
                WorkerRole::Dispatcher { concurrency } => {
                    let rpc = Arc::new(RpcClientPool::new(config.rpc_urls.clone(), MAX_RPC_CONCURRENT));
                    let scanner = config.scanner_base_url.clone().map(|url| Arc::new(ScannerClient::new(url)));
                    let oracle = build_oracle(&config)?;
                    let dispatcher =
                        Arc::new(Dispatcher::new(pool, rpc, scanner, oracle, config.stablecoins.clone()));
                    dispatcher.run(concurrency, cancel).await;
                }
            }
        }
    }

    Ok(())
}

fn build_oracle(config: &Config) -> eyre::Result<Arc<dyn chainidx::oracle::PriceOracle>> {
    let url = config
        .price_oracle_url
        .clone()
        .ok_or_else(|| eyre::eyre!("PRICE_ORACLE_URL must be set to serve or run enrichment/dispatcher workers"))?;
    Ok(Arc::new(HttpPriceOracle::new(url)))
}

/// Cancelled on SIGINT/SIGTERM so every worker loop drains its in-flight
/// batch before the process exits ("graceful shutdown").
fn shutdown_token() -> CancellationToken {
    let token = CancellationToken::new();
    let signal_token = token.clone();
    tokio::spawn(async move {
        let ctrl_c = async { tokio::signal::ctrl_c().await.expect("failed to install ctrl_c handler") };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler")
                .recv()
                .await;
        };
        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {}
            _ = terminate => {}
        }
        signal_token.cancel();
    });
    token
}
