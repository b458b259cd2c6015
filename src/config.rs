//! Environment configuration.
//!
//! Parsed once in `main` and threaded through as an `Arc<Config>`, mirroring
//! how the teacher's `BscNodeArgs` flattens env-backed `clap` args into one
//! struct rather than reading `std::env` scattered across the codebase.

use std::env;
use std::time::Duration;

use thiserror::Error;

use crate::domain::Address;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub rpc_urls: Vec<String>,
    pub chain_id: u64,
    pub poll_interval: Duration,
    pub scanner_base_url: Option<String>,
    pub price_oracle_url: Option<String>,
    /// Known stablecoin addresses, first in the USD valuation fallback
    /// chain: summing known stablecoin `Transfer` amounts.
    pub stablecoins: Vec<Address>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = require("DATABASE_URL")?;

        let rpc_urls = match env::var("RPC_URLS") {
            Ok(v) if !v.trim().is_empty() => {
                v.split(',').map(|s| s.trim().to_string()).collect::<Vec<_>>()
            }
            _ => match env::var("RPC_URL") {
                Ok(v) if !v.trim().is_empty() => vec![v],
                _ => return Err(ConfigError::Missing("RPC_URL or RPC_URLS")),
            },
        };

        let chain_id = parse_env("CHAIN_ID")?;

        let poll_interval_ms: u64 = env::var("POLL_INTERVAL_MS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(15_000);

        let scanner_base_url = env::var("SCANNER_BASE_URL").ok().filter(|s| !s.is_empty());
        let price_oracle_url = env::var("PRICE_ORACLE_URL").ok().filter(|s| !s.is_empty());

        let stablecoins = match env::var("STABLECOIN_ADDRESSES") {
            Ok(v) if !v.trim().is_empty() => v
                .split(',')
                .map(|s| {
                    Address::parse(s.trim()).map_err(|_| ConfigError::Invalid {
                        name: "STABLECOIN_ADDRESSES",
                        value: s.trim().to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            _ => Vec::new(),
        };

        Ok(Self {
            database_url,
            rpc_urls,
            chain_id,
            poll_interval: Duration::from_millis(poll_interval_ms),
            scanner_base_url,
            price_oracle_url,
            stablecoins,
        })
    }
}

fn require(name: &'static str) -> Result<String, ConfigError> {
    env::var(name).map_err(|_| ConfigError::Missing(name))
}

fn parse_env<T: std::str::FromStr>(name: &'static str) -> Result<T, ConfigError> {
    let raw = require(name)?;
    raw.parse().map_err(|_| ConfigError::Invalid { name, value: raw })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear() {
        for key in [
            "DATABASE_URL",
            "RPC_URL",
            "RPC_URLS",
            "CHAIN_ID",
            "POLL_INTERVAL_MS",
            "STABLECOIN_ADDRESSES",
        ] {
            env::remove_var(key);
        }
    }

    #[test]
    fn parses_rpc_urls_list() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear();
        env::set_var("DATABASE_URL", "postgres://localhost/chainidx");
        env::set_var("RPC_URLS", "https://a.example, https://b.example");
        env::set_var("CHAIN_ID", "56");
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.rpc_urls, vec!["https://a.example", "https://b.example"]);
        assert_eq!(cfg.chain_id, 56);
        assert_eq!(cfg.poll_interval, Duration::from_millis(15_000));
        clear();
    }

    #[test]
    fn falls_back_to_single_rpc_url() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear();
        env::set_var("DATABASE_URL", "postgres://localhost/chainidx");
        env::set_var("RPC_URL", "https://a.example");
        env::set_var("CHAIN_ID", "1");
        let cfg = Config::from_env().unwrap();
        assert_eq!(cfg.rpc_urls, vec!["https://a.example"]);
        clear();
    }

    #[test]
    fn missing_database_url_errors() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear();
        env::set_var("RPC_URL", "https://a.example");
        env::set_var("CHAIN_ID", "1");
        assert!(matches!(Config::from_env(), Err(ConfigError::Missing("DATABASE_URL"))));
        clear();
    }
}
