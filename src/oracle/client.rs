use std::time::Duration;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Timelike, Utc};
use moka::sync::Cache;
use serde::Deserialize;

use crate::domain::Address;

use super::Error;

/// Pluggable USD price source. One HTTP-backed implementation
/// ships here; tests substitute a stub that never makes a network call.
#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn price_of(&self, token: Address, at: DateTime<Utc>) -> Result<BigDecimal, Error>;
}

#[derive(Clone, Debug, Deserialize)]
struct PriceResponse {
    price_usd: String,
}

/// Hour-bucketed cache key: the oracle only has hourly granularity, so two
/// lookups within the same hour hit the cache instead of re-fetching.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    token: Address,
    hour: i64,
}

pub struct HttpPriceOracle {
    base_url: String,
    http: reqwest::Client,
    cache: Cache<CacheKey, BigDecimal>,
}

impl HttpPriceOracle {
    pub fn new(base_url: String) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client builder with static config never fails");
        Self {
            base_url,
            http,
            cache: Cache::builder().max_capacity(50_000).build(),
        }
    }

    fn cache_key(token: Address, at: DateTime<Utc>) -> CacheKey {
        let truncated = at.with_minute(0).and_then(|t| t.with_second(0)).unwrap_or(at);
        CacheKey { token, hour: truncated.timestamp() / 3600 }
    }
}

#[async_trait]
impl PriceOracle for HttpPriceOracle {
    async fn price_of(&self, token: Address, at: DateTime<Utc>) -> Result<BigDecimal, Error> {
        let key = Self::cache_key(token, at);
        if let Some(price) = self.cache.get(&key) {
            return Ok(price);
        }
        let resp = self
            .http
            .get(format!("{}/v1/price", self.base_url))
            .query(&[("token", token.as_lowercase()), ("at", at.to_rfc3339())])
            .send()
            .await?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(Error::NotFound);
        }
        if !resp.status().is_success() {
            return Err(Error::Status(resp.status().as_u16()));
        }
        let body: PriceResponse = resp.json().await.map_err(|e| Error::InvalidResponse(e.to_string()))?;
        let price: BigDecimal = body
            .price_usd
            .parse()
            .map_err(|_| Error::InvalidResponse(format!("not a decimal: {}", body.price_usd)))?;
        self.cache.insert(key, price.clone());
        Ok(price)
    }
}
