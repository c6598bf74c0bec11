//! Price/reserve data source
//!
//! Turns a mint identifier into a [`PoolState`] snapshot. The HTTP adapter
//! retries its own GET, so callers must not wrap it in a second retry loop.

use async_trait::async_trait;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::errors::{TraderError, TraderResult};
use crate::quoter::PoolState;
use crate::retry::RetryExecutor;

#[async_trait]
pub trait PoolDataSource: Send + Sync {
    async fn fetch_pool_state(&self, mint: &Pubkey) -> TraderResult<PoolState>;
}

/// Wire shape of `GET {base_url}/coins/{mint}`
#[derive(Debug, Clone, Deserialize)]
struct PoolStateResponse {
    mint: String,
    #[serde(alias = "bondingCurve")]
    bonding_curve: String,
    #[serde(alias = "associatedBondingCurve")]
    associated_bonding_curve: String,
    #[serde(alias = "virtualSolReserves")]
    virtual_sol_reserves: u64,
    #[serde(alias = "virtualTokenReserves")]
    virtual_token_reserves: u64,
    #[serde(default, alias = "priceRef")]
    price: f64,
    #[serde(default)]
    liquidity: f64,
}

fn parse_address(field: &str, value: &str) -> TraderResult<Pubkey> {
    Pubkey::from_str(value)
        .map_err(|e| TraderError::api(None, format!("invalid {field} address '{value}': {e}")))
}

impl PoolStateResponse {
    fn into_pool_state(self, requested: &Pubkey) -> TraderResult<PoolState> {
        let mint = parse_address("mint", &self.mint)?;
        if mint != *requested {
            return Err(TraderError::api(
                None,
                format!("data source returned pool for {mint}, requested {requested}"),
            ));
        }
        Ok(PoolState {
            mint,
            bonding_curve: parse_address("bonding_curve", &self.bonding_curve)?,
            associated_bonding_curve: parse_address(
                "associated_bonding_curve",
                &self.associated_bonding_curve,
            )?,
            virtual_sol_reserves: self.virtual_sol_reserves,
            virtual_token_reserves: self.virtual_token_reserves,
            price_ref: self.price,
            liquidity: self.liquidity,
        })
    }
}

/// Typed GET wrapper over the REST price service
pub struct HttpPoolDataSource {
    http: reqwest::Client,
    base_url: String,
    executor: RetryExecutor,
}

impl HttpPoolDataSource {
    pub fn new(
        base_url: impl Into<String>,
        timeout: Duration,
        executor: RetryExecutor,
    ) -> TraderResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TraderError::internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            executor,
        })
    }

    async fn fetch_once(&self, url: &str, mint: &Pubkey) -> TraderResult<PoolState> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TraderError::api(
                Some(status.as_u16()),
                format!("GET {url} returned {status}: {}", body.trim()),
            ));
        }

        let parsed: PoolStateResponse = response
            .json()
            .await
            .map_err(|e| TraderError::api(None, format!("invalid pool payload from {url}: {e}")))?;
        parsed.into_pool_state(mint)
    }
}

#[async_trait]
impl PoolDataSource for HttpPoolDataSource {
    async fn fetch_pool_state(&self, mint: &Pubkey) -> TraderResult<PoolState> {
        let url = format!("{}/coins/{}", self.base_url, mint);
        let pool = self
            .executor
            .execute("fetch_pool_state", || self.fetch_once(&url, mint))
            .await?;
        debug!(
            mint = %mint,
            virtual_sol_reserves = pool.virtual_sol_reserves,
            virtual_token_reserves = pool.virtual_token_reserves,
            liquidity = pool.liquidity,
            "Fetched pool state"
        );
        Ok(pool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_accepts_snake_and_camel_case() {
        let mint = Pubkey::new_unique();
        let curve = Pubkey::new_unique();
        let assoc = Pubkey::new_unique();
        let camel = serde_json::json!({
            "mint": mint.to_string(),
            "bondingCurve": curve.to_string(),
            "associatedBondingCurve": assoc.to_string(),
            "virtualSolReserves": 1000,
            "virtualTokenReserves": 100000,
            "price": 0.01,
            "liquidity": 500.0,
        });
        let parsed: PoolStateResponse = serde_json::from_value(camel).unwrap();
        let pool = parsed.into_pool_state(&mint).unwrap();
        assert_eq!(pool.bonding_curve, curve);
        assert_eq!(pool.virtual_token_reserves, 100_000);
        assert_eq!(pool.liquidity, 500.0);
    }

    #[test]
    fn test_mismatched_mint_is_api_error() {
        let returned = Pubkey::new_unique();
        let response = PoolStateResponse {
            mint: returned.to_string(),
            bonding_curve: Pubkey::new_unique().to_string(),
            associated_bonding_curve: Pubkey::new_unique().to_string(),
            virtual_sol_reserves: 1,
            virtual_token_reserves: 1,
            price: 0.0,
            liquidity: 1.0,
        };
        let err = response.into_pool_state(&Pubkey::new_unique()).unwrap_err();
        assert!(matches!(err, TraderError::Api { status: None, .. }));
    }
}
