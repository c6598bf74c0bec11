//! Bonding-curve pricing
//!
//! Pure functions over a [`PoolState`] snapshot. No I/O, no defaults: a pool
//! with zero reserves or no liquidity is a data-integrity failure of the data
//! source and is reported as such rather than patched over.

use serde::Serialize;
use solana_sdk::{native_token::LAMPORTS_PER_SOL, pubkey::Pubkey};

use crate::errors::{TraderError, TraderResult, ValidationError};

/// Lamports per whole SOL, used when converting the buy bound
pub const LAMPORTS_PER_UNIT: u64 = LAMPORTS_PER_SOL;

/// Immutable snapshot of a bonding-curve pool, fetched once per operation
#[derive(Debug, Clone, PartialEq)]
pub struct PoolState {
    pub mint: Pubkey,
    pub bonding_curve: Pubkey,
    pub associated_bonding_curve: Pubkey,
    pub virtual_sol_reserves: u64,
    pub virtual_token_reserves: u64,
    pub price_ref: f64,
    pub liquidity: f64,
}

impl PoolState {
    /// Reject snapshots the pricing formulas cannot divide by
    pub fn check_integrity(&self) -> TraderResult<()> {
        if self.virtual_sol_reserves == 0 {
            return Err(TraderError::api(
                None,
                format!("pool {} reports zero virtual SOL reserves", self.mint),
            ));
        }
        if self.virtual_token_reserves == 0 {
            return Err(TraderError::api(
                None,
                format!("pool {} reports zero virtual token reserves", self.mint),
            ));
        }
        if !self.liquidity.is_finite() || self.liquidity <= 0.0 {
            return Err(TraderError::api(
                None,
                format!("pool {} reports invalid liquidity {}", self.mint, self.liquidity),
            ));
        }
        Ok(())
    }

    fn sol_per_token(&self) -> f64 {
        self.virtual_sol_reserves as f64 / self.virtual_token_reserves as f64
    }
}

/// Direction of a trade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeSide::Buy => "buy",
            TradeSide::Sell => "sell",
        }
    }

    /// Advisory quote for this side
    pub fn quote(&self, pool: &PoolState, amount: f64) -> TraderResult<Quote> {
        match self {
            TradeSide::Buy => quote_buy(pool, amount),
            TradeSide::Sell => quote_sell(pool, amount),
        }
    }

    /// On-chain SOL bound: max cost for a buy, min output for a sell
    pub fn sol_bound(&self, pool: &PoolState, amount: f64, slippage: f64) -> TraderResult<u64> {
        match self {
            TradeSide::Buy => max_sol_cost(amount, slippage),
            TradeSide::Sell => min_sol_output(pool, amount, slippage),
        }
    }
}

/// Derived trade quote. Recomputed per call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Quote {
    pub input_amount: f64,
    pub expected_output_amount: f64,
    /// Output received per unit of input
    pub price: f64,
    pub price_impact: f64,
}

pub fn validate_amount(amount: f64) -> TraderResult<f64> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(ValidationError::NonPositiveAmount(amount).into());
    }
    Ok(amount)
}

pub fn validate_slippage(slippage: f64) -> TraderResult<f64> {
    if !(0.0..=1.0).contains(&slippage) {
        return Err(ValidationError::SlippageOutOfRange(slippage).into());
    }
    Ok(slippage)
}

/// `token_out = floor(sol_in * token_reserves / sol_reserves)`
///
/// Evaluated in `f64`, so a product just under an integer can round onto it
/// before the floor (e.g. `1/3` SOL at a 3:1 ratio quotes 1 token).
pub fn quote_buy(pool: &PoolState, sol_in: f64) -> TraderResult<Quote> {
    validate_amount(sol_in)?;
    pool.check_integrity()?;

    let token_out =
        (sol_in * pool.virtual_token_reserves as f64 / pool.virtual_sol_reserves as f64).floor();

    Ok(Quote {
        input_amount: sol_in,
        expected_output_amount: token_out,
        price: token_out / sol_in,
        price_impact: sol_in / pool.liquidity,
    })
}

/// `sol_out = token_in * sol_reserves / token_reserves`, left unfloored
/// because it is advisory; the enforced bound is [`min_sol_output`].
pub fn quote_sell(pool: &PoolState, token_in: f64) -> TraderResult<Quote> {
    validate_amount(token_in)?;
    pool.check_integrity()?;

    let sol_out = token_in * pool.sol_per_token();

    Ok(Quote {
        input_amount: token_in,
        expected_output_amount: sol_out,
        price: sol_out / token_in,
        price_impact: sol_out / pool.liquidity,
    })
}

/// `floor(sol_in * (1 + slippage) * LAMPORTS_PER_UNIT)`
pub fn max_sol_cost(sol_in: f64, slippage: f64) -> TraderResult<u64> {
    validate_amount(sol_in)?;
    validate_slippage(slippage)?;
    Ok((sol_in * (1.0 + slippage) * LAMPORTS_PER_UNIT as f64).floor() as u64)
}

/// `floor(token_in * (1 - slippage) * sol_reserves / token_reserves)`
pub fn min_sol_output(pool: &PoolState, token_in: f64, slippage: f64) -> TraderResult<u64> {
    validate_amount(token_in)?;
    validate_slippage(slippage)?;
    pool.check_integrity()?;
    Ok((token_in * (1.0 - slippage) * pool.virtual_sol_reserves as f64
        / pool.virtual_token_reserves as f64)
        .floor() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    fn pool() -> PoolState {
        PoolState {
            mint: Pubkey::new_unique(),
            bonding_curve: Pubkey::new_unique(),
            associated_bonding_curve: Pubkey::new_unique(),
            virtual_sol_reserves: 1000,
            virtual_token_reserves: 100_000,
            price_ref: 0.01,
            liquidity: 500.0,
        }
    }

    #[test]
    fn test_buy_quote_reference_scenario() {
        let quote = quote_buy(&pool(), 1.0).unwrap();
        assert_eq!(quote.expected_output_amount, 100.0);
        assert!((quote.price_impact - 0.002).abs() < 1e-12);
        assert_eq!(quote.price, 100.0);
    }

    #[test]
    fn test_sell_quote_reference_scenario() {
        let quote = quote_sell(&pool(), 10_000.0).unwrap();
        assert_eq!(quote.expected_output_amount, 100.0);
        assert!((quote.price_impact - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_buy_output_is_floored() {
        let mut p = pool();
        p.virtual_sol_reserves = 3;
        p.virtual_token_reserves = 10;
        // 1 * 10 / 3 = 3.33..
        assert_eq!(quote_buy(&p, 1.0).unwrap().expected_output_amount, 3.0);
    }

    #[test]
    fn test_buy_floor_follows_f64_product() {
        let mut p = pool();
        p.virtual_sol_reserves = 1;
        p.virtual_token_reserves = 3;
        // (1/3) * 3 rounds to exactly 1.0 before the floor
        let quote = quote_buy(&p, 1.0 / 3.0).unwrap();
        assert_eq!(quote.expected_output_amount, 1.0);
    }

    #[test]
    fn test_sell_advisory_is_not_floored_but_guard_is() {
        let mut p = pool();
        p.virtual_sol_reserves = 10;
        p.virtual_token_reserves = 3;
        let quote = quote_sell(&p, 1.0).unwrap();
        assert!((quote.expected_output_amount - 10.0 / 3.0).abs() < 1e-12);
        assert_eq!(min_sol_output(&p, 1.0, 0.0).unwrap(), 3);
    }

    #[test]
    fn test_execution_bounds() {
        assert_eq!(max_sol_cost(1.0, 0.1).unwrap(), 1_100_000_000);
        assert_eq!(max_sol_cost(0.5, 0.0).unwrap(), 500_000_000);
        // 10_000 * 0.9 * 1000 / 100_000 = 90
        assert_eq!(min_sol_output(&pool(), 10_000.0, 0.1).unwrap(), 90);
        assert_eq!(min_sol_output(&pool(), 10_000.0, 1.0).unwrap(), 0);
    }

    #[test]
    fn test_slippage_bounds_are_inclusive() {
        assert!(validate_slippage(0.0).is_ok());
        assert!(validate_slippage(1.0).is_ok());
        for bad in [-0.01, 1.01, f64::NAN] {
            assert!(matches!(
                validate_slippage(bad),
                Err(TraderError::Validation(ValidationError::SlippageOutOfRange(_)))
            ));
        }
    }

    #[test]
    fn test_non_positive_amounts_rejected() {
        for bad in [0.0, -1.0, f64::INFINITY, f64::NAN] {
            let err = quote_buy(&pool(), bad).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
        }
    }

    #[test]
    fn test_zero_reserves_is_data_integrity_failure() {
        let mut p = pool();
        p.virtual_sol_reserves = 0;
        let err = quote_buy(&p, 1.0).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Api);
        assert!(err.message().contains("zero virtual SOL reserves"));

        let mut p = pool();
        p.virtual_token_reserves = 0;
        assert_eq!(quote_sell(&p, 1.0).unwrap_err().kind(), ErrorKind::Api);
    }

    #[test]
    fn test_side_dispatch() {
        let p = pool();
        assert_eq!(TradeSide::Buy.quote(&p, 1.0).unwrap(), quote_buy(&p, 1.0).unwrap());
        assert_eq!(TradeSide::Sell.sol_bound(&p, 10_000.0, 0.1).unwrap(), 90);
        assert_eq!(TradeSide::Buy.sol_bound(&p, 1.0, 0.1).unwrap(), 1_100_000_000);
    }
}
