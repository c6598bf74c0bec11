//! Property tests for the bonding-curve quoter

use curve_trader::quoter::{max_sol_cost, min_sol_output, quote_buy, quote_sell, PoolState};
use proptest::prelude::*;
use solana_sdk::pubkey::Pubkey;

fn pool(virtual_sol_reserves: u64, virtual_token_reserves: u64, liquidity: f64) -> PoolState {
    PoolState {
        mint: Pubkey::new_unique(),
        bonding_curve: Pubkey::new_unique(),
        associated_bonding_curve: Pubkey::new_unique(),
        virtual_sol_reserves,
        virtual_token_reserves,
        price_ref: 0.0,
        liquidity,
    }
}

#[test]
fn reference_scenario() {
    let p = pool(1_000, 100_000, 500.0);

    let buy = quote_buy(&p, 1.0).unwrap();
    assert_eq!(buy.expected_output_amount, 100.0);
    assert!((buy.price_impact - 0.002).abs() < 1e-12);

    let sell = quote_sell(&p, 10_000.0).unwrap();
    assert_eq!(sell.expected_output_amount, 100.0);
    assert!((sell.price_impact - 0.2).abs() < 1e-12);
}

proptest! {
    // Inputs keep sol_in * token_reserves below 2^53 so every float step is exact
    #[test]
    fn buy_output_is_integer_floor(
        sol_reserves in 1u64..1_000_000_000_000,
        token_reserves in 1u64..4_000_000_000,
        sol_in in 1u64..1_000_000,
    ) {
        let p = pool(sol_reserves, token_reserves, 1.0);
        let out = quote_buy(&p, sol_in as f64).unwrap().expected_output_amount;

        prop_assert_eq!(out.fract(), 0.0);
        let out = out as u128;
        let product = sol_in as u128 * token_reserves as u128;
        let sol_reserves = sol_reserves as u128;
        prop_assert!(out * sol_reserves <= product);
        prop_assert!(product < (out + 1) * sol_reserves);
    }

    #[test]
    fn sell_guard_never_exceeds_advisory_quote(
        sol_reserves in 1u64..1_000_000_000_000,
        token_reserves in 1u64..1_000_000_000_000,
        token_in in 1.0f64..1_000_000.0,
        slippage in 0.0f64..=1.0,
    ) {
        let p = pool(sol_reserves, token_reserves, 1.0);
        let advisory = quote_sell(&p, token_in).unwrap().expected_output_amount;
        let guard = min_sol_output(&p, token_in, slippage).unwrap() as f64;

        // Float evaluation order differs between the two; allow one ulp-scale step
        prop_assert!(guard <= advisory * (1.0 + 1e-12) + 1e-9);
    }

    #[test]
    fn price_impact_is_monotonic_in_input(
        sol_reserves in 1u64..1_000_000_000,
        token_reserves in 1u64..1_000_000_000,
        liquidity in 0.01f64..1_000_000.0,
        small in 0.001f64..100.0,
        extra in 0.0f64..100.0,
    ) {
        let p = pool(sol_reserves, token_reserves, liquidity);
        let large = small + extra;

        prop_assert!(
            quote_buy(&p, small).unwrap().price_impact <= quote_buy(&p, large).unwrap().price_impact
        );
        prop_assert!(
            quote_sell(&p, small).unwrap().price_impact <= quote_sell(&p, large).unwrap().price_impact
        );
    }

    #[test]
    fn max_cost_grows_with_slippage(
        sol_in in 0.001f64..100.0,
        low in 0.0f64..=1.0,
        high in 0.0f64..=1.0,
    ) {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        prop_assert!(max_sol_cost(sol_in, low).unwrap() <= max_sol_cost(sol_in, high).unwrap());
    }

    #[test]
    fn slippage_outside_unit_interval_rejected(
        slippage in prop_oneof![-10.0f64..-0.000_001, 1.000_001f64..10.0],
    ) {
        prop_assert!(max_sol_cost(1.0, slippage).is_err());
        prop_assert!(min_sol_output(&pool(1_000, 100_000, 500.0), 1.0, slippage).is_err());
    }
}
