//! Weighted-invariant pool math.
//!
//! Pre-trade estimates for multi-asset weighted pools: weight normalization,
//! LP-out for a basket join (with fee-on-imbalance), proportional exit, swap
//! output, marginal spot price and price impact.
//!
//! Every function is total. Zero reserves, zero weights, fees of 100% and
//! arithmetic overflow all collapse to a zero estimate instead of an error,
//! and integer outputs are truncated so an estimate never exceeds what the
//! on-chain program would pay out.

use crate::dex::pool::WeightedPool;
use crate::error::RouterError;
use crate::utils::to_real;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, MathematicalOps};
use serde::Serialize;

/// `base ^ exp`, using exact integer powers when the exponent allows it.
///
/// A fraction raised past the smallest representable value is zero, not an error.
fn pow(base: Decimal, exp: Decimal) -> Option<Decimal> {
    let result = match exp.to_i64() {
        Some(n) if exp.fract().is_zero() => base.checked_powi(n),
        _ => base.checked_powd(exp),
    };
    match result {
        None if base > Decimal::ZERO && base < Decimal::ONE && exp > Decimal::ZERO => {
            Some(Decimal::ZERO)
        }
        other => other,
    }
}

fn truncate_to_u64(value: Decimal) -> u64 {
    if value <= Decimal::ZERO {
        return 0;
    }
    value.trunc().to_u64().unwrap_or(0)
}

fn fee_is_valid(swap_fee: Decimal) -> bool {
    swap_fee >= Decimal::ZERO && swap_fee < Decimal::ONE
}

/// `w / Σweights`, or zero when the weights sum to zero.
pub fn normalize_weight(weights: &[u64], w: u64) -> Decimal {
    let total: u128 = weights.iter().map(|x| *x as u128).sum();
    if total == 0 {
        return Decimal::ZERO;
    }
    Decimal::from(w)
        .checked_div(Decimal::from(total))
        .unwrap_or(Decimal::ZERO)
}

fn real_vectors(amounts: &[u64], reserves: &[u64], decimals: &[u8]) -> (Vec<Decimal>, Vec<Decimal>) {
    let amounts = amounts
        .iter()
        .zip(decimals)
        .map(|(a, d)| to_real(*a, *d))
        .collect();
    let reserves = reserves
        .iter()
        .zip(decimals)
        .map(|(r, d)| to_real(*r, *d))
        .collect();
    (amounts, reserves)
}

fn inputs_are_consistent(
    amounts_in: &[u64],
    reserves: &[u64],
    weights: &[u64],
    decimals: &[u8],
) -> bool {
    let n = reserves.len();
    n > 0
        && amounts_in.len() == n
        && weights.len() == n
        && decimals.len() == n
        && reserves.iter().all(|r| *r > 0)
        && weights.iter().any(|w| *w > 0)
}

/// Exact LP-out before truncation. `None` on degenerate input or overflow.
fn join_lp_out_real(
    amounts_in: &[u64],
    reserves: &[u64],
    weights: &[u64],
    lp_supply: u64,
    decimals: &[u8],
    swap_fee: Decimal,
) -> Option<Decimal> {
    if !inputs_are_consistent(amounts_in, reserves, weights, decimals) || !fee_is_valid(swap_fee) {
        return None;
    }
    let (amounts, balances) = real_vectors(amounts_in, reserves, decimals);
    let total_weight = Decimal::from(weights.iter().map(|w| *w as u128).sum::<u128>());

    let mut balance_ratios = Vec::with_capacity(balances.len());
    let mut weighted_sum = Decimal::ZERO;
    for i in 0..balances.len() {
        let ratio = balances[i]
            .checked_add(amounts[i])?
            .checked_div(balances[i])?;
        weighted_sum = weighted_sum.checked_add(ratio.checked_mul(Decimal::from(weights[i]))?)?;
        balance_ratios.push(ratio);
    }
    // Dividing once keeps a proportional deposit exactly on the invariant ratio.
    let invariant_ratio_with_fees = weighted_sum.checked_div(total_weight)?;

    let mut invariant_ratio = Decimal::ONE;
    for i in 0..balances.len() {
        let effective_in = if balance_ratios[i] > invariant_ratio_with_fees {
            let non_taxable = balances[i].checked_mul(invariant_ratio_with_fees - Decimal::ONE)?;
            let taxable = amounts[i].checked_sub(non_taxable)?;
            non_taxable.checked_add(taxable.checked_mul(Decimal::ONE - swap_fee)?)?
        } else {
            amounts[i]
        };
        let ratio = balances[i]
            .checked_add(effective_in)?
            .checked_div(balances[i])?;
        let nw = normalize_weight(weights, weights[i]);
        invariant_ratio = invariant_ratio.checked_mul(pow(ratio, nw)?)?;
    }

    if invariant_ratio <= Decimal::ONE {
        return Some(Decimal::ZERO);
    }
    Decimal::from(lp_supply).checked_mul(invariant_ratio - Decimal::ONE)
}

/// LP tokens minted for depositing `amounts_in` (base units) into a weighted pool.
///
/// Deposits beyond the pool's proportional share are charged `swap_fee` on the
/// excess. A below-proportional deposit legitimately mints zero.
pub fn join_lp_out(
    amounts_in: &[u64],
    reserves: &[u64],
    weights: &[u64],
    lp_supply: u64,
    decimals: &[u8],
    swap_fee: Decimal,
) -> u64 {
    join_lp_out_real(amounts_in, reserves, weights, lp_supply, decimals, swap_fee)
        .map(truncate_to_u64)
        .unwrap_or(0)
}

/// LP-out if every token were priced at its current marginal rate.
pub fn zero_impact_lp_out(
    amounts_in: &[u64],
    reserves: &[u64],
    weights: &[u64],
    lp_supply: u64,
    decimals: &[u8],
) -> Decimal {
    if !inputs_are_consistent(amounts_in, reserves, weights, decimals) {
        return Decimal::ZERO;
    }
    let (amounts, balances) = real_vectors(amounts_in, reserves, decimals);
    let supply = Decimal::from(lp_supply);
    let mut total = Decimal::ZERO;
    for i in 0..balances.len() {
        let nw = normalize_weight(weights, weights[i]);
        let term = amounts[i]
            .checked_mul(supply)
            .and_then(|v| v.checked_mul(nw))
            .and_then(|v| v.checked_div(balances[i]));
        match term.and_then(|t| total.checked_add(t)) {
            Some(sum) => total = sum,
            None => return Decimal::ZERO,
        }
    }
    total
}

/// `1 - actual / ideal`, clamped to zero.
pub fn join_price_impact(actual_lp_out: Decimal, ideal_lp_out: Decimal) -> Decimal {
    if ideal_lp_out <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let impact = actual_lp_out
        .checked_div(ideal_lp_out)
        .map(|r| Decimal::ONE - r)
        .unwrap_or(Decimal::ZERO);
    impact.max(Decimal::ZERO)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JoinEstimate {
    pub lp_out: u64,
    pub price_impact: Decimal,
}

/// LP-out and price impact of a basket deposit into `pool`.
pub fn join_estimate(
    pool: &WeightedPool,
    amounts_in: &[u64],
    decimals: &[u8],
) -> Result<JoinEstimate, RouterError> {
    let n = pool.mints.len();
    if amounts_in.len() != n || decimals.len() != n {
        return Err(RouterError::InputInvalid(format!(
            "pool {} takes {} amounts, got {} amounts and {} decimals",
            pool.address,
            n,
            amounts_in.len(),
            decimals.len()
        )));
    }
    if !pool.is_funded() {
        return Err(RouterError::NumericDegenerate(format!(
            "pool {} has an empty reserve",
            pool.address
        )));
    }

    let actual = join_lp_out_real(
        amounts_in,
        &pool.reserves,
        &pool.weights,
        pool.lp_supply,
        decimals,
        pool.swap_fee,
    )
    .unwrap_or(Decimal::ZERO);
    let ideal = zero_impact_lp_out(amounts_in, &pool.reserves, &pool.weights, pool.lp_supply, decimals);

    Ok(JoinEstimate {
        lp_out: truncate_to_u64(actual),
        price_impact: join_price_impact(actual, ideal),
    })
}

/// Proportional share of every reserve for burning `lp_in`.
pub fn exit_tokens_out(lp_in: u64, reserves: &[u64], lp_supply: u64) -> Vec<u64> {
    if lp_supply == 0 {
        return vec![0; reserves.len()];
    }
    let lp_in = lp_in.min(lp_supply) as u128;
    reserves
        .iter()
        .map(|r| ((*r as u128 * lp_in) / lp_supply as u128) as u64)
        .collect()
}

/// Output of a single weighted swap, in base units of the output mint.
///
/// Only the ratio `weight_in / weight_out` matters, so raw or normalized
/// weights both work.
pub fn swap_out_given_in(
    amount_in: u64,
    reserve_out: u64,
    reserve_in: u64,
    weight_out: Decimal,
    weight_in: Decimal,
    swap_fee: Decimal,
) -> u64 {
    if amount_in == 0
        || reserve_out == 0
        || reserve_in == 0
        || weight_out <= Decimal::ZERO
        || weight_in <= Decimal::ZERO
        || !fee_is_valid(swap_fee)
    {
        return 0;
    }
    let balance_in = Decimal::from(reserve_in);
    let balance_out = Decimal::from(reserve_out);

    let out = (|| {
        let net_in = Decimal::from(amount_in).checked_mul(Decimal::ONE - swap_fee)?;
        let balance_ratio = balance_in.checked_div(net_in.checked_add(balance_in)?)?;
        let weight_ratio = weight_in.checked_div(weight_out)?;
        let remaining = pow(balance_ratio, weight_ratio)?;
        balance_out.checked_mul(Decimal::ONE - remaining)
    })();

    // The invariant never empties the output side, even when `remaining` underflows.
    out.map(truncate_to_u64)
        .unwrap_or(0)
        .min(reserve_out - 1)
}

/// Total swap fee and the protocol's cut of it, both in input base units.
pub fn swap_fee_breakdown(amount_in: u64, swap_fee: Decimal, protocol_tax: Decimal) -> (u64, u64) {
    let fee = Decimal::from(amount_in)
        .checked_mul(swap_fee.max(Decimal::ZERO))
        .map(truncate_to_u64)
        .unwrap_or(0)
        .min(amount_in);
    let protocol = Decimal::from(fee)
        .checked_mul(protocol_tax.max(Decimal::ZERO).min(Decimal::ONE))
        .map(truncate_to_u64)
        .unwrap_or(0);
    (fee, protocol)
}

/// Pool parameters of one swap direction, for spot price and impact.
#[derive(Debug, Clone, PartialEq)]
pub struct LegParams {
    pub balance_in: u64,
    pub balance_out: u64,
    pub weight_in: Decimal,
    pub weight_out: Decimal,
    pub decimals_in: u8,
    pub decimals_out: u8,
    pub swap_fee: Decimal,
}

impl LegParams {
    /// Parameters for swapping `pool.mints[index_in]` into `pool.mints[index_out]`.
    pub fn for_pool(
        pool: &WeightedPool,
        index_in: usize,
        index_out: usize,
        decimals_in: u8,
        decimals_out: u8,
    ) -> Option<Self> {
        Some(Self {
            balance_in: *pool.reserves.get(index_in)?,
            balance_out: *pool.reserves.get(index_out)?,
            weight_in: Decimal::from(*pool.weights.get(index_in)?),
            weight_out: Decimal::from(*pool.weights.get(index_out)?),
            decimals_in,
            decimals_out,
            swap_fee: pool.swap_fee,
        })
    }
}

/// Marginal price (input per output, real units) after a hypothetical trade of `amount`.
pub fn spot_price_exact_in(amount: u64, params: &LegParams) -> Decimal {
    if params.balance_in == 0
        || params.balance_out == 0
        || params.weight_in <= Decimal::ZERO
        || params.weight_out <= Decimal::ZERO
        || !fee_is_valid(params.swap_fee)
    {
        return Decimal::ZERO;
    }
    let fee_factor = Decimal::ONE - params.swap_fee;
    let balance_in = to_real(params.balance_in, params.decimals_in);
    let balance_out = to_real(params.balance_out, params.decimals_out);
    let amount = to_real(amount, params.decimals_in);

    let price = (|| {
        let new_balance_in = balance_in.checked_add(amount.checked_mul(fee_factor)?)?;
        let weight_ratio = params.weight_in.checked_div(params.weight_out)?;
        let new_balance_out = balance_out
            .checked_mul(pow(balance_in.checked_div(new_balance_in)?, weight_ratio)?)?;
        let numerator = new_balance_in.checked_div(params.weight_in)?;
        let denominator = new_balance_out.checked_div(params.weight_out)?;
        numerator.checked_div(denominator)?.checked_div(fee_factor)
    })();

    price.unwrap_or(Decimal::ZERO)
}

/// `1 - sp(0) / sp(amount)`, clamped to zero.
pub fn price_impact(amount: u64, params: &LegParams) -> Decimal {
    if amount == 0 {
        return Decimal::ZERO;
    }
    let before = spot_price_exact_in(0, params);
    let after = spot_price_exact_in(amount, params);
    if before <= Decimal::ZERO || after <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    before
        .checked_div(after)
        .map(|r| Decimal::ONE - r)
        .unwrap_or(Decimal::ZERO)
        .max(Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::pool::MintAction;
    use rust_decimal_macros::dec;
    use solana_sdk::pubkey::Pubkey;

    const USDC: u64 = 1_000_000;
    const SOL: u64 = 1_000_000_000;

    fn usdc_sol_pool() -> WeightedPool {
        WeightedPool {
            address: Pubkey::new_unique(),
            mints: vec![Pubkey::new_unique(), Pubkey::new_unique()],
            reserves: vec![1_000 * USDC, 10 * SOL],
            weights: vec![50, 50],
            swap_fee: dec!(0.003),
            protocol_tax: dec!(0.2),
            lp_supply: 1_000_000_000,
            actions: vec![MintAction::Active; 2],
        }
    }

    fn assert_close(actual: Decimal, expected: Decimal, tolerance: Decimal) {
        assert!(
            (actual - expected).abs() <= tolerance,
            "{} not within {} of {}",
            actual,
            tolerance,
            expected
        );
    }

    #[test]
    fn test_normalize_weight() {
        let weights = [20, 30, 50];
        assert_eq!(normalize_weight(&weights, 20), dec!(0.2));
        assert_eq!(normalize_weight(&weights, 50), dec!(0.5));
        let sum: Decimal = weights.iter().map(|w| normalize_weight(&weights, *w)).sum();
        assert_eq!(sum, Decimal::ONE);
        assert_eq!(normalize_weight(&[0, 0], 0), Decimal::ZERO);
    }

    #[test]
    fn test_proportional_join_usdc_sol() {
        let pool = usdc_sol_pool();
        let estimate = join_estimate(&pool, &[10 * USDC, SOL / 10], &[6, 9]).unwrap();

        let expected = pool.lp_supply / 100;
        assert!(
            estimate.lp_out.abs_diff(expected) <= 10,
            "lp_out {} not close to {}",
            estimate.lp_out,
            expected
        );
        assert_close(estimate.price_impact, Decimal::ZERO, dec!(0.000001));
    }

    #[test]
    fn test_proportional_join_is_fee_free() {
        let pool = usdc_sol_pool();
        let amounts = [10 * USDC, SOL / 10];
        let with_fee = join_lp_out(&amounts, &pool.reserves, &pool.weights, pool.lp_supply, &[6, 9], dec!(0.3));
        let without_fee =
            join_lp_out(&amounts, &pool.reserves, &pool.weights, pool.lp_supply, &[6, 9], Decimal::ZERO);
        assert_eq!(with_fee, without_fee);
    }

    #[test]
    fn test_single_sided_join_is_taxed() {
        let pool = usdc_sol_pool();
        let amounts = [100 * USDC, 0];
        let taxed = join_lp_out(&amounts, &pool.reserves, &pool.weights, pool.lp_supply, &[6, 9], dec!(0.01));
        let untaxed =
            join_lp_out(&amounts, &pool.reserves, &pool.weights, pool.lp_supply, &[6, 9], Decimal::ZERO);
        assert!(taxed > 0);
        assert!(taxed < untaxed);

        let estimate = join_estimate(&pool, &amounts, &[6, 9]).unwrap();
        assert!(estimate.price_impact > Decimal::ZERO);
        assert!(estimate.price_impact < Decimal::ONE);
    }

    #[test]
    fn test_empty_join_mints_nothing() {
        let pool = usdc_sol_pool();
        assert_eq!(
            join_lp_out(&[0, 0], &pool.reserves, &pool.weights, pool.lp_supply, &[6, 9], dec!(0.003)),
            0
        );
        let estimate = join_estimate(&pool, &[0, 0], &[6, 9]).unwrap();
        assert_eq!(estimate.lp_out, 0);
        assert_eq!(estimate.price_impact, Decimal::ZERO);
    }

    #[test]
    fn test_join_guards_degenerate_pools() {
        assert_eq!(join_lp_out(&[10, 10], &[0, 100], &[50, 50], 1_000, &[0, 0], dec!(0.003)), 0);
        assert_eq!(join_lp_out(&[10], &[100, 100], &[50, 50], 1_000, &[0, 0], dec!(0.003)), 0);
        assert_eq!(join_lp_out(&[10, 10], &[100, 100], &[0, 0], 1_000, &[0, 0], dec!(0.003)), 0);

        let mut pool = usdc_sol_pool();
        assert!(matches!(
            join_estimate(&pool, &[1], &[6, 9]),
            Err(RouterError::InputInvalid(_))
        ));
        pool.reserves[1] = 0;
        assert!(matches!(
            join_estimate(&pool, &[1, 1], &[6, 9]),
            Err(RouterError::NumericDegenerate(_))
        ));
    }

    #[test]
    fn test_exit_is_proportional() {
        assert_eq!(exit_tokens_out(100, &[1_000, 50], 1_000), vec![100, 5]);
        assert_eq!(exit_tokens_out(5_000, &[1_000, 50], 1_000), vec![1_000, 50]);
        assert_eq!(exit_tokens_out(7, &[10, 10], 0), vec![0, 0]);
        assert_eq!(exit_tokens_out(1, &[3, 10], 3), vec![1, 3]);
    }

    #[test]
    fn test_equal_weight_swap_matches_constant_product() {
        // 50/50 without fee reduces to x*y=k: out = 1000 * 100 / (1000 + 100)
        let out = swap_out_given_in(100, 1_000, 1_000, dec!(50), dec!(50), Decimal::ZERO);
        assert_eq!(out, 90);
    }

    #[test]
    fn test_swap_truncates_and_guards() {
        let out = swap_out_given_in(10 * USDC, 10 * SOL, 1_000 * USDC, dec!(50), dec!(50), dec!(0.003));
        // Exact value is 98_715_803.44...; never rounded up.
        assert_eq!(out, 98_715_803);

        assert_eq!(swap_out_given_in(0, 10, 10, dec!(1), dec!(1), dec!(0.003)), 0);
        assert_eq!(swap_out_given_in(5, 0, 10, dec!(1), dec!(1), dec!(0.003)), 0);
        assert_eq!(swap_out_given_in(5, 10, 0, dec!(1), dec!(1), dec!(0.003)), 0);
        assert_eq!(swap_out_given_in(5, 10, 10, Decimal::ZERO, dec!(1), dec!(0.003)), 0);
        assert_eq!(swap_out_given_in(5, 10, 10, dec!(1), dec!(1), Decimal::ONE), 0);
    }

    #[test]
    fn test_uneven_weights_shift_output() {
        // 80/20 pool: input side heavy, so the same input buys more of the light side.
        let heavy_in = swap_out_given_in(1_000, 100_000, 100_000, dec!(20), dec!(80), Decimal::ZERO);
        let even = swap_out_given_in(1_000, 100_000, 100_000, dec!(50), dec!(50), Decimal::ZERO);
        assert!(heavy_in > even);
        assert!(heavy_in < 100_000);
    }

    #[test]
    fn test_fee_breakdown() {
        assert_eq!(swap_fee_breakdown(1_000_000, dec!(0.003), dec!(0.2)), (3_000, 600));
        assert_eq!(swap_fee_breakdown(333, dec!(0.003), dec!(0.5)), (0, 0));
        assert_eq!(swap_fee_breakdown(10_000, dec!(0.0025), dec!(0.1)), (25, 2));
    }

    #[test]
    fn test_spot_price_and_impact() {
        let pool = usdc_sol_pool();
        let params = LegParams::for_pool(&pool, 0, 1, 6, 9).unwrap();

        // 1000 USDC / 10 SOL = 100 USDC per SOL, grossed up by the fee.
        let spot = spot_price_exact_in(0, &params);
        assert_close(spot, dec!(100) / dec!(0.997), dec!(0.0000001));

        assert_eq!(price_impact(0, &params), Decimal::ZERO);
        let small = price_impact(USDC, &params);
        let large = price_impact(100 * USDC, &params);
        assert!(small > Decimal::ZERO);
        assert!(large > small);
        assert!(large < Decimal::ONE);
    }

    #[test]
    fn test_degenerate_spot_price_is_zero() {
        let params = LegParams {
            balance_in: 0,
            balance_out: 10,
            weight_in: dec!(1),
            weight_out: dec!(1),
            decimals_in: 0,
            decimals_out: 0,
            swap_fee: dec!(0.003),
        };
        assert_eq!(spot_price_exact_in(5, &params), Decimal::ZERO);
        assert_eq!(price_impact(5, &params), Decimal::ZERO);
    }
}
