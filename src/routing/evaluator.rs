// src/routing/evaluator.rs
//! Prices candidate routes against one pool snapshot and keeps the best.
//!
//! Each leg is priced on its own pool's observed reserves. Reserve depletion
//! across economically linked pools is not simulated; only literal pool reuse
//! within a route is ruled out, by the search.

use super::{EvaluatedRoute, Route, RouteInfo};
use crate::dex::math::weighted::{price_impact, swap_fee_breakdown, swap_out_given_in, LegParams};
use crate::dex::pool::{MintMetadataProvider, PoolSnapshot};
use crate::error::RouterError;
use log::debug;
use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;

pub struct RouteEvaluator<'a> {
    snapshot: &'a PoolSnapshot,
    mints: &'a dyn MintMetadataProvider,
}

impl<'a> RouteEvaluator<'a> {
    pub fn new(snapshot: &'a PoolSnapshot, mints: &'a dyn MintMetadataProvider) -> Self {
        Self { snapshot, mints }
    }

    fn decimals(&self, mint: &Pubkey) -> Result<u8, RouterError> {
        self.mints
            .decimals_of(mint)
            .ok_or_else(|| RouterError::NumericDegenerate(format!("no decimals for mint {}", mint)))
    }

    /// Walks `route` leg by leg, feeding each leg's output into the next.
    pub fn evaluate(&self, route: &Route, amount_in: u64) -> Result<EvaluatedRoute, RouterError> {
        let mut legs = Vec::with_capacity(route.len());
        let mut amount = amount_in;
        let mut retained = Decimal::ONE;

        for leg in &route.legs {
            let pool = self
                .snapshot
                .get(&leg.pool)
                .ok_or_else(|| RouterError::PoolNotFound(leg.pool.to_string()))?;
            if !pool.is_funded() {
                return Err(RouterError::NumericDegenerate(format!(
                    "pool {} has an empty reserve",
                    pool.address
                )));
            }
            let (index_in, index_out) = match (pool.index_of(&leg.mint_in), pool.index_of(&leg.mint_out)) {
                (Some(i), Some(o)) if i != o => (i, o),
                _ => {
                    return Err(RouterError::InvalidPoolState(format!(
                        "pool {} does not trade {} -> {}",
                        pool.address, leg.mint_in, leg.mint_out
                    )))
                }
            };
            let params = LegParams::for_pool(
                pool,
                index_in,
                index_out,
                self.decimals(&leg.mint_in)?,
                self.decimals(&leg.mint_out)?,
            )
            .ok_or_else(|| RouterError::InvalidPoolState(pool.address.to_string()))?;

            let amount_out = swap_out_given_in(
                amount,
                params.balance_out,
                params.balance_in,
                params.weight_out,
                params.weight_in,
                params.swap_fee,
            );
            let impact = price_impact(amount, &params);
            let (fee_amount, protocol_fee) = swap_fee_breakdown(amount, pool.swap_fee, pool.protocol_tax);
            retained *= Decimal::ONE - impact;

            legs.push(RouteInfo {
                pool: leg.pool,
                mint_in: leg.mint_in,
                mint_out: leg.mint_out,
                amount_in: amount,
                amount_out,
                price_impact: impact,
                fee_amount,
                protocol_fee,
            });
            amount = amount_out;
        }

        Ok(EvaluatedRoute {
            route: route.clone(),
            legs,
            amount_in,
            amount_out: amount,
            price_impact: (Decimal::ONE - retained).max(Decimal::ZERO),
        })
    }

    /// The candidate with the strictly greatest output; the earliest wins a tie.
    ///
    /// No candidates, or none that can be priced, is [`RouterError::NoRoute`].
    /// A route that prices to zero output is still a route.
    pub fn best_route(
        &self,
        routes: &[Route],
        bid: &Pubkey,
        ask: &Pubkey,
        amount_in: u64,
    ) -> Result<EvaluatedRoute, RouterError> {
        let mut best: Option<EvaluatedRoute> = None;
        for route in routes {
            match self.evaluate(route, amount_in) {
                Ok(evaluated) => {
                    let better = best
                        .as_ref()
                        .map_or(true, |current| evaluated.amount_out > current.amount_out);
                    if better {
                        best = Some(evaluated);
                    }
                }
                Err(e) => debug!("Skipping route {:?}: {}", route.pools(), e),
            }
        }
        best.ok_or_else(|| RouterError::NoRoute {
            bid: bid.to_string(),
            ask: ask.to_string(),
        })
    }
}
