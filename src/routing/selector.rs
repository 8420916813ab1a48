// src/routing/selector.rs
//! Venue choice between the best internal route and the external aggregator.

use super::{EvaluatedRoute, ExecutionPlan, Platform, Quote};
use crate::dex::quote::ExternalQuote;
use log::debug;
use rust_decimal::Decimal;
use serde::Serialize;

/// Internal on near-ties; external once the outputs differ by more than
/// `threshold` of the external output, in either direction.
pub fn choose_platform(internal_out: u64, external_out: u64, threshold: Decimal) -> Platform {
    let gap = Decimal::from(internal_out.abs_diff(external_out));
    let tolerance = Decimal::from(external_out)
        .checked_mul(threshold)
        .unwrap_or(Decimal::MAX);
    if gap > tolerance {
        Platform::External
    } else {
        Platform::Internal
    }
}

/// The chosen quote plus what it was chosen from.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Selection {
    pub quote: Quote,
    pub internal: Option<EvaluatedRoute>,
    pub external: Option<ExternalQuote>,
    /// Why the external side is missing, when it is.
    pub external_error: Option<String>,
}

impl Selection {
    pub fn platform(&self) -> Platform {
        self.quote.platform
    }

    pub fn hop_mints(&self) -> Vec<String> {
        self.quote.plan.hop_mints()
    }
}

fn internal_quote(route: &EvaluatedRoute) -> Quote {
    Quote {
        platform: Platform::Internal,
        plan: ExecutionPlan::Internal(route.route.legs.clone()),
        final_output_amount: route.amount_out,
        aggregate_price_impact: route.price_impact,
    }
}

fn external_quote(quote: &ExternalQuote) -> Quote {
    Quote {
        platform: Platform::External,
        plan: ExecutionPlan::External(quote.route_plan.clone()),
        final_output_amount: quote.out_amount,
        aggregate_price_impact: quote.price_impact,
    }
}

/// Picks a venue. One missing side yields the other; both missing yields `None`.
///
/// An external quote paying nothing never displaces an internal route.
pub fn select(
    internal: Option<EvaluatedRoute>,
    external: Option<ExternalQuote>,
    external_error: Option<String>,
    threshold: Decimal,
) -> Option<Selection> {
    let quote = match (&internal, &external) {
        (Some(route), Some(ext)) if ext.out_amount == 0 => {
            debug!("External quote pays nothing; keeping internal {}", route.amount_out);
            internal_quote(route)
        }
        (Some(route), Some(ext)) => {
            let platform = choose_platform(route.amount_out, ext.out_amount, threshold);
            debug!(
                "Internal {} vs external {}: choosing {:?}",
                route.amount_out, ext.out_amount, platform
            );
            match platform {
                Platform::Internal => internal_quote(route),
                Platform::External => external_quote(ext),
            }
        }
        (Some(route), None) => internal_quote(route),
        (None, Some(ext)) => external_quote(ext),
        (None, None) => return None,
    };
    Some(Selection {
        quote,
        internal,
        external,
        external_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dex::clients::jupiter_api::QuoteResponse;
    use crate::routing::{Leg, Route};
    use rust_decimal_macros::dec;
    use solana_sdk::pubkey::Pubkey;

    fn evaluated(amount_out: u64) -> EvaluatedRoute {
        let leg = Leg::new(Pubkey::new_unique(), Pubkey::new_unique(), Pubkey::new_unique());
        EvaluatedRoute {
            route: Route::new(vec![leg]),
            legs: vec![],
            amount_in: 1_000,
            amount_out,
            price_impact: dec!(0.01),
        }
    }

    fn external(out_amount: u64) -> ExternalQuote {
        ExternalQuote {
            out_amount,
            price_impact: dec!(0.002),
            route_plan: QuoteResponse {
                input_mint: "in".to_string(),
                in_amount: "1000".to_string(),
                output_mint: "out".to_string(),
                out_amount: out_amount.to_string(),
                other_amount_threshold: out_amount.to_string(),
                swap_mode: None,
                slippage_bps: Some(50),
                route_plan: vec![],
                context_slot: None,
                time_taken: None,
                platform_fee: None,
                price_impact_pct: "0.002".to_string(),
            },
        }
    }

    #[test]
    fn test_six_percent_gap_goes_external() {
        assert_eq!(choose_platform(100, 106, dec!(0.05)), Platform::External);
    }

    #[test]
    fn test_two_percent_gap_stays_internal() {
        assert_eq!(choose_platform(100, 102, dec!(0.05)), Platform::Internal);
    }

    #[test]
    fn test_boundary_and_direction() {
        // Exactly 5% is not "more than" 5%.
        assert_eq!(choose_platform(100, 105, dec!(0.05)), Platform::Internal);
        // The rule is symmetric: a much better internal output still defers to external.
        assert_eq!(choose_platform(120, 100, dec!(0.05)), Platform::External);
        assert_eq!(choose_platform(0, 0, dec!(0.05)), Platform::Internal);
    }

    #[test]
    fn test_select_with_both_sides() {
        let selection = select(Some(evaluated(100)), Some(external(106)), None, dec!(0.05)).unwrap();
        assert_eq!(selection.platform(), Platform::External);
        assert_eq!(selection.quote.final_output_amount, 106);
        assert_eq!(selection.quote.aggregate_price_impact, dec!(0.002));

        let selection = select(Some(evaluated(100)), Some(external(102)), None, dec!(0.05)).unwrap();
        assert_eq!(selection.platform(), Platform::Internal);
        assert_eq!(selection.quote.final_output_amount, 100);
        assert_eq!(selection.hop_mints().len(), 2);
    }

    #[test]
    fn test_zero_external_output_keeps_internal() {
        // The bare rule would pick external here, since any gap exceeds 5% of zero.
        assert_eq!(choose_platform(100, 0, dec!(0.05)), Platform::External);

        let selection = select(Some(evaluated(100)), Some(external(0)), None, dec!(0.05)).unwrap();
        assert_eq!(selection.platform(), Platform::Internal);
        assert_eq!(selection.quote.final_output_amount, 100);
        assert!(selection.external.is_some());

        let external_only = select(None, Some(external(0)), None, dec!(0.05)).unwrap();
        assert_eq!(external_only.platform(), Platform::External);
    }

    #[test]
    fn test_select_with_one_side_missing() {
        let internal_only = select(
            Some(evaluated(100)),
            None,
            Some("timeout".to_string()),
            dec!(0.05),
        )
        .unwrap();
        assert_eq!(internal_only.platform(), Platform::Internal);
        assert_eq!(internal_only.external_error.as_deref(), Some("timeout"));

        let external_only = select(None, Some(external(42)), None, dec!(0.05)).unwrap();
        assert_eq!(external_only.platform(), Platform::External);

        assert!(select(None, None, None, dec!(0.05)).is_none());
    }
}
