// src/dex/quote.rs

use crate::dex::clients::jupiter_api::QuoteResponse;
use crate::error::RouterError;
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

/// What the external aggregator is asked to price.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalQuoteRequest {
    pub mint_in: Pubkey,
    pub mint_out: Pubkey,
    /// Base units of `mint_in`.
    pub amount_in: u64,
    pub max_slippage_bps: u16,
}

/// An aggregator quote. The plan is opaque to this crate and passed through as-is.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExternalQuote {
    pub out_amount: u64,
    pub price_impact: Decimal,
    pub route_plan: QuoteResponse,
}

impl ExternalQuote {
    pub fn from_response(response: QuoteResponse) -> Result<Self, RouterError> {
        Ok(Self {
            out_amount: response.out_amount_u64()?,
            price_impact: response.price_impact(),
            route_plan: response,
        })
    }
}

/// A competing liquidity venue that can price a whole trade on its own.
///
/// Implementations report every failure as an error; callers degrade to
/// internal-only selection rather than retrying indefinitely.
#[async_trait]
pub trait AggregatorClient: Send + Sync {
    fn name(&self) -> &str;

    async fn quote(&self, request: &ExternalQuoteRequest) -> Result<ExternalQuote, RouterError>;
}
