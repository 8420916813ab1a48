//! Jupiter API V6 Data Structures
//!
//! Request and response structures for the Jupiter V6 `/quote` endpoint.
//! The response doubles as the opaque external execution plan handed to the
//! transaction builder, so it round-trips through serde unchanged.

use crate::error::RouterError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

/// Request structure for Jupiter V6 /quote endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRequest {
    /// Input token mint address
    #[serde(rename = "inputMint")]
    pub input_mint: String,

    /// Output token mint address
    #[serde(rename = "outputMint")]
    pub output_mint: String,

    /// Amount of input token (in smallest unit)
    pub amount: u64,

    /// Slippage tolerance in basis points (e.g., 100 = 1%)
    #[serde(rename = "slippageBps")]
    pub slippage_bps: u16,

    /// Only use direct routes (optional)
    #[serde(rename = "onlyDirectRoutes", skip_serializing_if = "Option::is_none")]
    pub only_direct_routes: Option<bool>,

    /// Maximum number of accounts (optional)
    #[serde(rename = "maxAccounts", skip_serializing_if = "Option::is_none")]
    pub max_accounts: Option<u16>,
}

/// Response structure for Jupiter V6 /quote endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteResponse {
    #[serde(rename = "inputMint")]
    pub input_mint: String,

    #[serde(rename = "inAmount")]
    pub in_amount: String,

    #[serde(rename = "outputMint")]
    pub output_mint: String,

    /// Output amount (estimated)
    #[serde(rename = "outAmount")]
    pub out_amount: String,

    /// Minimum output after slippage
    #[serde(rename = "otherAmountThreshold")]
    pub other_amount_threshold: String,

    #[serde(rename = "swapMode", default)]
    pub swap_mode: Option<String>,

    #[serde(rename = "slippageBps", default)]
    pub slippage_bps: Option<u16>,

    #[serde(rename = "routePlan")]
    pub route_plan: Vec<RoutePlan>,

    #[serde(rename = "contextSlot", default)]
    pub context_slot: Option<u64>,

    /// Time taken to generate quote (ms)
    #[serde(rename = "timeTaken", default)]
    pub time_taken: Option<f64>,

    #[serde(rename = "platformFee", default, skip_serializing_if = "Option::is_none")]
    pub platform_fee: Option<PlatformFee>,

    /// Price impact as a fraction, despite the name
    #[serde(rename = "priceImpactPct")]
    pub price_impact_pct: String,
}

impl QuoteResponse {
    pub fn out_amount_u64(&self) -> Result<u64, RouterError> {
        self.out_amount.parse().map_err(|e| {
            RouterError::ParseError(format!("Invalid Jupiter outAmount '{}': {}", self.out_amount, e))
        })
    }

    /// Missing or malformed impact reads as zero; the amount is what gets compared.
    pub fn price_impact(&self) -> Decimal {
        Decimal::from_str(&self.price_impact_pct)
            .map(|d| d.max(Decimal::ZERO))
            .unwrap_or(Decimal::ZERO)
    }

    /// Input and output mint of every hop, in plan order.
    pub fn hop_mints(&self) -> Vec<String> {
        let mut mints = Vec::with_capacity(self.route_plan.len() + 1);
        for plan in &self.route_plan {
            if mints.last() != Some(&plan.swap_info.input_mint) {
                mints.push(plan.swap_info.input_mint.clone());
            }
            mints.push(plan.swap_info.output_mint.clone());
        }
        mints
    }
}

/// Route plan step in Jupiter quote
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutePlan {
    #[serde(rename = "swapInfo")]
    pub swap_info: SwapInfo,

    /// Percentage of amount for this route
    pub percent: u8,
}

/// Swap information within route plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SwapInfo {
    #[serde(rename = "ammKey")]
    pub amm_key: String,

    /// Label/name of the DEX
    #[serde(default)]
    pub label: String,

    #[serde(rename = "inputMint")]
    pub input_mint: String,

    #[serde(rename = "outputMint")]
    pub output_mint: String,

    #[serde(rename = "inAmount")]
    pub in_amount: String,

    #[serde(rename = "outAmount")]
    pub out_amount: String,

    #[serde(rename = "feeAmount", default)]
    pub fee_amount: String,

    #[serde(rename = "feeMint", default)]
    pub fee_mint: String,
}

/// Platform fee information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformFee {
    pub amount: String,

    #[serde(rename = "feeBps")]
    pub fee_bps: u16,
}

/// Jupiter API error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JupiterErrorResponse {
    pub error: String,

    #[serde(default)]
    pub message: Option<String>,

    #[serde(rename = "errorCode", default)]
    pub error_code: Option<String>,

    #[serde(default)]
    pub details: Option<HashMap<String, serde_json::Value>>,
}
