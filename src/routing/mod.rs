// src/routing/mod.rs
//! Multi-hop routing over weighted pools.
//!
//! - `graph`: tradable mint pairs to candidate pools
//! - `pathfinder`: candidate routes of up to three hops
//! - `evaluator`: prices candidates and keeps the best
//! - `selector`: internal route versus the external aggregator

pub mod evaluator;
pub mod graph;
pub mod pathfinder;
pub mod selector;

pub use evaluator::RouteEvaluator;
pub use graph::RouteGraph;
pub use pathfinder::{RouteSearch, MAX_ROUTE_HOPS};
pub use selector::{choose_platform, select, Selection};

use crate::dex::clients::jupiter_api::QuoteResponse;
use crate::utils::serde_pubkey;
use rust_decimal::Decimal;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;

/// One swap through one pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Leg {
    #[serde(with = "serde_pubkey")]
    pub pool: Pubkey,
    #[serde(with = "serde_pubkey")]
    pub mint_in: Pubkey,
    #[serde(with = "serde_pubkey")]
    pub mint_out: Pubkey,
}

impl Leg {
    pub fn new(pool: Pubkey, mint_in: Pubkey, mint_out: Pubkey) -> Self {
        Self {
            pool,
            mint_in,
            mint_out,
        }
    }

    pub fn reverses(&self, other: &Leg) -> bool {
        self.mint_in == other.mint_out && self.mint_out == other.mint_in
    }
}

/// Ordered legs from a bid mint to an ask mint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Route {
    pub legs: Vec<Leg>,
}

impl Route {
    pub fn new(legs: Vec<Leg>) -> Self {
        Self { legs }
    }

    pub fn len(&self) -> usize {
        self.legs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.legs.is_empty()
    }

    pub fn pools(&self) -> Vec<Pubkey> {
        self.legs.iter().map(|l| l.pool).collect()
    }

    /// Mints visited in order, bid first.
    pub fn hop_mints(&self) -> Vec<Pubkey> {
        let mut mints = Vec::with_capacity(self.legs.len() + 1);
        if let Some(first) = self.legs.first() {
            mints.push(first.mint_in);
        }
        mints.extend(self.legs.iter().map(|l| l.mint_out));
        mints
    }
}

/// One priced leg.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteInfo {
    #[serde(with = "serde_pubkey")]
    pub pool: Pubkey,
    #[serde(with = "serde_pubkey")]
    pub mint_in: Pubkey,
    #[serde(with = "serde_pubkey")]
    pub mint_out: Pubkey,
    pub amount_in: u64,
    pub amount_out: u64,
    pub price_impact: Decimal,
    /// Swap fee charged on `amount_in`, in input base units.
    pub fee_amount: u64,
    /// Protocol's cut of `fee_amount`.
    pub protocol_fee: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluatedRoute {
    pub route: Route,
    pub legs: Vec<RouteInfo>,
    pub amount_in: u64,
    pub amount_out: u64,
    /// `1 - Π(1 - leg impact)`
    pub price_impact: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Internal,
    External,
}

/// What the downstream transaction builder consumes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "platform", content = "plan", rename_all = "lowercase")]
pub enum ExecutionPlan {
    Internal(Vec<Leg>),
    External(QuoteResponse),
}

impl ExecutionPlan {
    pub fn platform(&self) -> Platform {
        match self {
            ExecutionPlan::Internal(_) => Platform::Internal,
            ExecutionPlan::External(_) => Platform::External,
        }
    }

    /// Flattened mint sequence for display, as base58 strings.
    pub fn hop_mints(&self) -> Vec<String> {
        match self {
            ExecutionPlan::Internal(legs) => Route::new(legs.clone())
                .hop_mints()
                .iter()
                .map(|m| m.to_string())
                .collect(),
            ExecutionPlan::External(response) => response.hop_mints(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Quote {
    pub platform: Platform,
    pub plan: ExecutionPlan,
    pub final_output_amount: u64,
    pub aggregate_price_impact: Decimal,
}
