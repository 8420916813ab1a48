// src/engine/mod.rs
//! Quote computation over injected pool state, plus the reactive session driving it.

pub mod session;

pub use session::{QuotePhase, QuoteSession, SessionState};

use crate::config::Config;
use crate::dex::pool::{MintMetadataProvider, PoolSnapshot, PoolStateProvider};
use crate::dex::quote::{AggregatorClient, ExternalQuote, ExternalQuoteRequest};
use crate::error::RouterError;
use crate::routing::{select, EvaluatedRoute, Route, RouteEvaluator, RouteGraph, RouteSearch, Selection};
use crate::utils::timing::Timer;
use crate::utils::{resolve_mint, TokenAmount};
use dashmap::DashMap;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::Serialize;
use solana_sdk::pubkey::Pubkey;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

/// Warn when a single pass takes longer than this.
const SLOW_PASS_THRESHOLD: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub max_hops: usize,
    pub max_candidates: usize,
    pub max_slippage_bps: u16,
    pub external_preference_threshold: Decimal,
    pub debounce: Duration,
}

impl From<&Config> for EngineConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_hops: config.route_max_hops,
            max_candidates: config.route_max_candidates,
            max_slippage_bps: config.max_slippage_bps,
            external_preference_threshold: config.external_preference_threshold,
            debounce: Duration::from_millis(config.quote_debounce_ms),
        }
    }
}

/// Raw user input, exactly as typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteInput {
    pub bid: String,
    pub ask: String,
    pub amount: String,
}

impl QuoteInput {
    pub fn new(bid: impl Into<String>, ask: impl Into<String>, amount: impl Into<String>) -> Self {
        Self {
            bid: bid.into(),
            ask: ask.into(),
            amount: amount.into(),
        }
    }
}

/// A validated trade request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwapRequest {
    pub bid: Pubkey,
    pub ask: Pubkey,
    /// Base units of `bid`.
    pub amount_in: u64,
}

/// Every pass ends in one of these; none of them is fatal.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum QuoteOutcome {
    /// Bad input, shown as an empty quote.
    Invalid(String),
    NoRoute,
    Ready(Box<Selection>),
}

impl QuoteOutcome {
    pub fn selection(&self) -> Option<&Selection> {
        match self {
            QuoteOutcome::Ready(selection) => Some(selection.as_ref()),
            _ => None,
        }
    }
}

pub struct QuoteEngine {
    pools: Arc<dyn PoolStateProvider>,
    mints: Arc<dyn MintMetadataProvider>,
    aggregator: Option<Arc<dyn AggregatorClient>>,
    config: EngineConfig,
    search: RouteSearch,
    graph: RwLock<Option<Arc<RouteGraph>>>,
    /// Candidates per (bid, ask), tagged with the graph version they came from.
    candidates: DashMap<(Pubkey, Pubkey), (u64, Arc<Vec<Route>>)>,
}

impl QuoteEngine {
    pub fn new(
        pools: Arc<dyn PoolStateProvider>,
        mints: Arc<dyn MintMetadataProvider>,
        aggregator: Option<Arc<dyn AggregatorClient>>,
        config: EngineConfig,
    ) -> Self {
        let search = RouteSearch::new(config.max_hops, config.max_candidates);
        Self {
            pools,
            mints,
            aggregator,
            config,
            search,
            graph: RwLock::new(None),
            candidates: DashMap::new(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Registry symbols first, then the well-known table, then base58.
    fn resolve(&self, input: &str) -> Result<Pubkey, RouterError> {
        let input = input.trim();
        match self.mints.mint_by_symbol(input) {
            Some(mint) => Ok(mint),
            None => resolve_mint(input),
        }
    }

    /// Resolves mints and scales the typed amount by the bid mint's decimals.
    pub fn parse_input(&self, input: &QuoteInput) -> Result<SwapRequest, RouterError> {
        let bid = self.resolve(&input.bid)?;
        let ask = self.resolve(&input.ask)?;
        if bid == ask {
            return Err(RouterError::InputInvalid(
                "bid and ask mints are the same".to_string(),
            ));
        }
        let decimals = self
            .mints
            .decimals_of(&bid)
            .ok_or_else(|| RouterError::InputInvalid(format!("Unknown mint {}", bid)))?;
        if self.mints.decimals_of(&ask).is_none() {
            return Err(RouterError::InputInvalid(format!("Unknown mint {}", ask)));
        }
        let amount = TokenAmount::from_ui_str(&input.amount, decimals)?;
        if amount.amount == 0 {
            return Err(RouterError::InputInvalid("amount must be positive".to_string()));
        }
        Ok(SwapRequest {
            bid,
            ask,
            amount_in: amount.amount,
        })
    }

    /// The graph for `snapshot`, rebuilt only when the pool set has changed.
    pub async fn graph_for(&self, snapshot: &PoolSnapshot) -> Arc<RouteGraph> {
        if let Some(graph) = self.graph.read().await.as_ref() {
            if graph.version() == snapshot.version() {
                return graph.clone();
            }
        }
        let mut slot = self.graph.write().await;
        if let Some(graph) = slot.as_ref() {
            if graph.version() == snapshot.version() {
                return graph.clone();
            }
        }
        let graph = Arc::new(RouteGraph::build(snapshot));
        *slot = Some(graph.clone());
        graph
    }

    /// Candidate routes for a pair; amount changes reuse them.
    pub fn candidate_routes(&self, graph: &RouteGraph, bid: &Pubkey, ask: &Pubkey) -> Arc<Vec<Route>> {
        let key = (*bid, *ask);
        if let Some(entry) = self.candidates.get(&key) {
            if entry.0 == graph.version() {
                return entry.1.clone();
            }
        }
        let routes = Arc::new(self.search.find_routes(graph, bid, ask));
        self.candidates.insert(key, (graph.version(), routes.clone()));
        routes
    }

    /// Best internal route, all legs priced against the one `snapshot`.
    pub async fn quote_internal(
        &self,
        snapshot: &PoolSnapshot,
        request: &SwapRequest,
    ) -> Result<EvaluatedRoute, RouterError> {
        let graph = self.graph_for(snapshot).await;
        let routes = self.candidate_routes(&graph, &request.bid, &request.ask);
        RouteEvaluator::new(snapshot, self.mints.as_ref()).best_route(
            &routes,
            &request.bid,
            &request.ask,
            request.amount_in,
        )
    }

    pub async fn quote_external(&self, request: &SwapRequest) -> Result<ExternalQuote, RouterError> {
        let aggregator = self.aggregator.as_ref().ok_or_else(|| {
            RouterError::ExternalQuoteUnavailable("no aggregator configured".to_string())
        })?;
        aggregator
            .quote(&ExternalQuoteRequest {
                mint_in: request.bid,
                mint_out: request.ask,
                amount_in: request.amount_in,
                max_slippage_bps: self.config.max_slippage_bps,
            })
            .await
    }

    /// One full pass: internal and external run concurrently, then the selector decides.
    pub async fn compute(&self, request: &SwapRequest) -> QuoteOutcome {
        let mut timer = Timer::start(format!("quote {} -> {}", request.bid, request.ask));
        let snapshot = self.pools.get_all_pools();

        // External first, so its request is in flight while routes are priced.
        let (external, internal) = tokio::join!(
            self.quote_external(request),
            self.quote_internal(&snapshot, request)
        );
        timer.checkpoint("fetch");

        let internal = match internal {
            Ok(route) => Some(route),
            Err(e) => {
                debug!("No internal route: {}", e);
                None
            }
        };
        let (external, external_error) = match (external, self.aggregator.as_ref()) {
            (Ok(quote), _) => (Some(quote), None),
            (Err(e), Some(aggregator)) => {
                warn!(
                    "{} quote unavailable, using internal only: {}",
                    aggregator.name(),
                    e
                );
                (None, Some(e.to_string()))
            }
            (Err(e), None) => {
                debug!("External quotes disabled: {}", e);
                (None, Some(e.to_string()))
            }
        };

        let outcome = match select(
            internal,
            external,
            external_error,
            self.config.external_preference_threshold,
        ) {
            Some(selection) => {
                info!(
                    "Quote {} -> {}: {} in, {} out via {:?}",
                    request.bid,
                    request.ask,
                    request.amount_in,
                    selection.quote.final_output_amount,
                    selection.platform()
                );
                QuoteOutcome::Ready(Box::new(selection))
            }
            None => QuoteOutcome::NoRoute,
        };
        timer.checkpoint("select");
        timer.finish_with_threshold(SLOW_PASS_THRESHOLD);
        outcome
    }

    /// Parses then computes; bad input short-circuits to an empty quote.
    pub async fn quote(&self, input: &QuoteInput) -> QuoteOutcome {
        match self.parse_input(input) {
            Ok(request) => self.compute(&request).await,
            Err(e) => {
                debug!("Rejected quote input {:?}: {}", input, e);
                QuoteOutcome::Invalid(e.to_string())
            }
        }
    }
}
