//! Integration tests for the quote engine and the debounced quote session.
//!
//! Pool state and the aggregator are mocked; the clock is paused so debounce
//! timings are exact.

use async_trait::async_trait;
use pretty_assertions::assert_eq;
use rust_decimal_macros::dec;
use solana_sdk::pubkey::Pubkey;
use solana_swap_router::{
    config::Config,
    dex::{
        clients::jupiter_api::{QuoteResponse, RoutePlan, SwapInfo},
        pool::{MintAction, MintRegistry, PoolSnapshot, PoolStateProvider, PoolStore, WeightedPool},
        AggregatorClient, ExternalQuote, ExternalQuoteRequest,
    },
    engine::{EngineConfig, QuoteEngine, QuoteInput, QuoteOutcome, QuotePhase, QuoteSession},
    error::RouterError,
    routing::Platform,
    utils::{RAY_MINT, SOL_MINT, USDC_MINT},
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::Instant;

/// Pool store that records when each evaluation pass took its snapshot.
struct RecordingPools {
    store: PoolStore,
    reads: Mutex<Vec<Instant>>,
}

impl RecordingPools {
    fn new(pools: Vec<WeightedPool>) -> Arc<Self> {
        let store = PoolStore::new();
        for pool in pools {
            store.upsert(pool).unwrap();
        }
        Arc::new(Self {
            store,
            reads: Mutex::new(Vec::new()),
        })
    }

    fn reads(&self) -> Vec<Instant> {
        self.reads.lock().unwrap().clone()
    }
}

impl PoolStateProvider for RecordingPools {
    fn get_all_pools(&self) -> PoolSnapshot {
        self.reads.lock().unwrap().push(Instant::now());
        self.store.get_all_pools()
    }
}

/// Aggregator returning a fixed output after a delay, or failing.
struct MockAggregator {
    out_amount: Option<u64>,
    delay: Duration,
    calls: AtomicUsize,
}

impl MockAggregator {
    fn quoting(out_amount: u64) -> Arc<Self> {
        Arc::new(Self {
            out_amount: Some(out_amount),
            delay: Duration::from_millis(20),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            out_amount: None,
            delay: Duration::from_millis(20),
            calls: AtomicUsize::new(0),
        })
    }

    fn slow(out_amount: u64, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            out_amount: Some(out_amount),
            delay,
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl AggregatorClient for MockAggregator {
    fn name(&self) -> &str {
        "MockAggregator"
    }

    async fn quote(&self, request: &ExternalQuoteRequest) -> Result<ExternalQuote, RouterError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        let out_amount = self
            .out_amount
            .ok_or_else(|| RouterError::JupiterTimeoutError("mock timeout".to_string()))?;
        let response = QuoteResponse {
            input_mint: request.mint_in.to_string(),
            in_amount: request.amount_in.to_string(),
            output_mint: request.mint_out.to_string(),
            out_amount: out_amount.to_string(),
            other_amount_threshold: out_amount.to_string(),
            swap_mode: Some("ExactIn".to_string()),
            slippage_bps: Some(request.max_slippage_bps),
            route_plan: vec![RoutePlan {
                swap_info: SwapInfo {
                    amm_key: Pubkey::new_unique().to_string(),
                    label: "Mock".to_string(),
                    input_mint: request.mint_in.to_string(),
                    output_mint: request.mint_out.to_string(),
                    in_amount: request.amount_in.to_string(),
                    out_amount: out_amount.to_string(),
                    fee_amount: "0".to_string(),
                    fee_mint: request.mint_in.to_string(),
                },
                percent: 100,
            }],
            context_slot: Some(1),
            time_taken: Some(0.01),
            platform_fee: None,
            price_impact_pct: "0.001".to_string(),
        };
        ExternalQuote::from_response(response)
    }
}

fn pool(mints: [Pubkey; 2], reserves: [u64; 2]) -> WeightedPool {
    WeightedPool {
        address: Pubkey::new_unique(),
        mints: mints.to_vec(),
        reserves: reserves.to_vec(),
        weights: vec![50, 50],
        swap_fee: dec!(0.003),
        protocol_tax: dec!(0.1),
        lp_supply: 1_000_000_000,
        actions: vec![MintAction::Active; 2],
    }
}

/// 100 USDC per SOL, 50 RAY per SOL; no direct USDC/RAY pool.
fn market() -> Vec<WeightedPool> {
    vec![
        pool([USDC_MINT, SOL_MINT], [1_000_000_000_000, 10_000_000_000_000]),
        pool([SOL_MINT, RAY_MINT], [10_000_000_000_000, 500_000_000_000]),
    ]
}

fn registry() -> Arc<MintRegistry> {
    let mut registry = MintRegistry::default();
    registry.insert(USDC_MINT, "USDC", 6);
    registry.insert(SOL_MINT, "SOL", 9);
    registry.insert(RAY_MINT, "RAY", 6);
    Arc::new(registry)
}

fn engine(
    pools: Arc<RecordingPools>,
    aggregator: Option<Arc<dyn AggregatorClient>>,
) -> Arc<QuoteEngine> {
    Arc::new(QuoteEngine::new(
        pools,
        registry(),
        aggregator,
        EngineConfig::from(&Config::test_default()),
    ))
}

async fn internal_output(input: &QuoteInput) -> u64 {
    let engine = engine(RecordingPools::new(market()), None);
    engine
        .quote(input)
        .await
        .selection()
        .and_then(|s| s.internal.as_ref())
        .map(|r| r.amount_out)
        .expect("internal route")
}

#[tokio::test(start_paused = true)]
async fn test_debounce_runs_one_pass_with_last_amount() {
    let pools = RecordingPools::new(market());
    let session = QuoteSession::spawn(engine(pools.clone(), None));
    let mut state = session.subscribe();
    let start = Instant::now();

    for (i, amount) in ["1", "2", "3", "4"].iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert!(session.set_input(QuoteInput::new("USDC", "RAY", *amount)));
    }

    let ready = state
        .wait_for(|s| s.phase == QuotePhase::Ready)
        .await
        .unwrap()
        .clone();

    let reads = pools.reads();
    assert_eq!(reads.len(), 1);
    let fired_at = reads[0].duration_since(start);
    assert!(
        fired_at >= Duration::from_millis(450) && fired_at < Duration::from_millis(460),
        "recompute at {:?}",
        fired_at
    );

    assert_eq!(ready.recomputes, 1);
    assert_eq!(ready.input.as_ref().map(|i| i.amount.as_str()), Some("4"));
    let selection = ready.outcome.as_ref().and_then(|o| o.selection()).unwrap();
    assert_eq!(selection.internal.as_ref().unwrap().amount_in, 4_000_000);
    assert_eq!(selection.platform(), Platform::Internal);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_input_during_fetch_discards_stale_result() {
    let pools = RecordingPools::new(market());
    let aggregator = MockAggregator::slow(1, Duration::from_millis(500));
    let session = QuoteSession::spawn(engine(pools.clone(), Some(aggregator.clone())));
    let mut state = session.subscribe();

    session.set_input(QuoteInput::new("USDC", "RAY", "1"));
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(session.state().is_fetching());

    session.set_input(QuoteInput::new("USDC", "RAY", "2"));
    tokio::time::sleep(Duration::from_millis(1)).await;
    let debouncing = session.state();
    assert_eq!(debouncing.phase, QuotePhase::Debouncing);
    assert_eq!(debouncing.discarded, 1);
    assert!(debouncing.outcome.is_none());

    let ready = state
        .wait_for(|s| s.phase == QuotePhase::Ready)
        .await
        .unwrap()
        .clone();
    assert_eq!(ready.token, 2);
    assert_eq!(ready.recomputes, 2);
    let selection = ready.outcome.as_ref().and_then(|o| o.selection()).unwrap();
    assert_eq!(selection.internal.as_ref().unwrap().amount_in, 2_000_000);
    assert_eq!(pools.reads().len(), 2);
    assert_eq!(aggregator.calls.load(Ordering::SeqCst), 2);

    session.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_external_and_internal_run_concurrently() {
    let pools = RecordingPools::new(market());
    let aggregator = MockAggregator::slow(1, Duration::from_millis(200));
    let engine = engine(pools, Some(aggregator));
    let start = Instant::now();

    let outcome = engine.quote(&QuoteInput::new("USDC", "RAY", "10")).await;
    assert!(outcome.selection().is_some());
    // Internal pricing takes no virtual time, so the pass costs only the external wait.
    assert_eq!(start.elapsed(), Duration::from_millis(200));
}

#[tokio::test]
async fn test_external_failure_falls_back_to_internal() {
    let pools = RecordingPools::new(market());
    let aggregator = MockAggregator::failing();
    let engine = engine(pools, Some(aggregator.clone()));

    let outcome = engine.quote(&QuoteInput::new("USDC", "RAY", "100")).await;
    let selection = outcome.selection().expect("internal quote survives");
    assert_eq!(selection.platform(), Platform::Internal);
    assert!(selection.external.is_none());
    assert!(selection
        .external_error
        .as_deref()
        .unwrap()
        .contains("mock timeout"));
    assert_eq!(selection.hop_mints().len(), 3);
    assert_eq!(aggregator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_venue_choice_follows_five_percent_rule() {
    let input = QuoteInput::new("USDC", "RAY", "100");
    let internal = internal_output(&input).await;

    let far = MockAggregator::quoting(internal * 106 / 100);
    let outcome = engine(RecordingPools::new(market()), Some(far)).quote(&input).await;
    let selection = outcome.selection().unwrap();
    assert_eq!(selection.platform(), Platform::External);
    assert_eq!(selection.quote.final_output_amount, internal * 106 / 100);

    let near = MockAggregator::quoting(internal * 102 / 100);
    let outcome = engine(RecordingPools::new(market()), Some(near)).quote(&input).await;
    let selection = outcome.selection().unwrap();
    assert_eq!(selection.platform(), Platform::Internal);
    assert_eq!(selection.quote.final_output_amount, internal);
}

#[tokio::test]
async fn test_missing_internal_route_uses_external_or_reports_no_route() {
    let input = QuoteInput::new("USDC", "RAY", "5");

    let external_only = engine(RecordingPools::new(vec![]), Some(MockAggregator::quoting(777)))
        .quote(&input)
        .await;
    let selection = external_only.selection().unwrap();
    assert_eq!(selection.platform(), Platform::External);
    assert_eq!(selection.quote.final_output_amount, 777);

    let nothing = engine(RecordingPools::new(vec![]), Some(MockAggregator::failing()))
        .quote(&input)
        .await;
    assert_eq!(nothing, QuoteOutcome::NoRoute);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_input_short_circuits_without_a_pass() {
    let pools = RecordingPools::new(market());
    let session = QuoteSession::spawn(engine(pools.clone(), None));
    let mut state = session.subscribe();

    session.set_input(QuoteInput::new("USDC", "RAY", "-3"));
    let ready = state
        .wait_for(|s| s.phase == QuotePhase::Ready)
        .await
        .unwrap()
        .clone();

    assert!(matches!(ready.outcome, Some(QuoteOutcome::Invalid(_))));
    assert_eq!(ready.recomputes, 0);
    assert!(pools.reads().is_empty());

    session.shutdown().await;
}
