// src/engine/session.rs
//! Reactive quote session: trailing-edge debounce, request tokens, last input wins.
//!
//! ```text
//! Idle -> Debouncing -> Fetching -> Ready
//!              ^            |
//!              +-- Stale <--+   (input arrives while fetching)
//! ```

use super::{QuoteEngine, QuoteInput, QuoteOutcome};
use log::{debug, info};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum QuotePhase {
    Idle,
    Debouncing,
    Fetching,
    /// In-flight result superseded; about to debounce again.
    Stale,
    Ready,
}

/// What the host renders. Published through a `watch` channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionState {
    pub phase: QuotePhase,
    /// Token of the most recent input; results carrying any other token are dropped.
    pub token: u64,
    pub input: Option<QuoteInput>,
    /// Always computed from `input`, never from an older one.
    pub outcome: Option<QuoteOutcome>,
    pub recomputes: u64,
    pub discarded: u64,
}

impl SessionState {
    fn idle() -> Self {
        Self {
            phase: QuotePhase::Idle,
            token: 0,
            input: None,
            outcome: None,
            recomputes: 0,
            discarded: 0,
        }
    }

    pub fn is_fetching(&self) -> bool {
        self.phase == QuotePhase::Fetching
    }
}

pub struct QuoteSession {
    inputs: mpsc::UnboundedSender<QuoteInput>,
    state: watch::Receiver<SessionState>,
    task: JoinHandle<()>,
}

impl QuoteSession {
    pub fn spawn(engine: Arc<QuoteEngine>) -> Self {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(SessionState::idle());
        let task = tokio::spawn(run(engine, input_rx, state_tx));
        Self {
            inputs: input_tx,
            state: state_rx,
            task,
        }
    }

    /// Queues a new bid/ask/amount. Returns `false` once the session has stopped.
    pub fn set_input(&self, input: QuoteInput) -> bool {
        self.inputs.send(input).is_ok()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub async fn shutdown(self) {
        drop(self.inputs);
        let _ = self.task.await;
    }
}

struct InFlight {
    token: u64,
    handle: JoinHandle<()>,
}

async fn run(
    engine: Arc<QuoteEngine>,
    mut inputs: mpsc::UnboundedReceiver<QuoteInput>,
    state: watch::Sender<SessionState>,
) {
    let debounce = engine.config().debounce;
    let (result_tx, mut results) = mpsc::unbounded_channel::<(u64, QuoteOutcome)>();

    let mut token: u64 = 0;
    let mut pending: Option<QuoteInput> = None;
    let mut deadline: Option<Instant> = None;
    let mut in_flight: Option<InFlight> = None;

    loop {
        tokio::select! {
            input = inputs.recv() => {
                let Some(input) = input else {
                    debug!("Quote session input closed");
                    break;
                };
                token += 1;
                if let Some(stale) = in_flight.take() {
                    stale.handle.abort();
                    debug!("Request {} superseded by {}", stale.token, token);
                    state.send_modify(|s| {
                        s.phase = QuotePhase::Stale;
                        s.discarded += 1;
                    });
                }
                // Every input restarts the quiet period.
                deadline = Some(Instant::now() + debounce);
                pending = Some(input.clone());
                state.send_modify(|s| {
                    s.phase = QuotePhase::Debouncing;
                    s.token = token;
                    s.input = Some(input);
                    s.outcome = None;
                });
            }

            _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                let Some(input) = pending.take() else { continue };
                let request_token = token;

                match engine.parse_input(&input) {
                    Err(e) => {
                        debug!("Request {} rejected: {}", request_token, e);
                        state.send_modify(|s| {
                            s.phase = QuotePhase::Ready;
                            s.outcome = Some(QuoteOutcome::Invalid(e.to_string()));
                        });
                    }
                    Ok(request) => {
                        let engine = engine.clone();
                        let result_tx = result_tx.clone();
                        let handle = tokio::spawn(async move {
                            let outcome = engine.compute(&request).await;
                            let _ = result_tx.send((request_token, outcome));
                        });
                        in_flight = Some(InFlight { token: request_token, handle });
                        state.send_modify(|s| {
                            s.phase = QuotePhase::Fetching;
                            s.recomputes += 1;
                        });
                    }
                }
            }

            Some((result_token, outcome)) = results.recv() => {
                // Already counted as discarded when it was superseded.
                if result_token != token {
                    debug!("Discarding stale result {} (current {})", result_token, token);
                    continue;
                }
                in_flight = None;
                state.send_modify(|s| {
                    s.phase = QuotePhase::Ready;
                    s.outcome = Some(outcome);
                });
            }
        }
    }

    if let Some(flight) = in_flight.take() {
        flight.handle.abort();
    }
    info!("Quote session stopped after {} inputs", token);
}
