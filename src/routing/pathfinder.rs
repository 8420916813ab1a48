// src/routing/pathfinder.rs
//! Candidate route enumeration.
//!
//! Breadth-first over an explicit worklist, so routes come out shortest
//! first and, within a length, in mint then pool address order.

use super::graph::RouteGraph;
use super::{Leg, Route};
use log::{debug, warn};
use solana_sdk::pubkey::Pubkey;
use std::collections::VecDeque;

pub const MAX_ROUTE_HOPS: usize = 3;

#[derive(Debug, Clone)]
pub struct RouteSearch {
    max_hops: usize,
    max_candidates: usize,
}

/// A route under construction: where it stands and how it got there.
struct PartialRoute {
    at: Pubkey,
    legs: Vec<Leg>,
}

impl RouteSearch {
    pub fn new(max_hops: usize, max_candidates: usize) -> Self {
        Self {
            max_hops: max_hops.clamp(1, MAX_ROUTE_HOPS),
            max_candidates: max_candidates.max(1),
        }
    }

    pub fn max_hops(&self) -> usize {
        self.max_hops
    }

    /// Every valid route from `bid` to `ask`, up to the candidate cap.
    ///
    /// A route never uses the same pool twice and never trades a mint pair in
    /// both directions. Neither endpoint is used as an intermediate.
    pub fn find_routes(&self, graph: &RouteGraph, bid: &Pubkey, ask: &Pubkey) -> Vec<Route> {
        let mut routes = Vec::new();
        if bid == ask {
            return routes;
        }

        let mut worklist = VecDeque::new();
        worklist.push_back(PartialRoute {
            at: *bid,
            legs: Vec::new(),
        });

        while let Some(partial) = worklist.pop_front() {
            let depth = partial.legs.len();
            if depth >= self.max_hops {
                continue;
            }
            for (next, pools) in graph.neighbors(&partial.at) {
                if next == bid {
                    continue;
                }
                for pool in pools {
                    let leg = Leg::new(*pool, partial.at, *next);
                    if !extends_cleanly(&partial.legs, &leg) {
                        continue;
                    }
                    let mut legs = partial.legs.clone();
                    legs.push(leg);

                    if next == ask {
                        routes.push(Route::new(legs));
                        if routes.len() >= self.max_candidates {
                            warn!(
                                "Route search {} -> {} hit the {} candidate cap",
                                bid, ask, self.max_candidates
                            );
                            return routes;
                        }
                    } else if depth + 1 < self.max_hops {
                        worklist.push_back(PartialRoute { at: *next, legs });
                    }
                }
            }
        }

        debug!("Route search {} -> {}: {} candidates", bid, ask, routes.len());
        routes
    }
}

/// No repeated pool, no mint pair traded both ways.
fn extends_cleanly(legs: &[Leg], next: &Leg) -> bool {
    legs.iter()
        .all(|leg| leg.pool != next.pool && !leg.reverses(next))
}
