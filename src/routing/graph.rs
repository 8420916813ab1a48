// src/routing/graph.rs
//! Adjacency of tradable mint pairs, rebuilt whenever the pool snapshot changes.

use crate::dex::pool::PoolSnapshot;
use log::{debug, info};
use solana_sdk::pubkey::Pubkey;
use std::collections::BTreeMap;

pub type Adjacency = BTreeMap<Pubkey, BTreeMap<Pubkey, Vec<Pubkey>>>;

/// `mint -> mint -> [pool]`. Ordered maps keep search order deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteGraph {
    version: u64,
    adjacency: Adjacency,
}

impl RouteGraph {
    /// Directed edges for every pair of active mints in every funded pool.
    ///
    /// Directions can be asymmetric only through per-mint action flags,
    /// which both ends of an edge must pass.
    pub fn build(snapshot: &PoolSnapshot) -> Self {
        let mut adjacency: Adjacency = BTreeMap::new();
        let mut skipped = 0usize;
        let mut edges = 0usize;

        for pool in snapshot.sorted_pools() {
            if let Err(e) = pool.validate() {
                debug!("Excluding pool {} from routing: {}", pool.address, e);
                skipped += 1;
                continue;
            }
            if !pool.is_funded() {
                debug!("Excluding unfunded pool {} from routing", pool.address);
                skipped += 1;
                continue;
            }
            for (i, mint_in) in pool.mints.iter().enumerate() {
                if !pool.is_active(i) {
                    continue;
                }
                for (j, mint_out) in pool.mints.iter().enumerate() {
                    if i == j || !pool.is_active(j) || mint_in == mint_out {
                        continue;
                    }
                    adjacency
                        .entry(*mint_in)
                        .or_default()
                        .entry(*mint_out)
                        .or_default()
                        .push(pool.address);
                    edges += 1;
                }
            }
        }

        info!(
            "Route graph v{} built: {} mints, {} edges, {} pools excluded",
            snapshot.version(),
            adjacency.len(),
            edges,
            skipped
        );
        Self {
            version: snapshot.version(),
            adjacency,
        }
    }

    pub fn from_adjacency(version: u64, adjacency: Adjacency) -> Self {
        Self { version, adjacency }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn pools_between(&self, mint_in: &Pubkey, mint_out: &Pubkey) -> &[Pubkey] {
        self.adjacency
            .get(mint_in)
            .and_then(|targets| targets.get(mint_out))
            .map(|pools| pools.as_slice())
            .unwrap_or(&[])
    }

    pub fn neighbors(&self, mint: &Pubkey) -> impl Iterator<Item = (&Pubkey, &Vec<Pubkey>)> {
        self.adjacency.get(mint).into_iter().flat_map(|targets| targets.iter())
    }

    pub fn mint_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.adjacency
            .values()
            .flat_map(|targets| targets.values())
            .map(|pools| pools.len())
            .sum()
    }
}
