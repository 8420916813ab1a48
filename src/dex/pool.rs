//! Weighted pool state, immutable snapshots and the upstream provider seams.

use crate::error::RouterError;
use crate::utils::serde_pubkey;
use dashmap::DashMap;
use log::{debug, info, warn};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Per-mint trading switch set by the pool authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MintAction {
    Active,
    Paused,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedPool {
    #[serde(with = "serde_pubkey")]
    pub address: Pubkey,
    #[serde(with = "serde_pubkey::vec")]
    pub mints: Vec<Pubkey>,
    /// Base units of each mint.
    pub reserves: Vec<u64>,
    /// Relative scale; only ratios matter.
    pub weights: Vec<u64>,
    pub swap_fee: Decimal,
    pub protocol_tax: Decimal,
    pub lp_supply: u64,
    pub actions: Vec<MintAction>,
}

impl WeightedPool {
    /// Checks the structural invariants. Funding is checked separately by [`is_funded`].
    ///
    /// [`is_funded`]: WeightedPool::is_funded
    pub fn validate(&self) -> Result<(), RouterError> {
        let n = self.mints.len();
        if n < 2 {
            return Err(RouterError::InvalidPoolState(format!(
                "pool {} has {} mints, need at least 2",
                self.address, n
            )));
        }
        if self.reserves.len() != n || self.weights.len() != n || self.actions.len() != n {
            return Err(RouterError::InvalidPoolState(format!(
                "pool {} has mismatched lengths: mints={} reserves={} weights={} actions={}",
                self.address,
                n,
                self.reserves.len(),
                self.weights.len(),
                self.actions.len()
            )));
        }
        if self.total_weight() == 0 {
            return Err(RouterError::InvalidPoolState(format!(
                "pool {} has zero total weight",
                self.address
            )));
        }
        if self.swap_fee < Decimal::ZERO || self.swap_fee >= Decimal::ONE {
            return Err(RouterError::InvalidPoolState(format!(
                "pool {} swap fee {} outside [0, 1)",
                self.address, self.swap_fee
            )));
        }
        if self.protocol_tax < Decimal::ZERO || self.protocol_tax > Decimal::ONE {
            return Err(RouterError::InvalidPoolState(format!(
                "pool {} protocol tax {} outside [0, 1]",
                self.address, self.protocol_tax
            )));
        }
        Ok(())
    }

    /// A pool with any empty reserve cannot price anything.
    pub fn is_funded(&self) -> bool {
        !self.reserves.is_empty() && self.reserves.iter().all(|r| *r > 0)
    }

    pub fn total_weight(&self) -> u128 {
        self.weights.iter().map(|w| *w as u128).sum()
    }

    pub fn index_of(&self, mint: &Pubkey) -> Option<usize> {
        self.mints.iter().position(|m| m == mint)
    }

    pub fn is_active(&self, index: usize) -> bool {
        matches!(self.actions.get(index), Some(MintAction::Active))
    }
}

/// Immutable view of every known pool, shared by all legs of one evaluation pass.
#[derive(Debug, Clone, Default)]
pub struct PoolSnapshot {
    version: u64,
    pools: Arc<HashMap<Pubkey, WeightedPool>>,
}

impl PoolSnapshot {
    pub fn new(version: u64, pools: HashMap<Pubkey, WeightedPool>) -> Self {
        Self {
            version,
            pools: Arc::new(pools),
        }
    }

    pub fn from_pools(version: u64, pools: impl IntoIterator<Item = WeightedPool>) -> Self {
        Self::new(
            version,
            pools.into_iter().map(|p| (p.address, p)).collect(),
        )
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, address: &Pubkey) -> Option<&WeightedPool> {
        self.pools.get(address)
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }

    /// Pools sorted by address, so everything derived from a snapshot is deterministic.
    pub fn sorted_pools(&self) -> Vec<&WeightedPool> {
        let mut pools: Vec<&WeightedPool> = self.pools.values().collect();
        pools.sort_by_key(|p| p.address);
        pools
    }
}

/// Upstream pool state, kept live by an account subscription layer.
pub trait PoolStateProvider: Send + Sync {
    fn get_all_pools(&self) -> PoolSnapshot;
}

/// Upstream mint metadata.
pub trait MintMetadataProvider: Send + Sync {
    fn decimals_of(&self, mint: &Pubkey) -> Option<u8>;

    /// Mint registered under `symbol`, case-insensitive.
    fn mint_by_symbol(&self, _symbol: &str) -> Option<Pubkey> {
        None
    }
}

/// In-memory pool cache fed by the host's account subscriptions.
#[derive(Debug, Default)]
pub struct PoolStore {
    pools: DashMap<Pubkey, WeightedPool>,
    version: AtomicU64,
}

impl PoolStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a pool. Structurally invalid pools are rejected.
    pub fn upsert(&self, pool: WeightedPool) -> Result<(), RouterError> {
        pool.validate()?;
        debug!("Pool {} updated", pool.address);
        self.pools.insert(pool.address, pool);
        self.version.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    pub fn remove(&self, address: &Pubkey) -> Option<WeightedPool> {
        let removed = self.pools.remove(address).map(|(_, p)| p);
        if removed.is_some() {
            self.version.fetch_add(1, Ordering::SeqCst);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

impl PoolStateProvider for PoolStore {
    fn get_all_pools(&self) -> PoolSnapshot {
        let version = self.version.load(Ordering::SeqCst);
        let pools = self
            .pools
            .iter()
            .map(|entry| (*entry.key(), entry.value().clone()))
            .collect();
        PoolSnapshot::new(version, pools)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintInfo {
    #[serde(with = "serde_pubkey")]
    pub mint: Pubkey,
    #[serde(default)]
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, Default)]
pub struct MintRegistry {
    mints: HashMap<Pubkey, MintInfo>,
}

impl MintRegistry {
    pub fn new(mints: impl IntoIterator<Item = MintInfo>) -> Self {
        Self {
            mints: mints.into_iter().map(|m| (m.mint, m)).collect(),
        }
    }

    pub fn insert(&mut self, mint: Pubkey, symbol: &str, decimals: u8) {
        self.mints.insert(
            mint,
            MintInfo {
                mint,
                symbol: symbol.to_string(),
                decimals,
            },
        );
    }

    /// Lowest mint address wins when a symbol is registered twice.
    pub fn by_symbol(&self, symbol: &str) -> Option<&MintInfo> {
        if symbol.is_empty() {
            return None;
        }
        self.mints
            .values()
            .filter(|m| m.symbol.eq_ignore_ascii_case(symbol))
            .min_by_key(|m| m.mint)
    }
}

impl MintMetadataProvider for MintRegistry {
    fn decimals_of(&self, mint: &Pubkey) -> Option<u8> {
        self.mints.get(mint).map(|m| m.decimals)
    }

    fn mint_by_symbol(&self, symbol: &str) -> Option<Pubkey> {
        self.by_symbol(symbol).map(|m| m.mint)
    }
}

/// On-disk form of a pool snapshot, as written by the account indexer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SnapshotFile {
    #[serde(default)]
    pub mints: Vec<MintInfo>,
    #[serde(default)]
    pub pools: Vec<WeightedPool>,
}

impl SnapshotFile {
    pub fn from_json(raw: &str) -> Result<Self, RouterError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RouterError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            RouterError::ConfigError(format!("Cannot read snapshot {}: {}", path.display(), e))
        })?;
        Self::from_json(&raw)
    }

    /// Splits the file into a populated store and registry, skipping invalid pools.
    pub fn into_providers(self) -> (PoolStore, MintRegistry) {
        let store = PoolStore::new();
        let total = self.pools.len();
        for pool in self.pools {
            let address = pool.address;
            if let Err(e) = store.upsert(pool) {
                warn!("Skipping pool {}: {}", address, e);
            }
        }
        info!("Loaded {}/{} pools, {} mints", store.len(), total, self.mints.len());
        (store, MintRegistry::new(self.mints))
    }
}
