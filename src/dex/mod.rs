// src/dex/mod.rs

pub mod clients;
pub mod math;
pub mod pool;
pub mod quote;

pub use pool::{
    MintAction, MintMetadataProvider, MintRegistry, PoolSnapshot, PoolStateProvider, PoolStore,
    WeightedPool,
};
pub use quote::{AggregatorClient, ExternalQuote, ExternalQuoteRequest};
