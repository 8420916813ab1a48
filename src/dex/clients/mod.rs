// src/dex/clients/mod.rs
//! External venue clients.

pub mod jupiter;
pub mod jupiter_api;

pub use jupiter::JupiterClient;
