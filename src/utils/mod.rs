// src/utils/mod.rs
use crate::error::RouterError;
use log::info;
use once_cell::sync::Lazy;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey;
use solana_sdk::pubkey::Pubkey;
use std::collections::HashMap;
use std::str::FromStr;

pub mod serde_pubkey;
pub mod timing;

pub const SOL_MINT: Pubkey = pubkey!("So11111111111111111111111111111111111111112");
pub const USDC_MINT: Pubkey = pubkey!("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
pub const RAY_MINT: Pubkey = pubkey!("4k3Dyjzvzp8eMZWUXbBCjEvwSkkk59S5iCNLY3QrkX6R");

/// Symbols the CLI accepts in place of a base58 mint.
pub static WELL_KNOWN_MINTS: Lazy<HashMap<&'static str, Pubkey>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("SOL", SOL_MINT);
    m.insert("USDC", USDC_MINT);
    m.insert("RAY", RAY_MINT);
    m
});

pub fn setup_logging(level: log::LevelFilter) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                record.level(),
                record.target(),
                message
            ))
        })
        .level(level)
        .level_for("hyper", log::LevelFilter::Warn)
        .level_for("reqwest", log::LevelFilter::Warn)
        .chain(std::io::stderr())
        .apply()?;
    info!("Logging initialized.");
    Ok(())
}

/// Resolves a base58 mint or one of [`WELL_KNOWN_MINTS`].
pub fn resolve_mint(input: &str) -> Result<Pubkey, RouterError> {
    if let Some(mint) = WELL_KNOWN_MINTS.get(input.to_uppercase().as_str()) {
        return Ok(*mint);
    }
    Pubkey::from_str(input)
        .map_err(|e| RouterError::InputInvalid(format!("Unknown mint '{}': {}", input, e)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    pub amount: u64,
    pub decimals: u8,
}

impl TokenAmount {
    pub fn new(amount: u64, decimals: u8) -> Self {
        Self { amount, decimals }
    }

    /// Exact decimal value of the base-unit amount.
    pub fn to_decimal(&self) -> Decimal {
        to_real(self.amount, self.decimals)
    }

    /// Truncates toward zero; negative or unrepresentable values become zero.
    pub fn from_decimal(value: Decimal, decimals: u8) -> Self {
        Self {
            amount: from_real(value, decimals),
            decimals,
        }
    }

    /// Parses a user-typed amount ("1.5", "0.000001") into base units.
    ///
    /// Negative, non-numeric and over-precise inputs are rejected rather than rounded.
    pub fn from_ui_str(input: &str, decimals: u8) -> Result<Self, RouterError> {
        let trimmed = input.trim();
        let value = Decimal::from_str(trimmed)
            .map_err(|_| RouterError::InputInvalid(format!("'{}' is not a number", input)))?;
        if value.is_sign_negative() {
            return Err(RouterError::InputInvalid(format!(
                "'{}' is negative",
                input
            )));
        }
        if value.normalize().scale() > decimals as u32 {
            return Err(RouterError::InputInvalid(format!(
                "'{}' has more than {} decimal places",
                input, decimals
            )));
        }
        let scaled = pow10(decimals)
            .and_then(|scale| value.checked_mul(scale))
            .and_then(|v| v.trunc().to_u64())
            .ok_or_else(|| RouterError::InputInvalid(format!("'{}' is out of range", input)))?;
        Ok(Self::new(scaled, decimals))
    }
}

/// `10^decimals`, or `None` past what a `Decimal` can hold (above 28).
pub(crate) fn pow10(decimals: u8) -> Option<Decimal> {
    let mut value = Decimal::ONE;
    for _ in 0..decimals {
        value = value.checked_mul(Decimal::TEN)?;
    }
    Some(value)
}

/// Base units to real units. Unrepresentable scales read as zero, which every
/// estimate treats as an unpriceable balance.
pub fn to_real(amount: u64, decimals: u8) -> Decimal {
    Decimal::try_from_i128_with_scale(amount as i128, decimals as u32)
        .ok()
        .or_else(|| pow10(decimals).and_then(|scale| Decimal::from(amount).checked_div(scale)))
        .unwrap_or(Decimal::ZERO)
}

/// Real units to base units, truncating toward zero.
pub fn from_real(value: Decimal, decimals: u8) -> u64 {
    if value <= Decimal::ZERO {
        return 0;
    }
    pow10(decimals)
        .and_then(|scale| value.checked_mul(scale))
        .and_then(|v| v.trunc().to_u64())
        .unwrap_or(0)
}
