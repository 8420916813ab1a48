//! Pool pricing math.
//!
//! ## Modules
//!
//! - `math/weighted.rs`: weighted multi-asset pools (join, exit, swap, spot price, impact)

pub mod weighted;
