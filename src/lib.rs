pub mod config;
pub mod dex;
pub mod engine;
pub mod error;
pub mod routing;
pub mod utils;

pub use config::Config;
pub use engine::{EngineConfig, QuoteEngine, QuoteInput, QuoteOutcome, QuoteSession};
pub use error::RouterError;
