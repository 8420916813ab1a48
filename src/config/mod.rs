pub mod settings;

pub use settings::Config;

use crate::error::RouterError;
use rust_decimal::Decimal;
use std::sync::Arc;
use url::Url;

/// Loads `.env` if present, reads the environment and validates the result.
///
/// Logging is not up yet at this point; callers log the settings afterwards.
pub fn load_config() -> Result<Arc<Config>, RouterError> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    validate(&config)?;

    Ok(Arc::new(config))
}

pub fn validate(config: &Config) -> Result<(), RouterError> {
    Url::parse(&config.jupiter_api_base)?;
    if config.route_max_hops == 0 || config.route_max_hops > 3 {
        return Err(RouterError::ConfigError(format!(
            "ROUTE_MAX_HOPS must be within 1..=3, got {}",
            config.route_max_hops
        )));
    }
    if config.route_max_candidates == 0 {
        return Err(RouterError::ConfigError(
            "ROUTE_MAX_CANDIDATES cannot be zero".to_string(),
        ));
    }
    if config.external_preference_threshold < Decimal::ZERO {
        return Err(RouterError::ConfigError(
            "EXTERNAL_PREFERENCE_THRESHOLD cannot be negative".to_string(),
        ));
    }
    if config.jupiter_requests_per_second == 0 {
        return Err(RouterError::ConfigError(
            "JUPITER_REQUESTS_PER_SECOND cannot be zero".to_string(),
        ));
    }
    Ok(())
}
