use rust_decimal::Decimal;
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone)]
pub struct Config {
    pub jupiter_api_base: String,
    pub jupiter_enabled: bool,
    pub jupiter_timeout_ms: u64,
    pub jupiter_requests_per_second: u32,
    pub jupiter_max_retries: u32,
    pub max_slippage_bps: u16,
    pub quote_debounce_ms: u64,
    pub route_max_hops: usize,
    pub route_max_candidates: usize,
    pub external_preference_threshold: Decimal,
    pub pool_snapshot_path: String,
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        Config {
            jupiter_api_base: env::var("JUPITER_API_BASE")
                .unwrap_or_else(|_| "https://quote-api.jup.ag/v6/".to_string()),
            jupiter_enabled: env::var("JUPITER_ENABLED")
                .unwrap_or_else(|_| "true".to_string())
                .parse()
                .unwrap_or(true),
            jupiter_timeout_ms: env::var("JUPITER_TIMEOUT_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .unwrap_or(5000),
            jupiter_requests_per_second: env::var("JUPITER_REQUESTS_PER_SECOND")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(10),
            jupiter_max_retries: env::var("JUPITER_MAX_RETRIES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
            max_slippage_bps: env::var("MAX_SLIPPAGE_BPS")
                .unwrap_or_else(|_| "50".to_string())
                .parse()
                .unwrap_or(50),
            quote_debounce_ms: env::var("QUOTE_DEBOUNCE_MS")
                .unwrap_or_else(|_| "300".to_string())
                .parse()
                .unwrap_or(300),
            route_max_hops: env::var("ROUTE_MAX_HOPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
            route_max_candidates: env::var("ROUTE_MAX_CANDIDATES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(512),
            external_preference_threshold: env::var("EXTERNAL_PREFERENCE_THRESHOLD")
                .ok()
                .and_then(|v| Decimal::from_str(&v).ok())
                .unwrap_or_else(|| Decimal::new(5, 2)),
            pool_snapshot_path: env::var("POOL_SNAPSHOT_PATH")
                .unwrap_or_else(|_| "pools.json".to_string()),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        }
    }

    /// Deterministic settings for tests; never reads the environment.
    pub fn test_default() -> Self {
        Config {
            jupiter_api_base: "http://127.0.0.1:8080/v6/".to_string(),
            jupiter_enabled: true,
            jupiter_timeout_ms: 1000,
            jupiter_requests_per_second: 100,
            jupiter_max_retries: 1,
            max_slippage_bps: 50,
            quote_debounce_ms: 300,
            route_max_hops: 3,
            route_max_candidates: 512,
            external_preference_threshold: Decimal::new(5, 2),
            pool_snapshot_path: "pools.json".to_string(),
            log_level: "debug".to_string(),
        }
    }

    pub fn log_level_filter(&self) -> log::LevelFilter {
        log::LevelFilter::from_str(&self.log_level).unwrap_or(log::LevelFilter::Info)
    }

    pub fn validate_and_log(&self) {
        log::info!("Application Configuration Loaded: {:?}", self);
        if self.route_max_hops > 3 {
            log::warn!(
                "ROUTE_MAX_HOPS={} exceeds the supported maximum of 3",
                self.route_max_hops
            );
        }
    }
}
