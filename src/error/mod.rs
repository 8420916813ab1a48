use log::{debug, error, info, warn};
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;

#[derive(Debug, Clone, Error)]
pub enum RouterError {
    /// Non-numeric or negative amount, unknown mint, identical bid/ask
    #[error("Invalid Input: {0}")]
    InputInvalid(String),

    /// Graph search produced no evaluable candidate
    #[error("No route from {bid} to {ask}")]
    NoRoute { bid: String, ask: String },

    /// External aggregator returned an error or nothing usable
    #[error("External Quote Unavailable: {0}")]
    ExternalQuoteUnavailable(String),

    /// Jupiter rate limiting error
    #[error("Jupiter API rate limit exceeded")]
    JupiterRateLimitError,

    /// Jupiter timeout error
    #[error("Jupiter API timeout: {0}")]
    JupiterTimeoutError(String),

    /// Network/connectivity issues
    #[error("Network Error: {0}")]
    NetworkError(String),

    /// Result superseded by a newer request token
    #[error("Stale Result: token {0} superseded")]
    StaleResult(u64),

    /// Zero reserve, zero weight or otherwise unpriceable pool
    #[error("Numeric Degenerate: {0}")]
    NumericDegenerate(String),

    /// Pool not present in the current snapshot
    #[error("Pool Not Found: {0}")]
    PoolNotFound(String),

    /// Pool failed structural validation
    #[error("Invalid Pool State: {0}")]
    InvalidPoolState(String),

    /// Parsing errors for snapshot or API payloads
    #[error("Parse Error: {0}")]
    ParseError(String),

    /// Configuration errors
    #[error("Config Error: {0}")]
    ConfigError(String),
}

impl From<serde_json::Error> for RouterError {
    fn from(err: serde_json::Error) -> Self {
        RouterError::ParseError(format!("JSON serialization/deserialization error: {}", err))
    }
}

impl From<reqwest::Error> for RouterError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            RouterError::JupiterTimeoutError(err.to_string())
        } else if err.status().map(|s| s.as_u16()) == Some(429) {
            RouterError::JupiterRateLimitError
        } else {
            RouterError::NetworkError(err.to_string())
        }
    }
}

impl From<url::ParseError> for RouterError {
    fn from(err: url::ParseError) -> Self {
        RouterError::ConfigError(format!("Invalid URL: {}", err))
    }
}

impl RouterError {
    /// Determines if an error is recoverable through retry
    pub fn is_recoverable(&self) -> bool {
        match self {
            RouterError::InputInvalid(_) => false,
            RouterError::NoRoute { .. } => false,
            RouterError::ExternalQuoteUnavailable(_) => true,
            RouterError::JupiterRateLimitError => true,
            RouterError::JupiterTimeoutError(_) => true,
            RouterError::NetworkError(_) => true,
            RouterError::StaleResult(_) => false,
            RouterError::NumericDegenerate(_) => false,
            RouterError::PoolNotFound(_) => false,
            RouterError::InvalidPoolState(_) => false,
            RouterError::ParseError(_) => false,
            RouterError::ConfigError(_) => false,
        }
    }

    /// Determines if operation should be retried immediately
    pub fn should_retry(&self) -> bool {
        self.is_recoverable()
            && match self {
                RouterError::NetworkError(_) => true,
                RouterError::JupiterTimeoutError(_) => true,
                // 4xx and malformed payloads land here; resending won't help
                RouterError::ExternalQuoteUnavailable(_) => false,
                // Waiting out a rate limit is longer than a quote is worth
                RouterError::JupiterRateLimitError => false,
                _ => false,
            }
    }

    /// Categorizes error for logging
    pub fn categorize(&self) -> ErrorCategory {
        match self {
            RouterError::InputInvalid(_) => ErrorCategory::Input,
            RouterError::NoRoute { .. } => ErrorCategory::Routing,
            RouterError::ExternalQuoteUnavailable(_)
            | RouterError::JupiterRateLimitError
            | RouterError::JupiterTimeoutError(_)
            | RouterError::NetworkError(_) => ErrorCategory::Network,
            RouterError::StaleResult(_) => ErrorCategory::Superseded,
            RouterError::NumericDegenerate(_)
            | RouterError::PoolNotFound(_)
            | RouterError::InvalidPoolState(_) => ErrorCategory::Data,
            RouterError::ParseError(_) => ErrorCategory::Data,
            RouterError::ConfigError(_) => ErrorCategory::Configuration,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Routing,
    Network,
    Superseded,
    Data,
    Configuration,
}

/// Retry policy with exponential backoff
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Calculate delay for a given attempt (exponential backoff)
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::from_millis(0);
        }

        let delay_ms = self.base_delay.as_millis() * (2_u128.pow(attempt - 1));
        let delay = Duration::from_millis(delay_ms.min(self.max_delay.as_millis()) as u64);

        debug!("Retry attempt {}: delay = {:?}", attempt, delay);
        delay
    }

    /// Execute operation with retry logic
    pub async fn execute<F, T, Fut>(&self, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 0..self.max_attempts {
            if attempt > 0 {
                sleep(self.delay_for_attempt(attempt)).await;
            }

            match operation().await {
                Ok(result) => {
                    if attempt > 0 {
                        info!("Operation succeeded after {} retries", attempt);
                    }
                    return Ok(result);
                }
                Err(e) => {
                    if !e.should_retry() {
                        debug!("Non-retryable error on attempt {}: {}", attempt + 1, e);
                        return Err(e);
                    }

                    warn!("Attempt {} failed: {} (retrying...)", attempt + 1, e);
                    last_error = Some(e);
                }
            }
        }

        error!("All {} retry attempts failed", self.max_attempts);
        Err(last_error.unwrap_or_else(|| {
            RouterError::ExternalQuoteUnavailable("Max retries exceeded".to_string())
        }))
    }
}

pub type Result<T> = std::result::Result<T, RouterError>;
