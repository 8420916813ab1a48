//! Jupiter aggregator client: the external venue the router compares against.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use url::Url;

use crate::{
    config::Config,
    dex::clients::jupiter_api::{JupiterErrorResponse, QuoteRequest, QuoteResponse},
    dex::quote::{AggregatorClient, ExternalQuote, ExternalQuoteRequest},
    error::{RetryPolicy, RouterError},
};

const JUPITER_QUOTE_ENDPOINT: &str = "quote";
/// Keeps the route small enough to fit one transaction.
const JUPITER_MAX_ACCOUNTS: u16 = 64;

/// Spaces requests at least `min_interval` apart.
struct RateLimiter {
    last_request: Option<Instant>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(requests_per_second: u32) -> Self {
        Self {
            last_request: None,
            min_interval: Duration::from_millis(1000 / requests_per_second.max(1) as u64),
        }
    }

    async fn wait_if_needed(&mut self) {
        if let Some(last) = self.last_request {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        self.last_request = Some(Instant::now());
    }
}

pub struct JupiterClient {
    client: Client,
    quote_url: Url,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    retry_policy: RetryPolicy,
}

impl JupiterClient {
    pub fn new(config: &Config) -> Result<Self, RouterError> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.jupiter_timeout_ms))
            .user_agent("SolanaSwapRouter/1.0")
            .build()
            .map_err(|e| RouterError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            quote_url: quote_url(&config.jupiter_api_base)?,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(
                config.jupiter_requests_per_second,
            ))),
            retry_policy: RetryPolicy::new(
                config.jupiter_max_retries + 1,
                Duration::from_millis(100),
                Duration::from_millis(config.jupiter_timeout_ms),
            ),
        })
    }

    /// Get a quote from Jupiter for a specific trade
    pub async fn get_quote(&self, request: &QuoteRequest) -> Result<QuoteResponse, RouterError> {
        self.rate_limiter.lock().await.wait_if_needed().await;

        debug!(
            "Requesting Jupiter quote: {} {} -> {}",
            request.amount, request.input_mint, request.output_mint
        );

        let response = self
            .client
            .get(self.quote_url.clone())
            .query(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_failure(status, &body));
        }

        let quote: QuoteResponse = response.json().await.map_err(|e| {
            RouterError::ExternalQuoteUnavailable(format!("Malformed Jupiter quote: {}", e))
        })?;

        debug!(
            "Jupiter quote received: {} -> {} (impact: {})",
            quote.in_amount, quote.out_amount, quote.price_impact_pct
        );
        Ok(quote)
    }
}

/// `<base>/quote`, tolerating a base with or without a trailing slash.
fn quote_url(base: &str) -> Result<Url, RouterError> {
    let mut base = Url::parse(base)?;
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    Ok(base.join(JUPITER_QUOTE_ENDPOINT)?)
}

/// Server-side trouble is worth retrying; anything else is a verdict on the request.
fn classify_failure(status: StatusCode, body: &str) -> RouterError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return RouterError::JupiterRateLimitError;
    }
    let detail = serde_json::from_str::<JupiterErrorResponse>(body)
        .map(|e| e.message.unwrap_or(e.error))
        .unwrap_or_else(|_| body.to_string());
    if status.is_server_error() {
        RouterError::NetworkError(format!("Jupiter API error {}: {}", status, detail))
    } else {
        RouterError::ExternalQuoteUnavailable(format!("Jupiter API error {}: {}", status, detail))
    }
}

#[async_trait]
impl AggregatorClient for JupiterClient {
    fn name(&self) -> &str {
        "Jupiter"
    }

    async fn quote(&self, request: &ExternalQuoteRequest) -> Result<ExternalQuote, RouterError> {
        let api_request = QuoteRequest {
            input_mint: request.mint_in.to_string(),
            output_mint: request.mint_out.to_string(),
            amount: request.amount_in,
            slippage_bps: request.max_slippage_bps,
            only_direct_routes: Some(false),
            max_accounts: Some(JUPITER_MAX_ACCOUNTS),
        };

        let response = self
            .retry_policy
            .execute(|| self.get_quote(&api_request))
            .await
            .map_err(|e| {
                warn!("Jupiter quote failed: {}", e);
                e
            })?;

        if response.route_plan.is_empty() {
            return Err(RouterError::ExternalQuoteUnavailable(
                "Jupiter returned an empty route plan".to_string(),
            ));
        }
        ExternalQuote::from_response(response)
    }
}
