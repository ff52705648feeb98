//! Exchange rate lookup against a JSON rates endpoint

use anyhow::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{info, warn};

use crate::models::TARGET_CURRENCY;
use crate::traits::RateSource;

/// Client for a `{"rates": {"RUB": 75.5, ...}}` style endpoint
pub struct ExchangeRateClient {
    client: Client,
    url: String,
}

impl ExchangeRateClient {
    pub fn new(client: Client, url: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
        }
    }

    /// Fetch the rate, reporting transport and decoding failures
    ///
    /// # Returns
    /// * `Result<Option<f64>>` - `None` for a non-200 status or a missing rate
    async fn fetch_rate(&self) -> Result<Option<f64>> {
        let response = self.client.get(&self.url).send().await?;

        if response.status() != StatusCode::OK {
            warn!(
                "Rate source {} answered with status {}",
                self.url,
                response.status()
            );
            return Ok(None);
        }

        let body: Value = response.json().await?;
        Ok(rate_from_body(&body))
    }
}

/// Pull the target currency out of the `rates` mapping, numeric or as a string
fn rate_from_body(body: &Value) -> Option<f64> {
    let rate = body.get("rates")?.get(TARGET_CURRENCY)?;
    rate.as_f64()
        .or_else(|| rate.as_str().and_then(|s| s.trim().parse().ok()))
        .filter(|r| r.is_finite())
}

#[async_trait]
impl RateSource for ExchangeRateClient {
    async fn exchange_rate(&self) -> f64 {
        match self.fetch_rate().await {
            Ok(Some(rate)) => {
                info!("Exchange rate for {}: {}", TARGET_CURRENCY, rate);
                rate
            }
            Ok(None) => {
                warn!("No {} rate available, prices will be zero", TARGET_CURRENCY);
                0.0
            }
            Err(e) => {
                warn!("Failed to fetch exchange rate from {}: {:#}", self.url, e);
                0.0
            }
        }
    }
}
