use crate::core::{CurrencyCode, FetchError, RateProvider, RateTable};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

// FxRatesApiProvider implementation for RateProvider
pub struct FxRatesApiProvider {
    base_url: String,
    client: reqwest::Client,
}

impl FxRatesApiProvider {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("fxwatch/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(FxRatesApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    rates: HashMap<String, f64>,
}

fn to_rate_table(base: CurrencyCode, raw: HashMap<String, f64>) -> RateTable {
    raw.into_iter()
        .filter_map(|(code, rate)| match code.parse::<CurrencyCode>() {
            Ok(currency) if currency != base && rate.is_finite() && rate > 0.0 => {
                Some((currency, rate))
            }
            _ => {
                debug!(%code, rate, "Ignoring rate entry");
                None
            }
        })
        .collect()
}

#[async_trait]
impl RateProvider for FxRatesApiProvider {
    #[instrument(
        name = "FxRatesFetch",
        skip(self, symbols),
        fields(base = %base)
    )]
    async fn latest(
        &self,
        base: CurrencyCode,
        symbols: &[CurrencyCode],
    ) -> Result<RateTable, FetchError> {
        let symbols = symbols
            .iter()
            .filter(|c| **c != base)
            .map(|c| c.code())
            .collect::<Vec<_>>()
            .join(",");
        let url = format!("{}/latest?base={}&symbols={}", self.base_url, base, symbols);
        debug!("Requesting rates from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| FetchError::Network(format!("{e} for base: {base}")))?;

        if let Some(err) = FetchError::from_status(response.status().as_u16()) {
            warn!(status = %response.status(), "Rate provider returned an error status");
            return Err(err);
        }

        let text = response
            .text()
            .await
            .map_err(|e| FetchError::Network(format!("{e} for base: {base}")))?;

        let data: LatestRatesResponse = serde_json::from_str(&text)
            .map_err(|e| FetchError::Decode(format!("{e} for base: {base}")))?;

        let table = to_rate_table(base, data.rates);
        debug!(count = table.len(), "Received rates");
        Ok(table)
    }
}
