use super::util::fetch_json;
use crate::core::currency::CurrencyRateProvider;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::instrument;

/// Latest fiat exchange rates from the Frankfurter API.
pub struct FrankfurterProvider {
    base_url: String,
}

impl FrankfurterProvider {
    pub fn new(base_url: &str) -> Self {
        FrankfurterProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    rates: HashMap<String, f64>,
}

#[async_trait]
impl CurrencyRateProvider for FrankfurterProvider {
    #[instrument(name = "FrankfurterRate", skip(self))]
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();
        let url = format!("{}/latest?from={}&to={}", self.base_url, from, to);
        let label = format!("currency pair: {from}{to}");

        let data: LatestRatesResponse = fetch_json(&url, &label).await?;
        data.rates
            .get(&to)
            .copied()
            .ok_or_else(|| anyhow!("No rate data found for {}", label))
    }
}
