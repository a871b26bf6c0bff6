use super::util::fetch_json;
use crate::core::currency::CurrencyRateProvider;
use crate::core::history::{HistoryProvider, PriceSeries};
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::instrument;

/// Crypto spot prices and daily market history from the CoinGecko API.
pub struct CoinGeckoProvider {
    base_url: String,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str) -> Self {
        CoinGeckoProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

// {"bitcoin": {"usd": 50000.0}}
type SimplePriceResponse = HashMap<String, HashMap<String, f64>>;

#[derive(Debug, Deserialize)]
struct MarketChartResponse {
    prices: Vec<(f64, f64)>,
}

#[async_trait]
impl CurrencyRateProvider for CoinGeckoProvider {
    #[instrument(name = "CoinGeckoRate", skip(self))]
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64> {
        let url = format!(
            "{}/simple/price?ids={}&vs_currencies={}",
            self.base_url, from, to
        );
        let label = format!("price of {from} in {to}");

        let data: SimplePriceResponse = fetch_json(&url, &label).await?;
        data.get(from)
            .and_then(|quotes| quotes.get(to))
            .copied()
            .ok_or_else(|| anyhow!("No rate data found for {}/{}", from, to))
    }
}

#[async_trait]
impl HistoryProvider for CoinGeckoProvider {
    #[instrument(name = "CoinGeckoHistory", skip(self))]
    async fn fetch_history(&self, id: &str, vs_currency: &str, days: u32) -> Result<PriceSeries> {
        let url = format!(
            "{}/coins/{}/market_chart?vs_currency={}&days={}&interval=daily",
            self.base_url, id, vs_currency, days
        );
        let label = format!("{days}-day history of {id} in {vs_currency}");

        let data: MarketChartResponse = fetch_json(&url, &label).await?;
        if data.prices.is_empty() {
            return Err(anyhow!("No price history found for {}", id));
        }

        PriceSeries::from_millis(
            data.prices
                .into_iter()
                .map(|(millis, price)| (millis as i64, price)),
        )
    }
}
