//! Picks the upstream rate source for a currency pair and normalizes its answer.
use crate::core::currency::{CurrencyRateProvider, CurrencySets, PairRoute};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Outcome of a single conversion request. `rate` and `result` are `None`
/// when the rate could not be obtained; they are never defaulted.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    pub amount: f64,
    pub source: String,
    pub target: String,
    pub rate: Option<f64>,
    pub result: Option<f64>,
}

/// Multiplies `amount` by `rate`, propagating an unknown rate.
pub fn convert_amount(amount: f64, rate: Option<f64>) -> Option<f64> {
    rate.map(|r| amount * r)
}

pub struct RateResolver {
    currencies: CurrencySets,
    crypto_provider: Arc<dyn CurrencyRateProvider>,
    fiat_provider: Arc<dyn CurrencyRateProvider>,
}

impl RateResolver {
    pub fn new(
        currencies: CurrencySets,
        crypto_provider: Arc<dyn CurrencyRateProvider>,
        fiat_provider: Arc<dyn CurrencyRateProvider>,
    ) -> Self {
        RateResolver {
            currencies,
            crypto_provider,
            fiat_provider,
        }
    }

    pub fn currencies(&self) -> &CurrencySets {
        &self.currencies
    }

    /// Returns the rate such that `target = source * rate`, or `None` when the
    /// pair is unsupported or the upstream lookup failed.
    #[instrument(name = "ResolveRate", skip(self))]
    pub async fn resolve_rate(&self, source: &str, target: &str) -> Option<f64> {
        let provider = match self.currencies.route(source, target) {
            PairRoute::CryptoPair => &self.crypto_provider,
            PairRoute::FiatPair => &self.fiat_provider,
            PairRoute::Unsupported => {
                debug!("Unsupported currency pair, skipping lookup");
                return None;
            }
        };

        match provider.get_rate(source, target).await {
            Ok(rate) if rate.is_finite() && rate > 0.0 => Some(rate),
            Ok(rate) => {
                warn!(rate, "Discarding non-positive conversion rate");
                None
            }
            Err(e) => {
                warn!(error = %e, "Conversion rate lookup failed");
                None
            }
        }
    }

    pub async fn resolve(&self, source: &str, target: &str, amount: f64) -> Conversion {
        let rate = self.resolve_rate(source, target).await;
        Conversion {
            amount,
            source: source.to_string(),
            target: target.to_string(),
            rate,
            result: convert_amount(amount, rate),
        }
    }
}
