//! Per-request orchestration: rate resolution plus, for crypto sources, a
//! price forecast. The two run concurrently and share no state.

use crate::core::currency::market_symbol;
use crate::core::forecast::{ForecastPipeline, ForecastReport};
use crate::core::rate::{Conversion, RateResolver};
use futures::future::OptionFuture;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument};

#[derive(Debug)]
pub struct ConversionReport {
    pub conversion: Conversion,
    pub market_symbol: String,
    /// `None` when the source currency is not a crypto asset.
    pub forecast: Option<ForecastReport>,
}

pub struct Exchange {
    resolver: RateResolver,
    pipeline: ForecastPipeline,
    symbols: HashMap<String, String>,
    delay: Duration,
}

impl Exchange {
    pub fn new(
        resolver: RateResolver,
        pipeline: ForecastPipeline,
        symbols: HashMap<String, String>,
    ) -> Self {
        Exchange {
            resolver,
            pipeline,
            symbols,
            delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn resolver(&self) -> &RateResolver {
        &self.resolver
    }

    pub fn symbols(&self) -> &HashMap<String, String> {
        &self.symbols
    }

    #[instrument(name = "Convert", skip(self))]
    pub async fn convert(&self, amount: f64, from: &str, to: &str) -> ConversionReport {
        if !self.delay.is_zero() {
            debug!(delay_ms = self.delay.as_millis() as u64, "Simulated latency");
            tokio::time::sleep(self.delay).await;
        }

        let forecast: OptionFuture<_> = self
            .resolver
            .currencies()
            .is_crypto(from)
            .then(|| self.pipeline.forecast(from))
            .into();
        let (conversion, forecast) = futures::join!(self.resolver.resolve(from, to, amount), forecast);

        ConversionReport {
            conversion,
            market_symbol: market_symbol(&self.symbols, from),
            forecast,
        }
    }
}
