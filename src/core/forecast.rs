//! Next-day price forecast for a crypto asset: fetch, fit, render.
//!
//! Any failure inside the pipeline is logged and reported as an absent
//! forecast. The most recent observed price is still surfaced whenever the
//! history fetch itself succeeded.

use crate::core::artifact::ArtifactSink;
use crate::core::chart::{ChartLabels, render_forecast};
use crate::core::history::HistoryProvider;
use crate::core::model::{FittedModel, ForecastPoint, ModelSettings};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};

pub const DEFAULT_LOOKBACK_DAYS: u32 = 30;
const FORECAST_PERIODS: usize = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForecastStage {
    Fetch,
    Fit,
    Render,
}

impl fmt::Display for ForecastStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}",
            match self {
                ForecastStage::Fetch => "fetch",
                ForecastStage::Fit => "fit",
                ForecastStage::Render => "render",
            }
        )
    }
}

/// Why a forecast is absent. Kept for logging only.
#[derive(Debug)]
pub struct ForecastFailure {
    pub stage: ForecastStage,
    pub error: anyhow::Error,
}

impl fmt::Display for ForecastFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "forecast failed at {} stage: {:#}", self.stage, self.error)
    }
}

#[derive(Debug)]
pub struct Forecast {
    /// Point estimate for the period after the last observation.
    pub tomorrow_price: f64,
    /// Fitted curve over the history plus the forecast period.
    pub fitted: Vec<ForecastPoint>,
    pub model: FittedModel,
    pub artifact: PathBuf,
}

#[derive(Debug)]
pub struct ForecastReport {
    pub currency_id: String,
    pub latest_price: Option<f64>,
    pub outcome: Result<Forecast, ForecastFailure>,
}

impl ForecastReport {
    pub fn forecast(&self) -> Option<&Forecast> {
        self.outcome.as_ref().ok()
    }

    pub fn is_absent(&self) -> bool {
        self.outcome.is_err()
    }
}

pub struct ForecastPipeline {
    history_provider: Arc<dyn HistoryProvider>,
    sink: ArtifactSink,
    reporting_currency: String,
    lookback_days: u32,
    settings: ModelSettings,
}

impl ForecastPipeline {
    pub fn new(
        history_provider: Arc<dyn HistoryProvider>,
        sink: ArtifactSink,
        reporting_currency: &str,
    ) -> Self {
        ForecastPipeline {
            history_provider,
            sink,
            reporting_currency: reporting_currency.to_string(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            settings: ModelSettings::default().with_daily_seasonality(true),
        }
    }

    pub fn with_lookback_days(mut self, days: u32) -> Self {
        self.lookback_days = days;
        self
    }

    pub fn sink(&self) -> &ArtifactSink {
        &self.sink
    }

    #[instrument(name = "Forecast", skip(self), fields(vs = %self.reporting_currency))]
    pub async fn forecast(&self, crypto_id: &str) -> ForecastReport {
        let history = match self
            .history_provider
            .fetch_history(crypto_id, &self.reporting_currency, self.lookback_days)
            .await
        {
            Ok(history) if history.is_empty() => {
                return self.absent(
                    crypto_id,
                    None,
                    ForecastStage::Fetch,
                    anyhow::anyhow!("Empty price history for {crypto_id}"),
                );
            }
            Ok(history) => history,
            Err(e) => return self.absent(crypto_id, None, ForecastStage::Fetch, e),
        };
        let latest_price = history.latest().map(|p| p.price);

        let model = match self.settings.fit(&history) {
            Ok(model) => model,
            Err(e) => return self.absent(crypto_id, latest_price, ForecastStage::Fit, e.into()),
        };
        let fitted = model.predict(&model.future_timestamps(FORECAST_PERIODS));
        let Some(tomorrow_price) = fitted.last().map(|p| p.yhat) else {
            return self.absent(
                crypto_id,
                latest_price,
                ForecastStage::Fit,
                anyhow::anyhow!("Model produced no forecast rows"),
            );
        };

        let y_label = format!("Price ({})", self.reporting_currency.to_uppercase());
        let labels = ChartLabels {
            title: "Price Forecast",
            x_label: "Date",
            y_label: &y_label,
        };
        let artifact = match self
            .sink
            .prepare(crypto_id)
            .and_then(|path| render_forecast(&path, model.history(), &fitted, &labels).map(|_| path))
        {
            Ok(path) => path,
            Err(e) => return self.absent(crypto_id, latest_price, ForecastStage::Render, e),
        };

        info!(
            tomorrow_price,
            artifact = %artifact.display(),
            "Forecast ready"
        );
        ForecastReport {
            currency_id: crypto_id.to_string(),
            latest_price,
            outcome: Ok(Forecast {
                tomorrow_price,
                fitted,
                model,
                artifact,
            }),
        }
    }

    fn absent(
        &self,
        crypto_id: &str,
        latest_price: Option<f64>,
        stage: ForecastStage,
        error: anyhow::Error,
    ) -> ForecastReport {
        let failure = ForecastFailure { stage, error };
        warn!(currency = crypto_id, "{failure}");
        ForecastReport {
            currency_id: crypto_id.to_string(),
            latest_price,
            outcome: Err(failure),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::history::{PricePoint, PriceSeries};
    use anyhow::{Result, anyhow};
    use async_trait::async_trait;
    use chrono::{Duration, TimeZone, Utc};
    use std::sync::Mutex;
    use tempfile::TempDir;

    struct StubHistory {
        series: Result<PriceSeries, String>,
        requests: Mutex<Vec<(String, String, u32)>>,
    }

    impl StubHistory {
        fn with_prices(prices: &[f64]) -> Arc<Self> {
            let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
            let points = prices
                .iter()
                .enumerate()
                .map(|(i, price)| PricePoint {
                    timestamp: start + Duration::days(i as i64),
                    price: *price,
                })
                .collect();
            Arc::new(StubHistory {
                series: Ok(PriceSeries::new(points)),
                requests: Mutex::new(Vec::new()),
            })
        }

        fn failing(msg: &str) -> Arc<Self> {
            Arc::new(StubHistory {
                series: Err(msg.to_string()),
                requests: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl HistoryProvider for StubHistory {
        async fn fetch_history(
            &self,
            id: &str,
            vs_currency: &str,
            days: u32,
        ) -> Result<PriceSeries> {
            self.requests
                .lock()
                .unwrap()
                .push((id.to_string(), vs_currency.to_string(), days));
            self.series.clone().map_err(|e| anyhow!(e))
        }
    }

    fn increasing_prices() -> Vec<f64> {
        (0..30).map(|i| 47100.0 + 100.0 * i as f64).collect()
    }

    fn artifact_files(dir: &std::path::Path) -> Vec<String> {
        std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .collect()
            })
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn test_forecast_for_increasing_history() {
        let temp_dir = TempDir::new().unwrap();
        let history = StubHistory::with_prices(&increasing_prices());
        let pipeline =
            ForecastPipeline::new(history.clone(), ArtifactSink::new(temp_dir.path()), "usd");

        let report = pipeline.forecast("bitcoin").await;

        assert_eq!(report.latest_price, Some(50000.0));
        let forecast = report.forecast().expect("forecast should be present");
        assert!(
            forecast.tomorrow_price > 47100.0 && forecast.tomorrow_price < 53000.0,
            "forecast {} outside sane envelope",
            forecast.tomorrow_price
        );
        assert_eq!(forecast.fitted.len(), 31);
        assert_eq!(forecast.artifact, temp_dir.path().join("forecast_bitcoin.png"));
        assert_eq!(artifact_files(temp_dir.path()), vec!["forecast_bitcoin.png"]);
        assert_eq!(
            history.requests.lock().unwrap().clone(),
            vec![("bitcoin".to_string(), "usd".to_string(), 30)]
        );
    }

    #[tokio::test]
    async fn test_repeat_forecast_overwrites_artifact() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = ForecastPipeline::new(
            StubHistory::with_prices(&increasing_prices()),
            ArtifactSink::new(temp_dir.path()),
            "usd",
        );

        assert!(!pipeline.forecast("bitcoin").await.is_absent());
        assert!(!pipeline.forecast("bitcoin").await.is_absent());

        assert_eq!(artifact_files(temp_dir.path()), vec!["forecast_bitcoin.png"]);
    }

    #[tokio::test]
    async fn test_empty_history_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = ForecastPipeline::new(
            StubHistory::with_prices(&[]),
            ArtifactSink::new(temp_dir.path()),
            "usd",
        );

        let report = pipeline.forecast("bitcoin").await;

        assert!(report.is_absent());
        assert_eq!(report.latest_price, None);
        assert_eq!(
            report.outcome.as_ref().unwrap_err().stage,
            ForecastStage::Fetch
        );
        assert!(artifact_files(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_single_point_history_is_absent_but_keeps_latest_price() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = ForecastPipeline::new(
            StubHistory::with_prices(&[123.0]),
            ArtifactSink::new(temp_dir.path()),
            "usd",
        );

        let report = pipeline.forecast("dogecoin").await;

        assert!(report.is_absent());
        assert_eq!(report.latest_price, Some(123.0));
        assert_eq!(report.outcome.as_ref().unwrap_err().stage, ForecastStage::Fit);
        assert!(artifact_files(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_fetch_failure_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let pipeline = ForecastPipeline::new(
            StubHistory::failing("HTTP error: 429 Too Many Requests"),
            ArtifactSink::new(temp_dir.path()),
            "usd",
        );

        let report = pipeline.forecast("bitcoin").await;

        assert!(report.is_absent());
        assert_eq!(report.latest_price, None);
        let failure = report.outcome.unwrap_err();
        assert_eq!(failure.stage, ForecastStage::Fetch);
        assert!(failure.to_string().contains("429"));
    }

    #[tokio::test]
    async fn test_unwritable_artifact_dir_is_absent() {
        let temp_dir = TempDir::new().unwrap();
        let blocker = temp_dir.path().join("not_a_dir");
        std::fs::write(&blocker, "file").unwrap();

        let pipeline = ForecastPipeline::new(
            StubHistory::with_prices(&increasing_prices()),
            ArtifactSink::new(&blocker),
            "usd",
        );

        let report = pipeline.forecast("bitcoin").await;

        assert!(report.is_absent());
        assert_eq!(report.latest_price, Some(50000.0));
        assert_eq!(
            report.outcome.as_ref().unwrap_err().stage,
            ForecastStage::Render
        );
    }

    #[tokio::test]
    async fn test_custom_lookback_window() {
        let temp_dir = TempDir::new().unwrap();
        let history = StubHistory::with_prices(&increasing_prices());
        let pipeline = ForecastPipeline::new(history.clone(), ArtifactSink::new(temp_dir.path()), "eur")
            .with_lookback_days(14);

        pipeline.forecast("ethereum").await;

        assert_eq!(
            history.requests.lock().unwrap().clone(),
            vec![("ethereum".to_string(), "eur".to_string(), 14)]
        );
    }
}
