//! Daily price history types

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: f64,
}

/// Price samples sorted ascending by timestamp.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(mut points: Vec<PricePoint>) -> Self {
        points.sort_by_key(|p| p.timestamp);
        PriceSeries { points }
    }

    /// Builds a series from `[timestamp-millis, price]` pairs.
    pub fn from_millis<I>(samples: I) -> Result<Self>
    where
        I: IntoIterator<Item = (i64, f64)>,
    {
        let points = samples
            .into_iter()
            .map(|(millis, price)| {
                Utc.timestamp_millis_opt(millis)
                    .single()
                    .map(|timestamp| PricePoint { timestamp, price })
                    .ok_or_else(|| anyhow!("Invalid timestamp: {millis}"))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(PriceSeries::new(points))
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn latest(&self) -> Option<&PricePoint> {
        self.points.last()
    }

    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        self.points.iter().map(|p| p.timestamp).collect()
    }

    pub fn prices(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.price).collect()
    }
}

#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Daily prices of `id` quoted in `vs_currency` over the last `days` days.
    /// An empty history is an error.
    async fn fetch_history(&self, id: &str, vs_currency: &str, days: u32) -> Result<PriceSeries>;
}
