//! Renders a fitted forecast as a PNG chart.

use crate::core::history::PriceSeries;
use crate::core::model::ForecastPoint;
use anyhow::{Result, anyhow, bail};
use chrono::{DateTime, TimeZone, Utc};
use plotters::prelude::*;
use std::path::Path;
use tracing::debug;

const CHART_SIZE: (u32, u32) = (1024, 600);
const DAY_MS: f64 = 86_400_000.0;

pub struct ChartLabels<'a> {
    pub title: &'a str,
    pub x_label: &'a str,
    pub y_label: &'a str,
}

fn to_days(ts: DateTime<Utc>) -> f64 {
    ts.timestamp_millis() as f64 / DAY_MS
}

fn format_day(days: f64) -> String {
    Utc.timestamp_millis_opt((days * DAY_MS) as i64)
        .single()
        .map(|ts| ts.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}

fn draw_error<E: std::fmt::Display>(path: &Path, e: E) -> anyhow::Error {
    anyhow!("Failed to draw chart {}: {e}", path.display())
}

/// Draws history as dots, the fitted curve as a line and its uncertainty
/// interval as a shaded band, then writes the image to `path`.
pub fn render_forecast(
    path: &Path,
    history: &PriceSeries,
    forecast: &[ForecastPoint],
    labels: &ChartLabels<'_>,
) -> Result<()> {
    let (Some(first), Some(last)) = (forecast.first(), forecast.last()) else {
        bail!("Nothing to render: forecast is empty");
    };

    let x_range = to_days(first.timestamp)..to_days(last.timestamp);
    let (y_min, y_max) = forecast
        .iter()
        .flat_map(|p| [p.yhat_lower, p.yhat_upper])
        .chain(history.prices())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
    let padding = ((y_max - y_min) * 0.05).max(y_max.abs() * 0.01).max(1e-9);
    let y_range = (y_min - padding)..(y_max + padding);

    debug!(path = %path.display(), points = forecast.len(), "Rendering forecast chart");

    let root = BitMapBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(|e| draw_error(path, e))?;

    let mut chart = ChartBuilder::on(&root)
        .caption(labels.title, ("sans-serif", 28))
        .margin(20)
        .x_label_area_size(50)
        .y_label_area_size(90)
        .build_cartesian_2d(x_range, y_range)
        .map_err(|e| draw_error(path, e))?;

    chart
        .configure_mesh()
        .x_desc(labels.x_label)
        .y_desc(labels.y_label)
        .x_labels(8)
        .x_label_formatter(&|x| format_day(*x))
        .y_label_formatter(&|y| format!("{y:.2}"))
        .draw()
        .map_err(|e| draw_error(path, e))?;

    let band: Vec<(f64, f64)> = forecast
        .iter()
        .map(|p| (to_days(p.timestamp), p.yhat_upper))
        .chain(
            forecast
                .iter()
                .rev()
                .map(|p| (to_days(p.timestamp), p.yhat_lower)),
        )
        .collect();
    chart
        .draw_series(std::iter::once(Polygon::new(band, BLUE.mix(0.2).filled())))
        .map_err(|e| draw_error(path, e))?;

    chart
        .draw_series(LineSeries::new(
            forecast.iter().map(|p| (to_days(p.timestamp), p.yhat)),
            BLUE.stroke_width(2),
        ))
        .map_err(|e| draw_error(path, e))?;

    chart
        .draw_series(
            history
                .points()
                .iter()
                .map(|p| Circle::new((to_days(p.timestamp), p.price), 3, BLACK.filled())),
        )
        .map_err(|e| draw_error(path, e))?;

    root.present().map_err(|e| draw_error(path, e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::history::PricePoint;
    use chrono::Duration;
    use tempfile::TempDir;

    fn labels() -> ChartLabels<'static> {
        ChartLabels {
            title: "Price Forecast",
            x_label: "Date",
            y_label: "Price (USD)",
        }
    }

    #[test]
    fn test_render_writes_png() -> Result<()> {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let points: Vec<PricePoint> = (0..5)
            .map(|i| PricePoint {
                timestamp: start + Duration::days(i),
                price: 10.0 + i as f64,
            })
            .collect();
        let history = PriceSeries::new(points.clone());
        let forecast: Vec<ForecastPoint> = points
            .iter()
            .map(|p| ForecastPoint {
                timestamp: p.timestamp,
                yhat: p.price,
                yhat_lower: p.price - 0.5,
                yhat_upper: p.price + 0.5,
                trend: p.price,
            })
            .collect();

        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("forecast_test.png");
        render_forecast(&path, &history, &forecast, &labels())?;

        let bytes = std::fs::read(&path)?;
        assert!(bytes.starts_with(&[0x89, b'P', b'N', b'G']));
        Ok(())
    }

    #[test]
    fn test_render_rejects_empty_forecast() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("forecast_empty.png");
        let result = render_forecast(&path, &PriceSeries::default(), &[], &labels());
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_format_day() {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        assert_eq!(format_day(to_days(ts)), "2024-03-01");
    }
}
