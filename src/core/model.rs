//! Additive trend + seasonality model for short daily price histories.
//!
//! The model is `y(t) = g(t) + s(t)` where `g` is a piecewise-linear trend
//! with a set of potential changepoints and `s` is a sum of Fourier series
//! (daily and/or weekly). Coefficients are fitted as a MAP estimate under
//! Gaussian priors, which reduces to a penalized least squares problem:
//!
//! ```text
//! minimize |y - X b|^2 + sum_j (sigma^2 / s_j^2) * b_j^2
//! ```
//!
//! with `s_j` the prior scale of coefficient `j` (trend slope and offset are
//! unpenalized). Prices and time are scaled to unit range before fitting.
//!
//! ## Limitations
//!
//! - Thirty daily samples are too few for a reliable weekly decomposition;
//!   the seasonal terms are mostly there to soak up short cyclic moves.
//! - Daily seasonality is flat when every sample sits at the same time of day.

use crate::core::history::PriceSeries;
use chrono::{DateTime, Duration, Utc};
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;
use thiserror::Error;
use tracing::debug;

const DAY_MS: f64 = 86_400_000.0;
const MIN_NOISE_VARIANCE: f64 = 1e-4;
const PIVOT_EPSILON: f64 = 1e-12;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Numerical error: {0}")]
    NumericalError(String),
}

/// A Fourier seasonal component.
#[derive(Debug, Clone, PartialEq)]
pub struct Seasonality {
    pub name: &'static str,
    pub period_days: f64,
    pub order: usize,
}

impl Seasonality {
    pub fn daily() -> Self {
        Seasonality {
            name: "daily",
            period_days: 1.0,
            order: 4,
        }
    }

    pub fn weekly() -> Self {
        Seasonality {
            name: "weekly",
            period_days: 7.0,
            order: 3,
        }
    }

    fn features(&self, days: f64, row: &mut Vec<f64>) {
        for k in 1..=self.order {
            let angle = 2.0 * PI * k as f64 * days / self.period_days;
            row.push(angle.sin());
            row.push(angle.cos());
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub daily_seasonality: bool,
    /// `None` enables weekly seasonality when the history spans two weeks.
    pub weekly_seasonality: Option<bool>,
    pub n_changepoints: usize,
    /// Share of the history in which changepoints may be placed.
    pub changepoint_range: f64,
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    pub interval_width: f64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        ModelSettings {
            daily_seasonality: false,
            weekly_seasonality: None,
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            interval_width: 0.8,
        }
    }
}

/// One row of model output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForecastPoint {
    pub timestamp: DateTime<Utc>,
    pub yhat: f64,
    pub yhat_lower: f64,
    pub yhat_upper: f64,
    pub trend: f64,
}

impl ModelSettings {
    pub fn with_daily_seasonality(mut self, enabled: bool) -> Self {
        self.daily_seasonality = enabled;
        self
    }

    pub fn fit(&self, history: &PriceSeries) -> Result<FittedModel, ModelError> {
        let n = history.len();
        if n < 2 {
            return Err(ModelError::InsufficientData {
                required: 2,
                actual: n,
            });
        }

        let prices = history.prices();
        if prices.iter().any(|p| !p.is_finite()) {
            return Err(ModelError::InvalidInput(
                "price history contains non-finite values".to_string(),
            ));
        }

        let timestamps = history.timestamps();
        let start = timestamps[0];
        let span_ms = (timestamps[n - 1] - start).num_milliseconds() as f64;
        if span_ms <= 0.0 {
            return Err(ModelError::InvalidInput(
                "price history must span a positive time range".to_string(),
            ));
        }

        let y_scale = prices.iter().fold(0.0_f64, |acc, p| acc.max(p.abs()));
        let y_scale = if y_scale > 0.0 { y_scale } else { 1.0 };
        let y: Vec<f64> = prices.iter().map(|p| p / y_scale).collect();

        let mut model = FittedModel {
            history: history.clone(),
            start,
            span_ms,
            y_scale,
            changepoints: Vec::new(),
            seasonalities: self.seasonalities(span_ms / DAY_MS),
            coefficients: Vec::new(),
            residual_sd: 0.0,
            interval_z: interval_z(self.interval_width)?,
        };
        model.changepoints = self.changepoints(&model, &timestamps);

        let rows: Vec<Vec<f64>> = timestamps.iter().map(|ts| model.design_row(*ts)).collect();
        let n_cols = rows[0].len();

        let noise_variance = linear_residual_variance(&rows, &y).max(MIN_NOISE_VARIANCE);
        let penalties: Vec<f64> = (0..n_cols)
            .map(|j| match j {
                0 | 1 => 0.0,
                j if j < 2 + model.changepoints.len() => {
                    noise_variance / self.changepoint_prior_scale.powi(2)
                }
                _ => noise_variance / self.seasonality_prior_scale.powi(2),
            })
            .collect();

        let mut gram = vec![vec![0.0; n_cols]; n_cols];
        let mut rhs = vec![0.0; n_cols];
        for (row, target) in rows.iter().zip(&y) {
            for i in 0..n_cols {
                rhs[i] += row[i] * target;
                for j in 0..n_cols {
                    gram[i][j] += row[i] * row[j];
                }
            }
        }
        for (i, penalty) in penalties.iter().enumerate() {
            gram[i][i] += penalty;
        }

        model.coefficients = solve_linear_system(gram, rhs)?;

        let sse: f64 = rows
            .iter()
            .zip(&y)
            .map(|(row, target)| (target - dot(row, &model.coefficients)).powi(2))
            .sum();
        model.residual_sd = (sse / n as f64).sqrt() * y_scale;

        debug!(
            points = n,
            changepoints = model.changepoints.len(),
            seasonalities = model.seasonalities.len(),
            residual_sd = model.residual_sd,
            "Fitted trend + seasonality model"
        );
        Ok(model)
    }

    fn seasonalities(&self, span_days: f64) -> Vec<Seasonality> {
        let mut seasonalities = Vec::new();
        if self.weekly_seasonality.unwrap_or(span_days >= 14.0) {
            seasonalities.push(Seasonality::weekly());
        }
        if self.daily_seasonality {
            seasonalities.push(Seasonality::daily());
        }
        seasonalities
    }

    /// Evenly spaced over the first `changepoint_range` of the history.
    fn changepoints(&self, model: &FittedModel, timestamps: &[DateTime<Utc>]) -> Vec<f64> {
        let hist_size = (timestamps.len() as f64 * self.changepoint_range).floor() as usize;
        let count = self.n_changepoints.min(hist_size.saturating_sub(1));
        if count == 0 {
            return Vec::new();
        }

        let last_index = (hist_size - 1) as f64;
        (1..=count)
            .map(|i| {
                let index = (last_index * i as f64 / count as f64).round() as usize;
                model.scaled_time(timestamps[index])
            })
            .collect()
    }
}

/// Fitted model. Owns a copy of its training history for rendering.
#[derive(Debug, Clone)]
pub struct FittedModel {
    history: PriceSeries,
    start: DateTime<Utc>,
    span_ms: f64,
    y_scale: f64,
    changepoints: Vec<f64>,
    seasonalities: Vec<Seasonality>,
    coefficients: Vec<f64>,
    residual_sd: f64,
    interval_z: f64,
}

impl FittedModel {
    pub fn history(&self) -> &PriceSeries {
        &self.history
    }

    pub fn seasonalities(&self) -> &[Seasonality] {
        &self.seasonalities
    }

    pub fn changepoint_count(&self) -> usize {
        self.changepoints.len()
    }

    /// History timestamps followed by `periods` daily steps past the last one.
    pub fn future_timestamps(&self, periods: usize) -> Vec<DateTime<Utc>> {
        let mut timestamps = self.history.timestamps();
        if let Some(last) = timestamps.last().copied() {
            timestamps.extend((1..=periods as i64).map(|d| last + Duration::days(d)));
        }
        timestamps
    }

    pub fn predict(&self, timestamps: &[DateTime<Utc>]) -> Vec<ForecastPoint> {
        let trend_len = 2 + self.changepoints.len();
        let half_width = self.interval_z * self.residual_sd;

        timestamps
            .iter()
            .map(|ts| {
                let row = self.design_row(*ts);
                let yhat = dot(&row, &self.coefficients) * self.y_scale;
                let trend = dot(&row[..trend_len], &self.coefficients[..trend_len]) * self.y_scale;
                ForecastPoint {
                    timestamp: *ts,
                    yhat,
                    yhat_lower: yhat - half_width,
                    yhat_upper: yhat + half_width,
                    trend,
                }
            })
            .collect()
    }

    fn scaled_time(&self, ts: DateTime<Utc>) -> f64 {
        (ts - self.start).num_milliseconds() as f64 / self.span_ms
    }

    // [offset, slope, changepoint hinges..., fourier terms...]
    fn design_row(&self, ts: DateTime<Utc>) -> Vec<f64> {
        let t = self.scaled_time(ts);
        let mut row = Vec::with_capacity(2 + self.changepoints.len() + 8);
        row.push(1.0);
        row.push(t);
        row.extend(self.changepoints.iter().map(|c| (t - c).max(0.0)));

        let days = ts.timestamp_millis() as f64 / DAY_MS;
        for seasonality in &self.seasonalities {
            seasonality.features(days, &mut row);
        }
        row
    }
}

fn interval_z(width: f64) -> Result<f64, ModelError> {
    if !(0.0..1.0).contains(&width) {
        return Err(ModelError::InvalidInput(format!(
            "interval width must be in [0, 1), got {width}"
        )));
    }
    let normal = Normal::new(0.0, 1.0).map_err(|e| ModelError::NumericalError(e.to_string()))?;
    Ok(normal.inverse_cdf(0.5 + width / 2.0))
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Residual variance of a plain offset + slope fit, used as the noise scale.
fn linear_residual_variance(rows: &[Vec<f64>], y: &[f64]) -> f64 {
    let n = y.len() as f64;
    let sum_t: f64 = rows.iter().map(|r| r[1]).sum();
    let sum_y: f64 = y.iter().sum();
    let sum_t2: f64 = rows.iter().map(|r| r[1] * r[1]).sum();
    let sum_ty: f64 = rows.iter().zip(y).map(|(r, v)| r[1] * v).sum();

    let denominator = n * sum_t2 - sum_t * sum_t;
    if denominator.abs() < PIVOT_EPSILON {
        return 0.0;
    }
    let slope = (n * sum_ty - sum_t * sum_y) / denominator;
    let intercept = (sum_y - slope * sum_t) / n;

    rows.iter()
        .zip(y)
        .map(|(r, v)| (v - intercept - slope * r[1]).powi(2))
        .sum::<f64>()
        / n
}

/// Gaussian elimination with partial pivoting.
fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>, ModelError> {
    let n = b.len();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);
        if a[pivot][col].abs() < PIVOT_EPSILON {
            return Err(ModelError::NumericalError(
                "Singular matrix in model fit".to_string(),
            ));
        }
        a.swap(col, pivot);
        b.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }

    if x.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::NumericalError(
            "Model coefficients are not finite".to_string(),
        ));
    }
    Ok(x)
}
