//! Core business logic abstractions

pub mod artifact;
pub mod chart;
pub mod config;
pub mod currency;
pub mod exchange;
pub mod forecast;
pub mod history;
pub mod log;
pub mod model;
pub mod rate;

// Re-export main types for cleaner imports
pub use currency::{CurrencyKind, CurrencyRateProvider, CurrencySets, PairRoute};
pub use exchange::{ConversionReport, Exchange};
pub use forecast::{ForecastPipeline, ForecastReport};
pub use history::{HistoryProvider, PricePoint, PriceSeries};
pub use rate::{Conversion, RateResolver};
