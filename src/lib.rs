pub mod cli;
pub mod core;
pub mod providers;

use crate::core::artifact::ArtifactSink;
use crate::core::config::AppConfig;
use crate::core::{Exchange, ForecastPipeline, RateResolver};
use crate::providers::coingecko::CoinGeckoProvider;
use crate::providers::frankfurter::FrankfurterProvider;
use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    Convert { amount: f64, from: String, to: String },
    Currencies,
}

/// Wires providers, resolver and forecast pipeline from configuration.
pub fn build_exchange(config: &AppConfig) -> Result<Exchange> {
    let coingecko = Arc::new(CoinGeckoProvider::new(config.providers.coingecko_url()));
    let frankfurter = Arc::new(FrankfurterProvider::new(
        config.providers.frankfurter_url(),
    ));

    let resolver = RateResolver::new(config.currencies.clone(), coingecko.clone(), frankfurter);
    let pipeline = ForecastPipeline::new(
        coingecko,
        ArtifactSink::new(config.output_path()?),
        &config.reporting_currency,
    )
    .with_lookback_days(config.lookback_days);

    Ok(
        Exchange::new(resolver, pipeline, config.symbols.clone())
            .with_delay(Duration::from_millis(config.delay_ms)),
    )
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("coincast starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Convert { amount, from, to } => {
            let exchange = build_exchange(&config)?;
            cli::convert::run(&exchange, amount, &from, &to, &config.reporting_currency).await
        }
        AppCommand::Currencies => {
            cli::currencies::run(&config.currencies, &config.symbols);
            Ok(())
        }
    }
}
