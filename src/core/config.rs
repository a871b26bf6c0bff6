use crate::core::currency::{CurrencySets, default_symbols};
use crate::core::forecast::DEFAULT_LOOKBACK_DAYS;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CoinGeckoProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct FrankfurterProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub coingecko: Option<CoinGeckoProviderConfig>,
    pub frankfurter: Option<FrankfurterProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            coingecko: Some(CoinGeckoProviderConfig {
                base_url: "https://api.coingecko.com/api/v3".to_string(),
            }),
            frankfurter: Some(FrankfurterProviderConfig {
                base_url: "https://api.frankfurter.app".to_string(),
            }),
        }
    }
}

impl ProvidersConfig {
    pub fn coingecko_url(&self) -> &str {
        self.coingecko
            .as_ref()
            .map_or("https://api.coingecko.com/api/v3", |p| &p.base_url)
    }

    pub fn frankfurter_url(&self) -> &str {
        self.frankfurter
            .as_ref()
            .map_or("https://api.frankfurter.app", |p| &p.base_url)
    }
}

fn default_reporting_currency() -> String {
    "usd".to_string()
}

fn default_delay_ms() -> u64 {
    2000
}

fn default_lookback_days() -> u32 {
    DEFAULT_LOOKBACK_DAYS
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub currencies: CurrencySets,
    #[serde(default = "default_symbols")]
    pub symbols: HashMap<String, String>,
    #[serde(default = "default_reporting_currency")]
    pub reporting_currency: String,
    pub output_dir: Option<String>,
    /// Cosmetic pause before each conversion.
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            providers: ProvidersConfig::default(),
            currencies: CurrencySets::default(),
            symbols: default_symbols(),
            reporting_currency: default_reporting_currency(),
            output_dir: None,
            delay_ms: default_delay_ms(),
            lookback_days: default_lookback_days(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!("No config at {}, using defaults", config_path.display());
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "coincast", "coincast")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    /// Directory for forecast charts.
    pub fn output_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.output_dir {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "coincast", "coincast")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().join("forecasts"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .currencies
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::CurrencyKind;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").expect("Failed to deserialize");

        assert_eq!(
            config.providers.coingecko_url(),
            "https://api.coingecko.com/api/v3"
        );
        assert_eq!(
            config.providers.frankfurter_url(),
            "https://api.frankfurter.app"
        );
        assert_eq!(config.reporting_currency, "usd");
        assert_eq!(config.delay_ms, 2000);
        assert_eq!(config.lookback_days, 30);
        assert!(config.output_dir.is_none());
        assert_eq!(
            config.currencies.classify("bitcoin"),
            Some(CurrencyKind::Crypto)
        );
        assert_eq!(config.symbols.get("ethereum").map(String::as_str), Some("ETH"));
    }

    #[test]
    fn test_config_deserialization() {
        let yaml_str = r#"
providers:
  coingecko:
    base_url: "http://example.com/coingecko"
  frankfurter:
    base_url: "http://example.com/frankfurter"
currencies:
  crypto: ["bitcoin", "ethereum"]
  fiat: ["usd", "eur"]
symbols:
  bitcoin: BTC
reporting_currency: "eur"
output_dir: "/tmp/charts"
delay_ms: 0
lookback_days: 14
"#;

        let config: AppConfig = serde_yaml::from_str(yaml_str).expect("Failed to deserialize");
        assert_eq!(
            config.providers.coingecko_url(),
            "http://example.com/coingecko"
        );
        assert_eq!(
            config.providers.frankfurter_url(),
            "http://example.com/frankfurter"
        );
        assert_eq!(config.currencies.crypto.len(), 2);
        assert_eq!(config.currencies.classify("eur"), Some(CurrencyKind::Fiat));
        assert_eq!(config.currencies.classify("inr"), None);
        assert_eq!(config.symbols.len(), 1);
        assert_eq!(config.reporting_currency, "eur");
        assert_eq!(config.output_path().unwrap(), PathBuf::from("/tmp/charts"));
        assert_eq!(config.delay_ms, 0);
        assert_eq!(config.lookback_days, 14);
    }

    #[test]
    fn test_missing_provider_falls_back_to_default_url() {
        let yaml_str = r#"
providers:
  frankfurter:
    base_url: "http://localhost:8080"
"#;
        let config: AppConfig = serde_yaml::from_str(yaml_str).unwrap();
        assert!(config.providers.coingecko.is_none());
        assert_eq!(
            config.providers.coingecko_url(),
            "https://api.coingecko.com/api/v3"
        );
        assert_eq!(config.providers.frankfurter_url(), "http://localhost:8080");
    }

    #[test]
    fn test_load_rejects_overlapping_currency_sets() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "currencies:\n  crypto: [\"bitcoin\", \"usd\"]\n  fiat: [\"usd\"]"
        )
        .unwrap();

        let err = AppConfig::load_from_path(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("both crypto and fiat"));
    }

    #[test]
    fn test_load_missing_file_fails() {
        let result = AppConfig::load_from_path("/nonexistent/coincast/config.yaml");
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to read config file")
        );
    }
}
