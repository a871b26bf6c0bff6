//! Currency classification and conversion abstractions

use anyhow::{Result, bail};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

const DEFAULT_CRYPTO: &[&str] = &[
    "bitcoin",
    "ethereum",
    "dogecoin",
    "litecoin",
    "ripple",
    "cardano",
    "solana",
    "polkadot",
    "tron",
    "chainlink",
    "stellar",
    "avalanche-2",
    "uniswap",
    "monero",
    "near",
    "aptos",
    "the-graph",
    "algorand",
    "vechain",
    "filecoin",
    "cosmos",
    "maker",
    "aave",
    "eos",
    "dash",
    "tezos",
    "zcash",
    "theta-token",
    "compound-governance-token",
    "arweave",
    "flow",
    "kusama",
    "gala",
    "elrond-erd-2",
    "iota",
    "decentraland",
    "chiliz",
    "axie-infinity",
    "enjincoin",
    "waves",
    "klay-token",
    "bitcoin-cash",
    "helium",
    "quant-network",
    "curve-dao-token",
    "pancakeswap-token",
    "bitdao",
    "ocean-protocol",
    "convex-finance",
];

const DEFAULT_FIAT: &[&str] = &[
    "usd", "inr", "eur", "gbp", "jpy", "cad", "aud", "chf", "cny", "brl", "sek", "nok", "dkk",
    "zar", "mxn", "rub", "krw", "hkd", "sgd", "thb", "myr", "php", "idr", "vnd", "pln", "huf",
    "czk", "ils", "twd", "try", "ngn", "uah", "ars", "clp", "cop", "egp", "bdt", "lkr", "pkr",
    "nzd", "mad", "qar", "aed", "sar", "kwd", "bhd", "omr", "jod", "kes", "ghs",
];

const DEFAULT_SYMBOLS: &[(&str, &str)] = &[
    ("bitcoin", "BTC"),
    ("ethereum", "ETH"),
    ("dogecoin", "DOGE"),
    ("litecoin", "LTC"),
    ("ripple", "XRP"),
    ("cardano", "ADA"),
    ("solana", "SOL"),
    ("polkadot", "DOT"),
    ("tron", "TRX"),
    ("chainlink", "LINK"),
    ("stellar", "XLM"),
    ("avalanche-2", "AVAX"),
    ("uniswap", "UNI"),
    ("monero", "XMR"),
    ("near", "NEAR"),
    ("aptos", "APT"),
    ("the-graph", "GRT"),
    ("algorand", "ALGO"),
    ("vechain", "VET"),
    ("filecoin", "FIL"),
    ("cosmos", "ATOM"),
    ("maker", "MKR"),
    ("aave", "AAVE"),
    ("eos", "EOS"),
    ("dash", "DASH"),
    ("tezos", "XTZ"),
    ("zcash", "ZEC"),
    ("theta-token", "THETA"),
    ("compound-governance-token", "COMP"),
    ("arweave", "AR"),
    ("flow", "FLOW"),
    ("kusama", "KSM"),
    ("gala", "GALA"),
    ("elrond-erd-2", "EGLD"),
    ("iota", "MIOTA"),
    ("decentraland", "MANA"),
    ("chiliz", "CHZ"),
    ("axie-infinity", "AXS"),
    ("enjincoin", "ENJ"),
    ("waves", "WAVES"),
    ("klay-token", "KLAY"),
    ("bitcoin-cash", "BCH"),
    ("helium", "HNT"),
    ("quant-network", "QNT"),
    ("curve-dao-token", "CRV"),
    ("pancakeswap-token", "CAKE"),
    ("bitdao", "BIT"),
    ("ocean-protocol", "OCEAN"),
    ("convex-finance", "CVX"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CurrencyKind {
    Crypto,
    Fiat,
}

/// Upstream route for a currency pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairRoute {
    /// Source is a crypto asset; the target is passed through as-is.
    CryptoPair,
    /// Both sides are fiat currencies.
    FiatPair,
    /// Fiat to crypto, or an unrecognized side.
    Unsupported,
}

/// The static partition of supported currency identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencySets {
    pub crypto: BTreeSet<String>,
    pub fiat: BTreeSet<String>,
}

impl Default for CurrencySets {
    fn default() -> Self {
        CurrencySets::new(DEFAULT_CRYPTO.iter().copied(), DEFAULT_FIAT.iter().copied())
    }
}

impl CurrencySets {
    pub fn new<C, F, S>(crypto: C, fiat: F) -> Self
    where
        C: IntoIterator<Item = S>,
        F: IntoIterator<Item = S>,
        S: Into<String>,
    {
        CurrencySets {
            crypto: crypto.into_iter().map(Into::into).collect(),
            fiat: fiat.into_iter().map(Into::into).collect(),
        }
    }

    /// Fails if an identifier is listed as both crypto and fiat.
    pub fn validate(&self) -> Result<()> {
        if let Some(id) = self.crypto.intersection(&self.fiat).next() {
            bail!("Currency '{id}' is listed as both crypto and fiat");
        }
        Ok(())
    }

    pub fn classify(&self, id: &str) -> Option<CurrencyKind> {
        if self.crypto.contains(id) {
            Some(CurrencyKind::Crypto)
        } else if self.fiat.contains(id) {
            Some(CurrencyKind::Fiat)
        } else {
            None
        }
    }

    pub fn is_crypto(&self, id: &str) -> bool {
        self.classify(id) == Some(CurrencyKind::Crypto)
    }

    pub fn route(&self, source: &str, target: &str) -> PairRoute {
        match (self.classify(source), self.classify(target)) {
            (Some(CurrencyKind::Crypto), _) => PairRoute::CryptoPair,
            (Some(CurrencyKind::Fiat), Some(CurrencyKind::Fiat)) => PairRoute::FiatPair,
            _ => PairRoute::Unsupported,
        }
    }
}

/// Built-in crypto id to market ticker mapping.
pub fn default_symbols() -> HashMap<String, String> {
    DEFAULT_SYMBOLS
        .iter()
        .map(|(id, ticker)| (id.to_string(), ticker.to_string()))
        .collect()
}

/// Ticker quoted against USD, e.g. `BTCUSD`. Display only.
pub fn market_symbol(symbols: &HashMap<String, String>, id: &str) -> String {
    let base = symbols
        .get(id)
        .cloned()
        .unwrap_or_else(|| id.to_uppercase());
    format!("{base}USD")
}

#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    async fn get_rate(&self, from: &str, to: &str) -> Result<f64>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sets() -> CurrencySets {
        CurrencySets::new(["bitcoin", "ethereum"], ["usd", "eur"])
    }

    #[test]
    fn test_classify() {
        let sets = sets();
        assert_eq!(sets.classify("bitcoin"), Some(CurrencyKind::Crypto));
        assert_eq!(sets.classify("eur"), Some(CurrencyKind::Fiat));
        assert_eq!(sets.classify("gold"), None);
        assert!(sets.is_crypto("ethereum"));
        assert!(!sets.is_crypto("usd"));
    }

    #[test]
    fn test_route() {
        let sets = sets();
        assert_eq!(sets.route("bitcoin", "usd"), PairRoute::CryptoPair);
        assert_eq!(sets.route("bitcoin", "ethereum"), PairRoute::CryptoPair);
        assert_eq!(sets.route("bitcoin", "gold"), PairRoute::CryptoPair);
        assert_eq!(sets.route("eur", "usd"), PairRoute::FiatPair);
        assert_eq!(sets.route("usd", "bitcoin"), PairRoute::Unsupported);
        assert_eq!(sets.route("usd", "gold"), PairRoute::Unsupported);
        assert_eq!(sets.route("gold", "usd"), PairRoute::Unsupported);
    }

    #[test]
    fn test_validate_rejects_overlap() {
        assert!(sets().validate().is_ok());

        let overlapping = CurrencySets::new(["bitcoin", "usd"], ["usd"]);
        let err = overlapping.validate().unwrap_err();
        assert!(err.to_string().contains("'usd'"));
    }

    #[test]
    fn test_default_sets_are_disjoint() {
        let sets = CurrencySets::default();
        assert!(sets.validate().is_ok());
        assert!(sets.is_crypto("bitcoin"));
        assert_eq!(sets.classify("inr"), Some(CurrencyKind::Fiat));
    }

    #[test]
    fn test_market_symbol() {
        let symbols = default_symbols();
        assert_eq!(market_symbol(&symbols, "bitcoin"), "BTCUSD");
        assert_eq!(market_symbol(&symbols, "avalanche-2"), "AVAXUSD");
        assert_eq!(market_symbol(&symbols, "eur"), "EURUSD");
    }
}
