//! Pricing abstractions and core types

use anyhow::Result;
use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetSymbol {
    pub name: String,
    pub symbol: String,
}

impl AssetSymbol {
    pub fn new(name: &str, symbol: &str) -> Self {
        Self {
            name: name.to_string(),
            symbol: symbol.to_string(),
        }
    }
}

/// A point-in-time quote. `price` is always denominated in `currency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPrice {
    pub name: String,
    pub symbol: String,
    pub price: f64,
    pub currency: String,
    pub updated_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at_readable: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market_cap: Option<f64>,
    #[serde(default, rename = "volume24h", skip_serializing_if = "Option::is_none")]
    pub volume_24h: Option<f64>,
    #[serde(default, rename = "change24h", skip_serializing_if = "Option::is_none")]
    pub change_24h: Option<f64>,
}

impl AssetPrice {
    /// Returns a new quote with every monetary field scaled by `rate` and
    /// tagged with `currency`. The 24h change is a percentage and is kept.
    pub fn converted(&self, rate: f64, currency: &str) -> AssetPrice {
        AssetPrice {
            price: self.price * rate,
            currency: currency.to_string(),
            market_cap: self.market_cap.map(|cap| cap * rate),
            volume_24h: self.volume_24h.map(|volume| volume * rate),
            ..self.clone()
        }
    }
}

/// A source of prices backed by one upstream API.
///
/// Absence (`Ok(None)`, an empty list) is the normal "not supported" answer.
/// `Err` is reserved for unexpected failures; callers log and skip it.
#[async_trait]
pub trait PriceProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn supported_assets(&self) -> Result<Vec<AssetSymbol>>;

    async fn fetch_price(&self, symbol: &str, currency: &str) -> Result<Option<AssetPrice>>;

    /// Fetches all `symbols` concurrently, dropping the ones that could not be
    /// resolved.
    async fn fetch_prices(&self, symbols: &[String], currency: &str) -> Vec<AssetPrice> {
        let results = join_all(symbols.iter().map(|s| self.fetch_price(s, currency))).await;

        results
            .into_iter()
            .zip(symbols)
            .filter_map(|(result, symbol)| match result {
                Ok(price) => price,
                Err(e) => {
                    warn!(provider = self.name(), %symbol, error = %e, "Price lookup failed");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    fn sample_price() -> AssetPrice {
        AssetPrice {
            name: "Bitcoin".to_string(),
            symbol: "BTC".to_string(),
            price: 50_000.0,
            currency: "USD".to_string(),
            updated_at: "2025-01-01T00:00:00Z".to_string(),
            updated_at_readable: None,
            market_cap: Some(1_000_000.0),
            volume_24h: Some(2_000.0),
            change_24h: Some(-1.5),
        }
    }

    #[test]
    fn test_converted_scales_monetary_fields() {
        let original = sample_price();
        let converted = original.converted(7.2, "CNY");

        assert_eq!(converted.currency, "CNY");
        assert!((converted.price - 360_000.0).abs() < 1e-6);
        assert!((converted.market_cap.unwrap() - 7_200_000.0).abs() < 1e-6);
        assert!((converted.volume_24h.unwrap() - 14_400.0).abs() < 1e-6);
        assert_eq!(converted.change_24h, Some(-1.5));

        // The source quote is untouched
        assert_eq!(original.currency, "USD");
        assert_eq!(original.price, 50_000.0);
    }

    #[test]
    fn test_converting_back_restores_price() {
        let rate = 0.9213;
        let original = sample_price();
        let round_trip = original.converted(rate, "EUR").converted(1.0 / rate, "USD");

        assert_eq!(round_trip.currency, "USD");
        assert!((round_trip.price - original.price).abs() < 1e-6);
    }

    #[test]
    fn test_serializes_with_upstream_field_names() {
        let json = serde_json::to_value(sample_price()).unwrap();
        assert_eq!(json["updatedAt"], "2025-01-01T00:00:00Z");
        assert_eq!(json["marketCap"], 1_000_000.0);
        assert_eq!(json["volume24h"], 2_000.0);
        assert_eq!(json["change24h"], -1.5);
        assert!(json.get("updatedAtReadable").is_none());
    }

    struct FlakyProvider;

    #[async_trait]
    impl PriceProvider for FlakyProvider {
        fn name(&self) -> &str {
            "Flaky"
        }

        async fn supported_assets(&self) -> Result<Vec<AssetSymbol>> {
            Ok(vec![])
        }

        async fn fetch_price(&self, symbol: &str, _currency: &str) -> Result<Option<AssetPrice>> {
            match symbol {
                "BTC" => Ok(Some(sample_price())),
                "ERR" => Err(anyhow!("boom")),
                _ => Ok(None),
            }
        }
    }

    #[tokio::test]
    async fn test_fetch_prices_drops_failures() {
        let symbols = vec!["ERR".to_string(), "BTC".to_string(), "NOPE".to_string()];
        let prices = FlakyProvider.fetch_prices(&symbols, "USD").await;

        assert_eq!(prices.len(), 1);
        assert_eq!(prices[0].symbol, "BTC");
    }
}
