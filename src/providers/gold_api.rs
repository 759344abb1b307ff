use super::http::JsonFetcher;
use crate::core::cache::{Cache, get_json, put_json};
use crate::core::{AssetPrice, AssetSymbol, PriceProvider};
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Url;
use serde::Deserialize;
use std::sync::Arc;
use tracing::instrument;

/// gold-api.com: metals plus a handful of crypto and FX symbols, quoted in USD.
///
/// The symbol catalog and each price are cached separately, keyed by URL.
pub struct GoldApiProvider {
    base_url: String,
    fetcher: JsonFetcher,
    cache: Arc<dyn Cache>,
}

impl GoldApiProvider {
    pub fn new(base_url: &str, fetcher: JsonFetcher, cache: Arc<dyn Cache>) -> Self {
        GoldApiProvider {
            base_url: base_url.to_string(),
            fetcher,
            cache,
        }
    }

    /// `{base}/price/{symbol}` with the symbol encoded as one path segment.
    fn price_url(&self, symbol: &str) -> Result<Url> {
        let mut url = Url::parse(&format!("{}/price", self.base_url))
            .with_context(|| format!("Invalid gold-api base url: {}", self.base_url))?;
        url.path_segments_mut()
            .map_err(|_| anyhow!("gold-api base url cannot take a path: {}", self.base_url))?
            .push(symbol);
        Ok(url)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GoldApiPrice {
    name: String,
    price: f64,
    symbol: String,
    updated_at: String,
    updated_at_readable: Option<String>,
}

#[async_trait]
impl PriceProvider for GoldApiProvider {
    fn name(&self) -> &str {
        "GoldAPI"
    }

    async fn supported_assets(&self) -> Result<Vec<AssetSymbol>> {
        let url = format!("{}/symbols", self.base_url);
        if let Some(cached) = get_json(self.cache.as_ref(), &url).await {
            return Ok(cached);
        }

        let Some(symbols) = self.fetcher.fetch_json::<Vec<AssetSymbol>>(&url).await else {
            return Ok(vec![]);
        };
        put_json(self.cache.as_ref(), &url, &symbols).await;
        Ok(symbols)
    }

    #[instrument(name = "GoldApiFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_price(&self, symbol: &str, currency: &str) -> Result<Option<AssetPrice>> {
        let url = self.price_url(symbol)?;
        let cache_key = format!("{url}?currency={currency}");
        if let Some(cached) = get_json(self.cache.as_ref(), &cache_key).await {
            return Ok(Some(cached));
        }

        let Some(raw) = self.fetcher.fetch_json::<GoldApiPrice>(url.as_str()).await else {
            return Ok(None);
        };

        // Quotes are always in USD; conversion happens upstream of the provider
        let price = AssetPrice {
            name: raw.name,
            symbol: raw.symbol,
            price: raw.price,
            currency: "USD".to_string(),
            updated_at: raw.updated_at,
            updated_at_readable: raw.updated_at_readable,
            market_cap: None,
            volume_24h: None,
            change_24h: None,
        };

        put_json(self.cache.as_ref(), &cache_key, &price).await;
        Ok(Some(price))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryCache;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const SYMBOLS_JSON: &str = r#"[
        {"name": "Gold", "symbol": "XAU"},
        {"name": "Silver", "symbol": "XAG"},
        {"name": "Platinum", "symbol": "XPT"},
        {"name": "Bitcoin", "symbol": "BTC"}
    ]"#;

    const PRICE_JSON: &str = r#"{
        "name": "Platinum",
        "price": 941.3,
        "symbol": "XPT",
        "updatedAt": "2025-01-01T00:00:00Z",
        "updatedAtReadable": "a few seconds ago"
    }"#;

    async fn mount(mock_server: &MockServer, request_path: &str, body: &str, expected_calls: u64) {
        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .expect(expected_calls)
            .mount(mock_server)
            .await;
    }

    fn provider(base_url: &str) -> GoldApiProvider {
        GoldApiProvider::new(
            base_url,
            JsonFetcher::with_defaults().unwrap(),
            Arc::new(MemoryCache::default()),
        )
    }

    #[tokio::test]
    async fn test_supported_assets_cached() {
        let mock_server = MockServer::start().await;
        mount(&mock_server, "/symbols", SYMBOLS_JSON, 1).await;
        let provider = provider(&mock_server.uri());

        let assets = provider.supported_assets().await.unwrap();
        assert_eq!(assets.len(), 4);
        assert_eq!(assets[2], AssetSymbol::new("Platinum", "XPT"));

        // Second call is served from cache
        let again = provider.supported_assets().await.unwrap();
        assert_eq!(assets, again);
    }

    #[tokio::test]
    async fn test_fetch_price() {
        let mock_server = MockServer::start().await;
        mount(&mock_server, "/price/XPT", PRICE_JSON, 1).await;
        let provider = provider(&mock_server.uri());

        let price = provider.fetch_price("XPT", "USD").await.unwrap().unwrap();
        assert_eq!(price.name, "Platinum");
        assert_eq!(price.symbol, "XPT");
        assert_eq!(price.price, 941.3);
        assert_eq!(price.currency, "USD");
        assert_eq!(price.updated_at, "2025-01-01T00:00:00Z");
        assert_eq!(
            price.updated_at_readable.as_deref(),
            Some("a few seconds ago")
        );

        let cached = provider.fetch_price("XPT", "USD").await.unwrap().unwrap();
        assert_eq!(price, cached);
    }

    #[tokio::test]
    async fn test_unknown_symbol_is_absent() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/price/NOPE"))
            .respond_with(
                ResponseTemplate::new(404).set_body_string(r#"{"error": "Symbol not found"}"#),
            )
            .mount(&mock_server)
            .await;
        let provider = provider(&mock_server.uri());

        assert!(provider.fetch_price("NOPE", "USD").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_symbol_is_encoded_in_path() {
        let mock_server = MockServer::start().await;
        mount(&mock_server, "/price/XPT%3Fcurrency=EUR", PRICE_JSON, 1).await;
        let provider = provider(&mock_server.uri());

        let price = provider
            .fetch_price("XPT?currency=EUR", "USD")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(price.price, 941.3);
    }

    #[tokio::test]
    async fn test_symbols_failure_yields_empty_list() {
        let mock_server = MockServer::start().await;
        let provider = provider(&mock_server.uri());

        assert!(provider.supported_assets().await.unwrap().is_empty());
    }
}
