use super::http::JsonFetcher;
use crate::core::CurrencyRateProvider;
use crate::core::cache::{Cache, get_json, put_json};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const CACHE_KEY: &str = "EXCHANGE_RATES_USD";
const PIVOT: &str = "USD";

/// Currency code → units of that currency per 1 USD.
pub type RatesTable = HashMap<String, f64>;

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: RatesTable,
}

/// Cross rates through a USD-based table fetched from a primary source, with a
/// single backup. The table is cached as one unit and replaced wholesale.
pub struct ExchangeRateProvider {
    primary_url: String,
    backup_url: String,
    fetcher: JsonFetcher,
    cache: Arc<dyn Cache>,
    fill: Mutex<()>,
}

impl ExchangeRateProvider {
    pub fn new(
        primary_url: &str,
        backup_url: &str,
        fetcher: JsonFetcher,
        cache: Arc<dyn Cache>,
    ) -> Self {
        ExchangeRateProvider {
            primary_url: primary_url.to_string(),
            backup_url: backup_url.to_string(),
            fetcher,
            cache,
            fill: Mutex::new(()),
        }
    }

    async fn rates(&self) -> Option<RatesTable> {
        if let Some(cached) = get_json(self.cache.as_ref(), CACHE_KEY).await {
            return Some(cached);
        }

        let _guard = self.fill.lock().await;
        if let Some(cached) = get_json(self.cache.as_ref(), CACHE_KEY).await {
            return Some(cached);
        }

        let table = self.fetch_rates().await?;
        put_json(self.cache.as_ref(), CACHE_KEY, &table).await;
        Some(table)
    }

    async fn fetch_rates(&self) -> Option<RatesTable> {
        if let Some(data) = self
            .fetcher
            .fetch_json::<RatesResponse>(&self.primary_url)
            .await
        {
            return Some(data.rates);
        }

        warn!("Primary exchange rate API failed, trying backup");
        let data = self
            .fetcher
            .fetch_json::<RatesResponse>(&self.backup_url)
            .await;
        if data.is_none() {
            warn!("Backup exchange rate API failed");
        }
        data.map(|d| d.rates)
    }
}

/// Units of `code` per USD. The pivot itself is 1 even if the table omits it.
fn usd_rate(table: &RatesTable, code: &str) -> Option<f64> {
    match table.get(code) {
        Some(rate) if *rate > 0.0 => Some(*rate),
        Some(_) => None,
        None if code == PIVOT => Some(1.0),
        None => None,
    }
}

/// Rate between two currencies given a USD-based table.
pub fn cross_rate(table: &RatesTable, from: &str, to: &str) -> Option<f64> {
    let to_rate = usd_rate(table, to)?;
    if from == PIVOT {
        return Some(to_rate);
    }
    let from_rate = usd_rate(table, from)?;
    Some(to_rate / from_rate)
}

#[async_trait]
impl CurrencyRateProvider for ExchangeRateProvider {
    async fn get_rate(&self, from: &str, to: &str) -> Option<f64> {
        let from = from.to_uppercase();
        let to = to.to_uppercase();
        if from == to {
            return Some(1.0);
        }

        let table = self.rates().await?;
        let rate = cross_rate(&table, &from, &to);
        if rate.is_none() {
            debug!("No rate available for {}->{}", from, to);
        }
        rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryCache;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const PRIMARY_JSON: &str = r#"{
        "result": "success",
        "base_code": "USD",
        "rates": {"USD": 1, "EUR": 0.92, "CNY": 7.2, "JPY": 151.5}
    }"#;

    const BACKUP_JSON: &str = r#"{
        "base": "USD",
        "date": "2025-01-01",
        "rates": {"USD": 1, "EUR": 0.95, "CNY": 7.3}
    }"#;

    async fn mount(mock_server: &MockServer, request_path: &str, status: u16, body: &str) {
        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(mock_server)
            .await;
    }

    fn provider(mock_server: &MockServer) -> ExchangeRateProvider {
        ExchangeRateProvider::new(
            &format!("{}/v6/latest/USD", mock_server.uri()),
            &format!("{}/v4/latest/USD", mock_server.uri()),
            JsonFetcher::with_defaults().unwrap(),
            Arc::new(MemoryCache::default()),
        )
    }

    #[tokio::test]
    async fn test_same_currency_skips_network() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PRIMARY_JSON))
            .expect(0)
            .mount(&mock_server)
            .await;
        let provider = provider(&mock_server);

        assert_eq!(provider.get_rate("EUR", "EUR").await, Some(1.0));
        assert_eq!(provider.get_rate("usd", "USD").await, Some(1.0));
    }

    #[tokio::test]
    async fn test_rates_from_primary() {
        let mock_server = MockServer::start().await;
        mount(&mock_server, "/v6/latest/USD", 200, PRIMARY_JSON).await;
        let provider = provider(&mock_server);

        assert_eq!(provider.get_rate("USD", "CNY").await, Some(7.2));
        assert_eq!(provider.get_rate("USD", "EUR").await, Some(0.92));

        let cross = provider.get_rate("EUR", "CNY").await.unwrap();
        assert!((cross - 7.2 / 0.92).abs() < 1e-12);

        let to_usd = provider.get_rate("EUR", "USD").await.unwrap();
        assert!((to_usd - 1.0 / 0.92).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_rate_and_inverse_round_trip() {
        let mock_server = MockServer::start().await;
        mount(&mock_server, "/v6/latest/USD", 200, PRIMARY_JSON).await;
        let provider = provider(&mock_server);

        let there = provider.get_rate("JPY", "EUR").await.unwrap();
        let back = provider.get_rate("EUR", "JPY").await.unwrap();
        assert!((there * back - 1.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_table_is_cached() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v6/latest/USD"))
            .respond_with(ResponseTemplate::new(200).set_body_string(PRIMARY_JSON))
            .expect(1)
            .mount(&mock_server)
            .await;
        let provider = provider(&mock_server);

        provider.get_rate("USD", "EUR").await;
        provider.get_rate("USD", "CNY").await;
        provider.get_rate("EUR", "JPY").await;
    }

    #[tokio::test]
    async fn test_concurrent_cold_lookups_share_one_table() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v6/latest/USD"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(PRIMARY_JSON)
                    .set_delay(std::time::Duration::from_millis(100)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;
        let provider = provider(&mock_server);

        let (cny, eur) = tokio::join!(
            provider.get_rate("USD", "CNY"),
            provider.get_rate("USD", "EUR")
        );
        assert_eq!(cny, Some(7.2));
        assert_eq!(eur, Some(0.92));
    }

    #[tokio::test]
    async fn test_backup_used_when_primary_fails() {
        let mock_server = MockServer::start().await;
        mount(&mock_server, "/v6/latest/USD", 500, "").await;
        mount(&mock_server, "/v4/latest/USD", 200, BACKUP_JSON).await;
        let provider = provider(&mock_server);

        assert_eq!(provider.get_rate("USD", "CNY").await, Some(7.3));
    }

    #[tokio::test]
    async fn test_both_sources_failing_is_absent() {
        let mock_server = MockServer::start().await;
        mount(&mock_server, "/v6/latest/USD", 500, "").await;
        mount(&mock_server, "/v4/latest/USD", 200, r#"{"unexpected": true}"#).await;
        let provider = provider(&mock_server);

        assert_eq!(provider.get_rate("USD", "CNY").await, None);
    }

    #[tokio::test]
    async fn test_unknown_currency_is_absent() {
        let mock_server = MockServer::start().await;
        mount(&mock_server, "/v6/latest/USD", 200, PRIMARY_JSON).await;
        let provider = provider(&mock_server);

        assert_eq!(provider.get_rate("USD", "XYZ").await, None);
        assert_eq!(provider.get_rate("XYZ", "EUR").await, None);
    }

    #[test]
    fn test_cross_rate_without_pivot_entry() {
        let table: RatesTable = [("EUR".to_string(), 0.5)].into_iter().collect();
        assert_eq!(cross_rate(&table, "EUR", "USD"), Some(2.0));
        assert_eq!(cross_rate(&table, "USD", "EUR"), Some(0.5));
    }
}
