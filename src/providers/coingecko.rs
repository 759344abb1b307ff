use super::http::JsonFetcher;
use crate::core::cache::{Cache, get_json, put_json};
use crate::core::{AssetPrice, AssetSymbol, PriceProvider};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, instrument};

/// Upstream ids are keyed by symbol; values are the per-currency fields.
type SimplePriceResponse = HashMap<String, HashMap<String, Option<f64>>>;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MarketEntry {
    id: String,
    symbol: String,
    name: String,
    current_price: f64,
    market_cap: Option<f64>,
    total_volume: Option<f64>,
    price_change_percentage_24h: Option<f64>,
    last_updated: Option<String>,
}

#[derive(Debug, Clone)]
struct CoinRef {
    id: String,
    name: String,
}

fn price_cache_key(symbol: &str, currency: &str) -> String {
    format!("CG_PRICE_{symbol}_{currency}")
}

/// CoinGecko crypto quotes.
///
/// The top 100 coins by market cap provide the symbol→id lookup. Symbols
/// outside that listing are tried as upstream ids directly (lowercased),
/// which may legitimately miss.
pub struct CoinGeckoProvider {
    base_url: String,
    fetcher: JsonFetcher,
    cache: Arc<dyn Cache>,
    coins: RwLock<HashMap<String, CoinRef>>,
    // Held while filling the listing so concurrent lookups share one request
    fill: Mutex<()>,
}

impl CoinGeckoProvider {
    pub fn new(base_url: &str, fetcher: JsonFetcher, cache: Arc<dyn Cache>) -> Self {
        CoinGeckoProvider {
            base_url: base_url.to_string(),
            fetcher,
            cache,
            coins: RwLock::new(HashMap::new()),
            fill: Mutex::new(()),
        }
    }

    /// Top 100 listing, from cache or upstream. A fresh listing also seeds
    /// the USD price cache for every coin in it.
    async fn markets(&self) -> Option<Vec<MarketEntry>> {
        let cache_key = format!("{}/coins/markets", self.base_url);
        if let Some(cached) = get_json(self.cache.as_ref(), &cache_key).await {
            return Some(cached);
        }

        let _guard = self.fill.lock().await;
        if let Some(cached) = get_json(self.cache.as_ref(), &cache_key).await {
            return Some(cached);
        }

        let url = format!(
            "{}/coins/markets?vs_currency=usd&order=market_cap_desc&per_page=100&page=1&sparkline=false",
            self.base_url
        );
        let markets: Vec<MarketEntry> = self.fetcher.fetch_json(&url).await?;
        put_json(self.cache.as_ref(), &cache_key, &markets).await;

        for market in &markets {
            let symbol = market.symbol.to_uppercase();
            let price = AssetPrice {
                name: market.name.clone(),
                symbol: symbol.clone(),
                price: market.current_price,
                currency: "USD".to_string(),
                updated_at: market
                    .last_updated
                    .clone()
                    .unwrap_or_else(|| Utc::now().to_rfc3339()),
                updated_at_readable: None,
                market_cap: market.market_cap,
                volume_24h: market.total_volume,
                change_24h: market.price_change_percentage_24h,
            };
            put_json(
                self.cache.as_ref(),
                &price_cache_key(&symbol, "USD"),
                &price,
            )
            .await;
        }
        debug!("Seeded price cache with {} coins", markets.len());

        Some(markets)
    }

    async fn remember(&self, markets: &[MarketEntry]) {
        let mut coins = self.coins.write().await;
        for market in markets {
            // Listing is ordered by market cap, keep the largest coin per ticker
            coins
                .entry(market.symbol.to_uppercase())
                .or_insert_with(|| CoinRef {
                    id: market.id.clone(),
                    name: market.name.clone(),
                });
        }
    }

    async fn resolve_coin(&self, symbol: &str) -> CoinRef {
        if let Some(coin) = self.coins.read().await.get(symbol) {
            return coin.clone();
        }
        let guess = symbol.to_lowercase();
        debug!("{} not in listing, trying it as upstream id", symbol);
        CoinRef {
            id: guess.clone(),
            name: guess,
        }
    }
}

#[async_trait]
impl PriceProvider for CoinGeckoProvider {
    fn name(&self) -> &str {
        "CoinGecko"
    }

    async fn supported_assets(&self) -> Result<Vec<AssetSymbol>> {
        let Some(markets) = self.markets().await else {
            return Ok(vec![]);
        };
        self.remember(&markets).await;

        Ok(markets
            .iter()
            .map(|m| AssetSymbol {
                name: m.name.clone(),
                symbol: m.symbol.to_uppercase(),
            })
            .collect())
    }

    #[instrument(name = "CoinGeckoFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_price(&self, symbol: &str, currency: &str) -> Result<Option<AssetPrice>> {
        let symbol = symbol.to_uppercase();
        let currency = currency.to_uppercase();
        let cache_key = price_cache_key(&symbol, &currency);
        if let Some(cached) = get_json(self.cache.as_ref(), &cache_key).await {
            return Ok(Some(cached));
        }

        let needs_listing = self.coins.read().await.is_empty();
        if needs_listing {
            self.supported_assets().await?;
            // The listing may have just seeded this quote
            if let Some(cached) = get_json(self.cache.as_ref(), &cache_key).await {
                return Ok(Some(cached));
            }
        }

        let coin = self.resolve_coin(&symbol).await;
        let requested = currency.to_lowercase();
        let vs_currencies = if requested == "usd" {
            requested.clone()
        } else {
            format!("{requested},usd")
        };
        let url = Url::parse_with_params(
            &format!("{}/simple/price", self.base_url),
            [
                ("ids", coin.id.as_str()),
                ("vs_currencies", vs_currencies.as_str()),
                ("include_market_cap", "true"),
                ("include_24hr_vol", "true"),
                ("include_24hr_change", "true"),
                ("include_last_updated_at", "true"),
            ],
        )
        .with_context(|| format!("Invalid CoinGecko base url: {}", self.base_url))?;

        let Some(data) = self
            .fetcher
            .fetch_json::<SimplePriceResponse>(url.as_str())
            .await
        else {
            return Ok(None);
        };
        let Some(item) = data.get(&coin.id) else {
            debug!("No entry for id {} in response", coin.id);
            return Ok(None);
        };

        let field = |name: &str| item.get(name).copied().flatten();

        // Prefer the requested currency, fall back to USD and let the caller convert
        let Some((quote, price)) = [requested.as_str(), "usd"]
            .into_iter()
            .find_map(|cur| field(cur).map(|p| (cur.to_string(), p)))
        else {
            debug!("No {} or usd quote for {}", requested, coin.id);
            return Ok(None);
        };

        let updated_at = field("last_updated_at")
            .and_then(|ts| DateTime::from_timestamp(ts as i64, 0))
            .unwrap_or_else(Utc::now)
            .to_rfc3339();

        let price = AssetPrice {
            name: coin.name,
            symbol: symbol.clone(),
            price,
            currency: quote.to_uppercase(),
            updated_at,
            updated_at_readable: None,
            market_cap: field(&format!("{quote}_market_cap")),
            volume_24h: field(&format!("{quote}_24h_vol")),
            change_24h: field(&format!("{quote}_24h_change")),
        };

        put_json(
            self.cache.as_ref(),
            &price_cache_key(&symbol, &price.currency),
            &price,
        )
        .await;
        if price.currency != currency {
            // USD fallback also answers later requests for the same currency
            put_json(self.cache.as_ref(), &cache_key, &price).await;
        }
        Ok(Some(price))
    }
}
