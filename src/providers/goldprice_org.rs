use super::http::JsonFetcher;
use crate::core::cache::{Cache, get_json, put_json};
use crate::core::{AssetPrice, AssetSymbol, PriceProvider};
use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, instrument};

const CACHE_KEY: &str = "GOLD_PRICE_ORG_DATA";

/// Gold and silver quotes from goldprice.org. One upstream call returns both
/// metals, so the whole document is cached under a single key.
pub struct GoldPriceOrgProvider {
    base_url: String,
    fetcher: JsonFetcher,
    cache: Arc<dyn Cache>,
    // Held while filling the cache so concurrent lookups share one request
    fill: Mutex<()>,
}

impl GoldPriceOrgProvider {
    pub fn new(base_url: &str, fetcher: JsonFetcher, cache: Arc<dyn Cache>) -> Self {
        GoldPriceOrgProvider {
            base_url: base_url.to_string(),
            fetcher,
            cache,
            fill: Mutex::new(()),
        }
    }

    async fn rates(&self) -> Option<GoldPriceOrgResponse> {
        if let Some(cached) = get_json(self.cache.as_ref(), CACHE_KEY).await {
            return Some(cached);
        }

        let _guard = self.fill.lock().await;
        if let Some(cached) = get_json(self.cache.as_ref(), CACHE_KEY).await {
            return Some(cached);
        }

        let url = format!("{}/dbXRates/USD", self.base_url);
        let data: GoldPriceOrgResponse = self.fetcher.fetch_json(&url).await?;
        put_json(self.cache.as_ref(), CACHE_KEY, &data).await;
        Some(data)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct GoldPriceOrgResponse {
    items: Vec<RatesItem>,
    date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RatesItem {
    curr: String,
    xau_price: f64,
    xag_price: f64,
    pc_xau: Option<f64>,
    pc_xag: Option<f64>,
}

#[async_trait]
impl PriceProvider for GoldPriceOrgProvider {
    fn name(&self) -> &str {
        "GoldPriceOrg"
    }

    async fn supported_assets(&self) -> Result<Vec<AssetSymbol>> {
        Ok(vec![
            AssetSymbol::new("Gold", "XAU"),
            AssetSymbol::new("Silver", "XAG"),
        ])
    }

    #[instrument(name = "GoldPriceOrgFetch", skip(self), fields(symbol = %symbol))]
    async fn fetch_price(&self, symbol: &str, _currency: &str) -> Result<Option<AssetPrice>> {
        let symbol = symbol.to_uppercase();
        let is_gold = match symbol.as_str() {
            "XAU" => true,
            "XAG" => false,
            _ => return Ok(None),
        };

        let Some(data) = self.rates().await else {
            return Ok(None);
        };
        let Some(item) = data.items.first() else {
            debug!("goldprice.org returned no rate items");
            return Ok(None);
        };

        let (name, price, change) = if is_gold {
            ("Gold", item.xau_price, item.pc_xau)
        } else {
            ("Silver", item.xag_price, item.pc_xag)
        };

        Ok(Some(AssetPrice {
            name: name.to_string(),
            symbol,
            price,
            currency: item.curr.to_uppercase(),
            updated_at: Utc::now().to_rfc3339(),
            updated_at_readable: data.date.clone(),
            market_cap: None,
            volume_24h: None,
            change_24h: change,
        }))
    }
}
