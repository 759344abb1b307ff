//! Multi-provider price resolution.
//!
//! Providers are consulted in the order they were given, the first one that
//! knows a symbol wins, and prices quoted in another currency go through the
//! rate converter. Symbols are resolved concurrently and independently; the
//! aggregate keeps the order they were requested in.

use crate::core::{AssetPrice, AssetSymbol, CurrencyRateProvider, PriceProvider};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Outcome of one resolution request.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    /// At least one symbol resolved. Symbols that did not are left out.
    Resolved(Vec<AssetPrice>),
    /// Nothing resolved; one message per requested symbol.
    Failed(Vec<String>),
}

pub struct PriceResolver {
    providers: Vec<Arc<dyn PriceProvider>>,
    converter: Arc<dyn CurrencyRateProvider>,
    default_symbols: Vec<String>,
}

impl PriceResolver {
    /// `providers` is the priority order.
    pub fn new(
        providers: Vec<Arc<dyn PriceProvider>>,
        converter: Arc<dyn CurrencyRateProvider>,
        default_symbols: Vec<String>,
    ) -> Self {
        Self {
            providers,
            converter,
            default_symbols,
        }
    }

    pub fn providers(&self) -> &[Arc<dyn PriceProvider>] {
        &self.providers
    }

    /// Resolves `symbol` (or the default list when `None`) into `currency`.
    pub async fn resolve(&self, symbol: Option<&str>, currency: &str) -> Resolution {
        let target = currency.trim().to_uppercase();
        let symbols: Vec<String> = match symbol.map(str::trim).filter(|s| !s.is_empty()) {
            Some(symbol) => vec![symbol.to_uppercase()],
            None => self
                .default_symbols
                .iter()
                .map(|s| s.trim().to_uppercase())
                .filter(|s| !s.is_empty())
                .collect(),
        };

        self.resolve_all(&symbols, &target).await
    }

    pub async fn resolve_all(&self, symbols: &[String], target: &str) -> Resolution {
        if symbols.is_empty() {
            return Resolution::Failed(vec!["No symbols requested".to_string()]);
        }

        let results = join_all(symbols.iter().map(|s| self.resolve_symbol(s, target))).await;

        let mut prices = Vec::with_capacity(symbols.len());
        let mut errors = Vec::new();
        for (symbol, result) in symbols.iter().zip(results) {
            match result {
                Some(price) => prices.push(price),
                None => errors.push(format!("Could not find price for {symbol}")),
            }
        }

        if prices.is_empty() && !errors.is_empty() {
            return Resolution::Failed(errors);
        }
        if !errors.is_empty() {
            debug!("Partial resolution: {}", errors.join(", "));
        }
        Resolution::Resolved(prices)
    }

    async fn resolve_symbol(&self, symbol: &str, target: &str) -> Option<AssetPrice> {
        for provider in &self.providers {
            match provider.fetch_price(symbol, target).await {
                Ok(Some(price)) => {
                    debug!(provider = provider.name(), %symbol, "Resolved price");
                    return Some(self.convert(price, target).await);
                }
                Ok(None) => debug!(provider = provider.name(), %symbol, "No price"),
                Err(e) => warn!(provider = provider.name(), %symbol, error = %e, "Provider failed"),
            }
        }
        info!(%symbol, "No provider could resolve symbol");
        None
    }

    /// Converts into `target` when needed. Without a rate the price keeps its
    /// own currency rather than being mislabelled.
    async fn convert(&self, price: AssetPrice, target: &str) -> AssetPrice {
        if price.currency.eq_ignore_ascii_case(target) {
            return price;
        }

        match self.converter.get_rate(&price.currency, target).await {
            Some(rate) => price.converted(rate, target),
            None => {
                warn!(
                    symbol = %price.symbol,
                    from = %price.currency,
                    to = %target,
                    "No exchange rate, keeping source currency"
                );
                price
            }
        }
    }

    /// Supported assets across all providers, deduplicated by symbol. The
    /// first provider to list a symbol wins.
    pub async fn list_assets(&self) -> Vec<AssetSymbol> {
        let mut seen = HashSet::new();
        let mut assets = Vec::new();

        for provider in &self.providers {
            match provider.supported_assets().await {
                Ok(list) => assets.extend(
                    list.into_iter()
                        .filter(|asset| seen.insert(asset.symbol.clone())),
                ),
                Err(e) => warn!(provider = provider.name(), error = %e, "Failed to list assets"),
            }
        }

        assets
    }
}
