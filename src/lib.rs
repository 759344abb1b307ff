pub mod cli;
pub mod core;
pub mod providers;
pub mod resolver;
pub mod server;
pub mod store;
pub mod tools;

use crate::core::config::AppConfig;
use crate::core::{Cache, CurrencyRateProvider, PriceProvider};
use crate::providers::{
    CoinGeckoProvider, ExchangeRateProvider, GoldApiProvider, GoldPriceOrgProvider, JsonFetcher,
};
use crate::resolver::PriceResolver;
use crate::store::MemoryCache;
use anyhow::Result;
use std::sync::Arc;
use tracing::debug;

pub enum AppCommand {
    Serve,
    Price {
        symbol: Option<String>,
        currency: Option<String>,
    },
    Assets,
}

/// Shared state for one process: the cache every component reads through and
/// the resolver built on top of it.
pub struct App {
    pub config: AppConfig,
    pub cache: Arc<MemoryCache>,
    pub resolver: Arc<PriceResolver>,
}

impl App {
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let cache = Arc::new(MemoryCache::new(config.cache.ttl()));
        let shared: Arc<dyn Cache> = cache.clone();
        let fetcher = JsonFetcher::from_config(&config.http)?;
        let providers_config = &config.providers;

        // Priority order: fast metals, broad metals, crypto
        let providers: Vec<Arc<dyn PriceProvider>> = vec![
            Arc::new(GoldPriceOrgProvider::new(
                providers_config.goldprice_org_url(),
                fetcher.clone(),
                Arc::clone(&shared),
            )),
            Arc::new(GoldApiProvider::new(
                providers_config.gold_api_url(),
                fetcher.clone(),
                Arc::clone(&shared),
            )),
            Arc::new(CoinGeckoProvider::new(
                providers_config.coingecko_url(),
                fetcher.clone(),
                Arc::clone(&shared),
            )),
        ];

        let (primary_url, backup_url) = providers_config.rate_urls();
        let converter: Arc<dyn CurrencyRateProvider> = Arc::new(ExchangeRateProvider::new(
            primary_url,
            backup_url,
            fetcher,
            Arc::clone(&shared),
        ));

        let resolver = Arc::new(PriceResolver::new(
            providers,
            converter,
            config.default_symbols.clone(),
        ));

        Ok(Self {
            config,
            cache,
            resolver,
        })
    }

    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let config = match config_path {
            Some(path) => AppConfig::load_from_path(path)?,
            None => AppConfig::load()?,
        };
        debug!("Loaded config: {config:#?}");
        Self::from_config(config)
    }
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    let app = App::load(config_path)?;

    match command {
        AppCommand::Serve => cli::serve::run(&app).await,
        AppCommand::Price { symbol, currency } => {
            let currency = currency.unwrap_or_else(|| app.config.currency.clone());
            cli::price::run(&app.resolver, symbol.as_deref(), &currency).await
        }
        AppCommand::Assets => cli::assets::run(&app.resolver).await,
    }
}
