pub mod coingecko;
pub mod exchange_rate;
pub mod gold_api;
pub mod goldprice_org;
pub mod http;

pub use coingecko::CoinGeckoProvider;
pub use exchange_rate::ExchangeRateProvider;
pub use gold_api::GoldApiProvider;
pub use goldprice_org::GoldPriceOrgProvider;
pub use http::JsonFetcher;
