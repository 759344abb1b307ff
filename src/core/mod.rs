//! Core business logic abstractions

pub mod cache;
pub mod category;
pub mod config;
pub mod currency;
pub mod log;
pub mod price;

// Re-export main types for cleaner imports
pub use cache::Cache;
pub use category::Category;
pub use currency::CurrencyRateProvider;
pub use price::{AssetPrice, AssetSymbol, PriceProvider};
