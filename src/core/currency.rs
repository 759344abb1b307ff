//! Currency conversion abstractions

use async_trait::async_trait;

#[async_trait]
pub trait CurrencyRateProvider: Send + Sync {
    /// Multiplier that converts an amount in `from` into `to`, or `None` when
    /// no rate is available.
    async fn get_rate(&self, from: &str, to: &str) -> Option<f64>;
}
