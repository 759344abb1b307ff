//! The two query operations exposed to callers, rendered as text.

use crate::core::{AssetPrice, Category};
use crate::resolver::{PriceResolver, Resolution};
use anyhow::{Context, Result};

pub const GET_ASSET_PRICE: &str = "get_asset_price";
pub const LIST_ASSETS: &str = "list_assets";

const BLOCK_SEPARATOR: &str = "\n---\n";

#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    pub text: String,
    pub is_error: bool,
}

impl ToolOutput {
    fn text(text: String) -> Self {
        Self {
            text,
            is_error: false,
        }
    }

    fn error(text: String) -> Self {
        Self {
            text,
            is_error: true,
        }
    }
}

pub async fn get_asset_price(
    resolver: &PriceResolver,
    symbol: Option<&str>,
    currency: &str,
) -> ToolOutput {
    match resolver.resolve(symbol, currency).await {
        Resolution::Resolved(prices) => ToolOutput::text(format_prices(&prices)),
        Resolution::Failed(errors) => {
            ToolOutput::error(format!("Failed to retrieve prices: {}", errors.join(", ")))
        }
    }
}

pub async fn list_assets(resolver: &PriceResolver) -> Result<ToolOutput> {
    let assets = resolver.list_assets().await;
    let text = serde_json::to_string_pretty(&assets).context("Failed to serialize asset list")?;
    Ok(ToolOutput::text(text))
}

/// One block per price, precious metals first, otherwise in the given order.
pub fn format_prices(prices: &[AssetPrice]) -> String {
    let mut ordered: Vec<&AssetPrice> = prices.iter().collect();
    ordered.sort_by_key(|p| !Category::is_precious_metal(&p.symbol));

    ordered
        .into_iter()
        .map(format_price)
        .collect::<Vec<_>>()
        .join(BLOCK_SEPARATOR)
}

fn format_price(price: &AssetPrice) -> String {
    let mut output = format!(
        "Symbol: {}\nName: {}\nPrice: {} {}",
        price.symbol,
        price.name,
        format_number(price.price, 2),
        price.currency
    );
    if let Some(change) = price.change_24h {
        let sign = if change >= 0.0 { "+" } else { "" };
        output.push_str(&format!("\n24h Change: {sign}{change:.2}%"));
    }
    if let Some(cap) = price.market_cap.filter(|cap| *cap != 0.0) {
        output.push_str(&format!(
            "\nMarket Cap: {} {}",
            format_number(cap, 0),
            price.currency
        ));
    }
    output.push_str(&format!("\nUpdated: {}", price.updated_at));
    if let Some(readable) = &price.updated_at_readable {
        output.push_str(&format!(" ({readable})"));
    }
    output
}

/// Rounds to at most `max_fraction_digits`, drops trailing zeros and groups
/// the integer part by thousands: `1234567.891` -> `1,234,567.89`.
pub fn format_number(value: f64, max_fraction_digits: usize) -> String {
    let fixed = format!("{:.*}", max_fraction_digits, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((int_part, frac_part)) => (int_part, frac_part.trim_end_matches('0')),
        None => (fixed.as_str(), ""),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let negative = value < 0.0 && (grouped != "0" || !frac_part.is_empty());
    let sign = if negative { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{sign}{grouped}")
    } else {
        format!("{sign}{grouped}.{frac_part}")
    }
}
