use std::fmt::Display;

const PRECIOUS_METALS: &[&str] = &["XAU", "XAG", "XPD", "XPT", "HG"];
const CRYPTO: &[&str] = &["BTC", "ETH", "LTC", "XRP", "DOT", "ADA"];
const FOREX: &[&str] = &["USD", "EUR", "JPY", "GBP", "AUD", "CAD", "CHF"];
const INDICES: &[&str] = &["SPX", "NDX", "DJI", "VIX"];

/// Display grouping for a symbol. Derived from static tables, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Category {
    PreciousMetals,
    Crypto,
    Forex,
    Indices,
    Other,
}

impl Category {
    pub fn of(symbol: &str) -> Self {
        let symbol = symbol.to_uppercase();
        let symbol = symbol.as_str();
        if PRECIOUS_METALS.contains(&symbol) {
            Category::PreciousMetals
        } else if CRYPTO.contains(&symbol) {
            Category::Crypto
        } else if FOREX.contains(&symbol) {
            Category::Forex
        } else if INDICES.contains(&symbol) {
            Category::Indices
        } else {
            Category::Other
        }
    }

    pub fn is_precious_metal(symbol: &str) -> bool {
        Self::of(symbol) == Category::PreciousMetals
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Category::PreciousMetals => "precious_metals",
                Category::Crypto => "crypto",
                Category::Forex => "forex",
                Category::Indices => "indices",
                Category::Other => "other",
            }
        )
    }
}
