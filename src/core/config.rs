use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

pub const DEFAULT_CURRENCY: &str = "USD";
pub const DEFAULT_SYMBOLS: [&str; 4] = ["XAU", "XAG", "BTC", "ETH"];
pub const DEFAULT_USER_AGENT: &str = "asset-price-tracker/1.0";

pub const GOLDPRICE_ORG_URL: &str = "https://data-asg.goldprice.org";
pub const GOLD_API_URL: &str = "https://api.gold-api.com";
pub const COINGECKO_URL: &str = "https://api.coingecko.com/api/v3";
pub const RATES_PRIMARY_URL: &str = "https://open.er-api.com/v6/latest/USD";
pub const RATES_BACKUP_URL: &str = "https://api.exchangerate-api.com/v4/latest/USD";

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProviderEndpoint {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ExchangeRateConfig {
    pub primary_url: String,
    pub backup_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub goldprice_org: Option<ProviderEndpoint>,
    pub gold_api: Option<ProviderEndpoint>,
    pub coingecko: Option<ProviderEndpoint>,
    pub exchange_rate: Option<ExchangeRateConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            goldprice_org: Some(ProviderEndpoint {
                base_url: GOLDPRICE_ORG_URL.to_string(),
            }),
            gold_api: Some(ProviderEndpoint {
                base_url: GOLD_API_URL.to_string(),
            }),
            coingecko: Some(ProviderEndpoint {
                base_url: COINGECKO_URL.to_string(),
            }),
            exchange_rate: Some(ExchangeRateConfig {
                primary_url: RATES_PRIMARY_URL.to_string(),
                backup_url: RATES_BACKUP_URL.to_string(),
            }),
        }
    }
}

impl ProvidersConfig {
    pub fn goldprice_org_url(&self) -> &str {
        self.goldprice_org
            .as_ref()
            .map_or(GOLDPRICE_ORG_URL, |p| &p.base_url)
    }

    pub fn gold_api_url(&self) -> &str {
        self.gold_api.as_ref().map_or(GOLD_API_URL, |p| &p.base_url)
    }

    pub fn coingecko_url(&self) -> &str {
        self.coingecko.as_ref().map_or(COINGECKO_URL, |p| &p.base_url)
    }

    pub fn rate_urls(&self) -> (&str, &str) {
        self.exchange_rate
            .as_ref()
            .map_or((RATES_PRIMARY_URL, RATES_BACKUP_URL), |r| {
                (r.primary_url.as_str(), r.backup_url.as_str())
            })
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CacheConfig {
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_clear_interval_secs")]
    pub clear_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            ttl_secs: default_ttl_secs(),
            clear_interval_secs: default_clear_interval_secs(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn clear_interval(&self) -> Duration {
        Duration::from_secs(self.clear_interval_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        HttpConfig {
            timeout_ms: default_timeout_ms(),
            user_agent: default_user_agent(),
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_symbols")]
    pub default_symbols: Vec<String>,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            currency: default_currency(),
            default_symbols: default_symbols(),
            cache: CacheConfig::default(),
            http: HttpConfig::default(),
            providers: ProvidersConfig::default(),
        }
    }
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_symbols() -> Vec<String> {
    DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect()
}

fn default_ttl_secs() -> u64 {
    60
}

fn default_clear_interval_secs() -> u64 {
    5 * 60
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl AppConfig {
    /// Loads the config from the default location, or built-in defaults when
    /// no config file has been created yet.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "asset-price", "asset-price")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config
            .validate()
            .with_context(|| format!("Invalid config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache.ttl_secs == 0 {
            bail!("cache.ttl_secs must be greater than zero");
        }
        if self.cache.clear_interval_secs == 0 {
            bail!("cache.clear_interval_secs must be greater than zero");
        }
        if self.http.timeout_ms == 0 {
            bail!("http.timeout_ms must be greater than zero");
        }
        if self.currency.trim().is_empty() {
            bail!("currency must not be empty");
        }
        if self.default_symbols.iter().all(|s| s.trim().is_empty()) {
            bail!("default_symbols must list at least one symbol");
        }
        Ok(())
    }
}
