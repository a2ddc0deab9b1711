//! Configuration for the [`MarketData`](crate::MarketData) caches.

use serde::{Deserialize, Serialize};
use tickerdata_core::{CacheSettings, DataError, Result};

/// Default price series cache: 100 entries for about 12 hours.
pub const DEFAULT_PRICE_CACHE: CacheSettings = CacheSettings::new(100, 43_000);

/// Default company name cache: 200 entries for one hour.
pub const DEFAULT_NAME_CACHE: CacheSettings = CacheSettings::new(200, 3_600);

/// Default company info cache: 200 entries for one hour.
pub const DEFAULT_INFO_CACHE: CacheSettings = CacheSettings::new(200, 3_600);

/// Sizing and policy for the three caches owned by [`MarketData`](crate::MarketData).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketDataConfig {
    /// Cache for price series keyed by `(symbol, period, interval)`.
    pub price_series: CacheSettings,
    /// Cache for company names keyed by symbol.
    pub company_name: CacheSettings,
    /// Cache for company info records keyed by symbol.
    pub company_info: CacheSettings,
    /// Whether an empty price series (no data, or a failed fetch) is cached.
    ///
    /// Off by default so a symbol that failed can be retried immediately.
    pub cache_empty_series: bool,
}

impl Default for MarketDataConfig {
    fn default() -> Self {
        Self {
            price_series: DEFAULT_PRICE_CACHE,
            company_name: DEFAULT_NAME_CACHE,
            company_info: DEFAULT_INFO_CACHE,
            cache_empty_series: false,
        }
    }
}

impl MarketDataConfig {
    /// Loads the configuration from environment variables.
    ///
    /// | Variable | Effect |
    /// |---|---|
    /// | `PRICE_DATA_CACHE_TTL` | price series TTL in seconds |
    /// | `PRICE_DATA_CACHE_MAX_SIZE` | price series capacity |
    /// | `COMPANY_NAME_CACHE_TTL` | company name TTL in seconds |
    /// | `COMPANY_INFO_CACHE_TTL` | company info TTL in seconds |
    /// | `CACHE_MAX_SIZE` | capacity of the name and info caches |
    /// | `CACHE_EMPTY_SERIES` | `true` to cache empty price series |
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(ttl) = parse_var(&lookup, "PRICE_DATA_CACHE_TTL")? {
            config.price_series.ttl_secs = ttl;
        }
        if let Some(size) = parse_var(&lookup, "PRICE_DATA_CACHE_MAX_SIZE")? {
            config.price_series.max_size = size;
        }
        if let Some(ttl) = parse_var(&lookup, "COMPANY_NAME_CACHE_TTL")? {
            config.company_name.ttl_secs = ttl;
        }
        if let Some(ttl) = parse_var(&lookup, "COMPANY_INFO_CACHE_TTL")? {
            config.company_info.ttl_secs = ttl;
        }
        if let Some(size) = parse_var(&lookup, "CACHE_MAX_SIZE")? {
            config.company_name.max_size = size;
            config.company_info.max_size = size;
        }
        if let Some(flag) = parse_var(&lookup, "CACHE_EMPTY_SERIES")? {
            config.cache_empty_series = flag;
        }

        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would make a cache unusable.
    pub fn validate(&self) -> Result<()> {
        self.price_series.validate("price series")?;
        self.company_name.validate("company name")?;
        self.company_info.validate("company info")
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    lookup(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| {
                DataError::InvalidParameter(format!("{key}='{raw}' is not valid: {e}"))
            })
        })
        .transpose()
}
