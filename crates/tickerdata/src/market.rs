//! Cached access to price history and company data.

use std::sync::Arc;

use futures::future::join_all;
use polars::prelude::DataFrame;
use tickerdata_cache::{CacheStats, TtlCache};
use tickerdata_core::{
    ChartView, Clock, CompanyDataProvider, CompanyInfo, DataError, PriceHistoryProvider, PriceKey,
    Result, Symbol, empty_price_frame,
};
use tracing::{debug, info, instrument};

use crate::config::MarketDataConfig;
use crate::fetch;

/// Price history and company data behind three TTL caches.
///
/// Lookups never fail: a provider error yields an empty series, the symbol
/// as the name, or a placeholder [`CompanyInfo`]. Failures are not cached, so
/// the next call for the same key asks the provider again. Symbols are
/// case-normalized, so `"aapl"` and `"AAPL"` share an entry.
///
/// `MarketData` is `Send + Sync`; wrap it in an [`Arc`] to share it between
/// tasks. Concurrent misses on one key each reach the provider and the last
/// result stored wins.
///
/// # Example
///
/// ```rust,ignore
/// use tickerdata::{MarketData, MarketDataConfig};
///
/// let market = MarketData::yahoo(MarketDataConfig::default())?;
/// let daily = market.get_price_history("aapl", "3y", "1d").await;
/// let name = market.get_company_name("AAPL").await;
/// ```
#[derive(Debug)]
pub struct MarketData {
    price_provider: Arc<dyn PriceHistoryProvider>,
    company_provider: Arc<dyn CompanyDataProvider>,
    price_cache: TtlCache<PriceKey, DataFrame>,
    name_cache: TtlCache<Symbol, String>,
    info_cache: TtlCache<Symbol, CompanyInfo>,
    cache_empty_series: bool,
}

impl MarketData {
    /// Starts building a `MarketData`.
    #[must_use]
    pub fn builder() -> MarketDataBuilder {
        MarketDataBuilder::default()
    }

    /// Creates a `MarketData` backed by Yahoo Finance for both prices and
    /// company data.
    #[cfg(feature = "yahoo")]
    pub fn yahoo(config: MarketDataConfig) -> Result<Self> {
        Self::builder()
            .provider(Arc::new(tickerdata_yahoo::YahooProvider::new()))
            .config(config)
            .build()
    }

    /// Returns the price series for `(symbol, period, interval)`.
    ///
    /// Serves from cache while the entry is younger than the price TTL.
    /// Returns an empty series when the provider has no usable data or fails.
    #[instrument(skip(self, symbol), fields(symbol = tracing::field::Empty))]
    pub async fn get_price_history(
        &self,
        symbol: impl Into<Symbol>,
        period: &str,
        interval: &str,
    ) -> DataFrame {
        let key = PriceKey::new(symbol, period, interval);
        tracing::Span::current().record("symbol", key.symbol.as_str());

        let provider = self.price_provider.as_ref();
        let cache_empty = self.cache_empty_series;
        let result = self
            .price_cache
            .get_or_try_compute(key.clone(), || async {
                match fetch::try_fetch_price_series(provider, &key.symbol, period, interval).await
                {
                    Err(e) if cache_empty => {
                        fetch::log_fetch_failure("price history", &key.symbol, &e);
                        Ok(empty_price_frame())
                    }
                    other => other,
                }
            })
            .await;

        result.unwrap_or_else(|e| {
            fetch::log_fetch_failure("price history", &key.symbol, &e);
            empty_price_frame()
        })
    }

    /// Returns the price series for one of the predefined chart views.
    pub async fn get_chart_view(&self, symbol: impl Into<Symbol>, view: ChartView) -> DataFrame {
        self.get_price_history(symbol, view.period(), view.interval())
            .await
    }

    /// Returns the company's display name, falling back to the symbol.
    ///
    /// A name derived from a successful provider response is cached even when
    /// it is only the symbol; a provider error is not.
    pub async fn get_company_name(&self, symbol: impl Into<Symbol>) -> String {
        let symbol = symbol.into();
        let provider = self.company_provider.as_ref();

        self.name_cache
            .get_or_try_compute(symbol.clone(), || {
                fetch::try_fetch_company_name(provider, &symbol)
            })
            .await
            .unwrap_or_else(|e| {
                fetch::log_fetch_failure("company name", &symbol, &e);
                symbol.to_string()
            })
    }

    /// Returns the company record, with placeholders for missing fields.
    pub async fn get_company_info(&self, symbol: impl Into<Symbol>) -> CompanyInfo {
        let symbol = symbol.into();
        let provider = self.company_provider.as_ref();

        self.info_cache
            .get_or_try_compute(symbol.clone(), || {
                fetch::try_fetch_company_info(provider, &symbol)
            })
            .await
            .unwrap_or_else(|e| {
                fetch::log_fetch_failure("company info", &symbol, &e);
                CompanyInfo::placeholder(&symbol)
            })
    }

    /// Loads the company name and all [`ChartView`]s for a symbol concurrently.
    #[instrument(skip(self, symbol))]
    pub async fn load_overview(&self, symbol: impl Into<Symbol>) -> TickerOverview {
        let symbol = symbol.into();
        let sym = &symbol;

        let views = join_all(ChartView::ALL.into_iter().map(|view| async move {
            ChartSeries {
                view,
                frame: self.get_chart_view(sym, view).await,
            }
        }));
        let (company_name, views) = futures::join!(self.get_company_name(sym), views);

        let overview = TickerOverview {
            symbol,
            company_name,
            views,
        };
        let missing = overview.missing_views();
        if missing.is_empty() {
            info!(symbol = %overview.symbol, "Loaded ticker overview");
        } else {
            info!(symbol = %overview.symbol, ?missing, "Loaded ticker overview with missing views");
        }
        overview
    }

    /// Counters for the three caches.
    pub async fn cache_stats(&self) -> MarketDataStats {
        MarketDataStats {
            price_series: self.price_cache.stats().await,
            company_name: self.name_cache.stats().await,
            company_info: self.info_cache.stats().await,
        }
    }

    /// Drops every cached entry.
    pub async fn clear_caches(&self) {
        self.price_cache.clear().await;
        self.name_cache.clear().await;
        self.info_cache.clear().await;
        debug!("Cleared all caches");
    }

    /// Drops expired entries from every cache and returns how many were removed.
    pub async fn purge_expired(&self) -> usize {
        self.price_cache.purge_expired().await
            + self.name_cache.purge_expired().await
            + self.info_cache.purge_expired().await
    }
}

/// Builder for [`MarketData`].
#[derive(Debug, Default)]
pub struct MarketDataBuilder {
    price_provider: Option<Arc<dyn PriceHistoryProvider>>,
    company_provider: Option<Arc<dyn CompanyDataProvider>>,
    config: MarketDataConfig,
    clock: Option<Arc<dyn Clock>>,
}

impl MarketDataBuilder {
    /// Sets the price history provider.
    #[must_use]
    pub fn price_provider(mut self, provider: Arc<dyn PriceHistoryProvider>) -> Self {
        debug!(provider = provider.name(), "Registering price provider");
        self.price_provider = Some(provider);
        self
    }

    /// Sets the company data provider.
    #[must_use]
    pub fn company_provider(mut self, provider: Arc<dyn CompanyDataProvider>) -> Self {
        debug!(provider = provider.name(), "Registering company provider");
        self.company_provider = Some(provider);
        self
    }

    /// Uses one provider for both prices and company data.
    #[must_use]
    pub fn provider<P>(self, provider: Arc<P>) -> Self
    where
        P: PriceHistoryProvider + CompanyDataProvider + 'static,
    {
        let price: Arc<dyn PriceHistoryProvider> = provider.clone();
        let company: Arc<dyn CompanyDataProvider> = provider;
        self.price_provider(price).company_provider(company)
    }

    /// Sets cache sizes, TTLs and the empty-series policy.
    #[must_use]
    pub fn config(mut self, config: MarketDataConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the time source for cache expiry. Defaults to the system clock.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Builds the [`MarketData`].
    ///
    /// Fails when a provider is missing or the configuration is invalid.
    pub fn build(self) -> Result<MarketData> {
        let price_provider = self.price_provider.ok_or_else(|| {
            DataError::ProviderNotConfigured("No price history provider set".to_string())
        })?;
        let company_provider = self.company_provider.ok_or_else(|| {
            DataError::ProviderNotConfigured("No company data provider set".to_string())
        })?;
        self.config.validate()?;

        let mut price_cache = TtlCache::new("price_series", self.config.price_series)?;
        let mut name_cache = TtlCache::new("company_name", self.config.company_name)?;
        let mut info_cache = TtlCache::new("company_info", self.config.company_info)?;
        if let Some(clock) = self.clock {
            price_cache = price_cache.with_clock(Arc::clone(&clock));
            name_cache = name_cache.with_clock(Arc::clone(&clock));
            info_cache = info_cache.with_clock(clock);
        }

        Ok(MarketData {
            price_provider,
            company_provider,
            price_cache,
            name_cache,
            info_cache,
            cache_empty_series: self.config.cache_empty_series,
        })
    }
}

/// One chart view and its price series.
#[derive(Clone, Debug)]
pub struct ChartSeries {
    /// Which view this is.
    pub view: ChartView,
    /// The series; empty when no data was available.
    pub frame: DataFrame,
}

/// Everything needed to render a ticker page.
#[derive(Clone, Debug)]
pub struct TickerOverview {
    /// Normalized symbol.
    pub symbol: Symbol,
    /// Display name, or the symbol when none is known.
    pub company_name: String,
    /// One entry per [`ChartView`], in [`ChartView::ALL`] order.
    pub views: Vec<ChartSeries>,
}

impl TickerOverview {
    /// The series for `view`, if it was loaded.
    #[must_use]
    pub fn series(&self, view: ChartView) -> Option<&DataFrame> {
        self.views
            .iter()
            .find(|s| s.view == view)
            .map(|s| &s.frame)
    }

    /// Views whose series came back empty.
    #[must_use]
    pub fn missing_views(&self) -> Vec<ChartView> {
        self.views
            .iter()
            .filter(|s| s.frame.height() == 0)
            .map(|s| s.view)
            .collect()
    }

    /// Whether at least one view has data.
    #[must_use]
    pub fn has_data(&self) -> bool {
        self.views.iter().any(|s| s.frame.height() > 0)
    }
}

/// Counters for each cache owned by [`MarketData`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MarketDataStats {
    /// Price series cache.
    pub price_series: CacheStats,
    /// Company name cache.
    pub company_name: CacheStats,
    /// Company info cache.
    pub company_info: CacheStats,
}
