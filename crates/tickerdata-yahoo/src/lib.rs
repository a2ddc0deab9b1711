#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tickerdata/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Yahoo Finance data provider.
//!
//! This crate provides a Yahoo Finance data provider that implements the
//! [`DataProvider`], [`PriceHistoryProvider`], and [`CompanyDataProvider`]
//! traits from `tickerdata-core`.
//!
//! # Features
//!
//! - Price history from Yahoo Finance's chart API, queried by range and interval
//! - Company name, summary, sector, industry and website from the quote summary API
//! - Session cookie and crumb for the quote summary API, refreshed on rejection
//! - Built-in rate limiting (1 request per second by default), also across
//!   concurrent requests
//! - Bounded request timeout (30 seconds by default)
//!
//! # Example
//!
//! ```no_run
//! use tickerdata_yahoo::YahooProvider;
//! use tickerdata_core::{PriceHistoryProvider, Symbol};
//!
//! # async fn example() -> tickerdata_core::Result<()> {
//! let provider = YahooProvider::new();
//! let symbol = Symbol::new("AAPL");
//!
//! let df = provider.fetch_history(&symbol, "3y", "1d").await?;
//! println!("Fetched {} rows", df.height());
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, TimeZone, Utc};
use polars::prelude::*;
use serde::Deserialize;
use tickerdata_core::{
    CompanyDataProvider, CompanyMetadata, DataError, DataProvider, PriceHistoryProvider, Result,
    Symbol,
};
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep_until};
use tracing::{debug, instrument, warn};

/// Yahoo Finance chart API base URL.
const CHART_API_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance quote summary API base URL.
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";

/// Sets the session cookie that the crumb is tied to.
const COOKIE_URL: &str = "https://fc.yahoo.com";

/// Returns the crumb for the current session cookie.
const CRUMB_URL: &str = "https://query1.finance.yahoo.com/v1/test/getcrumb";

/// Default rate limit delay in milliseconds.
const DEFAULT_RATE_LIMIT_MS: u64 = 1000;

/// Default HTTP request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// User agent for HTTP requests.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Days between 0001-01-01 (CE day 1) and the Unix epoch.
const UNIX_EPOCH_FROM_CE: i32 = 719_163;

const PROVIDER_NAME: &str = "Yahoo Finance";

/// Yahoo Finance data provider.
///
/// Implements [`DataProvider`], [`PriceHistoryProvider`], and [`CompanyDataProvider`].
///
/// Requests are spaced by the rate limit even when issued concurrently. The
/// quote summary endpoint needs a session cookie and crumb; both are fetched
/// on first use and refreshed once when Yahoo rejects them.
#[derive(Debug)]
pub struct YahooProvider {
    client: reqwest::Client,
    rate_limit: Duration,
    next_request_at: Mutex<Option<Instant>>,
    crumb: Mutex<Option<String>>,
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider with default settings.
    ///
    /// Uses built-in rate limiting of 1 request per second and a 30 second
    /// request timeout.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rate_limit(Duration::from_millis(DEFAULT_RATE_LIMIT_MS))
    }

    /// Create a new Yahoo Finance provider with a custom HTTP client.
    ///
    /// Uses the provided client for all HTTP requests. Rate limiting
    /// is still applied. Company data needs the client to keep cookies
    /// (`cookie_store(true)`).
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self::from_parts(client, Duration::from_millis(DEFAULT_RATE_LIMIT_MS))
    }

    fn from_parts(client: reqwest::Client, rate_limit: Duration) -> Self {
        Self {
            client,
            rate_limit,
            next_request_at: Mutex::new(None),
            crumb: Mutex::new(None),
        }
    }

    /// Create a new Yahoo Finance provider with custom rate limiting.
    #[must_use]
    pub fn with_rate_limit(rate_limit: Duration) -> Self {
        Self::with_limits(rate_limit, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a new Yahoo Finance provider with custom rate limiting and
    /// request timeout.
    #[must_use]
    pub fn with_limits(rate_limit: Duration, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .cookie_store(true)
            .build()
            .unwrap_or_else(|e| {
                warn!(error = %e, "Failed to configure HTTP client, using defaults");
                reqwest::Client::new()
            });

        Self::from_parts(client, rate_limit)
    }

    /// Waits for the next free request slot.
    ///
    /// The slot lock is held across the wait, so concurrent callers are
    /// released one rate-limit interval apart.
    async fn apply_rate_limit(&self) {
        let mut next_request_at = self.next_request_at.lock().await;
        if let Some(at) = *next_request_at {
            let wait = at.saturating_duration_since(Instant::now());
            if !wait.is_zero() {
                debug!("Rate limiting: waiting {}ms", wait.as_millis());
                sleep_until(at).await;
            }
        }
        *next_request_at = Some(Instant::now() + self.rate_limit);
    }

    /// Returns the session crumb, fetching a cookie and crumb if there is none.
    async fn crumb(&self) -> Result<String> {
        let mut crumb = self.crumb.lock().await;
        if let Some(crumb) = crumb.as_ref() {
            return Ok(crumb.clone());
        }

        debug!("Fetching Yahoo session cookie and crumb");
        self.apply_rate_limit().await;
        // Only the Set-Cookie header matters; the page itself is usually a 404.
        self.client
            .get(COOKIE_URL)
            .send()
            .await
            .map_err(|e| DataError::Network(format!("session cookie request failed: {e}")))?;

        self.apply_rate_limit().await;
        let response = self
            .client
            .get(CRUMB_URL)
            .send()
            .await
            .map_err(|e| DataError::Network(format!("crumb request failed: {e}")))?;
        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited {
                provider: PROVIDER_NAME.to_string(),
                retry_after: Some(Duration::from_secs(60)),
            });
        }
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| DataError::Network(e.to_string()))?;

        let fresh = parse_crumb(status, &body)
            .ok_or_else(|| DataError::Network(format!("no crumb issued (HTTP {status})")))?;
        *crumb = Some(fresh.clone());
        Ok(fresh)
    }

    /// Forgets the crumb so the next company data request starts a new session.
    async fn reset_crumb(&self) {
        self.crumb.lock().await.take();
    }

    /// Build the chart API URL for a symbol, range and interval.
    fn build_chart_url(&self, symbol: &Symbol, period: &str, interval: &str) -> String {
        format!(
            "{}/{}?range={}&interval={}&includeAdjustedClose=true",
            CHART_API_URL,
            symbol.as_str(),
            period,
            interval
        )
    }

    /// Build the quote summary URL for a symbol.
    fn build_quote_summary_url(&self, symbol: &Symbol) -> String {
        format!(
            "{}/{}?modules=price,assetProfile",
            QUOTE_SUMMARY_URL,
            symbol.as_str()
        )
    }

    /// Send a rate-limited request without looking at the status.
    async fn send_raw(
        &self,
        request: reqwest::RequestBuilder,
        symbol: &Symbol,
    ) -> Result<reqwest::Response> {
        self.apply_rate_limit().await;

        request.send().await.map_err(|e| {
            if e.is_timeout() {
                DataError::Network(format!("request for {symbol} timed out: {e}"))
            } else {
                DataError::Network(e.to_string())
            }
        })
    }

    /// Send a rate-limited GET request and map HTTP failures to [`DataError`].
    async fn send(&self, url: &str, symbol: &Symbol) -> Result<reqwest::Response> {
        debug!("Requesting {}", url);
        let response = self.send_raw(self.client.get(url), symbol).await?;
        check_status(response, symbol)
    }

    /// Requests the quote summary with the session crumb, starting a new
    /// session once if the crumb is rejected.
    async fn send_quote_summary(&self, symbol: &Symbol) -> Result<reqwest::Response> {
        let response = self.request_quote_summary(symbol).await?;
        if !is_auth_failure(response.status()) {
            return check_status(response, symbol);
        }

        warn!(status = %response.status(), "Quote summary rejected the crumb, refreshing session");
        self.reset_crumb().await;
        let response = self.request_quote_summary(symbol).await?;
        check_status(response, symbol)
    }

    async fn request_quote_summary(&self, symbol: &Symbol) -> Result<reqwest::Response> {
        let crumb = self.crumb().await?;
        let url = self.build_quote_summary_url(symbol);
        debug!("Requesting {}", url);
        let request = self.client.get(&url).query(&[("crumb", crumb.as_str())]);
        self.send_raw(request, symbol).await
    }

    /// Parse Yahoo Finance chart response into a DataFrame.
    fn parse_chart_response(
        &self,
        symbol: &Symbol,
        period: &str,
        interval: &str,
        response: ChartResponse,
    ) -> Result<DataFrame> {
        if let Some(error) = response.chart.error {
            if error.code == "Not Found" {
                return Err(DataError::SymbolNotFound(symbol.to_string()));
            }
            return Err(DataError::Other(format!(
                "{}: {}",
                error.code, error.description
            )));
        }

        let not_available = || DataError::DataNotAvailable {
            symbol: symbol.to_string(),
            period: period.to_string(),
            interval: interval.to_string(),
        };

        let result = response
            .chart
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| DataError::SymbolNotFound(symbol.to_string()))?;

        let timestamps = result.timestamp.unwrap_or_default();
        if timestamps.is_empty() {
            return Err(not_available());
        }

        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| DataError::Parse("Missing quote data".to_string()))?;

        let adj_close = result
            .indicators
            .adjclose
            .and_then(|ac| ac.into_iter().next())
            .map(|ac| ac.adjclose)
            .unwrap_or_default();

        // Bars are dated by their UTC trading day.
        let dates: Vec<Option<i32>> = timestamps
            .iter()
            .map(|&ts| {
                Utc.timestamp_opt(ts, 0)
                    .single()
                    .map(|dt| dt.date_naive().num_days_from_ce() - UNIX_EPOCH_FROM_CE)
            })
            .collect();

        let len = dates.len();
        let pad = |mut values: Vec<Option<f64>>| {
            values.resize(len, None);
            values
        };
        let closes = pad(quote.close);
        let volumes: Vec<Option<f64>> = pad(
            quote
                .volume
                .into_iter()
                .map(|v| v.map(|v| v as f64))
                .collect(),
        );

        // Fall back to close if adjusted close is missing or misaligned
        let adj_closes: Vec<Option<f64>> = if adj_close.len() == len {
            adj_close
        } else {
            closes.clone()
        };

        let date_col = Column::new("date".into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| DataError::Other(e.to_string()))?;

        DataFrame::new(vec![
            date_col,
            Column::new("open".into(), pad(quote.open)),
            Column::new("high".into(), pad(quote.high)),
            Column::new("low".into(), pad(quote.low)),
            Column::new("close".into(), closes),
            Column::new("volume".into(), volumes),
            Column::new("adjusted_close".into(), adj_closes),
        ])
        .map_err(|e| DataError::Other(e.to_string()))
    }

    /// Extract company metadata from a quote summary response.
    fn parse_quote_summary(&self, response: QuoteSummaryResponse) -> Result<CompanyMetadata> {
        if let Some(error) = response.quote_summary.error {
            if error.code == "Not Found" {
                return Ok(CompanyMetadata::default());
            }
            return Err(DataError::Other(format!(
                "{}: {}",
                error.code, error.description
            )));
        }

        let Some(data) = response
            .quote_summary
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
        else {
            return Ok(CompanyMetadata::default());
        };

        let price = data.price.unwrap_or_default();
        let profile = data.asset_profile.unwrap_or_default();

        Ok(CompanyMetadata {
            long_name: price.long_name,
            short_name: price.short_name,
            long_business_summary: profile.long_business_summary,
            sector: profile.sector,
            industry: profile.industry,
            website: profile.website,
        })
    }
}

/// Maps HTTP failures to [`DataError`].
fn check_status(response: reqwest::Response, symbol: &Symbol) -> Result<reqwest::Response> {
    let status = response.status();

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(DataError::RateLimited {
            provider: PROVIDER_NAME.to_string(),
            retry_after: Some(Duration::from_secs(60)),
        });
    }

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(DataError::SymbolNotFound(symbol.to_string()));
    }

    if !status.is_success() {
        return Err(DataError::Network(format!("HTTP {status} for {symbol}")));
    }

    Ok(response)
}

/// Whether Yahoo refused the session cookie or crumb.
fn is_auth_failure(status: reqwest::StatusCode) -> bool {
    matches!(
        status,
        reqwest::StatusCode::UNAUTHORIZED | reqwest::StatusCode::FORBIDDEN
    )
}

/// Extracts a crumb from the getcrumb body. Error pages come back as HTML or
/// JSON, sometimes with a 200.
fn parse_crumb(status: reqwest::StatusCode, body: &str) -> Option<String> {
    let crumb = body.trim();
    let looks_valid = !crumb.is_empty()
        && !crumb.contains(char::is_whitespace)
        && !crumb.starts_with(['<', '{']);
    (status.is_success() && looks_valid).then(|| crumb.to_string())
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl DataProvider for YahooProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn description(&self) -> &str {
        "Yahoo Finance data provider for price history and company information"
    }
}

#[async_trait]
impl PriceHistoryProvider for YahooProvider {
    #[instrument(skip(self), fields(symbol = %symbol))]
    async fn fetch_history(
        &self,
        symbol: &Symbol,
        period: &str,
        interval: &str,
    ) -> Result<DataFrame> {
        if period.trim().is_empty() || interval.trim().is_empty() {
            return Err(DataError::InvalidParameter(format!(
                "period and interval are required (got '{period}', '{interval}')"
            )));
        }

        let url = self.build_chart_url(symbol, period, interval);
        let response = self.send(&url, symbol).await?;

        let chart_response: ChartResponse = response
            .json()
            .await
            .map_err(|e| DataError::Parse(e.to_string()))?;

        self.parse_chart_response(symbol, period, interval, chart_response)
    }
}

#[async_trait]
impl CompanyDataProvider for YahooProvider {
    #[instrument(skip(self), fields(symbol = %symbol))]
    async fn fetch_metadata(&self, symbol: &Symbol) -> Result<CompanyMetadata> {
        let response = match self.send_quote_summary(symbol).await {
            Ok(response) => response,
            Err(DataError::SymbolNotFound(_)) => {
                debug!("No quote summary for symbol");
                return Ok(CompanyMetadata::default());
            }
            Err(e) => return Err(e),
        };

        let summary: QuoteSummaryResponse = response
            .json()
            .await
            .map_err(|e| DataError::Parse(e.to_string()))?;

        self.parse_quote_summary(summary)
    }
}

// ============================================================================
// Yahoo Finance API Response Types
// ============================================================================

/// Chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjClose>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<u64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    adjclose: Vec<Option<f64>>,
}

/// Quote Summary API response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummaryResult,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    result: Option<Vec<QuoteSummaryData>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryData {
    price: Option<PriceModule>,
    asset_profile: Option<AssetProfile>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    long_name: Option<String>,
    short_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetProfile {
    sector: Option<String>,
    industry: Option<String>,
    website: Option<String>,
    long_business_summary: Option<String>,
}
