#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tickerdata/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Cached price history and company data for ticker charts.
//!
//! This crate re-exports the core types and the bundled provider, and adds
//! [`MarketData`]: three TTL caches in front of a price provider and a company
//! data provider, with lookups that fall back to safe values instead of
//! failing.
//!
//! # Features
//!
//! - `yahoo` (default) - Yahoo Finance provider and [`MarketData::yahoo`]
//!
//! # Example
//!
//! ```rust,ignore
//! use tickerdata::{ChartView, MarketData, MarketDataConfig};
//!
//! #[tokio::main]
//! async fn main() -> tickerdata::Result<()> {
//!     let market = MarketData::yahoo(MarketDataConfig::from_env()?)?;
//!
//!     let overview = market.load_overview("msft").await;
//!     println!("{} ({})", overview.company_name, overview.symbol);
//!     for view in overview.missing_views() {
//!         println!("no {view} data");
//!     }
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use tickerdata_core::*;

// Cache
pub use tickerdata_cache::{CacheStats, TtlCache};

// Providers
#[cfg(feature = "yahoo")]
pub use tickerdata_yahoo::YahooProvider;

mod config;
pub use config::{DEFAULT_INFO_CACHE, DEFAULT_NAME_CACHE, DEFAULT_PRICE_CACHE, MarketDataConfig};

pub mod fetch;
pub use fetch::{fetch_company_info, fetch_company_name, fetch_price_series};

mod market;
pub use market::{ChartSeries, MarketData, MarketDataBuilder, MarketDataStats, TickerOverview};

#[cfg(test)]
mod testing;
