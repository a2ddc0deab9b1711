#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/tickerdata/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for cached ticker data.
//!
//! This crate provides the foundational abstractions:
//!
//! - [`PriceHistoryProvider`](provider::PriceHistoryProvider) - OHLC price history
//! - [`CompanyDataProvider`](provider::CompanyDataProvider) - Company metadata
//! - [`Clock`](clock::Clock) - Time source used for cache expiry
//! - [`validate_price_frame`](series::validate_price_frame) - Price table checks

/// Time sources for cache expiry.
pub mod clock;
/// Cache size and TTL settings.
pub mod config;
/// Error types for data operations.
pub mod error;
/// Provider traits for fetching market data.
pub mod provider;
/// Price series DataFrame helpers and validation.
pub mod series;
/// Core data types (Symbol, OhlcvBar, CompanyInfo, etc.).
pub mod types;
/// Chart view definitions.
pub mod view;

// Re-export commonly used items at crate root
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::CacheSettings;
pub use error::{DataError, Result};
pub use provider::{CompanyDataProvider, DataProvider, PriceHistoryProvider};
pub use series::{
    PriceFrameReport, bars_from_frame, empty_price_frame, frame_from_bars, validate_price_frame,
};
pub use types::{CompanyInfo, CompanyMetadata, OhlcvBar, PriceKey, Symbol};
pub use view::ChartView;
