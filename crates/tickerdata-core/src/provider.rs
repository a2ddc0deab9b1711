//! Provider traits for fetching market data.
//!
//! This module defines the core provider traits:
//!
//! - [`DataProvider`] - Base trait for all data providers
//! - [`PriceHistoryProvider`] - OHLC price history by period and interval
//! - [`CompanyDataProvider`] - Descriptive company metadata

use async_trait::async_trait;
use polars::prelude::DataFrame;
use std::fmt::Debug;

use crate::{
    error::Result,
    types::{CompanyMetadata, Symbol},
};

/// Base trait for all data providers.
pub trait DataProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "Yahoo Finance").
    fn name(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;
}

/// Provider for historical OHLC price data.
#[async_trait]
pub trait PriceHistoryProvider: DataProvider {
    /// Fetches price history for a symbol.
    ///
    /// `period` (e.g. `3y`) and `interval` (e.g. `1d`) are passed through as
    /// the provider understands them. Returns a DataFrame with columns: date,
    /// open, high, low, close, volume. The frame may be empty.
    async fn fetch_history(&self, symbol: &Symbol, period: &str, interval: &str)
    -> Result<DataFrame>;
}

/// Provider for descriptive company metadata.
#[async_trait]
pub trait CompanyDataProvider: DataProvider {
    /// Fetches name, summary, sector, industry and website for a symbol.
    ///
    /// A provider that knows nothing about the symbol returns an empty
    /// [`CompanyMetadata`] rather than an error.
    async fn fetch_metadata(&self, symbol: &Symbol) -> Result<CompanyMetadata>;
}
