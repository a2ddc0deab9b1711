//! In-memory provider used by the unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use polars::prelude::DataFrame;
use tickerdata_core::{
    CompanyDataProvider, CompanyMetadata, DataError, DataProvider, OhlcvBar, PriceHistoryProvider,
    Result, Symbol, empty_price_frame, frame_from_bars,
};

/// Builds a clean daily frame with `rows` ascending bars.
pub(crate) fn sample_frame(rows: usize) -> DataFrame {
    let start = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    let bars: Vec<OhlcvBar> = (0..rows)
        .map(|i| {
            let base = 100.0 + i as f64;
            OhlcvBar::new(
                start + Duration::days(i as i64),
                base,
                base + 2.0,
                base - 1.0,
                base + 1.0,
            )
            .with_volume(1_000_000.0)
        })
        .collect();
    frame_from_bars(&bars).unwrap()
}

/// Serves canned frames keyed by `(symbol, interval)` and canned metadata
/// keyed by symbol. Symbols marked failing return a network error.
#[derive(Debug, Default)]
pub(crate) struct MockProvider {
    history: HashMap<(String, String), DataFrame>,
    metadata: HashMap<String, CompanyMetadata>,
    failing: HashSet<String>,
    history_calls: AtomicUsize,
    metadata_calls: AtomicUsize,
}

impl MockProvider {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_history(mut self, symbol: &str, interval: &str, frame: DataFrame) -> Self {
        self.history
            .insert((symbol.to_string(), interval.to_string()), frame);
        self
    }

    pub(crate) fn with_metadata(mut self, symbol: &str, metadata: CompanyMetadata) -> Self {
        self.metadata.insert(symbol.to_string(), metadata);
        self
    }

    pub(crate) fn failing(mut self, symbol: &str) -> Self {
        self.failing.insert(symbol.to_string());
        self
    }

    pub(crate) fn history_calls(&self) -> usize {
        self.history_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn metadata_calls(&self) -> usize {
        self.metadata_calls.load(Ordering::SeqCst)
    }
}

impl DataProvider for MockProvider {
    fn name(&self) -> &str {
        "Mock"
    }

    fn description(&self) -> &str {
        "In-memory test provider"
    }
}

#[async_trait]
impl PriceHistoryProvider for MockProvider {
    async fn fetch_history(
        &self,
        symbol: &Symbol,
        _period: &str,
        interval: &str,
    ) -> Result<DataFrame> {
        self.history_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(symbol.as_str()) {
            return Err(DataError::Network("connection refused".to_string()));
        }
        Ok(self
            .history
            .get(&(symbol.to_string(), interval.to_string()))
            .cloned()
            .unwrap_or_else(empty_price_frame))
    }
}

#[async_trait]
impl CompanyDataProvider for MockProvider {
    async fn fetch_metadata(&self, symbol: &Symbol) -> Result<CompanyMetadata> {
        self.metadata_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(symbol.as_str()) {
            return Err(DataError::Network("connection refused".to_string()));
        }
        Ok(self
            .metadata
            .get(symbol.as_str())
            .cloned()
            .unwrap_or_default())
    }
}
