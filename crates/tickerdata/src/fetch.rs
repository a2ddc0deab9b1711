//! Fetch functions: call a provider, validate what comes back, and fall back
//! to a safe value instead of failing.
//!
//! Each `fetch_*` function has a `try_fetch_*` twin that reports the failure
//! instead. [`MarketData`](crate::MarketData) caches through the `try_` forms
//! so that failures are never stored.

use polars::prelude::DataFrame;
use tickerdata_core::{
    CompanyDataProvider, CompanyInfo, DataError, PriceHistoryProvider, Result, Symbol,
    empty_price_frame, validate_price_frame,
};
use tracing::{error, info, instrument, warn};

/// Logs a failed lookup at a level matching how surprising it is.
///
/// "No data" outcomes are warnings; anything else (network, parse, rate
/// limit) is an error.
pub(crate) fn log_fetch_failure(what: &str, symbol: &Symbol, err: &DataError) {
    match err {
        DataError::DataNotAvailable { .. }
        | DataError::SymbolNotFound(_)
        | DataError::Validation(_) => {
            warn!(%symbol, error = %err, "No usable {what}, using fallback");
        }
        _ => error!(%symbol, error = %err, "Failed to fetch {what}, using fallback"),
    }
}

/// Fetches and validates a price series, reporting any failure.
///
/// An empty provider response is [`DataError::DataNotAvailable`]; a frame that
/// fails [`validate_price_frame`] is [`DataError::Validation`].
#[instrument(skip(provider), fields(provider = provider.name()))]
pub async fn try_fetch_price_series(
    provider: &dyn PriceHistoryProvider,
    symbol: &Symbol,
    period: &str,
    interval: &str,
) -> Result<DataFrame> {
    let frame = provider.fetch_history(symbol, period, interval).await?;
    if frame.height() == 0 {
        return Err(DataError::DataNotAvailable {
            symbol: symbol.to_string(),
            period: period.to_string(),
            interval: interval.to_string(),
        });
    }

    let (frame, report) = validate_price_frame(frame)?;
    if report.dropped_rows > 0 {
        warn!(
            dropped = report.dropped_rows,
            "Dropped price rows with missing values"
        );
    }
    info!(rows = frame.height(), "Fetched price history");
    Ok(frame)
}

/// Fetches a price series, returning an empty series when there is no usable
/// data or the provider fails.
pub async fn fetch_price_series(
    provider: &dyn PriceHistoryProvider,
    symbol: &Symbol,
    period: &str,
    interval: &str,
) -> DataFrame {
    try_fetch_price_series(provider, symbol, period, interval)
        .await
        .unwrap_or_else(|e| {
            log_fetch_failure("price history", symbol, &e);
            empty_price_frame()
        })
}

/// Fetches the display name: long name, then short name, then the symbol.
/// Only a provider failure is an error.
#[instrument(skip(provider), fields(provider = provider.name()))]
pub async fn try_fetch_company_name(
    provider: &dyn CompanyDataProvider,
    symbol: &Symbol,
) -> Result<String> {
    let metadata = provider.fetch_metadata(symbol).await?;
    let name = metadata.display_name(symbol);

    if name == symbol.as_str() {
        warn!("Provider has no company name, using the symbol");
    } else {
        info!(%name, "Fetched company name");
    }
    Ok(name)
}

/// Fetches the display name, falling back to the symbol itself.
pub async fn fetch_company_name(provider: &dyn CompanyDataProvider, symbol: &Symbol) -> String {
    try_fetch_company_name(provider, symbol)
        .await
        .unwrap_or_else(|e| {
            log_fetch_failure("company name", symbol, &e);
            symbol.to_string()
        })
}

/// Fetches the company record with placeholders for missing fields. Only a
/// provider failure is an error.
#[instrument(skip(provider), fields(provider = provider.name()))]
pub async fn try_fetch_company_info(
    provider: &dyn CompanyDataProvider,
    symbol: &Symbol,
) -> Result<CompanyInfo> {
    let metadata = provider.fetch_metadata(symbol).await?;

    if metadata.is_empty() {
        warn!("Provider returned no company metadata, using placeholders");
        return Ok(CompanyInfo::placeholder(symbol));
    }

    let info = CompanyInfo::from_metadata(symbol, &metadata);
    info!(name = %info.name, sector = %info.sector, "Fetched company info");
    Ok(info)
}

/// Fetches the company record, falling back to
/// [`CompanyInfo::placeholder`] when the provider fails.
pub async fn fetch_company_info(provider: &dyn CompanyDataProvider, symbol: &Symbol) -> CompanyInfo {
    try_fetch_company_info(provider, symbol)
        .await
        .unwrap_or_else(|e| {
            log_fetch_failure("company info", symbol, &e);
            CompanyInfo::placeholder(symbol)
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockProvider, sample_frame};
    use tickerdata_core::{CompanyMetadata, OhlcvBar, frame_from_bars};

    #[tokio::test]
    async fn test_price_series_passthrough() {
        let frame = sample_frame(5);
        let provider = MockProvider::new().with_history("AAPL", "1d", frame.clone());

        let result = fetch_price_series(&provider, &Symbol::new("AAPL"), "3y", "1d").await;
        assert!(result.equals(&frame));
        assert_eq!(provider.history_calls(), 1);
    }

    #[tokio::test]
    async fn test_price_series_provider_error_is_empty() {
        let provider = MockProvider::new().failing("BADCO");

        let result = fetch_price_series(&provider, &Symbol::new("BADCO"), "3y", "1d").await;
        assert_eq!(result.height(), 0);
        assert!(result.column("close").is_ok());

        let err = try_fetch_price_series(&provider, &Symbol::new("BADCO"), "3y", "1d")
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Network(_)));
    }

    #[tokio::test]
    async fn test_price_series_no_rows_is_not_available() {
        let provider = MockProvider::new();

        let err = try_fetch_price_series(&provider, &Symbol::new("NODATA"), "10y", "1mo")
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::DataNotAvailable { ref period, .. } if period == "10y"));
        assert_eq!(
            fetch_price_series(&provider, &Symbol::new("NODATA"), "10y", "1mo")
                .await
                .height(),
            0
        );
    }

    #[tokio::test]
    async fn test_price_series_invalid_prices_is_empty() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let frame = frame_from_bars(&[OhlcvBar::new(date, 10.0, 11.0, -1.0, 10.5)]).unwrap();
        let provider = MockProvider::new().with_history("BAD", "1d", frame);

        assert!(matches!(
            try_fetch_price_series(&provider, &Symbol::new("BAD"), "3y", "1d").await,
            Err(DataError::Validation(_))
        ));
        assert_eq!(
            fetch_price_series(&provider, &Symbol::new("BAD"), "3y", "1d")
                .await
                .height(),
            0
        );
    }

    #[tokio::test]
    async fn test_price_series_missing_column_is_empty() {
        let frame = sample_frame(3).drop("high").unwrap();
        let provider = MockProvider::new().with_history("AAPL", "1d", frame);

        let result = fetch_price_series(&provider, &Symbol::new("AAPL"), "3y", "1d").await;
        assert_eq!(result.height(), 0);
    }

    #[tokio::test]
    async fn test_company_name_fallbacks() {
        let provider = MockProvider::new()
            .with_metadata(
                "AAPL",
                CompanyMetadata {
                    long_name: Some("Apple Inc.".to_string()),
                    short_name: Some("Apple".to_string()),
                    ..Default::default()
                },
            )
            .with_metadata(
                "SHRT",
                CompanyMetadata {
                    short_name: Some("Short Only Corp".to_string()),
                    ..Default::default()
                },
            )
            .failing("DOWN");

        assert_eq!(
            fetch_company_name(&provider, &Symbol::new("AAPL")).await,
            "Apple Inc."
        );
        assert_eq!(
            fetch_company_name(&provider, &Symbol::new("SHRT")).await,
            "Short Only Corp"
        );
        assert_eq!(fetch_company_name(&provider, &Symbol::new("NONE")).await, "NONE");
        assert_eq!(fetch_company_name(&provider, &Symbol::new("DOWN")).await, "DOWN");
    }

    #[tokio::test]
    async fn test_company_info_placeholders() {
        let provider = MockProvider::new().failing("DOWN");

        let info = fetch_company_info(&provider, &Symbol::new("XYZ")).await;
        assert_eq!(info, CompanyInfo::placeholder(&Symbol::new("XYZ")));
        assert_eq!(info.name, "XYZ");

        let info = fetch_company_info(&provider, &Symbol::new("DOWN")).await;
        assert!(info.is_placeholder());
        assert!(try_fetch_company_info(&provider, &Symbol::new("DOWN")).await.is_err());
    }

    #[tokio::test]
    async fn test_company_info_from_provider() {
        let provider = MockProvider::new().with_metadata(
            "AAPL",
            CompanyMetadata {
                long_name: Some("Apple Inc.".to_string()),
                long_business_summary: Some("Designs smartphones.".to_string()),
                sector: Some("Technology".to_string()),
                ..Default::default()
            },
        );

        let info = fetch_company_info(&provider, &Symbol::new("AAPL")).await;
        assert_eq!(info.name, "Apple Inc.");
        assert_eq!(info.description, "Designs smartphones.");
        assert_eq!(info.sector, "Technology");
        assert_eq!(info.industry, tickerdata_core::types::UNKNOWN_PLACEHOLDER);
        assert_eq!(info.website, None);
    }
}
