//! Core data types for ticker data.
//!
//! This module defines the fundamental data structures:
//!
//! - [`Symbol`] - Trading symbol/ticker
//! - [`OhlcvBar`] - One row of a price series
//! - [`PriceKey`] - Cache key for a price series query
//! - [`CompanyMetadata`] - Raw descriptive fields returned by a provider
//! - [`CompanyInfo`] - Normalized company record with placeholders filled in

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{DataError, Result};

/// Longest ticker accepted by [`Symbol::parse`].
pub const SYMBOL_MAX_LEN: usize = 12;

/// Description used when a provider has no business summary.
pub const DESCRIPTION_PLACEHOLDER: &str = "No description available";

/// Sector/industry value used when a provider has none.
pub const UNKNOWN_PLACEHOLDER: &str = "Unknown";

/// A trading symbol/ticker.
///
/// Symbols are automatically uppercased on creation, so `"aapl"` and `"AAPL"`
/// compare and hash equal.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().to_uppercase())
    }

    /// Validates raw user input and returns the normalized symbol.
    ///
    /// The input is trimmed, must be 1 to [`SYMBOL_MAX_LEN`] characters long
    /// and may only contain ASCII letters, digits, `.`, `-` and `^`.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let reject = |reason: &str| DataError::InvalidSymbol {
            symbol: trimmed.to_string(),
            reason: reason.to_string(),
        };

        if trimmed.is_empty() {
            return Err(reject("symbol is empty"));
        }
        if let Some(c) = trimmed
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '^')))
        {
            return Err(reject(&format!("character '{c}' is not allowed")));
        }
        if trimmed.len() > SYMBOL_MAX_LEN {
            return Err(reject(&format!(
                "must be at most {SYMBOL_MAX_LEN} characters"
            )));
        }

        Ok(Self::new(trimmed))
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&Symbol> for Symbol {
    fn from(s: &Symbol) -> Self {
        s.clone()
    }
}

/// One bar of a price series.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OhlcvBar {
    /// Trading date of the bar (start of the week/month for coarser intervals).
    pub date: NaiveDate,
    /// Opening price.
    pub open: f64,
    /// Highest price during the period.
    pub high: f64,
    /// Lowest price during the period.
    pub low: f64,
    /// Closing price.
    pub close: f64,
    /// Trading volume, when the provider reports it.
    pub volume: Option<f64>,
}

impl OhlcvBar {
    /// Creates a new bar without volume.
    #[must_use]
    pub const fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume: None,
        }
    }

    /// Sets the traded volume.
    #[must_use]
    pub const fn with_volume(mut self, volume: f64) -> Self {
        self.volume = Some(volume);
        self
    }

    /// Returns true if all four prices are finite and strictly positive.
    #[must_use]
    pub fn has_positive_prices(&self) -> bool {
        [self.open, self.high, self.low, self.close]
            .iter()
            .all(|p| p.is_finite() && *p > 0.0)
    }
}

/// Cache key for a price series query.
///
/// The symbol is case-normalized through [`Symbol`]; period and interval are
/// kept verbatim since their meaning belongs to the provider.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PriceKey {
    /// Upper-cased ticker.
    pub symbol: Symbol,
    /// Lookback period, e.g. `3y`.
    pub period: String,
    /// Bar interval, e.g. `1d`.
    pub interval: String,
}

impl PriceKey {
    /// Builds the key for a `(symbol, period, interval)` query.
    #[must_use]
    pub fn new(
        symbol: impl Into<Symbol>,
        period: impl Into<String>,
        interval: impl Into<String>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            period: period.into(),
            interval: interval.into(),
        }
    }
}

impl fmt::Display for PriceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.symbol, self.period, self.interval)
    }
}

/// Descriptive fields as returned by a provider. Every field is optional.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CompanyMetadata {
    /// Full legal name, e.g. "Apple Inc.".
    pub long_name: Option<String>,
    /// Short display name.
    pub short_name: Option<String>,
    /// Free-text business summary.
    pub long_business_summary: Option<String>,
    /// Business sector.
    pub sector: Option<String>,
    /// Industry within the sector.
    pub industry: Option<String>,
    /// Company website.
    pub website: Option<String>,
}

impl CompanyMetadata {
    /// Returns true if the provider supplied no usable field at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        [
            &self.long_name,
            &self.short_name,
            &self.long_business_summary,
            &self.sector,
            &self.industry,
            &self.website,
        ]
        .iter()
        .all(|field| non_blank(field).is_none())
    }

    /// Resolves the display name: long name, then short name, then the symbol.
    #[must_use]
    pub fn display_name(&self, symbol: &Symbol) -> String {
        non_blank(&self.long_name)
            .or_else(|| non_blank(&self.short_name))
            .map_or_else(|| symbol.to_string(), str::to_string)
    }
}

/// Normalized company record. Never partially empty: missing fields carry
/// placeholders so callers can always render it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInfo {
    /// Stock symbol.
    pub symbol: Symbol,
    /// Company name, or the symbol when the provider has none.
    pub name: String,
    /// Business description or [`DESCRIPTION_PLACEHOLDER`].
    pub description: String,
    /// Business sector or [`UNKNOWN_PLACEHOLDER`].
    pub sector: String,
    /// Industry or [`UNKNOWN_PLACEHOLDER`].
    pub industry: String,
    /// Company website.
    pub website: Option<String>,
}

impl CompanyInfo {
    /// The record returned when nothing is known about `symbol`.
    #[must_use]
    pub fn placeholder(symbol: &Symbol) -> Self {
        Self {
            symbol: symbol.clone(),
            name: symbol.to_string(),
            description: DESCRIPTION_PLACEHOLDER.to_string(),
            sector: UNKNOWN_PLACEHOLDER.to_string(),
            industry: UNKNOWN_PLACEHOLDER.to_string(),
            website: None,
        }
    }

    /// Builds a record from provider metadata, filling the gaps.
    #[must_use]
    pub fn from_metadata(symbol: &Symbol, metadata: &CompanyMetadata) -> Self {
        let or_placeholder = |field: &Option<String>, placeholder: &str| {
            non_blank(field).unwrap_or(placeholder).to_string()
        };

        Self {
            symbol: symbol.clone(),
            name: metadata.display_name(symbol),
            description: or_placeholder(&metadata.long_business_summary, DESCRIPTION_PLACEHOLDER),
            sector: or_placeholder(&metadata.sector, UNKNOWN_PLACEHOLDER),
            industry: or_placeholder(&metadata.industry, UNKNOWN_PLACEHOLDER),
            website: non_blank(&metadata.website).map(str::to_string),
        }
    }

    /// Returns true if every descriptive field is still a placeholder.
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        *self == Self::placeholder(&self.symbol)
    }
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_uppercases() {
        assert_eq!(Symbol::new("aapl"), Symbol::new("AAPL"));
        assert_eq!(Symbol::from("brk.b").as_str(), "BRK.B");
    }

    #[test]
    fn test_symbol_parse_accepts_common_tickers() {
        for raw in ["aapl", "  MSFT ", "BRK-B", "^GSPC", "TEVA.TA", "123456789012"] {
            let symbol = Symbol::parse(raw).unwrap();
            assert_eq!(symbol.as_str(), raw.trim().to_uppercase());
        }
    }

    #[test]
    fn test_symbol_parse_rejects_bad_input() {
        assert!(matches!(
            Symbol::parse("   "),
            Err(DataError::InvalidSymbol { .. })
        ));
        assert!(Symbol::parse("AAPL;DROP").is_err());
        assert!(Symbol::parse("<script>").is_err());
        assert!(Symbol::parse("ABCDEFGHIJKLM").is_err());
        assert!(Symbol::parse("ÄPPLE").is_err());
    }

    #[test]
    fn test_price_key_normalizes_symbol_only() {
        assert_eq!(
            PriceKey::new("aapl", "3y", "1d"),
            PriceKey::new("AAPL", "3y", "1d")
        );
        assert_ne!(
            PriceKey::new("AAPL", "3y", "1d"),
            PriceKey::new("AAPL", "3Y", "1d")
        );
        assert_eq!(PriceKey::new("msft", "5y", "1wk").to_string(), "MSFT:5y:1wk");
    }

    #[test]
    fn test_bar_price_check() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        assert!(OhlcvBar::new(date, 1.0, 2.0, 0.5, 1.5).has_positive_prices());
        assert!(!OhlcvBar::new(date, 1.0, 2.0, 0.0, 1.5).has_positive_prices());
        assert!(!OhlcvBar::new(date, f64::NAN, 2.0, 0.5, 1.5).has_positive_prices());
    }

    #[test]
    fn test_display_name_fallback_chain() {
        let symbol = Symbol::new("XYZ");
        let mut metadata = CompanyMetadata {
            long_name: Some("Xyz Holdings Inc.".to_string()),
            short_name: Some("Xyz".to_string()),
            ..Default::default()
        };
        assert_eq!(metadata.display_name(&symbol), "Xyz Holdings Inc.");

        metadata.long_name = Some("  ".to_string());
        assert_eq!(metadata.display_name(&symbol), "Xyz");

        metadata.short_name = None;
        assert_eq!(metadata.display_name(&symbol), "XYZ");
    }

    #[test]
    fn test_company_info_from_empty_metadata_is_placeholder() {
        let symbol = Symbol::new("XYZ");
        let metadata: CompanyMetadata = serde_json::from_str("{}").unwrap();

        assert!(metadata.is_empty());
        let info = CompanyInfo::from_metadata(&symbol, &metadata);
        assert_eq!(info, CompanyInfo::placeholder(&symbol));
        assert_eq!(info.name, "XYZ");
        assert_eq!(info.description, DESCRIPTION_PLACEHOLDER);
        assert_eq!(info.sector, UNKNOWN_PLACEHOLDER);
        assert!(info.is_placeholder());
    }

    #[test]
    fn test_company_info_from_metadata() {
        let symbol = Symbol::new("AAPL");
        let metadata: CompanyMetadata = serde_json::from_str(
            r#"{"longName":"Apple Inc.","sector":"Technology","industry":"Consumer Electronics","website":"https://www.apple.com"}"#,
        )
        .unwrap();

        let info = CompanyInfo::from_metadata(&symbol, &metadata);
        assert_eq!(info.name, "Apple Inc.");
        assert_eq!(info.sector, "Technology");
        assert_eq!(info.description, DESCRIPTION_PLACEHOLDER);
        assert_eq!(info.website.as_deref(), Some("https://www.apple.com"));
        assert!(!info.is_placeholder());
    }
}
