//! Error types for data operations.
//!
//! This module defines [`DataError`] which covers all error cases that can occur
//! when fetching, validating, or caching ticker data.

use thiserror::Error;

/// Errors that can occur during data operations.
#[derive(Error, Debug)]
pub enum DataError {
    /// Network-related errors (connection failures, timeouts, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limit exceeded by a provider.
    #[error("Rate limited by {provider}: retry after {retry_after:?}")]
    RateLimited {
        /// The provider that rate limited the request.
        provider: String,
        /// Suggested time to wait before retrying.
        retry_after: Option<std::time::Duration>,
    },

    /// The requested symbol was not found.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// The provider answered but had no rows for the query.
    #[error("Data not available for {symbol} (period {period}, interval {interval})")]
    DataNotAvailable {
        /// The symbol that was requested.
        symbol: String,
        /// The requested lookback period, e.g. `3y`.
        period: String,
        /// The requested bar interval, e.g. `1d`.
        interval: String,
    },

    /// Error parsing data from a provider.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Provider data failed validation (missing columns, non-positive prices).
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Raw ticker input was rejected.
    #[error("Invalid symbol '{symbol}': {reason}")]
    InvalidSymbol {
        /// The offending input, trimmed.
        symbol: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// The requested provider is not configured.
    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

/// Result type alias using [`DataError`].
pub type Result<T> = std::result::Result<T, DataError>;
