//! Cache sizing and expiry settings.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{DataError, Result};

/// Size bound and time-to-live for one cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Maximum number of entries held at once.
    pub max_size: usize,
    /// Seconds an entry stays live after insertion.
    pub ttl_secs: u64,
}

impl CacheSettings {
    /// Creates settings for `max_size` entries living `ttl_secs` seconds.
    #[must_use]
    pub const fn new(max_size: usize, ttl_secs: u64) -> Self {
        Self { max_size, ttl_secs }
    }

    /// The time-to-live as a [`Duration`].
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    /// Rejects settings that would make a cache unusable.
    pub fn validate(&self, label: &str) -> Result<()> {
        if self.max_size == 0 {
            return Err(DataError::InvalidParameter(format!(
                "{label} cache max_size must be greater than zero"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_conversion() {
        let settings = CacheSettings::new(100, 43_000);
        assert_eq!(settings.ttl(), Duration::from_secs(43_000));
        assert!(settings.validate("price").is_ok());
    }

    #[test]
    fn test_zero_size_rejected() {
        let err = CacheSettings::new(0, 60).validate("company name").unwrap_err();
        assert!(err.to_string().contains("company name"));
    }

    #[test]
    fn test_deserialize() {
        let settings: CacheSettings =
            serde_json::from_str(r#"{"max_size": 200, "ttl_secs": 3600}"#).unwrap();
        assert_eq!(settings, CacheSettings::new(200, 3600));
    }
}
