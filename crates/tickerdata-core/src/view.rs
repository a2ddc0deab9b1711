//! Chart views and their provider query parameters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the candlestick views drawn for a ticker.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChartView {
    /// Daily bars over the last three years.
    Daily,
    /// Weekly bars over the last five years.
    Weekly,
    /// Monthly bars over the last ten years.
    Monthly,
}

impl ChartView {
    /// All views, in display order.
    pub const ALL: [Self; 3] = [Self::Daily, Self::Weekly, Self::Monthly];

    /// Lookback period passed to the provider.
    #[must_use]
    pub const fn period(&self) -> &'static str {
        match self {
            Self::Daily => "3y",
            Self::Weekly => "5y",
            Self::Monthly => "10y",
        }
    }

    /// Bar interval passed to the provider.
    #[must_use]
    pub const fn interval(&self) -> &'static str {
        match self {
            Self::Daily => "1d",
            Self::Weekly => "1wk",
            Self::Monthly => "1mo",
        }
    }
}

impl fmt::Display for ChartView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_view_parameters() {
        assert_eq!(ChartView::Daily.period(), "3y");
        assert_eq!(ChartView::Weekly.interval(), "1wk");
        assert_eq!(ChartView::Monthly.period(), "10y");
        assert_eq!(ChartView::Monthly.interval(), "1mo");
        assert_eq!(ChartView::ALL.len(), 3);
    }

    #[test]
    fn test_view_serde_names() {
        assert_eq!(serde_json::to_string(&ChartView::Weekly).unwrap(), "\"weekly\"");
        assert_eq!(ChartView::Daily.to_string(), "daily");
    }
}
