//! Price series helpers.
//!
//! A price series is a [`DataFrame`] with a `date` column (polars `Date`) and
//! the `open`, `high`, `low`, `close` price columns, optionally followed by
//! `volume` and any extra columns a provider adds.

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;

use crate::{
    error::{DataError, Result},
    types::OhlcvBar,
};

/// Name of the date column.
pub const DATE_COLUMN: &str = "date";

/// Name of the volume column.
pub const VOLUME_COLUMN: &str = "volume";

/// Price columns every row must carry.
pub const PRICE_COLUMNS: [&str; 4] = ["open", "high", "low", "close"];

/// Days between 0001-01-01 (CE day 1) and the Unix epoch.
const UNIX_EPOCH_FROM_CE: i32 = 719_163;

/// What [`validate_price_frame`] had to do to make a frame usable.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PriceFrameReport {
    /// Rows dropped because a date or price was missing.
    pub dropped_rows: usize,
    /// Whether the rows had to be re-sorted by date.
    pub resorted: bool,
}

impl PriceFrameReport {
    /// Returns true if the frame was passed through untouched.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.dropped_rows == 0 && !self.resorted
    }
}

fn polars_err(e: PolarsError) -> DataError {
    DataError::Other(e.to_string())
}

/// Builds a price frame from bars, in the given order.
pub fn frame_from_bars(bars: &[OhlcvBar]) -> Result<DataFrame> {
    let dates: Vec<i32> = bars
        .iter()
        .map(|b| b.date.num_days_from_ce() - UNIX_EPOCH_FROM_CE)
        .collect();
    let date_col = Column::new(DATE_COLUMN.into(), dates)
        .cast(&DataType::Date)
        .map_err(polars_err)?;

    let prices = |f: fn(&OhlcvBar) -> f64| bars.iter().map(f).collect::<Vec<f64>>();
    let volumes: Vec<Option<f64>> = bars.iter().map(|b| b.volume).collect();

    DataFrame::new(vec![
        date_col,
        Column::new("open".into(), prices(|b| b.open)),
        Column::new("high".into(), prices(|b| b.high)),
        Column::new("low".into(), prices(|b| b.low)),
        Column::new("close".into(), prices(|b| b.close)),
        Column::new(VOLUME_COLUMN.into(), volumes),
    ])
    .map_err(polars_err)
}

/// An empty price frame that still carries the full schema.
#[must_use]
pub fn empty_price_frame() -> DataFrame {
    frame_from_bars(&[]).unwrap_or_else(|_| DataFrame::empty())
}

/// Returns the first required column the frame lacks, if any.
#[must_use]
pub fn missing_price_column(frame: &DataFrame) -> Option<&'static str> {
    std::iter::once(DATE_COLUMN)
        .chain(PRICE_COLUMNS)
        .find(|name| frame.column(name).is_err())
}

fn read_days(frame: &DataFrame) -> Result<Vec<Option<i32>>> {
    let column = frame
        .column(DATE_COLUMN)
        .map_err(polars_err)?
        .cast(&DataType::Date)
        .and_then(|c| c.cast(&DataType::Int32))
        .map_err(polars_err)?;
    Ok(column.i32().map_err(polars_err)?.into_iter().collect())
}

fn read_f64(frame: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    let column = frame
        .column(name)
        .map_err(polars_err)?
        .cast(&DataType::Float64)
        .map_err(polars_err)?;
    Ok(column.f64().map_err(polars_err)?.into_iter().collect())
}

/// Checks a provider frame and returns the usable part of it.
///
/// Rows whose date or any OHLC price is missing (null or NaN) are dropped.
/// A missing column, a non-positive or infinite price in a remaining row, or a
/// frame with no usable rows is a [`DataError::Validation`] failure. The result is sorted ascending by
/// date. A frame that needs none of this is returned unchanged.
pub fn validate_price_frame(frame: DataFrame) -> Result<(DataFrame, PriceFrameReport)> {
    if frame.height() == 0 {
        return Err(DataError::Validation("price frame has no rows".to_string()));
    }
    if let Some(name) = missing_price_column(&frame) {
        return Err(DataError::Validation(format!(
            "price frame is missing the '{name}' column"
        )));
    }

    let days = read_days(&frame)?;
    let mut keep: Vec<bool> = days.iter().map(Option::is_some).collect();

    let prices = PRICE_COLUMNS
        .iter()
        .map(|name| read_f64(&frame, name).map(|values| (*name, values)))
        .collect::<Result<Vec<_>>>()?;

    for (_, values) in &prices {
        for (row, value) in values.iter().enumerate() {
            if !matches!(value, Some(v) if !v.is_nan()) {
                keep[row] = false;
            }
        }
    }

    // Only rows that survive the drop are checked.
    for (name, values) in &prices {
        let bad = values
            .iter()
            .zip(&keep)
            .filter_map(|(value, kept)| if *kept { *value } else { None })
            .find(|v| !v.is_finite() || *v <= 0.0);
        if let Some(v) = bad {
            return Err(DataError::Validation(format!(
                "invalid price {v} in '{name}' column"
            )));
        }
    }

    let dropped_rows = keep.iter().filter(|k| !**k).count();
    if dropped_rows == keep.len() {
        return Err(DataError::Validation(
            "no valid rows left after dropping missing values".to_string(),
        ));
    }

    let kept_days: Vec<i32> = days
        .iter()
        .zip(&keep)
        .filter_map(|(day, kept)| if *kept { *day } else { None })
        .collect();
    let resorted = kept_days.windows(2).any(|w| w[0] > w[1]);

    let mut frame = frame;
    if dropped_rows > 0 {
        let mask = BooleanChunked::from_slice(PlSmallStr::from_static("valid"), &keep);
        frame = frame.filter(&mask).map_err(polars_err)?;
    }
    if resorted {
        frame = frame
            .sort([DATE_COLUMN], SortMultipleOptions::default())
            .map_err(polars_err)?;
    }

    Ok((
        frame,
        PriceFrameReport {
            dropped_rows,
            resorted,
        },
    ))
}

/// Reads a validated price frame back into bars.
///
/// Rows with a missing date or price are skipped; a missing `volume` column
/// yields bars without volume.
pub fn bars_from_frame(frame: &DataFrame) -> Result<Vec<OhlcvBar>> {
    if let Some(name) = missing_price_column(frame) {
        return Err(DataError::Validation(format!(
            "price frame is missing the '{name}' column"
        )));
    }

    let days = read_days(frame)?;
    let opens = read_f64(frame, "open")?;
    let highs = read_f64(frame, "high")?;
    let lows = read_f64(frame, "low")?;
    let closes = read_f64(frame, "close")?;
    let volumes = if frame.column(VOLUME_COLUMN).is_ok() {
        read_f64(frame, VOLUME_COLUMN)?
    } else {
        vec![None; frame.height()]
    };

    let bars = (0..frame.height())
        .filter_map(|row| {
            let date = NaiveDate::from_num_days_from_ce_opt(days[row]? + UNIX_EPOCH_FROM_CE)?;
            let bar = OhlcvBar::new(date, opens[row]?, highs[row]?, lows[row]?, closes[row]?);
            Some(match volumes[row] {
                Some(volume) => bar.with_volume(volume),
                None => bar,
            })
        })
        .collect();

    Ok(bars)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn sample_bars() -> Vec<OhlcvBar> {
        (2..7)
            .map(|d| {
                let base = 100.0 + f64::from(d);
                OhlcvBar::new(day(d), base, base + 2.0, base - 1.0, base + 1.0)
                    .with_volume(1_000_000.0)
            })
            .collect()
    }

    #[test]
    fn test_frame_from_bars_schema() {
        let df = frame_from_bars(&sample_bars()).unwrap();
        assert_eq!(df.height(), 5);
        assert_eq!(df.column(DATE_COLUMN).unwrap().dtype(), &DataType::Date);
        assert!(missing_price_column(&df).is_none());
        assert_eq!(bars_from_frame(&df).unwrap(), sample_bars());
    }

    #[test]
    fn test_empty_frame_keeps_columns() {
        let df = empty_price_frame();
        assert_eq!(df.height(), 0);
        assert!(missing_price_column(&df).is_none());
        assert!(df.column(VOLUME_COLUMN).is_ok());
    }

    #[test]
    fn test_clean_frame_passes_unchanged() {
        let df = frame_from_bars(&sample_bars()).unwrap();
        let (validated, report) = validate_price_frame(df.clone()).unwrap();
        assert!(report.is_clean());
        assert!(validated.equals(&df));
    }

    #[test]
    fn test_rejects_empty_and_missing_columns() {
        assert!(matches!(
            validate_price_frame(empty_price_frame()),
            Err(DataError::Validation(_))
        ));

        let df = frame_from_bars(&sample_bars()).unwrap().drop("close").unwrap();
        assert_eq!(missing_price_column(&df), Some("close"));
        assert!(matches!(
            validate_price_frame(df),
            Err(DataError::Validation(msg)) if msg.contains("close")
        ));
    }

    #[test]
    fn test_rejects_non_positive_prices() {
        let mut bars = sample_bars();
        bars[3].low = 0.0;
        let df = frame_from_bars(&bars).unwrap();
        assert!(matches!(
            validate_price_frame(df),
            Err(DataError::Validation(msg)) if msg.contains("low")
        ));
    }

    #[test]
    fn test_rejects_infinite_prices() {
        let mut bars = sample_bars();
        bars[0].open = f64::INFINITY;
        assert!(!bars[0].has_positive_prices());
        let df = frame_from_bars(&bars).unwrap();
        assert!(matches!(
            validate_price_frame(df),
            Err(DataError::Validation(msg)) if msg.contains("open")
        ));
    }

    #[test]
    fn test_dropped_row_is_not_price_checked() {
        let df = DataFrame::new(vec![
            Column::new(DATE_COLUMN.into(), vec![19_724i32, 19_725])
                .cast(&DataType::Date)
                .unwrap(),
            Column::new("open".into(), vec![Some(10.0), Some(0.0)]),
            Column::new("high".into(), vec![Some(11.0), Some(11.0)]),
            Column::new("low".into(), vec![Some(9.0), Some(9.0)]),
            Column::new("close".into(), vec![Some(10.5), None]),
        ])
        .unwrap();

        let (validated, report) = validate_price_frame(df).unwrap();
        assert_eq!(report.dropped_rows, 1);
        assert_eq!(validated.height(), 1);
        assert_eq!(bars_from_frame(&validated).unwrap()[0].open, 10.0);
    }

    #[test]
    fn test_drops_rows_with_missing_prices() {
        let mut bars = sample_bars();
        bars[1].close = f64::NAN;
        let df = frame_from_bars(&bars).unwrap();

        let (validated, report) = validate_price_frame(df).unwrap();
        assert_eq!(report.dropped_rows, 1);
        assert_eq!(validated.height(), 4);
        let dates: Vec<NaiveDate> = bars_from_frame(&validated)
            .unwrap()
            .into_iter()
            .map(|b| b.date)
            .collect();
        assert_eq!(dates, vec![day(2), day(4), day(5), day(6)]);
    }

    #[test]
    fn test_all_rows_missing_is_failure() {
        let df = DataFrame::new(vec![
            Column::new(DATE_COLUMN.into(), vec![19_724i32])
                .cast(&DataType::Date)
                .unwrap(),
            Column::new("open".into(), vec![None::<f64>]),
            Column::new("high".into(), vec![Some(2.0)]),
            Column::new("low".into(), vec![Some(1.0)]),
            Column::new("close".into(), vec![Some(1.5)]),
        ])
        .unwrap();
        assert!(validate_price_frame(df).is_err());
    }

    #[test]
    fn test_sorts_by_date() {
        let mut bars = sample_bars();
        bars.reverse();
        let df = frame_from_bars(&bars).unwrap();

        let (validated, report) = validate_price_frame(df).unwrap();
        assert!(report.resorted);
        assert_eq!(report.dropped_rows, 0);
        assert_eq!(bars_from_frame(&validated).unwrap(), sample_bars());
    }
}
