use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::ForecastError;

/// Calendar date with no time-of-day and no timezone.
///
/// Every series in the pipeline is keyed by this type, so the normalizer and the
/// reconciler cannot disagree on what "the same day" means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NormalizedDate(NaiveDate);

impl NormalizedDate {
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Wall-clock calendar date of `ts` in its own offset. The offset and the
    /// time of day are dropped.
    pub fn from_timestamp<Tz: TimeZone>(ts: &DateTime<Tz>) -> Self {
        Self(ts.date_naive())
    }

    /// Parse a `YYYY-MM-DD` string.
    pub fn parse(input: &str) -> Result<Self, ForecastError> {
        NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|e| ForecastError::InvalidRequest(format!("invalid date '{}': {}", input, e)))
    }

    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }

    pub fn succ(&self) -> Option<Self> {
        self.0.succ_opt().map(Self)
    }

    pub fn add_days(&self, days: u32) -> Option<Self> {
        self.0.checked_add_days(Days::new(days as u64)).map(Self)
    }

    /// Signed number of days from `earlier` to `self`.
    pub fn days_since(&self, earlier: NormalizedDate) -> i64 {
        (self.0 - earlier.0).num_days()
    }

    /// Midnight UTC on this date.
    pub fn midnight_utc(&self) -> DateTime<FixedOffset> {
        self.0.and_time(NaiveTime::MIN).and_utc().fixed_offset()
    }
}

impl From<NaiveDate> for NormalizedDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

impl fmt::Display for NormalizedDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

/// The instrument and date range one pipeline run is about.
///
/// Also the fingerprint used to deduplicate concurrent runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstrumentSpec {
    pub symbol: String,
    pub quote_currency: String,
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
}

impl InstrumentSpec {
    pub fn new(
        symbol: impl AsRef<str>,
        quote_currency: impl AsRef<str>,
        range_start: NaiveDate,
        range_end: NaiveDate,
    ) -> Result<Self, ForecastError> {
        let symbol = symbol.as_ref().trim().to_ascii_uppercase();
        if symbol.is_empty() || !symbol.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ForecastError::InvalidRequest(format!(
                "invalid symbol '{}'",
                symbol
            )));
        }

        let quote_currency = quote_currency.as_ref().trim().to_ascii_uppercase();
        if quote_currency.len() != 3 || !quote_currency.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ForecastError::InvalidRequest(format!(
                "invalid quote currency '{}'",
                quote_currency
            )));
        }

        if range_start > range_end {
            return Err(ForecastError::InvalidRequest(format!(
                "range start {} is after range end {}",
                range_start, range_end
            )));
        }

        Ok(Self {
            symbol,
            quote_currency,
            range_start,
            range_end,
        })
    }

    /// Provider ticker, e.g. `BTC-USD`.
    pub fn ticker(&self) -> String {
        format!("{}-{}", self.symbol, self.quote_currency)
    }
}

/// One record as handed over by a retrieval collaborator.
///
/// Fields are optional because providers leave gaps; the normalizer decides
/// what to do with them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRecord {
    pub timestamp: DateTime<FixedOffset>,
    pub open: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub close: Option<f64>,
    pub volume: Option<f64>,
}

/// Daily OHLCV observation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NormalizedDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Price points with strictly increasing unique dates and positive finite prices.
///
/// Never empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PriceSeries {
    points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(points: Vec<PricePoint>) -> Result<Self, ForecastError> {
        if points.is_empty() {
            return Err(ForecastError::DataShape("price series is empty".to_string()));
        }

        for point in &points {
            for (field, value) in [
                ("open", point.open),
                ("high", point.high),
                ("low", point.low),
                ("close", point.close),
            ] {
                if !value.is_finite() || value <= 0.0 {
                    return Err(ForecastError::DataShape(format!(
                        "{} on {} must be finite and positive, got {}",
                        field, point.date, value
                    )));
                }
            }
        }

        if let Some(pair) = points.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(ForecastError::DataShape(format!(
                "dates not strictly increasing: {} followed by {}",
                pair[0].date, pair[1].date
            )));
        }

        Ok(Self { points })
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first_date(&self) -> NormalizedDate {
        self.points[0].date
    }

    pub fn last_date(&self) -> NormalizedDate {
        self.points[self.points.len() - 1].date
    }

    pub fn dates(&self) -> BTreeSet<NormalizedDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Date → close lookup used by the reconciler.
    pub fn close_index(&self) -> BTreeMap<NormalizedDate, f64> {
        self.points.iter().map(|p| (p.date, p.close)).collect()
    }

    /// (date, close) projection fed to the forecasting model.
    pub fn training_records(&self) -> Vec<TrainingRecord> {
        self.points
            .iter()
            .map(|p| TrainingRecord {
                date: p.date,
                value: p.close,
            })
            .collect()
    }

    /// Render back to raw records stamped at midnight UTC.
    pub fn to_raw_records(&self) -> Vec<RawRecord> {
        self.points
            .iter()
            .map(|p| RawRecord {
                timestamp: p.date.midnight_utc(),
                open: Some(p.open),
                high: Some(p.high),
                low: Some(p.low),
                close: Some(p.close),
                volume: Some(p.volume as f64),
            })
            .collect()
    }
}

/// Model input: one close value per date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainingRecord {
    pub date: NormalizedDate,
    pub value: f64,
}

/// Model output for one date, historical or future.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NormalizedDate,
    pub predicted_value: f64,
}

/// Actual vs. predicted for a date known to both series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReconciledRecord {
    pub date: NormalizedDate,
    pub actual_value: f64,
    pub predicted_value: f64,
}

/// Prediction for a date absent from the observed series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FutureProjectionRecord {
    pub date: NormalizedDate,
    pub predicted_value: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn point(date: &str, close: f64) -> PricePoint {
        PricePoint {
            date: NormalizedDate::parse(date).unwrap(),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1_000,
        }
    }

    #[test]
    fn test_normalized_date_drops_offset_and_time() {
        let tokyo = FixedOffset::east_opt(9 * 3600).unwrap();
        let ts = tokyo.with_ymd_and_hms(2024, 3, 10, 1, 30, 0).unwrap();
        // 2024-03-09 16:30 in UTC, but the wall-clock date is kept
        assert_eq!(
            NormalizedDate::from_timestamp(&ts),
            NormalizedDate::from_ymd(2024, 3, 10).unwrap()
        );

        let utc = Utc.with_ymd_and_hms(2024, 3, 10, 23, 59, 59).unwrap();
        assert_eq!(NormalizedDate::from_timestamp(&utc).to_string(), "2024-03-10");
    }

    #[test]
    fn test_normalized_date_serializes_as_plain_date() {
        let date = NormalizedDate::parse("2024-01-05").unwrap();
        assert_eq!(serde_json::to_string(&date).unwrap(), "\"2024-01-05\"");
        assert!(NormalizedDate::parse("05/01/2024").is_err());
    }

    #[test]
    fn test_date_arithmetic() {
        let date = NormalizedDate::parse("2024-02-28").unwrap();
        assert_eq!(date.succ().unwrap().to_string(), "2024-02-29");
        assert_eq!(date.add_days(2).unwrap().to_string(), "2024-03-01");
        assert_eq!(date.add_days(2).unwrap().days_since(date), 2);
    }

    #[test]
    fn test_instrument_spec_validation() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();

        let spec = InstrumentSpec::new(" eth ", "usd", start, end).unwrap();
        assert_eq!(spec.symbol, "ETH");
        assert_eq!(spec.ticker(), "ETH-USD");

        assert!(InstrumentSpec::new("", "USD", start, end).is_err());
        assert!(InstrumentSpec::new("BTC-USD", "USD", start, end).is_err());
        assert!(InstrumentSpec::new("BTC", "USDT", start, end).is_err());
        assert!(matches!(
            InstrumentSpec::new("BTC", "USD", end, start),
            Err(ForecastError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_price_series_rejects_bad_shapes() {
        assert!(PriceSeries::new(vec![]).is_err());

        let unordered = vec![point("2024-01-02", 10.0), point("2024-01-01", 11.0)];
        assert!(matches!(
            PriceSeries::new(unordered),
            Err(ForecastError::DataShape(_))
        ));

        let duplicate = vec![point("2024-01-01", 10.0), point("2024-01-01", 11.0)];
        assert!(PriceSeries::new(duplicate).is_err());

        let mut zero = point("2024-01-01", 10.0);
        zero.low = 0.0;
        assert!(PriceSeries::new(vec![zero]).is_err());

        let mut nan = point("2024-01-01", 10.0);
        nan.close = f64::NAN;
        assert!(PriceSeries::new(vec![nan]).is_err());
    }

    #[test]
    fn test_price_series_projections() {
        let series = PriceSeries::new(vec![
            point("2024-01-01", 10.0),
            point("2024-01-02", 12.0),
            point("2024-01-04", 11.0),
        ])
        .unwrap();

        assert_eq!(series.len(), 3);
        assert_eq!(series.first_date().to_string(), "2024-01-01");
        assert_eq!(series.last_date().to_string(), "2024-01-04");

        let training = series.training_records();
        assert_eq!(training.len(), 3);
        assert_eq!(training[1].value, 12.0);

        let index = series.close_index();
        assert_eq!(index[&NormalizedDate::parse("2024-01-04").unwrap()], 11.0);

        let raw = series.to_raw_records();
        assert_eq!(raw[0].timestamp.to_rfc3339(), "2024-01-01T00:00:00+00:00");
        assert_eq!(raw[2].close, Some(11.0));
    }
}
