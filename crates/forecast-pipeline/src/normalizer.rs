use forecast_core::{ForecastError, NormalizedDate, PricePoint, PriceSeries, RawRecord};
use std::collections::BTreeMap;

/// Turn raw provider records into a validated daily series.
///
/// Records are keyed by the wall-clock date of their own timestamp. When two
/// records fall on the same date the one appearing later in `raw` wins.
/// Output is ascending by date.
pub fn normalize(raw: Vec<RawRecord>) -> Result<PriceSeries, ForecastError> {
    if raw.is_empty() {
        return Err(ForecastError::DataShape("no records to normalize".to_string()));
    }

    let input_len = raw.len();
    let mut by_date: BTreeMap<NormalizedDate, PricePoint> = BTreeMap::new();

    for record in raw {
        let date = NormalizedDate::from_timestamp(&record.timestamp);
        let point = PricePoint {
            date,
            open: price(date, "open", record.open)?,
            high: price(date, "high", record.high)?,
            low: price(date, "low", record.low)?,
            close: price(date, "close", record.close)?,
            volume: volume(date, record.volume)?,
        };
        by_date.insert(date, point);
    }

    if by_date.len() < input_len {
        tracing::debug!(
            "Collapsed {} duplicate dates while normalizing",
            input_len - by_date.len()
        );
    }

    PriceSeries::new(by_date.into_values().collect())
}

fn price(date: NormalizedDate, field: &str, value: Option<f64>) -> Result<f64, ForecastError> {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => Ok(v),
        Some(v) => Err(ForecastError::DataShape(format!(
            "{} on {} must be finite and positive, got {}",
            field, date, v
        ))),
        None => Err(ForecastError::DataShape(format!("missing {} on {}", field, date))),
    }
}

fn volume(date: NormalizedDate, value: Option<f64>) -> Result<u64, ForecastError> {
    match value {
        Some(v) if v.is_finite() && v >= 0.0 => Ok(v.round() as u64),
        Some(v) => Err(ForecastError::DataShape(format!(
            "volume on {} must be finite and non-negative, got {}",
            date, v
        ))),
        None => Err(ForecastError::DataShape(format!("missing volume on {}", date))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset, TimeZone};

    fn record(ts: DateTime<FixedOffset>, close: f64) -> RawRecord {
        RawRecord {
            timestamp: ts,
            open: Some(close - 1.0),
            high: Some(close + 2.0),
            low: Some(close - 2.0),
            close: Some(close),
            volume: Some(1_500.4),
        }
    }

    fn utc(y: i32, m: u32, d: u32, h: u32) -> DateTime<FixedOffset> {
        FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(y, m, d, h, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_sorts_and_strips_time() {
        let series = normalize(vec![
            record(utc(2024, 1, 3, 0), 30.0),
            record(utc(2024, 1, 1, 18), 10.0),
            record(utc(2024, 1, 2, 5), 20.0),
        ])
        .unwrap();

        let dates: Vec<String> = series.points().iter().map(|p| p.date.to_string()).collect();
        assert_eq!(dates, vec!["2024-01-01", "2024-01-02", "2024-01-03"]);
        assert_eq!(series.points()[0].close, 10.0);
        assert_eq!(series.points()[0].volume, 1_500);
    }

    #[test]
    fn test_keeps_wall_clock_date_of_offset_timestamps() {
        let new_york = FixedOffset::west_opt(5 * 3600).unwrap();
        let ts = new_york.with_ymd_and_hms(2024, 1, 1, 19, 0, 0).unwrap();

        let series = normalize(vec![record(ts, 10.0)]).unwrap();
        assert_eq!(series.first_date().to_string(), "2024-01-01");
    }

    #[test]
    fn test_duplicate_dates_keep_last_seen() {
        let series = normalize(vec![
            record(utc(2024, 1, 1, 0), 10.0),
            record(utc(2024, 1, 2, 0), 20.0),
            record(utc(2024, 1, 1, 12), 15.0),
        ])
        .unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.points()[0].close, 15.0);
    }

    #[test]
    fn test_rejects_missing_and_invalid_fields() {
        let mut missing = record(utc(2024, 1, 1, 0), 10.0);
        missing.close = None;
        assert!(matches!(normalize(vec![missing]), Err(ForecastError::DataShape(_))));

        let mut negative = record(utc(2024, 1, 1, 0), 10.0);
        negative.low = Some(-1.0);
        assert!(matches!(normalize(vec![negative]), Err(ForecastError::DataShape(_))));

        let mut infinite = record(utc(2024, 1, 1, 0), 10.0);
        infinite.high = Some(f64::INFINITY);
        assert!(matches!(normalize(vec![infinite]), Err(ForecastError::DataShape(_))));

        let mut no_volume = record(utc(2024, 1, 1, 0), 10.0);
        no_volume.volume = Some(-5.0);
        assert!(matches!(normalize(vec![no_volume]), Err(ForecastError::DataShape(_))));
    }

    #[test]
    fn test_empty_input() {
        match normalize(Vec::new()) {
            Err(ForecastError::DataShape(msg)) => assert_eq!(msg, "no records to normalize"),
            other => panic!("Expected DataShape, got {:?}", other),
        }
    }

    #[test]
    fn test_idempotent() {
        let first = normalize(vec![
            record(utc(2024, 1, 2, 23), 20.0),
            record(utc(2024, 1, 1, 1), 10.0),
            record(utc(2024, 1, 2, 1), 21.0),
        ])
        .unwrap();

        let second = normalize(first.to_raw_records()).unwrap();
        assert_eq!(first, second);
    }
}
