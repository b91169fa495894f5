//! Parsing of Yahoo Finance v8 chart responses into [`RawRecord`]s.

use chrono::{DateTime, FixedOffset};
use forecast_core::{ForecastError, RawRecord};
use serde_json::Value;

/// Convert a chart response body into raw daily records.
///
/// Timestamps are shifted into the exchange's wall clock using `meta.gmtoffset`.
/// Rows where every OHLCV field is null are placeholder rows and are skipped;
/// partially null rows are kept with `None` fields.
pub fn parse_chart(json: &Value, ticker: &str) -> Result<Vec<RawRecord>, ForecastError> {
    let chart = json
        .get("chart")
        .ok_or_else(|| ForecastError::Retrieval(format!("malformed chart response for {}", ticker)))?;

    if let Some(error) = chart.get("error").filter(|e| !e.is_null()) {
        let description = error
            .get("description")
            .and_then(|v| v.as_str())
            .unwrap_or("no description");
        return Err(ForecastError::Retrieval(format!(
            "unknown symbol {}: {}",
            ticker, description
        )));
    }

    let result = chart
        .get("result")
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| ForecastError::Retrieval(format!("no chart data found for {}", ticker)))?;

    let gmt_offset = result
        .get("meta")
        .and_then(|m| m.get("gmtoffset"))
        .and_then(|v| v.as_i64())
        .unwrap_or(0);
    let offset = i32::try_from(gmt_offset)
        .ok()
        .and_then(FixedOffset::east_opt)
        .ok_or_else(|| ForecastError::Retrieval(format!("invalid gmtoffset {}", gmt_offset)))?;

    let timestamps = match result.get("timestamp").and_then(|v| v.as_array()) {
        Some(ts) if !ts.is_empty() => ts,
        _ => {
            return Err(ForecastError::Retrieval(format!(
                "empty result for {} in requested range",
                ticker
            )))
        }
    };

    let quote = result
        .get("indicators")
        .and_then(|v| v.get("quote"))
        .and_then(|v| v.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| ForecastError::Retrieval(format!("no quote data found for {}", ticker)))?;

    let opens = quote_column(quote, "open");
    let highs = quote_column(quote, "high");
    let lows = quote_column(quote, "low");
    let closes = quote_column(quote, "close");
    let volumes = quote_column(quote, "volume");

    let mut records = Vec::with_capacity(timestamps.len());
    let mut skipped = 0usize;

    for (i, ts) in timestamps.iter().enumerate() {
        let secs = ts
            .as_i64()
            .ok_or_else(|| ForecastError::Retrieval(format!("invalid timestamp {}", ts)))?;
        let timestamp = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| ForecastError::Retrieval(format!("timestamp out of range: {}", secs)))?
            .with_timezone(&offset);

        let record = RawRecord {
            timestamp,
            open: value_at(opens, i),
            high: value_at(highs, i),
            low: value_at(lows, i),
            close: value_at(closes, i),
            volume: value_at(volumes, i),
        };

        let placeholder = record.open.is_none()
            && record.high.is_none()
            && record.low.is_none()
            && record.close.is_none()
            && record.volume.is_none();
        if placeholder {
            skipped += 1;
            continue;
        }

        records.push(record);
    }

    if skipped > 0 {
        tracing::debug!("Skipped {} placeholder rows for {}", skipped, ticker);
    }

    if records.is_empty() {
        return Err(ForecastError::Retrieval(format!(
            "empty result for {} in requested range",
            ticker
        )));
    }

    Ok(records)
}

fn quote_column<'a>(quote: &'a Value, name: &str) -> Option<&'a Vec<Value>> {
    quote.get(name).and_then(|v| v.as_array())
}

fn value_at(column: Option<&Vec<Value>>, index: usize) -> Option<f64> {
    column.and_then(|c| c.get(index)).and_then(|v| v.as_f64())
}
