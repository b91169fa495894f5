//! Plain-text rendering of a [`DashboardReport`].

use forecast_pipeline::{ColumnSummary, DashboardReport};
use std::fmt::{self, Write};

pub fn render(report: &DashboardReport, rows: usize) -> Result<String, fmt::Error> {
    let name = &report.display_name;
    let mut out = String::new();

    writeln!(
        out,
        "{} ({}) {}..{}",
        name, report.instrument, report.range_start, report.range_end
    )?;

    header(&mut out, &format!("{} Data", name))?;
    writeln!(
        out,
        "{:<12}{:>14}{:>14}{:>14}{:>14}{:>20}",
        "Date", "Open", "High", "Low", "Close", "Volume"
    )?;
    for p in report.raw_series.iter().take(rows) {
        writeln!(
            out,
            "{:<12}{:>14.4}{:>14.4}{:>14.4}{:>14.4}{:>20}",
            p.date.to_string(),
            p.open,
            p.high,
            p.low,
            p.close,
            p.volume
        )?;
    }
    more(&mut out, report.raw_series.len(), rows)?;

    header(&mut out, &format!("{} Data Statistics", name))?;
    writeln!(
        out,
        "{:<8}{:>16}{:>16}{:>16}{:>16}{:>20}",
        "", "Open", "High", "Low", "Close", "Volume"
    )?;
    let stats = &report.statistics;
    let columns = [&stats.open, &stats.high, &stats.low, &stats.close, &stats.volume];
    let measures: [(&str, fn(&ColumnSummary) -> Option<f64>); 8] = [
        ("count", |c| Some(c.count as f64)),
        ("mean", |c| Some(c.mean)),
        ("std", |c| c.std),
        ("min", |c| Some(c.min)),
        ("25%", |c| Some(c.p25)),
        ("50%", |c| Some(c.p50)),
        ("75%", |c| Some(c.p75)),
        ("max", |c| Some(c.max)),
    ];
    for (label, measure) in measures {
        write!(out, "{:<8}", label)?;
        for (i, column) in columns.iter().enumerate() {
            let width = if i == 4 { 20 } else { 16 };
            match measure(column) {
                Some(v) => write!(out, "{:>width$.4}", v, width = width)?,
                None => write!(out, "{:>width$}", "NaN", width = width)?,
            }
        }
        writeln!(out)?;
    }

    header(&mut out, &format!("{} Close Price Over Time", name))?;
    let tail = report.close_series.len().saturating_sub(rows);
    for p in &report.close_series[tail..] {
        writeln!(out, "{:<12}{:>14.4}", p.date.to_string(), p.close)?;
    }

    header(&mut out, &format!("{} Actual vs Predicted Prices", name))?;
    match &report.fit_quality {
        Some(q) => writeln!(
            out,
            "Model fit over {} days: MAE {:.4}, RMSE {:.4}, MAPE {:.2}%",
            q.points, q.mae, q.rmse, q.mape
        )?,
        None => writeln!(out, "No overlapping dates between model and data")?,
    }
    if let (Some(first), Some(last)) = (
        report.future_projection.first(),
        report.future_projection.last(),
    ) {
        writeln!(
            out,
            "Future predictions: {} days, {} {:.4} -> {} {:.4}",
            report.future_projection.len(),
            first.date,
            first.predicted_value,
            last.date,
            last.predicted_value
        )?;
    }
    for p in report.future_projection.iter().take(rows) {
        writeln!(out, "{:<12}{:>14.4}", p.date.to_string(), p.predicted_value)?;
    }
    more(&mut out, report.future_projection.len(), rows)?;

    header(&mut out, "Combined Data and Predictions Table")?;
    writeln!(out, "{:<12}{:>14}{:>14}", "Date", "Close", "Predictions")?;
    for r in report.reconciled.iter().take(rows) {
        writeln!(
            out,
            "{:<12}{:>14.4}{:>14.4}",
            r.date.to_string(),
            r.actual_value,
            r.predicted_value
        )?;
    }
    more(&mut out, report.reconciled.len(), rows)?;

    header(&mut out, &format!("{} Trading Volume", name))?;
    let tail = report.volume_series.len().saturating_sub(rows);
    for p in &report.volume_series[tail..] {
        writeln!(out, "{:<12}{:>20}", p.date.to_string(), p.volume)?;
    }

    header(&mut out, &format!("{} Price Movement", name))?;
    let tail = report.ohlc_series.len().saturating_sub(rows);
    for p in &report.ohlc_series[tail..] {
        let direction = if p.close >= p.open { "+" } else { "-" };
        writeln!(
            out,
            "{:<12}{:>14.4}{:>14.4}{:>14.4}{:>14.4} {}",
            p.date.to_string(),
            p.open,
            p.high,
            p.low,
            p.close,
            direction
        )?;
    }

    Ok(out)
}

fn header(out: &mut String, title: &str) -> fmt::Result {
    writeln!(out)?;
    writeln!(out, "== {} ==", title)
}

fn more(out: &mut String, total: usize, shown: usize) -> fmt::Result {
    if total > shown {
        writeln!(out, "... {} more rows", total - shown)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use forecast_core::{ForecastPoint, InstrumentSpec, NormalizedDate, PricePoint, PriceSeries};
    use forecast_pipeline::{present, reconcile};

    fn report() -> DashboardReport {
        let start = NormalizedDate::parse("2024-01-01").unwrap();
        let points: Vec<PricePoint> = (0..3)
            .map(|i| PricePoint {
                date: start.add_days(i).unwrap(),
                open: 10.0 + i as f64,
                high: 12.0 + i as f64,
                low: 9.0 + i as f64,
                close: 11.0 + i as f64,
                volume: 1_000 * (i as u64 + 1),
            })
            .collect();
        let actual = PriceSeries::new(points).unwrap();
        let forecast: Vec<ForecastPoint> = (0..5)
            .map(|i| ForecastPoint {
                date: start.add_days(i).unwrap(),
                predicted_value: 11.5 + i as f64,
            })
            .collect();
        let spec = InstrumentSpec::new(
            "ETH",
            "USD",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
        )
        .unwrap();

        let reconciliation = reconcile(&actual, &forecast);
        present(&spec, "Ethereum", &actual, &forecast, &reconciliation)
    }

    #[test]
    fn test_sections_in_order() {
        let text = render(&report(), 10).unwrap();

        let headers = [
            "== Ethereum Data ==",
            "== Ethereum Data Statistics ==",
            "== Ethereum Close Price Over Time ==",
            "== Ethereum Actual vs Predicted Prices ==",
            "== Combined Data and Predictions Table ==",
            "== Ethereum Trading Volume ==",
            "== Ethereum Price Movement ==",
        ];
        let positions: Vec<usize> = headers
            .iter()
            .map(|h| text.find(h).unwrap_or_else(|| panic!("missing {}", h)))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(text.contains("Future predictions: 2 days"));
    }

    #[test]
    fn test_rows_limit() {
        let text = render(&report(), 1).unwrap();
        assert!(text.contains("... 2 more rows"));
        // newest first in the data table
        let data = text.split("== Ethereum Data Statistics ==").next().unwrap();
        assert!(data.contains("2024-01-03"));
        assert!(!data.contains("2024-01-01 "));
    }
}
