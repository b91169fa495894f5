use chrono::{DateTime, Utc};
use forecast_core::{
    ForecastPoint, FutureProjectionRecord, InstrumentSpec, NormalizedDate, PricePoint, PriceSeries,
    ReconciledRecord,
};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::reconciler::Reconciliation;

/// Everything the rendering layer needs for one instrument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardReport {
    /// Provider ticker, e.g. `BTC-USD`
    pub instrument: String,
    pub display_name: String,
    pub range_start: NormalizedDate,
    pub range_end: NormalizedDate,
    pub generated_at: DateTime<Utc>,
    /// Observations, newest first
    pub raw_series: Vec<PricePoint>,
    pub statistics: SeriesStatistics,
    /// Actual vs. predicted, newest first
    pub reconciled: Vec<ReconciledRecord>,
    /// Predictions past the observed dates, oldest first
    pub future_projection: Vec<FutureProjectionRecord>,
    /// Full model output, oldest first
    pub forecast_series: Vec<ForecastPoint>,
    pub close_series: Vec<ClosePoint>,
    pub volume_series: Vec<VolumePoint>,
    pub ohlc_series: Vec<OhlcPoint>,
    /// In-sample error over the reconciled rows
    pub fit_quality: Option<FitQuality>,
}

/// Descriptive statistics of one numeric column.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation; `None` below two observations.
    pub std: Option<f64>,
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeriesStatistics {
    pub open: ColumnSummary,
    pub high: ColumnSummary,
    pub low: ColumnSummary,
    pub close: ColumnSummary,
    pub volume: ColumnSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClosePoint {
    pub date: NormalizedDate,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VolumePoint {
    pub date: NormalizedDate,
    pub volume: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OhlcPoint {
    pub date: NormalizedDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FitQuality {
    pub points: usize,
    pub mae: f64,
    pub rmse: f64,
    /// Mean absolute percentage error, as a percentage
    pub mape: f64,
}

/// Assemble the dashboard views from one pipeline run.
pub fn present(
    spec: &InstrumentSpec,
    display_name: &str,
    actual: &PriceSeries,
    forecast: &[ForecastPoint],
    reconciliation: &Reconciliation,
) -> DashboardReport {
    let points = actual.points();

    let mut raw_series = points.to_vec();
    raw_series.reverse();

    let mut forecast_series = forecast.to_vec();
    forecast_series.sort_by_key(|p| p.date);

    DashboardReport {
        instrument: spec.ticker(),
        display_name: display_name.to_string(),
        range_start: spec.range_start.into(),
        range_end: spec.range_end.into(),
        generated_at: Utc::now(),
        raw_series,
        statistics: SeriesStatistics::from_points(points),
        reconciled: reconciliation.sorted_by_date_desc(),
        future_projection: reconciliation.future_ascending(),
        forecast_series,
        close_series: points
            .iter()
            .map(|p| ClosePoint {
                date: p.date,
                close: p.close,
            })
            .collect(),
        volume_series: points
            .iter()
            .map(|p| VolumePoint {
                date: p.date,
                volume: p.volume,
            })
            .collect(),
        ohlc_series: points
            .iter()
            .map(|p| OhlcPoint {
                date: p.date,
                open: p.open,
                high: p.high,
                low: p.low,
                close: p.close,
            })
            .collect(),
        fit_quality: FitQuality::from_reconciled(&reconciliation.reconciled),
    }
}

impl SeriesStatistics {
    pub fn from_points(points: &[PricePoint]) -> Self {
        let column = |f: fn(&PricePoint) -> f64| {
            let values: Vec<f64> = points.iter().map(f).collect();
            ColumnSummary::describe(&values).unwrap_or_default()
        };

        Self {
            open: column(|p| p.open),
            high: column(|p| p.high),
            low: column(|p| p.low),
            close: column(|p| p.close),
            volume: column(|p| p.volume as f64),
        }
    }
}

impl ColumnSummary {
    /// Count, mean, sample std, min, quartiles and max of `values`.
    pub fn describe(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));

        Some(Self {
            count: values.len(),
            mean: values.mean(),
            std: (values.len() > 1).then(|| values.std_dev()),
            min: Statistics::min(values),
            p25: quantile(&sorted, 0.25),
            p50: quantile(&sorted, 0.50),
            p75: quantile(&sorted, 0.75),
            max: Statistics::max(values),
        })
    }
}

/// Quantile with linear interpolation between closest ranks.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    sorted[lower] + (sorted[upper] - sorted[lower]) * (pos - lower as f64)
}

impl FitQuality {
    pub fn from_reconciled(rows: &[ReconciledRecord]) -> Option<Self> {
        if rows.is_empty() {
            return None;
        }

        let n = rows.len() as f64;
        let errors: Vec<f64> = rows
            .iter()
            .map(|r| r.predicted_value - r.actual_value)
            .collect();

        let mae = errors.iter().map(|e| e.abs()).sum::<f64>() / n;
        let rmse = (errors.iter().map(|e| e * e).sum::<f64>() / n).sqrt();

        let relative: Vec<f64> = rows
            .iter()
            .filter(|r| r.actual_value != 0.0)
            .map(|r| ((r.predicted_value - r.actual_value) / r.actual_value).abs())
            .collect();
        let mape = if relative.is_empty() {
            0.0
        } else {
            relative.iter().sum::<f64>() / relative.len() as f64 * 100.0
        };

        Some(Self {
            points: rows.len(),
            mae,
            rmse,
            mape,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_matches_linear_quartiles() {
        let summary = ColumnSummary::describe(&[4.0, 1.0, 3.0, 2.0]).unwrap();

        assert_eq!(summary.count, 4);
        assert!((summary.mean - 2.5).abs() < 1e-12);
        // sample std of 1..=4
        assert!((summary.std.unwrap() - 1.2909944487358056).abs() < 1e-12);
        assert_eq!(summary.min, 1.0);
        assert!((summary.p25 - 1.75).abs() < 1e-12);
        assert!((summary.p50 - 2.5).abs() < 1e-12);
        assert!((summary.p75 - 3.25).abs() < 1e-12);
        assert_eq!(summary.max, 4.0);
    }

    #[test]
    fn test_describe_single_value() {
        let summary = ColumnSummary::describe(&[7.0]).unwrap();
        assert_eq!(summary.count, 1);
        assert_eq!(summary.std, None);
        assert_eq!(summary.p25, 7.0);
        assert_eq!(summary.p75, 7.0);
        assert!(ColumnSummary::describe(&[]).is_none());
    }

    #[test]
    fn test_fit_quality() {
        let date = NormalizedDate::parse("2024-01-01").unwrap();
        let rows = [
            ReconciledRecord {
                date,
                actual_value: 100.0,
                predicted_value: 110.0,
            },
            ReconciledRecord {
                date: date.succ().unwrap(),
                actual_value: 200.0,
                predicted_value: 190.0,
            },
        ];

        let quality = FitQuality::from_reconciled(&rows).unwrap();
        assert_eq!(quality.points, 2);
        assert!((quality.mae - 10.0).abs() < 1e-12);
        assert!((quality.rmse - 10.0).abs() < 1e-12);
        assert!((quality.mape - 7.5).abs() < 1e-12);

        assert!(FitQuality::from_reconciled(&[]).is_none());
    }
}
