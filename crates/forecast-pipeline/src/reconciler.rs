use forecast_core::{
    ForecastPoint, FutureProjectionRecord, NormalizedDate, PriceSeries, ReconciledRecord,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Forecast points split by whether the observed series has the same date.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Reconciliation {
    /// Dates present in both series, in forecast order.
    pub reconciled: Vec<ReconciledRecord>,
    /// Dates only the forecast has, in forecast order.
    pub future: Vec<FutureProjectionRecord>,
}

/// Inner-join `forecast` with the closes of `actual` on date.
///
/// Every forecast point lands in exactly one of the two halves.
pub fn reconcile(actual: &PriceSeries, forecast: &[ForecastPoint]) -> Reconciliation {
    let closes = actual.close_index();
    let mut reconciliation = Reconciliation::default();

    for point in forecast {
        match closes.get(&point.date) {
            Some(&close) => reconciliation.reconciled.push(ReconciledRecord {
                date: point.date,
                actual_value: close,
                predicted_value: point.predicted_value,
            }),
            None => reconciliation.future.push(FutureProjectionRecord {
                date: point.date,
                predicted_value: point.predicted_value,
            }),
        }
    }

    reconciliation
}

impl Reconciliation {
    /// Reconciled rows newest first.
    pub fn sorted_by_date_desc(&self) -> Vec<ReconciledRecord> {
        let mut rows = self.reconciled.clone();
        rows.sort_by(|a, b| b.date.cmp(&a.date));
        rows
    }

    /// Future rows oldest first.
    pub fn future_ascending(&self) -> Vec<FutureProjectionRecord> {
        let mut rows = self.future.clone();
        rows.sort_by_key(|r| r.date);
        rows
    }

    /// Every date the forecast covered.
    pub fn domain(&self) -> BTreeSet<NormalizedDate> {
        self.reconciled
            .iter()
            .map(|r| r.date)
            .chain(self.future.iter().map(|r| r.date))
            .collect()
    }

    pub fn has_overlap(&self) -> bool {
        !self.reconciled.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forecast_core::PricePoint;

    fn date(s: &str) -> NormalizedDate {
        NormalizedDate::parse(s).unwrap()
    }

    fn actual(dates: &[&str]) -> PriceSeries {
        PriceSeries::new(
            dates
                .iter()
                .enumerate()
                .map(|(i, d)| {
                    let close = 100.0 + i as f64;
                    PricePoint {
                        date: date(d),
                        open: close,
                        high: close,
                        low: close,
                        close,
                        volume: 10,
                    }
                })
                .collect(),
        )
        .unwrap()
    }

    fn forecast(dates: &[&str]) -> Vec<ForecastPoint> {
        dates
            .iter()
            .map(|d| ForecastPoint {
                date: date(d),
                predicted_value: 1.0,
            })
            .collect()
    }

    #[test]
    fn test_partitions_forecast() {
        let actual = actual(&["2024-01-01", "2024-01-02", "2024-01-03"]);
        let forecast = forecast(&["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04", "2024-01-05"]);

        let result = reconcile(&actual, &forecast);

        assert_eq!(result.reconciled.len(), 3);
        assert_eq!(result.future.len(), 2);
        assert_eq!(result.reconciled[2].actual_value, 102.0);
        assert_eq!(result.future[0].date, date("2024-01-04"));
        assert_eq!(result.domain(), forecast.iter().map(|p| p.date).collect::<BTreeSet<_>>());
    }

    #[test]
    fn test_gap_dates_go_to_future() {
        // 2024-01-02 is missing from the observations
        let actual = actual(&["2024-01-01", "2024-01-03"]);
        let forecast = forecast(&["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04"]);

        let result = reconcile(&actual, &forecast);

        let future: Vec<String> = result.future.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(future, vec!["2024-01-02", "2024-01-04"]);
        assert_eq!(result.reconciled.len(), 2);
    }

    #[test]
    fn test_disjoint_dates() {
        let actual = actual(&["2023-01-01", "2023-01-02"]);
        let forecast = forecast(&["2024-01-01", "2024-01-02"]);

        let result = reconcile(&actual, &forecast);
        assert!(!result.has_overlap());
        assert_eq!(result.future.len(), 2);
    }

    #[test]
    fn test_presentation_orders() {
        let actual = actual(&["2024-01-01", "2024-01-02", "2024-01-03"]);
        let mut points = forecast(&["2024-01-02", "2024-01-05", "2024-01-01", "2024-01-03", "2024-01-04"]);
        points.rotate_left(1);

        let result = reconcile(&actual, &points);

        let desc: Vec<String> = result
            .sorted_by_date_desc()
            .iter()
            .map(|r| r.date.to_string())
            .collect();
        assert_eq!(desc, vec!["2024-01-03", "2024-01-02", "2024-01-01"]);

        let asc: Vec<String> = result
            .future_ascending()
            .iter()
            .map(|r| r.date.to_string())
            .collect();
        assert_eq!(asc, vec!["2024-01-04", "2024-01-05"]);
    }
}
