//! Design-matrix features: Fourier seasonality terms and trend changepoints.

use std::f64::consts::PI;

/// A periodic component expressed as a truncated Fourier series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seasonality {
    pub name: &'static str,
    /// Period in days
    pub period: f64,
    pub order: usize,
}

pub const YEARLY: Seasonality = Seasonality {
    name: "yearly",
    period: 365.25,
    order: 10,
};

pub const WEEKLY: Seasonality = Seasonality {
    name: "weekly",
    period: 7.0,
    order: 3,
};

/// Seasonalities that the history is long enough to identify: yearly needs two
/// full years, weekly needs two full weeks.
pub fn seasonalities_for_span(span_days: i64) -> Vec<Seasonality> {
    let mut enabled = Vec::new();
    if span_days >= 730 {
        enabled.push(YEARLY);
    }
    if span_days >= 14 {
        enabled.push(WEEKLY);
    }
    enabled
}

impl Seasonality {
    pub fn width(&self) -> usize {
        2 * self.order
    }

    /// Append `sin, cos` pairs for harmonics `1..=order` at absolute day `day`.
    pub fn push_terms(&self, day: f64, row: &mut Vec<f64>) {
        for k in 1..=self.order {
            let angle = 2.0 * PI * k as f64 * day / self.period;
            row.push(angle.sin());
            row.push(angle.cos());
        }
    }
}

/// Fourier row for all `seasonalities` at absolute day `day`.
pub fn fourier_row(seasonalities: &[Seasonality], day: f64) -> Vec<f64> {
    let width = seasonalities.iter().map(Seasonality::width).sum();
    let mut row = Vec::with_capacity(width);
    for s in seasonalities {
        s.push_terms(day, &mut row);
    }
    row
}

/// Potential changepoint locations on the scaled time axis.
///
/// Changepoints sit on history points spread uniformly over the first
/// `changepoint_range` of the rows. The first row never hosts one, so with `n`
/// rows there are at most `n - 2`.
pub fn changepoints(t: &[f64], n_changepoints: usize, changepoint_range: f64) -> Vec<f64> {
    let hist_size = (t.len() as f64 * changepoint_range).floor() as usize;
    if hist_size < 2 {
        return Vec::new();
    }

    let count = n_changepoints.min(hist_size - 1);
    if count == 0 {
        return Vec::new();
    }

    let last = (hist_size - 1) as f64;
    (1..=count)
        .map(|i| {
            let idx = (i as f64 * last / count as f64).round() as usize;
            t[idx]
        })
        .collect()
}

/// Trend row `[1, t, (t - s_1)+, ..., (t - s_k)+]`.
pub fn trend_row(t: f64, changepoints: &[f64]) -> Vec<f64> {
    let mut row = Vec::with_capacity(2 + changepoints.len());
    row.push(1.0);
    row.push(t);
    row.extend(changepoints.iter().map(|&s| (t - s).max(0.0)));
    row
}
