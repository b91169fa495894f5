use chrono::Datelike;
use forecast_core::{ForecastError, ForecastPoint, Forecaster, NormalizedDate, TrainingRecord};
use nalgebra::{DMatrix, DVector};

use crate::config::ModelConfig;
use crate::features::{changepoints, fourier_row, seasonalities_for_span, trend_row, Seasonality};

/// Additive-trend forecaster with multiplicative seasonality:
/// `yhat(t) = trend(t) * (1 + seasonal(t))`.
#[derive(Debug, Clone, Default)]
pub struct SeasonalTrendForecaster {
    config: ModelConfig,
}

/// Parameters of a fitted model, in scaled units.
#[derive(Debug, Clone)]
pub struct FittedModel {
    history: Vec<NormalizedDate>,
    origin: NormalizedDate,
    span_days: f64,
    y_scale: f64,
    changepoints: Vec<f64>,
    trend_coef: DVector<f64>,
    seasonalities: Vec<Seasonality>,
    seasonal_coef: DVector<f64>,
}

impl SeasonalTrendForecaster {
    pub fn new(config: ModelConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Fit the model to `training`, which must be strictly ascending by date.
    pub fn fit(&self, training: &[TrainingRecord]) -> Result<FittedModel, ForecastError> {
        let n = training.len();
        let min_rows = self.config.min_training_rows.max(2);
        if n < min_rows {
            return Err(ForecastError::ModelFit(format!(
                "need at least {} training rows, got {}",
                min_rows, n
            )));
        }

        if let Some(pair) = training.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(ForecastError::ModelFit(format!(
                "training dates must be strictly ascending: {} followed by {}",
                pair[0].date, pair[1].date
            )));
        }

        if let Some(bad) = training.iter().find(|r| !r.value.is_finite()) {
            return Err(ForecastError::ModelFit(format!(
                "non-finite training value on {}",
                bad.date
            )));
        }

        let y_scale = training.iter().map(|r| r.value.abs()).fold(0.0, f64::max);
        if y_scale == 0.0 {
            return Err(ForecastError::ModelFit(
                "cannot scale a series of zeros".to_string(),
            ));
        }

        let origin = training[0].date;
        let span = training[n - 1].date.days_since(origin);
        let span_days = span as f64;

        let t: Vec<f64> = training
            .iter()
            .map(|r| r.date.days_since(origin) as f64 / span_days)
            .collect();
        let y = DVector::from_iterator(n, training.iter().map(|r| r.value / y_scale));

        let cps = changepoints(&t, self.config.n_changepoints, self.config.changepoint_range);
        let seasonalities = seasonalities_for_span(span);

        let trend_width = 2 + cps.len();
        let trend_design = DMatrix::from_row_iterator(
            n,
            trend_width,
            t.iter().flat_map(|&ti| trend_row(ti, &cps)),
        );

        let seasonal_width: usize = seasonalities.iter().map(Seasonality::width).sum();
        let seasonal_design = DMatrix::from_row_iterator(
            n,
            seasonal_width,
            training
                .iter()
                .flat_map(|r| fourier_row(&seasonalities, absolute_day(r.date))),
        );
        let seasonal_penalty = vec![self.config.seasonality_penalty(); seasonal_width];

        // Plain line first; its residual variance sets the initial changepoint penalty.
        let line_design = trend_design.columns(0, 2).into_owned();
        let line_coef = solve_ridge(&line_design, &y, &[0.0, 0.0])?;
        let mut noise_variance = (&y - &line_design * &line_coef).norm_squared() / n as f64;

        let mut trend_coef: DVector<f64> = DVector::zeros(trend_width);
        let mut seasonal_coef: DVector<f64> = DVector::zeros(seasonal_width);
        let mut seasonal: DVector<f64> = DVector::zeros(n);

        // Each pass minimises |y - trend * (1 + seasonal)|^2 over one block with the
        // other held fixed, so neither solve divides by a fitted component.
        for iteration in 0..self.config.backfit_iterations.max(1) {
            let changepoint_penalty = self.config.changepoint_penalty(noise_variance);
            let mut trend_penalty = vec![changepoint_penalty; trend_width];
            trend_penalty[0] = 0.0;
            trend_penalty[1] = 0.0;

            let factor = seasonal.add_scalar(1.0);
            trend_coef = solve_ridge(&scale_rows(&trend_design, &factor), &y, &trend_penalty)?;
            let trend = &trend_design * &trend_coef;

            if seasonal_width > 0 {
                seasonal_coef = solve_ridge(
                    &scale_rows(&seasonal_design, &trend),
                    &(&y - &trend),
                    &seasonal_penalty,
                )?;
                seasonal = &seasonal_design * &seasonal_coef;
            }

            let fitted = trend.component_mul(&seasonal.add_scalar(1.0));
            noise_variance = (&y - fitted).norm_squared() / n as f64;

            if self.config.trace_fit {
                tracing::debug!(
                    "Backfit iteration {}: in-sample RMSE {:.6}",
                    iteration + 1,
                    noise_variance.sqrt() * y_scale
                );
            }
        }

        if self.config.trace_fit {
            tracing::debug!(
                "Fitted {} rows over {} days: {} changepoints, seasonalities [{}]",
                n,
                span,
                cps.len(),
                seasonalities.iter().map(|s| s.name).collect::<Vec<_>>().join(", ")
            );
        }

        Ok(FittedModel {
            history: training.iter().map(|r| r.date).collect(),
            origin,
            span_days,
            y_scale,
            changepoints: cps,
            trend_coef,
            seasonalities,
            seasonal_coef,
        })
    }
}

impl FittedModel {
    pub fn changepoint_count(&self) -> usize {
        self.changepoints.len()
    }

    pub fn seasonality_names(&self) -> Vec<&'static str> {
        self.seasonalities.iter().map(|s| s.name).collect()
    }

    /// Trend component in price units.
    pub fn trend(&self, date: NormalizedDate) -> f64 {
        let t = date.days_since(self.origin) as f64 / self.span_days;
        dot(&trend_row(t, &self.changepoints), &self.trend_coef) * self.y_scale
    }

    /// Relative seasonal effect; the prediction is `trend * (1 + seasonal)`.
    pub fn seasonal(&self, date: NormalizedDate) -> f64 {
        if self.seasonalities.is_empty() {
            return 0.0;
        }
        dot(
            &fourier_row(&self.seasonalities, absolute_day(date)),
            &self.seasonal_coef,
        )
    }

    pub fn predict(&self, date: NormalizedDate) -> f64 {
        self.trend(date) * (1.0 + self.seasonal(date))
    }

    /// History dates followed by `horizon_days` consecutive days after the last one.
    pub fn forecast_dates(&self, horizon_days: u32) -> Result<Vec<NormalizedDate>, ForecastError> {
        let last = match self.history.last() {
            Some(date) => *date,
            None => return Err(ForecastError::ModelFit("model has no history".to_string())),
        };

        let mut dates = Vec::with_capacity(self.history.len() + horizon_days as usize);
        dates.extend_from_slice(&self.history);
        for offset in 1..=horizon_days {
            let date = last.add_days(offset).ok_or_else(|| {
                ForecastError::ModelFit(format!("forecast date {} days after {} is out of range", offset, last))
            })?;
            dates.push(date);
        }
        Ok(dates)
    }
}

impl Forecaster for SeasonalTrendForecaster {
    fn forecast(
        &self,
        training: &[TrainingRecord],
        horizon_days: u32,
    ) -> Result<Vec<ForecastPoint>, ForecastError> {
        let model = self.fit(training)?;

        let points = model
            .forecast_dates(horizon_days)?
            .into_iter()
            .map(|date| ForecastPoint {
                date,
                predicted_value: model.predict(date),
            })
            .collect::<Vec<_>>();

        if let Some(bad) = points.iter().find(|p| !p.predicted_value.is_finite()) {
            return Err(ForecastError::ModelFit(format!(
                "non-finite prediction on {}",
                bad.date
            )));
        }

        Ok(points)
    }
}

/// Day count used as the Fourier time axis, so phases follow the calendar.
fn absolute_day(date: NormalizedDate) -> f64 {
    date.as_naive().num_days_from_ce() as f64
}

/// Copy of `design` with row `i` multiplied by `weights[i]`.
fn scale_rows(design: &DMatrix<f64>, weights: &DVector<f64>) -> DMatrix<f64> {
    let mut scaled = design.clone();
    for (i, w) in weights.iter().enumerate() {
        scaled.row_mut(i).scale_mut(*w);
    }
    scaled
}

fn dot(row: &[f64], coef: &DVector<f64>) -> f64 {
    row.iter().zip(coef.iter()).map(|(x, c)| x * c).sum()
}

/// Solve `(XᵀX + diag(penalty)) β = Xᵀy`.
fn solve_ridge(
    design: &DMatrix<f64>,
    target: &DVector<f64>,
    penalty: &[f64],
) -> Result<DVector<f64>, ForecastError> {
    let mut gram = design.transpose() * design;
    for (i, p) in penalty.iter().enumerate() {
        gram[(i, i)] += p;
    }
    let rhs = design.transpose() * target;

    let cholesky = gram
        .cholesky()
        .ok_or_else(|| ForecastError::ModelFit("normal equations are singular".to_string()))?;
    let solution = cholesky.solve(&rhs);

    if solution.iter().any(|v| !v.is_finite()) {
        return Err(ForecastError::ModelFit(
            "least-squares solution is not finite".to_string(),
        ));
    }
    Ok(solution)
}
