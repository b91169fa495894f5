use forecast_core::config::env_or;
use forecast_core::ConfigError;
use serde::{Deserialize, Serialize};

/// Lower bound on the residual variance (scaled units) that drives the
/// changepoint penalty, so an exact fit keeps a well-posed trend solve.
const NOISE_VARIANCE_FLOOR: f64 = 1e-5;

/// Tuning knobs for [`crate::SeasonalTrendForecaster`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Fewer training rows than this is a hard fit error.
    pub min_training_rows: usize,
    pub n_changepoints: usize,
    /// Share of the history in which changepoints may be placed.
    pub changepoint_range: f64,
    /// Prior scale of the trend rate adjustments, relative to the residual noise.
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    /// Alternating trend/seasonal passes; each re-estimates the noise variance.
    pub backfit_iterations: usize,
    /// Emit debug events describing each fit.
    pub trace_fit: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            min_training_rows: 2,
            n_changepoints: 25,
            changepoint_range: 0.8,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            backfit_iterations: 10,
            trace_fit: false,
        }
    }
}

impl ModelConfig {
    /// Load `MIN_TRAINING_ROWS` and `MODEL_TRACE_FIT`; the remaining fields keep
    /// their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let min_training_rows = env_or("MIN_TRAINING_ROWS", defaults.min_training_rows)?;
        if min_training_rows < 2 {
            return Err(ConfigError::InvalidValue {
                key: "MIN_TRAINING_ROWS".to_string(),
                value: min_training_rows.to_string(),
                reason: "at least 2 rows are needed to scale the time axis".to_string(),
            });
        }

        Ok(Self {
            min_training_rows,
            trace_fit: env_or("MODEL_TRACE_FIT", defaults.trace_fit)?,
            ..defaults
        })
    }

    /// Ridge strength on the rate adjustments: `sigma^2 / tau^2`, with the noise
    /// variance `sigma^2` taken from the current residuals.
    pub(crate) fn changepoint_penalty(&self, noise_variance: f64) -> f64 {
        let noise = if noise_variance.is_finite() {
            noise_variance.max(NOISE_VARIANCE_FLOOR)
        } else {
            NOISE_VARIANCE_FLOOR
        };
        noise / (self.changepoint_prior_scale * self.changepoint_prior_scale)
    }

    pub(crate) fn seasonality_penalty(&self) -> f64 {
        1.0 / (self.seasonality_prior_scale * self.seasonality_prior_scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ModelConfig::default();
        assert_eq!(config.min_training_rows, 2);
        assert_eq!(config.n_changepoints, 25);
        assert_eq!(config.backfit_iterations, 10);
        assert!((config.seasonality_penalty() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_changepoint_penalty_follows_noise() {
        let config = ModelConfig::default();
        assert!((config.changepoint_penalty(0.01) - 4.0).abs() < 1e-9);
        assert!((config.changepoint_penalty(0.0025) - 1.0).abs() < 1e-9);
        // exact fits fall back to the floor
        assert!((config.changepoint_penalty(0.0) - 0.004).abs() < 1e-12);
        assert!((config.changepoint_penalty(f64::NAN) - 0.004).abs() < 1e-12);
    }
}
