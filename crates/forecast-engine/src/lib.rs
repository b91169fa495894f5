//! Seasonal trend forecasting.
//!
//! The model is a piecewise-linear trend scaled by multiplicative Fourier
//! seasonality, fitted by backfitting two ridge-regularised least-squares
//! problems.

pub mod config;
pub mod features;
pub mod model;

pub use config::ModelConfig;
pub use model::{FittedModel, SeasonalTrendForecaster};
