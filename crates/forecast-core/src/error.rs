use chrono::NaiveDate;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the individual pipeline stages.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ForecastError {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Retrieval error: {0}")]
    Retrieval(String),

    #[error("Data shape error: {0}")]
    DataShape(String),

    #[error("Model fit error: {0}")]
    ModelFit(String),

    #[error("Model timed out after {}s", .0.as_secs_f64())]
    ModelTimeout(Duration),
}

impl ForecastError {
    /// The pipeline stage this kind of error originates from.
    pub fn stage(&self) -> Stage {
        match self {
            ForecastError::InvalidRequest(_) => Stage::Request,
            ForecastError::Retrieval(_) => Stage::Retrieval,
            ForecastError::DataShape(_) => Stage::Normalization,
            ForecastError::ModelFit(_) | ForecastError::ModelTimeout(_) => Stage::Forecast,
        }
    }
}

/// Pipeline stage names used in error reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Request,
    Retrieval,
    Normalization,
    Forecast,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Stage::Request => "request",
            Stage::Retrieval => "retrieval",
            Stage::Normalization => "normalization",
            Stage::Forecast => "forecast",
        };
        f.write_str(label)
    }
}

/// A stage failure annotated with the instrument and date range of the run.
///
/// This is what callers of the pipeline receive, so a front end can render
/// "BTC-USD 2024-01-01..2024-06-30 failed during forecast: ..." without
/// keeping its own bookkeeping.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{symbol}-{quote_currency} {range_start}..{range_end} failed during {stage}: {source}")]
pub struct PipelineError {
    pub symbol: String,
    pub quote_currency: String,
    pub range_start: NaiveDate,
    pub range_end: NaiveDate,
    pub stage: Stage,
    #[source]
    pub source: ForecastError,
}

impl PipelineError {
    pub fn new(spec: &crate::InstrumentSpec, source: ForecastError) -> Self {
        Self {
            symbol: spec.symbol.clone(),
            quote_currency: spec.quote_currency.clone(),
            range_start: spec.range_start,
            range_end: spec.range_end,
            stage: source.stage(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InstrumentSpec;

    #[test]
    fn test_stage_mapping() {
        assert_eq!(ForecastError::Retrieval("x".into()).stage(), Stage::Retrieval);
        assert_eq!(ForecastError::DataShape("x".into()).stage(), Stage::Normalization);
        assert_eq!(ForecastError::ModelFit("x".into()).stage(), Stage::Forecast);
        assert_eq!(
            ForecastError::ModelTimeout(Duration::from_secs(1)).stage(),
            Stage::Forecast
        );
        assert_eq!(ForecastError::InvalidRequest("x".into()).stage(), Stage::Request);
    }

    #[test]
    fn test_pipeline_error_carries_context() {
        let spec = InstrumentSpec::new(
            "btc",
            "usd",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
        )
        .unwrap();
        let err = PipelineError::new(&spec, ForecastError::ModelFit("singular system".into()));

        assert_eq!(err.stage, Stage::Forecast);
        let message = err.to_string();
        assert!(message.contains("BTC-USD"));
        assert!(message.contains("2024-01-01..2024-06-30"));
        assert!(message.contains("forecast"));
        assert!(message.contains("singular system"));
    }

    #[test]
    fn test_timeout_display() {
        let err = ForecastError::ModelTimeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "Model timed out after 1.5s");
    }
}
