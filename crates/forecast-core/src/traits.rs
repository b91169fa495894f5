use async_trait::async_trait;
use crate::{ForecastError, ForecastPoint, InstrumentSpec, RawRecord, TrainingRecord};

/// Trait for historical record providers
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Fetch daily records for `spec`, inclusive of both range ends.
    ///
    /// Unknown symbols, transport failures and empty results are all reported
    /// as [`ForecastError::Retrieval`].
    async fn fetch(&self, spec: &InstrumentSpec) -> Result<Vec<RawRecord>, ForecastError>;
}

/// Trait for forecasting models
///
/// Implementations return one point per training date followed by one point per
/// day of the horizon, in ascending date order.
pub trait Forecaster: Send + Sync {
    fn forecast(
        &self,
        training: &[TrainingRecord],
        horizon_days: u32,
    ) -> Result<Vec<ForecastPoint>, ForecastError>;
}
