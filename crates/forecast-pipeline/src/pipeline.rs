use forecast_core::{
    display_name, ConfigError, ForecastError, ForecastPoint, Forecaster, HistorySource,
    InstrumentSpec, PipelineError, TrainingRecord, HORIZON_DAYS,
};
use forecast_engine::{ModelConfig, SeasonalTrendForecaster};
use std::sync::Arc;
use std::time::Instant;
use yahoo_client::{YahooConfig, YahooFinanceClient};

use crate::config::PipelineConfig;
use crate::normalizer::normalize;
use crate::presenter::{present, DashboardReport};
use crate::reconciler::reconcile;

/// One batch run: fetch, normalize, forecast, reconcile, present.
///
/// Holds no state between runs; see [`crate::ForecastService`] for reuse.
pub struct ForecastPipeline {
    source: Arc<dyn HistorySource>,
    forecaster: Arc<dyn Forecaster>,
    config: PipelineConfig,
}

impl ForecastPipeline {
    pub fn new(
        source: Arc<dyn HistorySource>,
        forecaster: Arc<dyn Forecaster>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            source,
            forecaster,
            config,
        }
    }

    /// Yahoo Finance history and the seasonal trend model, configured from the
    /// environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let source = YahooFinanceClient::new(YahooConfig::from_env()?);
        let forecaster = SeasonalTrendForecaster::new(ModelConfig::from_env()?);
        Ok(Self::new(
            Arc::new(source),
            Arc::new(forecaster),
            PipelineConfig::from_env()?,
        ))
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub async fn run(&self, spec: &InstrumentSpec) -> Result<DashboardReport, PipelineError> {
        let started = Instant::now();
        tracing::info!(
            "Starting forecast pipeline for {} ({}..{})",
            spec.ticker(),
            spec.range_start,
            spec.range_end
        );

        match self.execute(spec).await {
            Ok(report) => {
                tracing::info!(
                    "Forecast pipeline for {} finished in {:.2}s",
                    spec.ticker(),
                    started.elapsed().as_secs_f64()
                );
                Ok(report)
            }
            Err(e) => {
                let err = PipelineError::new(spec, e);
                tracing::warn!("{}", err);
                Err(err)
            }
        }
    }

    async fn execute(&self, spec: &InstrumentSpec) -> Result<DashboardReport, ForecastError> {
        let raw = self.source.fetch(spec).await?;
        tracing::debug!("Retrieved {} raw records for {}", raw.len(), spec.ticker());

        let actual = normalize(raw)?;
        tracing::info!(
            "Normalized {} daily points for {} ({}..{})",
            actual.len(),
            spec.ticker(),
            actual.first_date(),
            actual.last_date()
        );

        let training = actual.training_records();
        let expected = training.len() + HORIZON_DAYS as usize;
        let forecast = self.run_model(training).await?;
        if forecast.len() != expected {
            return Err(ForecastError::ModelFit(format!(
                "forecaster returned {} points, expected {}",
                forecast.len(),
                expected
            )));
        }

        let reconciliation = reconcile(&actual, &forecast);
        if !reconciliation.has_overlap() {
            tracing::warn!(
                "Forecast for {} shares no dates with the observed series",
                spec.ticker()
            );
        }
        tracing::info!(
            "Reconciled {} historical dates, {} future dates for {}",
            reconciliation.reconciled.len(),
            reconciliation.future.len(),
            spec.ticker()
        );

        Ok(present(
            spec,
            display_name(&spec.symbol),
            &actual,
            &forecast,
            &reconciliation,
        ))
    }

    /// Fit on the blocking pool, bounded by `model_timeout`.
    ///
    /// A timed-out fit keeps running on its blocking thread until it returns;
    /// its result is discarded.
    async fn run_model(
        &self,
        training: Vec<TrainingRecord>,
    ) -> Result<Vec<ForecastPoint>, ForecastError> {
        let forecaster = Arc::clone(&self.forecaster);
        let task =
            tokio::task::spawn_blocking(move || forecaster.forecast(&training, HORIZON_DAYS));

        match tokio::time::timeout(self.config.model_timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => {
                tracing::error!("Model task failed: {}", e);
                Err(ForecastError::ModelFit("model task panicked".to_string()))
            }
            Err(_) => Err(ForecastError::ModelTimeout(self.config.model_timeout)),
        }
    }
}
