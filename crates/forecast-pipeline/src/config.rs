use chrono::{NaiveDate, Utc};
use forecast_core::config::env_or;
use forecast_core::{ConfigError, ForecastError, InstrumentSpec};
use std::time::Duration;

/// Run-level settings shared by [`crate::ForecastPipeline`] and
/// [`crate::ForecastService`].
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub quote_currency: String,
    /// First day of history requested when the caller gives no start date.
    pub history_start: NaiveDate,
    pub model_timeout: Duration,
    /// How long a finished report is reused. Zero disables reuse.
    pub cache_ttl: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            quote_currency: "USD".to_string(),
            history_start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap_or_default(),
            model_timeout: Duration::from_secs(120),
            cache_ttl: Duration::from_secs(300),
        }
    }
}

impl PipelineConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            quote_currency: env_or("QUOTE_CURRENCY", defaults.quote_currency)?,
            history_start: env_or("HISTORY_START", defaults.history_start)?,
            model_timeout: Duration::from_secs(env_or(
                "MODEL_TIMEOUT_SECS",
                defaults.model_timeout.as_secs(),
            )?),
            cache_ttl: Duration::from_secs(env_or(
                "FORECAST_CACHE_TTL_SECS",
                defaults.cache_ttl.as_secs(),
            )?),
        })
    }

    /// Build the instrument for `symbol`, filling unset fields from this config.
    /// The range ends today (UTC) unless `end` is given.
    pub fn instrument(
        &self,
        symbol: &str,
        quote_currency: Option<&str>,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<InstrumentSpec, ForecastError> {
        InstrumentSpec::new(
            symbol,
            quote_currency.unwrap_or(&self.quote_currency),
            start.unwrap_or(self.history_start),
            end.unwrap_or_else(|| Utc::now().date_naive()),
        )
    }
}
