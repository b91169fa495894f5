pub mod chart;

use async_trait::async_trait;
use chrono::NaiveTime;
use forecast_core::config::env_or;
use forecast_core::{ConfigError, ForecastError, HistorySource, InstrumentSpec, RawRecord};
use reqwest::{Client, StatusCode};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

pub use chart::parse_chart;

const DEFAULT_BASE_URL: &str = "https://query2.finance.yahoo.com";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";
const MAX_ATTEMPTS: u32 = 3;

/// Connection settings for [`YahooFinanceClient`].
#[derive(Debug, Clone)]
pub struct YahooConfig {
    pub base_url: String,
    /// Requests allowed per minute.
    pub rate_limit: usize,
    pub timeout: Duration,
    /// Emit a debug event for every outgoing request.
    pub trace_requests: bool,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            rate_limit: 60,
            timeout: Duration::from_secs(30),
            trace_requests: false,
        }
    }
}

impl YahooConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            base_url: std::env::var("YAHOO_BASE_URL").unwrap_or(defaults.base_url),
            rate_limit: env_or("YAHOO_RATE_LIMIT", defaults.rate_limit)?,
            timeout: Duration::from_secs(env_or(
                "YAHOO_TIMEOUT_SECS",
                defaults.timeout.as_secs(),
            )?),
            trace_requests: env_or("YAHOO_TRACE_REQUESTS", defaults.trace_requests)?,
        })
    }
}

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
struct RateLimiter {
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request falls out of the window
            let sleep_dur = match ts.front() {
                Some(&oldest) => (oldest + self.window).duration_since(now) + Duration::from_millis(50),
                None => Duration::from_millis(50),
            };
            drop(ts);
            tracing::debug!("Rate limiter: waiting {:.1}s for Yahoo slot", sleep_dur.as_secs_f64());
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

/// Daily history from the Yahoo Finance chart endpoint.
#[derive(Clone)]
pub struct YahooFinanceClient {
    client: Client,
    config: YahooConfig,
    rate_limiter: RateLimiter,
}

impl YahooFinanceClient {
    pub fn new(config: YahooConfig) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            rate_limiter: RateLimiter::new(config.rate_limit, Duration::from_secs(60)),
            config,
        }
    }

    /// Chart URL for `spec`. The range end is inclusive, so `period2` is midnight
    /// UTC of the following day.
    pub fn chart_url(&self, spec: &InstrumentSpec) -> String {
        let period1 = spec.range_start.and_time(NaiveTime::MIN).and_utc().timestamp();
        let end = spec.range_end.succ_opt().unwrap_or(spec.range_end);
        let period2 = end.and_time(NaiveTime::MIN).and_utc().timestamp();

        format!(
            "{}/v8/finance/chart/{}?period1={}&period2={}&interval=1d&events=history",
            self.config.base_url.trim_end_matches('/'),
            spec.ticker(),
            period1,
            period2
        )
    }

    /// Send a request with rate limiting and automatic 429 retry.
    async fn send_request(&self, url: &str) -> Result<reqwest::Response, ForecastError> {
        for attempt in 0..MAX_ATTEMPTS {
            self.rate_limiter.acquire().await;
            if self.config.trace_requests {
                tracing::debug!("GET {}", url);
            }

            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| ForecastError::Retrieval(format!("request failed: {}", e)))?;

            if response.status() != StatusCode::TOO_MANY_REQUESTS {
                return Ok(response);
            }

            let wait_secs = 5u64 * (attempt as u64 + 1);
            tracing::warn!(
                "Yahoo 429 rate limited, waiting {}s before retry {}/{}",
                wait_secs,
                attempt + 1,
                MAX_ATTEMPTS
            );
            tokio::time::sleep(Duration::from_secs(wait_secs)).await;
        }

        Err(ForecastError::Retrieval(format!(
            "rate limited by Yahoo after {} retries",
            MAX_ATTEMPTS
        )))
    }

    /// Get daily historical records for the instrument and range in `spec`.
    pub async fn get_history(&self, spec: &InstrumentSpec) -> Result<Vec<RawRecord>, ForecastError> {
        let ticker = spec.ticker();
        let url = self.chart_url(spec);
        let response = self.send_request(&url).await?;
        let status = response.status();

        let body = response
            .text()
            .await
            .map_err(|e| ForecastError::Retrieval(format!("failed to read body: {}", e)))?;

        if status == StatusCode::NOT_FOUND {
            // Yahoo answers unknown tickers with 404 and a chart.error payload
            return match serde_json::from_str::<serde_json::Value>(&body) {
                Ok(json) => parse_chart(&json, &ticker),
                Err(_) => Err(ForecastError::Retrieval(format!("unknown symbol {}", ticker))),
            };
        }

        if !status.is_success() {
            return Err(ForecastError::Retrieval(format!("HTTP {}: {}", status, body)));
        }

        let json: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| ForecastError::Retrieval(format!("invalid chart JSON: {}", e)))?;

        let records = parse_chart(&json, &ticker)?;
        tracing::info!("Fetched {} daily records for {}", records.len(), ticker);
        Ok(records)
    }
}

impl Default for YahooFinanceClient {
    fn default() -> Self {
        Self::new(YahooConfig::default())
    }
}

#[async_trait]
impl HistorySource for YahooFinanceClient {
    async fn fetch(&self, spec: &InstrumentSpec) -> Result<Vec<RawRecord>, ForecastError> {
        self.get_history(spec).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn spec() -> InstrumentSpec {
        InstrumentSpec::new(
            "btc",
            "usd",
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_chart_url_includes_range_end() {
        let client = YahooFinanceClient::new(YahooConfig {
            base_url: "http://localhost:9999/".to_string(),
            ..YahooConfig::default()
        });

        let url = client.chart_url(&spec());
        assert_eq!(
            url,
            "http://localhost:9999/v8/finance/chart/BTC-USD?period1=1704067200&period2=1704931200&interval=1d&events=history"
        );
    }

    #[test]
    fn test_default_config() {
        let config = YahooConfig::default();
        assert_eq!(config.rate_limit, 60);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(!config.trace_requests);
    }

    #[tokio::test]
    async fn test_rate_limiter_admits_within_budget() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let started = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
        }
        assert!(started.elapsed() < Duration::from_secs(1));
        assert_eq!(limiter.timestamps.lock().await.len(), 3);
    }

    #[tokio::test]
    async fn test_unreachable_host_is_retrieval_error() {
        let client = YahooFinanceClient::new(YahooConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            timeout: Duration::from_secs(2),
            ..YahooConfig::default()
        });

        let err = client.fetch(&spec()).await.unwrap_err();
        assert!(matches!(err, ForecastError::Retrieval(_)));
    }
}
