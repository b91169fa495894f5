use chrono::{DateTime, Utc};
use dashmap::DashMap;
use forecast_core::{InstrumentSpec, PipelineError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::pipeline::ForecastPipeline;
use crate::presenter::DashboardReport;

type ReportCell = Arc<OnceCell<Arc<DashboardReport>>>;

/// Internal cache entry with timestamp
struct CacheEntry<T> {
    data: T,
    cached_at: DateTime<Utc>,
}

impl<T> CacheEntry<T> {
    fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
        }
    }
}

/// Concurrent front door to [`ForecastPipeline`].
///
/// Callers asking for the same instrument and range while a run is in flight
/// wait for that run instead of starting their own. Finished reports are reused
/// for `cache_ttl`; failures are never kept. Every request first drops finished
/// reports that have expired, so stale ranges do not accumulate.
pub struct ForecastService {
    pipeline: Arc<ForecastPipeline>,
    reports: DashMap<InstrumentSpec, CacheEntry<ReportCell>>,
    cache_ttl: Duration,
}

impl ForecastService {
    pub fn new(pipeline: ForecastPipeline) -> Self {
        let cache_ttl = pipeline.config().cache_ttl;
        Self {
            pipeline: Arc::new(pipeline),
            reports: DashMap::new(),
            cache_ttl,
        }
    }

    pub async fn get_report(
        &self,
        spec: &InstrumentSpec,
    ) -> Result<Arc<DashboardReport>, PipelineError> {
        self.purge_expired();
        let cell = self.cell_for(spec);
        let computed = AtomicBool::new(false);

        let result = cell
            .get_or_try_init(|| async {
                computed.store(true, Ordering::Relaxed);
                let report = self.pipeline.run(spec).await?;
                Ok::<_, PipelineError>(Arc::new(report))
            })
            .await
            .map(Arc::clone);

        match &result {
            Ok(_) if self.cache_ttl.is_zero() => self.evict(spec, &cell),
            Ok(_) if computed.load(Ordering::Relaxed) => self.mark_fresh(spec, &cell),
            Ok(_) => {}
            Err(_) => self.evict(spec, &cell),
        }

        result
    }

    /// Number of fingerprints currently tracked, finished or in flight.
    pub fn tracked(&self) -> usize {
        self.reports.len()
    }

    /// Drop finished reports older than the TTL. In-flight runs are kept.
    pub fn purge_expired(&self) {
        let before = self.reports.len();
        self.reports
            .retain(|_, entry| !(entry.data.initialized() && self.is_expired(entry)));
        let purged = before.saturating_sub(self.reports.len());
        if purged > 0 {
            tracing::debug!("Purged {} expired reports", purged);
        }
    }

    /// The shared cell for `spec`. In-flight cells are always shared; a finished
    /// cell is replaced once it has expired.
    fn cell_for(&self, spec: &InstrumentSpec) -> ReportCell {
        let mut entry = self
            .reports
            .entry(spec.clone())
            .or_insert_with(|| CacheEntry::new(Arc::new(OnceCell::new())));

        if entry.data.initialized() && self.is_expired(&entry) {
            tracing::debug!("Cached report for {} expired", spec.ticker());
            *entry = CacheEntry::new(Arc::new(OnceCell::new()));
        } else if entry.data.initialized() {
            tracing::debug!("Serving cached report for {}", spec.ticker());
        }

        Arc::clone(&entry.data)
    }

    fn is_expired(&self, entry: &CacheEntry<ReportCell>) -> bool {
        let age = (Utc::now() - entry.cached_at).to_std().unwrap_or_default();
        age >= self.cache_ttl
    }

    /// Restart the TTL clock from completion rather than from the first request.
    fn mark_fresh(&self, spec: &InstrumentSpec, cell: &ReportCell) {
        if let Some(mut entry) = self.reports.get_mut(spec) {
            if Arc::ptr_eq(&entry.data, cell) {
                entry.cached_at = Utc::now();
            }
        }
    }

    /// Remove `cell` unless another caller has already replaced it.
    fn evict(&self, spec: &InstrumentSpec, cell: &ReportCell) {
        self.reports
            .remove_if(spec, |_, entry| Arc::ptr_eq(&entry.data, cell));
    }
}
