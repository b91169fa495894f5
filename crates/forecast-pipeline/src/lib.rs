//! Retrieval → normalization → forecast → reconciliation → presentation.

pub mod config;
pub mod normalizer;
pub mod pipeline;
pub mod presenter;
pub mod reconciler;
pub mod service;


pub use config::PipelineConfig;
pub use normalizer::normalize;
pub use pipeline::ForecastPipeline;
pub use presenter::{
    present, ClosePoint, ColumnSummary, DashboardReport, FitQuality, OhlcPoint, SeriesStatistics,
    VolumePoint,
};
pub use reconciler::{reconcile, Reconciliation};
pub use service::ForecastService;
