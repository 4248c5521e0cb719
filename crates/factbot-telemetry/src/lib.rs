//! FactBot Telemetry
//!
//! Metrics for the moderation pipeline.
//!
//! Provides:
//! - Metric names shared by every crate that records through the `metrics` facade
//! - Descriptions registered with the installed recorder
//! - An in-process counter snapshot for the stats endpoint

pub mod metrics;

pub use crate::metrics::{describe_metrics, MetricsSnapshot, ModerationMetrics};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::metrics::{names, MetricsSnapshot, ModerationMetrics};
}
