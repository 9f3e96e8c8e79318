//! On-demand aggregation across the monitor's stores

use serde::Serialize;

use crate::logs::PipelineStats;
use crate::memory::MemorySummary;
use crate::records::EventStatistics;
use crate::subscriptions::SubscriptionCounts;

/// Direction of a metric across its recent window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

impl Trend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
            Self::Stable => "stable",
        }
    }
}

/// Classify a series by comparing the mean of its first half against the
/// mean of its second half; a ±10% band counts as stable.
pub fn classify_trend(values: &[f64]) -> Trend {
    if values.len() < 2 {
        return Trend::Stable;
    }

    let mid = values.len() / 2;
    let (first, second) = values.split_at(mid);
    let mean = |slice: &[f64]| slice.iter().sum::<f64>() / slice.len() as f64;

    let first_mean = mean(first);
    let second_mean = mean(second);

    if second_mean > first_mean * 1.1 {
        Trend::Increasing
    } else if second_mean < first_mean * 0.9 {
        Trend::Decreasing
    } else {
        Trend::Stable
    }
}

/// Combined point-in-time view of everything the monitor knows
#[derive(Debug, Clone, Serialize)]
pub struct MonitorReport {
    pub statistics: EventStatistics,
    pub subscriptions: SubscriptionCounts,
    /// `None` before the first memory sample
    pub memory: Option<MemorySummary>,
    /// Trend over the RSS values in the sample window
    pub memory_trend: Trend,
    pub events_per_second: f64,
    pub pipeline: PipelineStats,
}
