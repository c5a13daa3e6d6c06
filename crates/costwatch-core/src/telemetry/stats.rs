//! Windowed aggregation of usage records

use crate::models::{Metric, UsageRecord};

/// Aggregated usage statistics over an evaluation window
#[derive(Debug, Clone, Default)]
pub struct UsageStats {
    /// Number of calls in the window
    pub call_count: i64,

    /// Number of errored calls
    pub error_count: i64,

    /// Total cost
    pub cost_sum: f64,

    /// Total duration in milliseconds
    pub duration_ms_sum: f64,

    /// Total tokens
    pub token_sum: i64,
}

impl UsageStats {
    /// Aggregate a slice of usage records
    pub fn aggregate(records: &[UsageRecord]) -> Self {
        let mut stats = Self::default();

        for record in records {
            stats.call_count += 1;
            if record.is_error() {
                stats.error_count += 1;
            }
            stats.cost_sum += record.cost;
            stats.duration_ms_sum += record.duration_ms;
            stats.token_sum += record.tokens.total;
        }

        stats
    }

    /// Observed value for a metric, or `None` when the window has no data
    /// to support a rate or average
    pub fn observed(&self, metric: Metric) -> Option<f64> {
        match metric {
            Metric::DailyCost => Some(self.cost_sum),
            Metric::TokenTotal => Some(self.token_sum as f64),
            Metric::ErrorRate => {
                if self.call_count == 0 {
                    None
                } else {
                    Some(self.error_count as f64 / self.call_count as f64 * 100.0)
                }
            }
            Metric::AvgLatency => {
                if self.call_count == 0 {
                    None
                } else {
                    Some(self.duration_ms_sum / self.call_count as f64)
                }
            }
        }
    }
}
