//! Long-term statistics types.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// ============================================================================
// StatisticsPeriod
// ============================================================================

/// Aggregation period for statistics queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatisticsPeriod {
    /// 5-minute buckets.
    #[serde(rename = "5minute")]
    FiveMinute,
    /// Hourly buckets.
    #[default]
    Hour,
    /// Daily buckets.
    Day,
    /// Weekly buckets.
    Week,
    /// Monthly buckets.
    Month,
}

// ============================================================================
// StatisticsQuery
// ============================================================================

/// Parameters for a statistics-during-period read.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatisticsQuery {
    /// Start time (ISO 8601).
    pub start_time: String,
    /// End time (ISO 8601), open-ended if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    /// Statistic ids to read.
    pub statistic_ids: Vec<String>,
    /// Bucket size.
    pub period: StatisticsPeriod,
    /// Value kinds to include (`mean`, `min`, `max`, `sum`, `state`, `change`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,
}

impl StatisticsQuery {
    /// Creates an hourly query starting at `start_time`.
    #[must_use]
    pub fn new<I, S>(start_time: impl Into<String>, statistic_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            start_time: start_time.into(),
            statistic_ids: statistic_ids.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Sets the end time.
    #[must_use]
    pub fn with_end_time(mut self, end_time: impl Into<String>) -> Self {
        self.end_time = Some(end_time.into());
        self
    }

    /// Sets the period.
    #[must_use]
    pub fn with_period(mut self, period: StatisticsPeriod) -> Self {
        self.period = period;
        self
    }
}

// ============================================================================
// StatisticValue
// ============================================================================

/// One aggregated statistics bucket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticValue {
    /// Bucket start (epoch millis or ISO string depending on hub version).
    pub start: Value,
    /// Bucket end.
    #[serde(default)]
    pub end: Option<Value>,
    /// Mean value.
    #[serde(default)]
    pub mean: Option<f64>,
    /// Minimum value.
    #[serde(default)]
    pub min: Option<f64>,
    /// Maximum value.
    #[serde(default)]
    pub max: Option<f64>,
    /// Running sum.
    #[serde(default)]
    pub sum: Option<f64>,
    /// Last state.
    #[serde(default)]
    pub state: Option<f64>,
    /// Change over the bucket.
    #[serde(default)]
    pub change: Option<f64>,
}

// ============================================================================
// StatisticMetadata
// ============================================================================

/// Metadata of a recorded statistic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticMetadata {
    /// Statistic id.
    pub statistic_id: String,
    /// Source integration.
    #[serde(default)]
    pub source: Option<String>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Unit of the statistic.
    #[serde(default)]
    pub statistics_unit_of_measurement: Option<String>,
    /// Whether mean/min/max are recorded.
    #[serde(default)]
    pub has_mean: bool,
    /// Whether sum is recorded.
    #[serde(default)]
    pub has_sum: bool,
    /// Remaining fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

// ============================================================================
// Tests
// ============================================================================
