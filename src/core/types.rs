use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::time::Duration;

/// Dimension value that matches any discovered value.
pub const DIMENSION_WILDCARD: &str = "*";

/// Name/value attribute scoping a metric to one resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    /// Dimension name, e.g. `InstanceId`
    pub name: String,
    /// Dimension value, or `*` in discovery configuration
    pub value: String,
}

impl Dimension {
    /// Creates a new dimension
    pub fn new<N: Into<String>, V: Into<String>>(name: N, value: V) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Returns true if the value is the wildcard sentinel
    pub fn is_wildcard(&self) -> bool {
        self.value == DIMENSION_WILDCARD
    }
}

/// Ordered dimension list. Order pairs names with values inside labels.
pub type Dimensions = SmallVec<[Dimension; 4]>;

/// Metric identity as known to the remote metrics API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Metric {
    /// Namespace such as `AWS/EC2`
    pub namespace: String,
    /// Metric name such as `CPUUtilization`
    pub metric_name: String,
    /// Ordered dimensions
    #[serde(default)]
    pub dimensions: Dimensions,
}

impl Metric {
    /// Creates a metric with the given dimensions
    pub fn new<N, M, I>(namespace: N, metric_name: M, dimensions: I) -> Self
    where
        N: Into<String>,
        M: Into<String>,
        I: IntoIterator<Item = Dimension>,
    {
        Self {
            namespace: namespace.into(),
            metric_name: metric_name.into(),
            dimensions: dimensions.into_iter().collect(),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.metric_name)?;
        for dim in &self.dimensions {
            write!(f, " {}={}", dim.name, dim.value)?;
        }
        Ok(())
    }
}

/// Metric catalog entry reported by the remote API.
pub type DiscoveredMetric = Metric;

/// A metric paired with the statistics requested for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricRequest {
    /// The metric to query
    pub metric: Metric,
    /// Statistic names as accepted by the remote API (`Average`, `p99`, ...)
    pub statistics: Vec<String>,
}

/// Resource tag, also used as a required key/value pair in tag filters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    /// Tag key
    pub key: String,
    /// Tag value
    pub value: String,
}

impl Tag {
    /// Creates a new tag
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Account the collector runs under.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountContext {
    /// Account id, folded into fallback identities
    pub id: String,
    /// Human-readable account alias
    pub name: String,
}

impl AccountContext {
    /// Creates a new account context
    pub fn new<I: Into<String>, N: Into<String>>(id: I, name: N) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Query window handed to the batched metric query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    /// Inclusive start
    pub start: DateTime<Utc>,
    /// Exclusive end
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// Window of one `period` ending `latency` before `now`.
    pub fn new(now: DateTime<Utc>, period: Duration, latency: Duration) -> Self {
        let end = now - to_chrono(latency);
        let start = end - to_chrono(period);
        Self { start, end }
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or_else(|_| chrono::Duration::zero())
}

/// Replaces every `.` with `_` so a name can be used as a single field path segment.
pub fn dedot(name: &str) -> String {
    name.replace('.', "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_time_window() {
        let now = Utc.with_ymd_and_hms(2024, 3, 11, 17, 45, 0).unwrap();
        let window = TimeWindow::new(now, Duration::from_secs(300), Duration::from_secs(60));
        assert_eq!(window.end, Utc.with_ymd_and_hms(2024, 3, 11, 17, 44, 0).unwrap());
        assert_eq!(window.start, Utc.with_ymd_and_hms(2024, 3, 11, 17, 39, 0).unwrap());
    }

    #[test]
    fn test_dedot() {
        assert_eq!(dedot("aws.cloudformation.stack"), "aws_cloudformation_stack");
        assert_eq!(dedot("CPUUtilization"), "CPUUtilization");
    }

    #[test]
    fn test_wildcard_dimension() {
        assert!(Dimension::new("InstanceId", "*").is_wildcard());
        assert!(!Dimension::new("InstanceId", "i-123").is_wildcard());
    }

    #[test]
    fn test_metric_display() {
        let metric = Metric::new("AWS/EC2", "CPUUtilization", [Dimension::new("InstanceId", "i-1")]);
        assert_eq!(metric.to_string(), "AWS/EC2/CPUUtilization InstanceId=i-1");
    }
}
