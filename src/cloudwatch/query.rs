//! Batched query descriptors and the label codec that carries identity through them.
//!
//! The remote query engine only echoes a query's label back with its result,
//! so the label encodes everything needed to rebuild the metric identity:
//!
//! ```text
//! metricName|namespace|statistic[|dimName1,dimName2|dimValue1,dimValue2]
//! ```

use crate::core::{CollectorError, Metric, MetricRequest, Result};
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Separates the top-level label fields.
pub const LABEL_SEPARATOR: char = '|';
/// Joins dimension names and dimension values inside one label field.
pub const DIMENSION_SEPARATOR: char = ',';

/// One entry of a batched metric query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryDescriptor {
    /// Identifier, unique within the batch
    pub id: String,
    /// Metric to query
    pub metric: Metric,
    /// Statistic name as the remote API expects it
    pub statistic: String,
    /// Aggregation period in whole seconds
    pub period_secs: u32,
    /// Encoded label, see [`Label`]
    pub label: String,
}

/// Emits one descriptor per (metric, statistic) pair in request order.
pub fn build_queries(requests: &[MetricRequest], period: Duration) -> Vec<QueryDescriptor> {
    let period_secs = u32::try_from(period.as_secs()).unwrap_or(u32::MAX);
    let mut queries = Vec::with_capacity(requests.iter().map(|r| r.statistics.len()).sum());

    for (i, request) in requests.iter().enumerate() {
        for (j, statistic) in request.statistics.iter().enumerate() {
            queries.push(QueryDescriptor {
                id: format!("cw{}stats{}", i, j),
                metric: request.metric.clone(),
                statistic: statistic.clone(),
                period_secs,
                label: Label::for_metric(&request.metric, statistic).to_string(),
            });
        }
    }

    queries
}

/// Dimension names and values, each comma-joined in the original order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelDimensions {
    /// Comma-joined dimension names
    pub names: String,
    /// Comma-joined dimension values; this is the resource identifier
    pub values: String,
}

/// Decoded query label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    /// Metric name
    pub metric_name: String,
    /// Namespace
    pub namespace: String,
    /// Statistic the query asked for
    pub statistic: String,
    /// Present only for metrics with dimensions
    pub dimensions: Option<LabelDimensions>,
}

impl Label {
    /// Builds the label of `metric` queried with `statistic`.
    pub fn for_metric(metric: &Metric, statistic: &str) -> Self {
        let dimensions = (!metric.dimensions.is_empty()).then(|| LabelDimensions {
            names: join(metric.dimensions.iter().map(|d| d.name.as_str())),
            values: join(metric.dimensions.iter().map(|d| d.value.as_str())),
        });

        Self {
            metric_name: metric.metric_name.clone(),
            namespace: metric.namespace.clone(),
            statistic: statistic.to_string(),
            dimensions,
        }
    }

    /// Decodes a label, rejecting any field count other than 3 or 5.
    pub fn decode(label: &str) -> Result<Self> {
        let fields: Vec<&str> = label.split(LABEL_SEPARATOR).collect();
        match fields.as_slice() {
            [metric_name, namespace, statistic] => Ok(Self {
                metric_name: (*metric_name).to_string(),
                namespace: (*namespace).to_string(),
                statistic: (*statistic).to_string(),
                dimensions: None,
            }),
            [metric_name, namespace, statistic, names, values] => Ok(Self {
                metric_name: (*metric_name).to_string(),
                namespace: (*namespace).to_string(),
                statistic: (*statistic).to_string(),
                dimensions: Some(LabelDimensions {
                    names: (*names).to_string(),
                    values: (*values).to_string(),
                }),
            }),
            _ => Err(CollectorError::MalformedLabel {
                label: label.to_string(),
                fields: fields.len(),
            }),
        }
    }

    /// Resource identifier carried by the label, if any.
    pub fn identifier(&self) -> Option<&str> {
        self.dimensions.as_ref().map(|d| d.values.as_str())
    }

    /// Number of dimension names and values, if the label carries dimensions.
    pub fn dimension_counts(&self) -> Option<(usize, usize)> {
        self.dimensions.as_ref().map(|d| {
            (
                d.names.split(DIMENSION_SEPARATOR).count(),
                d.values.split(DIMENSION_SEPARATOR).count(),
            )
        })
    }

    /// Dimension name/value pairs in their original order.
    ///
    /// Pairs stop at the shorter side; a count mismatch is logged.
    pub fn dimension_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        if let Some((names, values)) = self.dimension_counts() {
            if names != values {
                tracing::error!(
                    label = %self,
                    names,
                    values,
                    "Dimension names and values differ in count, dropping unpaired entries"
                );
            }
        }

        self.dimensions.iter().flat_map(|d| {
            d.names
                .split(DIMENSION_SEPARATOR)
                .zip(d.values.split(DIMENSION_SEPARATOR))
        })
    }
}

impl FromStr for Label {
    type Err = CollectorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::decode(s)
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.metric_name,
            self.namespace,
            self.statistic,
            sep = LABEL_SEPARATOR
        )?;
        if let Some(dims) = &self.dimensions {
            write!(f, "{sep}{}{sep}{}", dims.names, dims.values, sep = LABEL_SEPARATOR)?;
        }
        Ok(())
    }
}

fn join<'a>(parts: impl Iterator<Item = &'a str>) -> String {
    let mut joined = String::new();
    for (i, part) in parts.enumerate() {
        if i > 0 {
            joined.push(DIMENSION_SEPARATOR);
        }
        joined.push_str(part);
    }
    joined
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Dimension;

    fn cpu(instance: &str) -> Metric {
        Metric::new("AWS/EC2", "CPUUtilization", [Dimension::new("InstanceId", instance)])
    }

    #[test]
    fn test_label_round_trip() {
        let encoded = Label::for_metric(&cpu("i-1"), "avg").to_string();
        assert_eq!(encoded, "CPUUtilization|AWS/EC2|avg|InstanceId|i-1");

        let label = Label::decode(&encoded).unwrap();
        assert_eq!(label.metric_name, "CPUUtilization");
        assert_eq!(label.namespace, "AWS/EC2");
        assert_eq!(label.statistic, "avg");
        assert_eq!(label.identifier(), Some("i-1"));
        assert_eq!(label.dimension_pairs().collect::<Vec<_>>(), vec![("InstanceId", "i-1")]);
    }

    #[test]
    fn test_label_keeps_dimension_order() {
        let metric = Metric::new(
            "AWS/S3",
            "BucketSizeBytes",
            [
                Dimension::new("StorageType", "StandardStorage"),
                Dimension::new("BucketName", "logs"),
            ],
        );
        let label: Label = Label::for_metric(&metric, "Average").to_string().parse().unwrap();

        assert_eq!(label.identifier(), Some("StandardStorage,logs"));
        assert_eq!(
            label.dimension_pairs().collect::<Vec<_>>(),
            vec![("StorageType", "StandardStorage"), ("BucketName", "logs")]
        );
    }

    #[test]
    fn test_dimension_value_with_separator() {
        let metric = Metric::new(
            "Custom/App",
            "Requests",
            [Dimension::new("Route", "/a,b"), Dimension::new("Host", "web-1")],
        );
        let label = Label::for_metric(&metric, "Sum");

        assert_eq!(label.dimension_counts(), Some((2, 3)));
        assert_eq!(
            label.dimension_pairs().collect::<Vec<_>>(),
            vec![("Route", "/a"), ("Host", "b")]
        );
    }

    #[test]
    fn test_label_without_dimensions() {
        let metric = Metric::new("AWS/Billing", "EstimatedCharges", Vec::new());
        let encoded = Label::for_metric(&metric, "Maximum").to_string();
        assert_eq!(encoded, "EstimatedCharges|AWS/Billing|Maximum");

        let label = Label::decode(&encoded).unwrap();
        assert!(label.identifier().is_none());
        assert_eq!(label.dimension_counts(), None);
        assert_eq!(label.dimension_pairs().count(), 0);
    }

    #[test]
    fn test_malformed_labels() {
        for bad in ["", "a|b", "a|b|c|d", "a|b|c|d|e|f"] {
            match Label::decode(bad) {
                Err(CollectorError::MalformedLabel { fields, .. }) => {
                    assert_eq!(fields, bad.split('|').count());
                },
                other => panic!("expected malformed label for {:?}, got {:?}", bad, other),
            }
        }
    }

    #[test]
    fn test_build_queries_ids_are_unique() {
        let requests = vec![
            MetricRequest {
                metric: cpu("i-1"),
                statistics: vec!["Average".into(), "Maximum".into()],
            },
            MetricRequest {
                metric: cpu("i-2"),
                statistics: vec!["Average".into()],
            },
        ];
        let queries = build_queries(&requests, Duration::from_secs(300));

        let ids: Vec<_> = queries.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["cw0stats0", "cw0stats1", "cw1stats0"]);
        assert!(queries.iter().all(|q| q.period_secs == 300));
        assert_eq!(queries[1].statistic, "Maximum");
        assert_eq!(queries[2].label, "CPUUtilization|AWS/EC2|Average|InstanceId|i-2");
    }

    #[test]
    fn test_build_queries_empty() {
        assert!(build_queries(&[], Duration::from_secs(60)).is_empty());
    }
}
