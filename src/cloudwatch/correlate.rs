//! Picks one timestamp for a whole batch of query results and reads every series at it.

use ahash::AHashMap;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One sample of a result series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataPoint {
    /// Sample time
    pub timestamp: DateTime<Utc>,
    /// Sample value
    pub value: f64,
}

/// Time series returned for one query descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// Label echoed back from the descriptor
    pub label: String,
    /// Samples, possibly empty
    #[serde(default)]
    pub points: Vec<DataPoint>,
}

impl QueryResult {
    /// Creates a result from `(timestamp, value)` pairs
    pub fn new<S, I>(label: S, points: I) -> Self
    where
        S: Into<String>,
        I: IntoIterator<Item = (DateTime<Utc>, f64)>,
    {
        Self {
            label: label.into(),
            points: points
                .into_iter()
                .map(|(timestamp, value)| DataPoint { timestamp, value })
                .collect(),
        }
    }

    /// Value sampled exactly at `timestamp`
    pub fn value_at(&self, timestamp: DateTime<Utc>) -> Option<f64> {
        self.points
            .iter()
            .find(|point| point.timestamp == timestamp)
            .map(|point| point.value)
    }
}

/// A result's value at the alignment timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignedValue<'a> {
    /// Label of the contributing result
    pub label: &'a str,
    /// Value at the alignment timestamp
    pub value: f64,
}

/// Values of every series that has a sample at the shared timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment<'a> {
    /// Timestamp shared by every event of the batch
    pub timestamp: DateTime<Utc>,
    /// Aligned values in result order
    pub values: Vec<AlignedValue<'a>>,
}

/// Most frequent timestamp across all non-empty series, latest on ties.
///
/// A timestamp repeated inside one series counts once for that series.
/// Returns `None` when no series has any sample.
pub fn alignment_timestamp(results: &[QueryResult]) -> Option<DateTime<Utc>> {
    let mut frequency: AHashMap<DateTime<Utc>, usize> = AHashMap::new();
    let mut seen = Vec::new();

    for result in results {
        seen.clear();
        for point in &result.points {
            if !seen.contains(&point.timestamp) {
                seen.push(point.timestamp);
                *frequency.entry(point.timestamp).or_insert(0) += 1;
            }
        }
    }

    frequency
        .into_iter()
        .max_by(|(ts_a, count_a), (ts_b, count_b)| count_a.cmp(count_b).then(ts_a.cmp(ts_b)))
        .map(|(timestamp, _)| timestamp)
}

/// Reads each series at the alignment timestamp; misaligned series are skipped.
pub fn align(results: &[QueryResult]) -> Option<Alignment<'_>> {
    let timestamp = alignment_timestamp(results)?;

    let values = results
        .iter()
        .filter_map(|result| {
            let value = result.value_at(timestamp);
            if value.is_none() && !result.points.is_empty() {
                tracing::debug!(label = %result.label, %timestamp, "No sample at alignment timestamp");
            }
            value.map(|value| AlignedValue {
                label: &result.label,
                value,
            })
        })
        .collect();

    Some(Alignment { timestamp, values })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 11, 17, minute, 0).unwrap()
    }

    #[test]
    fn test_no_samples() {
        let results = vec![QueryResult::new("a|b|c", Vec::new()), QueryResult::new("d|e|f", Vec::new())];
        assert_eq!(alignment_timestamp(&results), None);
        assert!(align(&results).is_none());
        assert!(align(&[]).is_none());
    }

    #[test]
    fn test_most_frequent_wins() {
        let results = vec![
            QueryResult::new("a", [(at(40), 1.0), (at(45), 2.0)]),
            QueryResult::new("b", [(at(40), 3.0)]),
        ];
        assert_eq!(alignment_timestamp(&results), Some(at(40)));

        let alignment = align(&results).unwrap();
        assert_eq!(alignment.timestamp, at(40));
        assert_eq!(
            alignment.values,
            vec![
                AlignedValue { label: "a", value: 1.0 },
                AlignedValue { label: "b", value: 3.0 },
            ]
        );
    }

    #[test]
    fn test_ties_break_to_latest() {
        let results = vec![
            QueryResult::new("a", [(at(45), 2.0), (at(40), 1.0)]),
            QueryResult::new("b", [(at(35), 3.0)]),
        ];
        assert_eq!(alignment_timestamp(&results), Some(at(45)));
    }

    #[test]
    fn test_misaligned_series_skipped() {
        let results = vec![
            QueryResult::new("a", [(at(45), 2.0)]),
            QueryResult::new("b", [(at(45), 5.0)]),
            QueryResult::new("c", [(at(30), 9.0)]),
            QueryResult::new("d", Vec::new()),
        ];
        let alignment = align(&results).unwrap();

        let labels: Vec<_> = alignment.values.iter().map(|v| v.label).collect();
        assert_eq!(labels, vec!["a", "b"]);
    }

    #[test]
    fn test_duplicate_timestamps_count_once_per_series() {
        let results = vec![
            QueryResult::new("a", [(at(30), 1.0), (at(30), 1.0), (at(30), 1.0)]),
            QueryResult::new("b", [(at(45), 2.0)]),
            QueryResult::new("c", [(at(45), 3.0)]),
        ];
        assert_eq!(alignment_timestamp(&results), Some(at(45)));
    }
}
