//! Common test utilities and fixtures.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use cloudwatch_collector::api::{MetricsApi, TaggingApi};
use cloudwatch_collector::cloudwatch::correlate::{DataPoint, QueryResult};
use cloudwatch_collector::cloudwatch::tags::TagMap;
use cloudwatch_collector::cloudwatch::QueryDescriptor;
use cloudwatch_collector::core::{
    CollectorError, Dimension, DiscoveredMetric, Metric, Result, Tag, TimeWindow,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// Fixed collection time used by every test, `2024-03-11T17:45:00Z`.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 11, 17, 45, 0).unwrap()
}

/// `minutes` before [`now`].
pub fn minutes_ago(minutes: i64) -> DateTime<Utc> {
    now() - Duration::minutes(minutes)
}

/// EC2 metric keyed by instance id.
pub fn ec2_metric(name: &str, instance_id: &str) -> Metric {
    Metric::new("AWS/EC2", name, [Dimension::new("InstanceId", instance_id)])
}

#[derive(Default)]
struct MockRegion {
    catalog: Vec<Metric>,
    samples: HashMap<(Metric, String), Vec<DataPoint>>,
    resources: HashMap<String, TagMap>,
}

/// In-memory metrics and tagging backend with per-call failure injection.
#[derive(Default)]
pub struct MockCloud {
    regions: HashMap<String, MockRegion>,
    failing_catalogs: HashSet<(String, String)>,
    failing_queries: HashSet<(String, String)>,
    failing_tags: HashSet<(String, String)>,
    calls: Mutex<Vec<String>>,
}

impl MockCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lists `metric` in the catalog of `region`.
    pub fn metric(mut self, region: &str, metric: Metric) -> Self {
        self.region_mut(region).catalog.push(metric);
        self
    }

    /// Adds a sample without touching the catalog.
    pub fn sample(
        mut self,
        region: &str,
        metric: &Metric,
        statistic: &str,
        timestamp: DateTime<Utc>,
        value: f64,
    ) -> Self {
        self.region_mut(region)
            .samples
            .entry((metric.clone(), statistic.to_string()))
            .or_default()
            .push(DataPoint { timestamp, value });
        self
    }

    /// Lists `metric` and gives it one sample.
    pub fn metric_with_sample(
        self,
        region: &str,
        metric: Metric,
        statistic: &str,
        timestamp: DateTime<Utc>,
        value: f64,
    ) -> Self {
        self.sample(region, &metric, statistic, timestamp, value)
            .metric(region, metric)
    }

    /// Registers a tagged resource of `resource_type` under `identifier`.
    pub fn resource(
        mut self,
        region: &str,
        resource_type: &str,
        identifier: &str,
        tags: &[(&str, &str)],
    ) -> Self {
        let tags = tags.iter().map(|(k, v)| Tag::new(*k, *v)).collect();
        self.region_mut(region)
            .resources
            .entry(resource_type.to_string())
            .or_default()
            .insert(identifier.to_string(), tags);
        self
    }

    pub fn fail_list_metrics(mut self, region: &str, namespace: &str) -> Self {
        self.failing_catalogs
            .insert((region.to_string(), namespace.to_string()));
        self
    }

    /// Fails batches whose first query targets `namespace`.
    pub fn fail_metric_data(mut self, region: &str, namespace: &str) -> Self {
        self.failing_queries
            .insert((region.to_string(), namespace.to_string()));
        self
    }

    pub fn fail_tags(mut self, region: &str, resource_type: &str) -> Self {
        self.failing_tags
            .insert((region.to_string(), resource_type.to_string()));
        self
    }

    /// Every call made so far, e.g. `GetMetricData us-east-1 3`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Number of recorded calls starting with `operation`.
    pub fn call_count(&self, operation: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call.starts_with(operation))
            .count()
    }

    fn region_mut(&mut self, region: &str) -> &mut MockRegion {
        self.regions.entry(region.to_string()).or_default()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl MetricsApi for MockCloud {
    async fn list_metrics(&self, namespace: &str, region: &str) -> Result<Vec<DiscoveredMetric>> {
        self.record(format!("ListMetrics {} {}", region, namespace));

        if self
            .failing_catalogs
            .contains(&(region.to_string(), namespace.to_string()))
        {
            return Err(CollectorError::api("ListMetrics", region, "access denied"));
        }

        Ok(self
            .regions
            .get(region)
            .map(|r| {
                r.catalog
                    .iter()
                    .filter(|m| m.namespace == namespace)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn get_metric_data(
        &self,
        queries: &[QueryDescriptor],
        region: &str,
        window: TimeWindow,
    ) -> Result<Vec<QueryResult>> {
        self.record(format!("GetMetricData {} {}", region, queries.len()));

        if let Some(first) = queries.first() {
            if self
                .failing_queries
                .contains(&(region.to_string(), first.metric.namespace.clone()))
            {
                return Err(CollectorError::api("GetMetricData", region, "throttled"));
            }
        }

        let mock_region = self.regions.get(region);
        Ok(queries
            .iter()
            .map(|query| {
                let mut points: Vec<DataPoint> = mock_region
                    .and_then(|r| {
                        r.samples
                            .get(&(query.metric.clone(), query.statistic.clone()))
                    })
                    .map(|points| {
                        points
                            .iter()
                            .filter(|p| p.timestamp >= window.start && p.timestamp < window.end)
                            .copied()
                            .collect()
                    })
                    .unwrap_or_default();
                points.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

                QueryResult {
                    label: query.label.clone(),
                    points,
                }
            })
            .collect())
    }
}

#[async_trait::async_trait]
impl TaggingApi for MockCloud {
    async fn get_resource_tags(&self, resource_type: &str, region: &str) -> Result<TagMap> {
        self.record(format!("GetResources {} {}", region, resource_type));

        if self
            .failing_tags
            .contains(&(region.to_string(), resource_type.to_string()))
        {
            return Err(CollectorError::api("GetResources", region, "service unavailable"));
        }

        Ok(self
            .regions
            .get(region)
            .and_then(|r| r.resources.get(resource_type))
            .cloned()
            .unwrap_or_default())
    }
}
