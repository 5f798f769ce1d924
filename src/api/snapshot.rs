//! File-backed metrics and tagging API.
//!
//! A snapshot is a JSON document holding, per region, the metric catalog with
//! samples per statistic and the tagged resources:
//!
//! ```json
//! {
//!   "regions": {
//!     "us-east-1": {
//!       "metrics": [{
//!         "namespace": "AWS/EC2",
//!         "metric_name": "CPUUtilization",
//!         "dimensions": [{ "name": "InstanceId", "value": "i-0abc" }],
//!         "samples": { "Average": [{ "timestamp": "2024-03-11T17:40:00Z", "value": 12.5 }] }
//!       }],
//!       "resources": [{
//!         "arn": "arn:aws:ec2:us-east-1:123456789012:instance/i-0abc",
//!         "resource_type": "ec2:instance",
//!         "tags": [{ "key": "env", "value": "prod" }]
//!       }]
//!     }
//!   }
//! }
//! ```

use crate::api::{MetricsApi, TaggingApi};
use crate::cloudwatch::correlate::{DataPoint, QueryResult};
use crate::cloudwatch::query::QueryDescriptor;
use crate::cloudwatch::tags::{short_identifier_from_arn, TagMap};
use crate::core::{CollectorError, DiscoveredMetric, Metric, Result, Tag, TimeWindow};
use ahash::AHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Whole snapshot document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Data per region name
    #[serde(default)]
    pub regions: BTreeMap<String, RegionSnapshot>,
}

/// Catalog and resources of one region.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegionSnapshot {
    /// Metrics with their samples
    pub metrics: Vec<MetricSnapshot>,
    /// Tagged resources
    pub resources: Vec<ResourceSnapshot>,
}

/// One metric and its samples per statistic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSnapshot {
    /// Metric identity
    #[serde(flatten)]
    pub metric: Metric,
    /// Samples keyed by statistic name
    #[serde(default)]
    pub samples: AHashMap<String, Vec<DataPoint>>,
}

/// A tagged resource.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    /// Resource ARN
    pub arn: String,
    /// Resource type, e.g. `ec2:instance`
    pub resource_type: String,
    /// Resource tags
    #[serde(default)]
    pub tags: Vec<Tag>,
}

/// Serves metric and tag requests from a [`Snapshot`].
#[derive(Debug, Clone, Default)]
pub struct SnapshotApi {
    snapshot: Snapshot,
}

impl SnapshotApi {
    /// Wraps an in-memory snapshot
    pub fn new(snapshot: Snapshot) -> Self {
        Self { snapshot }
    }

    /// Parses a snapshot from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    /// Loads a snapshot file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| CollectorError::api_with_source("LoadSnapshot", path.display().to_string(), e))?;
        let api = Self::from_json(&content)?;
        tracing::info!(path = %path.display(), regions = api.snapshot.regions.len(), "Loaded snapshot");
        Ok(api)
    }

    fn region(&self, operation: &'static str, region: &str) -> Result<&RegionSnapshot> {
        self.snapshot
            .regions
            .get(region)
            .ok_or_else(|| CollectorError::api(operation, region, "region not present in snapshot"))
    }
}

#[async_trait::async_trait]
impl MetricsApi for SnapshotApi {
    async fn list_metrics(&self, namespace: &str, region: &str) -> Result<Vec<DiscoveredMetric>> {
        let snapshot = self.region("ListMetrics", region)?;
        Ok(snapshot
            .metrics
            .iter()
            .filter(|entry| entry.metric.namespace == namespace)
            .map(|entry| entry.metric.clone())
            .collect())
    }

    async fn get_metric_data(
        &self,
        queries: &[QueryDescriptor],
        region: &str,
        window: TimeWindow,
    ) -> Result<Vec<QueryResult>> {
        let snapshot = self.region("GetMetricData", region)?;

        let results = queries
            .iter()
            .map(|query| {
                let points = snapshot
                    .metrics
                    .iter()
                    .find(|entry| entry.metric == query.metric)
                    .and_then(|entry| entry.samples.get(&query.statistic))
                    .map(|samples| {
                        let mut points: Vec<DataPoint> = samples
                            .iter()
                            .filter(|p| p.timestamp >= window.start && p.timestamp < window.end)
                            .copied()
                            .collect();
                        // newest first, like the remote API
                        points.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
                        points
                    })
                    .unwrap_or_default();

                QueryResult {
                    label: query.label.clone(),
                    points,
                }
            })
            .collect();

        Ok(results)
    }
}

#[async_trait::async_trait]
impl TaggingApi for SnapshotApi {
    async fn get_resource_tags(&self, resource_type: &str, region: &str) -> Result<TagMap> {
        let snapshot = self.region("GetResources", region)?;
        let service_prefix = format!("{}:", resource_type);

        let mut tag_map = TagMap::new();
        for resource in &snapshot.resources {
            if resource.resource_type != resource_type
                && !resource.resource_type.starts_with(&service_prefix)
            {
                continue;
            }

            match short_identifier_from_arn(&resource.arn) {
                Ok(short_id) => {
                    tag_map.insert(short_id, resource.tags.clone());
                    tag_map.insert(resource.arn.clone(), resource.tags.clone());
                },
                Err(e) => {
                    tracing::warn!(region, arn = %resource.arn, error = %e, "Skipping resource");
                },
            }
        }
        Ok(tag_map)
    }
}
