//! Remote API collaborators consumed by the collector.
//!
//! The collector never builds transport clients itself. It talks to the
//! metrics and tagging services through these traits, so any client (or the
//! file-backed [`SnapshotApi`]) can be plugged in. Retries and pagination
//! belong to the implementations.

pub mod snapshot;

use crate::cloudwatch::correlate::QueryResult;
use crate::cloudwatch::query::QueryDescriptor;
use crate::cloudwatch::tags::TagMap;
use crate::core::{DiscoveredMetric, Result, TimeWindow};

pub use snapshot::SnapshotApi;

/// Metric catalog and batched time-series access.
#[async_trait::async_trait]
pub trait MetricsApi: Send + Sync {
    /// List every metric of `namespace` in `region`.
    async fn list_metrics(&self, namespace: &str, region: &str) -> Result<Vec<DiscoveredMetric>>;

    /// Run a batch of queries over `window`, one result per descriptor.
    async fn get_metric_data(
        &self,
        queries: &[QueryDescriptor],
        region: &str,
        window: TimeWindow,
    ) -> Result<Vec<QueryResult>>;
}

/// Resource tag lookups.
#[async_trait::async_trait]
pub trait TaggingApi: Send + Sync {
    /// Tags of every resource of `resource_type` in `region`, keyed by resource id.
    async fn get_resource_tags(&self, resource_type: &str, region: &str) -> Result<TagMap>;
}
