//! CloudWatch metric collection.
//!
//! One [`CloudwatchCollector::fetch`] call turns the configured metrics into
//! a batch of per-resource events:
//!
//! 1. configuration entries are split into exact requests and namespace
//!    discovery specs ([`resolver`])
//! 2. discovery specs are matched against the listed catalog ([`discovery`])
//! 3. accepted metrics become one batched query ([`query`])
//! 4. results are read at one shared timestamp ([`correlate`])
//! 5. values are merged per resource identity ([`event`]) and tagged ([`tags`])
//!
//! Failures of the remote calls only drop the affected region, namespace or
//! resource type; everything else is still emitted.

pub mod correlate;
pub mod discovery;
pub mod event;
pub mod query;
pub mod resolver;
pub mod statistic;
pub mod tags;

pub use event::{Event, EventAssembler, FieldValue};
pub use query::{Label, QueryDescriptor};
pub use resolver::{NamespaceFilterSpec, ResolvedConfig, ResourceTypeFilters};

use crate::api::{MetricsApi, TaggingApi};
use crate::core::{AccountContext, Config, MetricRequest, Result, TimeWindow};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Collects events for every configured region.
pub struct CloudwatchCollector {
    regions: Vec<String>,
    period: Duration,
    latency: Duration,
    account: AccountContext,
    resolved: ResolvedConfig,
    metrics_api: Arc<dyn MetricsApi>,
    tagging_api: Arc<dyn TaggingApi>,
}

impl CloudwatchCollector {
    /// Validates `config` and resolves its metric entries.
    pub fn new(
        config: &Config,
        metrics_api: Arc<dyn MetricsApi>,
        tagging_api: Arc<dyn TaggingApi>,
    ) -> Result<Self> {
        config.validate()?;

        let resolved = resolver::resolve_config(&config.metrics, &config.tags_filter);
        tracing::debug!(
            exact = resolved.exact.requests.len(),
            namespaces = resolved.namespaces.len(),
            "Resolved metric configuration"
        );

        Ok(Self {
            regions: config.regions.clone(),
            period: config.period,
            latency: config.latency,
            account: config.account.clone(),
            resolved,
            metrics_api,
            tagging_api,
        })
    }

    /// Resolved configuration
    pub fn resolved(&self) -> &ResolvedConfig {
        &self.resolved
    }

    /// Collect one batch of events ending now.
    pub async fn fetch(&self) -> Vec<Event> {
        self.fetch_at(Utc::now()).await
    }

    /// Collect one batch of events for the window ending at `now - latency`.
    pub async fn fetch_at(&self, now: DateTime<Utc>) -> Vec<Event> {
        let window = TimeWindow::new(now, self.period, self.latency);
        tracing::debug!(start = %window.start, end = %window.end, "Collecting metrics");

        let per_region = futures::future::join_all(
            self.regions
                .iter()
                .map(|region| self.collect_region(region, window)),
        )
        .await;

        per_region.into_iter().flatten().collect()
    }

    async fn collect_region(&self, region: &str, window: TimeWindow) -> Vec<Event> {
        let mut events = Vec::new();

        let exact = &self.resolved.exact;
        if !exact.requests.is_empty() {
            match self
                .create_events(region, &exact.requests, &exact.resource_type_filters, window)
                .await
            {
                Ok(created) => {
                    tracing::debug!(region, events = created.len(), "Collected exact metrics");
                    events.extend(created);
                },
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(region, category = e.category(), error = %e, "Skipping exact metrics for region");
                },
                Err(e) => {
                    tracing::error!(region, category = e.category(), error = %e, "Exact metrics failed");
                },
            }
        }

        for (namespace, specs) in &self.resolved.namespaces {
            let catalog = match self.metrics_api.list_metrics(namespace, region).await {
                Ok(catalog) => catalog,
                Err(e) => {
                    tracing::info!(region, namespace = %namespace, error = %e, "Skipping namespace");
                    continue;
                },
            };
            if catalog.is_empty() {
                continue;
            }

            let requests = discovery::filter_metrics(&catalog, specs);
            let filters = resolver::construct_tag_filters(specs);

            match self.create_events(region, &requests, &filters, window).await {
                Ok(created) => {
                    tracing::debug!(
                        region,
                        namespace = %namespace,
                        events = created.len(),
                        "Collected namespace metrics"
                    );
                    events.extend(created);
                },
                Err(e) if e.is_recoverable() => {
                    tracing::warn!(
                        region,
                        namespace = %namespace,
                        category = e.category(),
                        error = %e,
                        "Skipping namespace"
                    );
                },
                Err(e) => {
                    tracing::error!(
                        region,
                        namespace = %namespace,
                        category = e.category(),
                        error = %e,
                        "Namespace collection failed"
                    );
                },
            }
        }

        events
    }

    async fn create_events(
        &self,
        region: &str,
        requests: &[MetricRequest],
        filters: &ResourceTypeFilters,
        window: TimeWindow,
    ) -> Result<Vec<Event>> {
        let queries = query::build_queries(requests, self.period);
        tracing::debug!(region, queries = queries.len(), "Built metric data queries");
        if queries.is_empty() {
            return Ok(Vec::new());
        }

        let results = self
            .metrics_api
            .get_metric_data(&queries, region, window)
            .await?;
        tracing::debug!(region, results = results.len(), "Fetched metric data results");

        let Some(alignment) = correlate::align(&results) else {
            return Ok(Vec::new());
        };

        let mut assembler = EventAssembler::new(region, &self.account, alignment.timestamp);

        if filters.is_empty() {
            assembler.add_untagged(&alignment);
            return Ok(assembler.into_events());
        }

        for (resource_type, filter) in filters {
            let mut tag_map = match self
                .tagging_api
                .get_resource_tags(resource_type, region)
                .await
            {
                Ok(tag_map) => tag_map,
                Err(e) => {
                    tracing::info!(
                        region,
                        resource_type = %resource_type,
                        error = %e,
                        "Resource tag lookup failed, continuing without tags"
                    );
                    tags::TagMap::new()
                },
            };

            if !filter.is_empty() && tag_map.is_empty() {
                continue;
            }

            tags::retain_matching(&mut tag_map, filter, region);
            assembler.add_tagged(&alignment, filter, &tag_map);
        }

        Ok(assembler.into_events())
    }
}
