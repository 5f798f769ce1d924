//! Wires configuration, API collaborators and the publisher together.

use crate::api::{MetricsApi, TaggingApi};
use crate::cloudwatch::{CloudwatchCollector, Event};
use crate::core::{Config, Result};
use crate::export::{publish_all, JsonLinesPublisher};
use chrono::{DateTime, Utc};
use std::io::Write;
use std::sync::Arc;

/// One configured collector ready to be invoked.
pub struct Application {
    /// The collection core
    collector: CloudwatchCollector,
    /// Application configuration
    config: Config,
}

impl Application {
    /// Create a new Application with the given configuration and collaborators.
    pub fn new(
        config: Config,
        metrics_api: Arc<dyn MetricsApi>,
        tagging_api: Arc<dyn TaggingApi>,
    ) -> Result<Self> {
        let collector = CloudwatchCollector::new(&config, metrics_api, tagging_api)?;
        Ok(Self { collector, config })
    }

    /// Collect one batch ending now and write it as JSON lines.
    pub async fn run_once<W: Write>(&self, out: W) -> Result<usize> {
        self.run_at(Utc::now(), out).await
    }

    /// Collect one batch for the window ending at `now` and write it as JSON lines.
    pub async fn run_at<W: Write>(&self, now: DateTime<Utc>, out: W) -> Result<usize> {
        tracing::info!(regions = ?self.config.regions, "Starting collection");

        let events = self.collect_at(now).await;
        let mut publisher = JsonLinesPublisher::new(out);
        let published = publish_all(&mut publisher, &events)?;
        publisher.into_inner()?;

        tracing::info!(events = published, "Collection finished");
        Ok(published)
    }

    /// Collect one batch without publishing it.
    pub async fn collect_at(&self, now: DateTime<Utc>) -> Vec<Event> {
        self.collector.fetch_at(now).await
    }

    /// Get a reference to the collector.
    pub fn collector(&self) -> &CloudwatchCollector {
        &self.collector
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}
