//! Configuration management for the collector.
//!
//! This module provides configuration handling with:
//! - YAML file support
//! - Builder overrides from the command line
//! - Validation and defaults

use crate::cloudwatch::statistic;
use crate::core::types::{AccountContext, Dimension, Tag};
use crate::core::{CollectorError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Complete collector configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Regions to collect from
    pub regions: Vec<String>,
    /// Query period, also the statistic aggregation period
    #[serde(with = "humantime_serde")]
    pub period: Duration,
    /// How far behind `now` the query window ends
    #[serde(with = "humantime_serde")]
    pub latency: Duration,
    /// Account metadata stamped on every event
    pub account: AccountContext,
    /// Required tags for resources of a filtered resource type
    pub tags_filter: Vec<Tag>,
    /// Metric configuration entries
    pub metrics: Vec<MetricConfig>,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Debug mode
    #[serde(skip)]
    pub debug: bool,
}

/// One entry of the `metrics` list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricConfig {
    /// Namespace, required
    pub namespace: String,
    /// Exact metric names
    #[serde(rename = "name")]
    pub metric_names: Vec<String>,
    /// Dimensions; a value of `*` matches any discovered value
    pub dimensions: Vec<Dimension>,
    /// Resource type used for tag lookups, e.g. `ec2:instance`
    pub resource_type: Option<String>,
    /// Statistic names; empty means the default set
    #[serde(rename = "statistic")]
    pub statistics: Vec<String>,
}

impl MetricConfig {
    /// Creates an entry for a namespace with nothing else set
    pub fn namespace<S: Into<String>>(namespace: S) -> Self {
        Self {
            namespace: namespace.into(),
            ..Self::default()
        }
    }

    /// Adds exact metric names
    pub fn with_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metric_names.extend(names.into_iter().map(Into::into));
        self
    }

    /// Adds a dimension
    pub fn with_dimension<N: Into<String>, V: Into<String>>(mut self, name: N, value: V) -> Self {
        self.dimensions.push(Dimension::new(name, value));
        self
    }

    /// Sets the resource type
    pub fn with_resource_type<S: Into<String>>(mut self, resource_type: S) -> Self {
        self.resource_type = Some(resource_type.into());
        self
    }

    /// Adds statistics
    pub fn with_statistics<I, S>(mut self, statistics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.statistics.extend(statistics.into_iter().map(Into::into));
        self
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: LogLevel,
}

/// Log levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            regions: vec!["us-east-1".to_string()],
            period: Duration::from_secs(300),
            latency: Duration::ZERO,
            account: AccountContext::default(),
            tags_filter: Vec::new(),
            metrics: Vec::new(),
            logging: LoggingConfig::default(),
            debug: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        LoggingConfig {
            level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.regions.is_empty() {
            return Err(CollectorError::config("at least one region must be configured"));
        }

        if self.period < Duration::from_secs(1) {
            return Err(CollectorError::config(format!(
                "period must be at least one second, got {:?}",
                self.period
            )));
        }

        if self.metrics.is_empty() {
            return Err(CollectorError::config("metrics in config is missing"));
        }

        for (index, entry) in self.metrics.iter().enumerate() {
            if entry.namespace.trim().is_empty() {
                return Err(CollectorError::MissingNamespace { index });
            }

            for dim in &entry.dimensions {
                if dim.name.is_empty() || dim.value.is_empty() {
                    return Err(CollectorError::config(format!(
                        "dimensions in namespace '{}' must have a name and a value",
                        entry.namespace
                    )));
                }
            }
        }

        self.check_statistics()
    }

    /// Fails on the first statistic name the resolver rejects.
    pub fn check_statistics(&self) -> Result<()> {
        for entry in &self.metrics {
            for stat in &entry.statistics {
                if statistic::resolve(stat).is_none() {
                    return Err(CollectorError::InvalidStatistic(stat.clone()));
                }
            }
        }
        Ok(())
    }
}

impl LogLevel {
    /// Convert to tracing filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Configuration builder for programmatic construction
pub struct ConfigBuilder {
    config: Config,
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigBuilder {
    /// Create a new builder with defaults
    pub fn new() -> Self {
        ConfigBuilder {
            config: Config::default(),
        }
    }

    /// Load configuration from YAML string
    pub fn from_yaml(mut self, yaml: &str) -> Result<Self> {
        self.config = serde_yaml::from_str(yaml)
            .map_err(|e| CollectorError::config(format!("Failed to parse YAML config: {}", e)))?;
        Ok(self)
    }

    /// Replace the region list
    pub fn regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.regions = regions.into_iter().map(Into::into).collect();
        self
    }

    /// Set the query period
    pub fn period(mut self, period: Duration) -> Self {
        self.config.period = period;
        self
    }

    /// Set the query latency
    pub fn latency(mut self, latency: Duration) -> Self {
        self.config.latency = latency;
        self
    }

    /// Set the account context
    pub fn account(mut self, account: AccountContext) -> Self {
        self.config.account = account;
        self
    }

    /// Add a required tag
    pub fn tag_filter(mut self, tag: Tag) -> Self {
        self.config.tags_filter.push(tag);
        self
    }

    /// Add a metric entry
    pub fn metric(mut self, entry: MetricConfig) -> Self {
        self.config.metrics.push(entry);
        self
    }

    /// Set debug mode
    pub fn debug(mut self, debug: bool) -> Self {
        self.config.debug = debug;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal() -> ConfigBuilder {
        ConfigBuilder::new().metric(MetricConfig::namespace("AWS/EC2"))
    }

    #[test]
    fn test_default_config_needs_metrics() {
        let config = Config::default();
        assert!(config.validate().is_err());
        assert!(minimal().build().is_ok());
    }

    #[test]
    fn test_invalid_statistic() {
        let config = ConfigBuilder::new()
            .metric(MetricConfig::namespace("AWS/EC2").with_statistics(["Average", "bogus"]))
            .build();

        match config {
            Err(CollectorError::InvalidStatistic(stat)) => assert_eq!(stat, "bogus"),
            other => panic!("expected invalid statistic, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_namespace() {
        let config = ConfigBuilder::new()
            .metric(MetricConfig::namespace("AWS/EC2"))
            .metric(MetricConfig::default())
            .build();

        assert!(matches!(config, Err(CollectorError::MissingNamespace { index: 1 })));
    }

    #[test]
    fn test_period_too_short() {
        let config = minimal().period(Duration::from_millis(500)).build();
        assert!(config.is_err());
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
regions: [us-east-1, eu-west-1]
period: 1m
latency: 5m
account:
  id: "111111111111"
  name: prod
tags_filter:
  - key: env
    value: prod
metrics:
  - namespace: AWS/EC2
    name: [CPUUtilization]
    dimensions:
      - name: InstanceId
        value: "*"
    resource_type: ec2:instance
    statistic: [Average, p99]
  - namespace: AWS/S3
"#;

        let config = ConfigBuilder::new().from_yaml(yaml).unwrap().build().unwrap();

        assert_eq!(config.regions, vec!["us-east-1", "eu-west-1"]);
        assert_eq!(config.period, Duration::from_secs(60));
        assert_eq!(config.latency, Duration::from_secs(300));
        assert_eq!(config.account.id, "111111111111");
        assert_eq!(config.tags_filter, vec![Tag::new("env", "prod")]);
        assert_eq!(config.metrics.len(), 2);
        assert_eq!(config.metrics[0].metric_names, vec!["CPUUtilization"]);
        assert!(config.metrics[0].dimensions[0].is_wildcard());
        assert_eq!(config.metrics[0].resource_type.as_deref(), Some("ec2:instance"));
        assert_eq!(config.metrics[0].statistics, vec!["Average", "p99"]);
        assert!(config.metrics[1].statistics.is_empty());
    }
}
