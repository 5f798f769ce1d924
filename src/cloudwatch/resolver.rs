//! Splits configuration entries into exact metric requests and namespace discovery specs.

use crate::cloudwatch::statistic;
use crate::core::{Dimensions, Metric, MetricConfig, MetricRequest, Tag};
use std::collections::BTreeMap;

/// Required tags per resource type. Ordered so passes are reproducible.
pub type ResourceTypeFilters = BTreeMap<String, Vec<Tag>>;

/// Discovery-mode request for one namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceFilterSpec {
    /// Namespace to enumerate
    pub namespace: String,
    /// Metric names to keep, `None` keeps every name
    pub metric_names: Option<Vec<String>>,
    /// Dimension pattern, `None` keeps every dimension set
    pub dimensions: Option<Dimensions>,
    /// Tag predicate applied to resources of `resource_type`
    pub tags: Vec<Tag>,
    /// Resource type used for tag lookups
    pub resource_type: Option<String>,
    /// Statistics attached to every accepted metric
    pub statistics: Vec<String>,
}

/// Fully specified requests and the resource type filters they carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExactRequests {
    /// One request per configured metric name
    pub requests: Vec<MetricRequest>,
    /// Tag filters for entries that name a resource type
    pub resource_type_filters: ResourceTypeFilters,
}

/// Configuration partitioned into both collection modes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedConfig {
    /// Exact-mode requests
    pub exact: ExactRequests,
    /// Discovery specs per namespace, never merged
    pub namespaces: BTreeMap<String, Vec<NamespaceFilterSpec>>,
}

impl ResolvedConfig {
    /// Returns true if neither mode has work
    pub fn is_empty(&self) -> bool {
        self.exact.requests.is_empty() && self.namespaces.is_empty()
    }
}

/// Partitions `entries` into exact requests and discovery specs.
///
/// An entry is exact only when it names metrics, lists dimensions, and none of
/// the dimension values is the wildcard.
pub fn resolve_config(entries: &[MetricConfig], tags_filter: &[Tag]) -> ResolvedConfig {
    let mut resolved = ResolvedConfig::default();

    for entry in entries {
        let statistics = if entry.statistics.is_empty() {
            statistic::defaults()
        } else {
            entry.statistics.clone()
        };

        let resource_type = entry
            .resource_type
            .as_deref()
            .filter(|resource_type| !resource_type.is_empty());
        let dimensions: Dimensions = entry.dimensions.iter().cloned().collect();
        let has_wildcard = dimensions.iter().any(|dim| dim.is_wildcard());

        if !entry.metric_names.is_empty() && !dimensions.is_empty() && !has_wildcard {
            for name in &entry.metric_names {
                resolved.exact.requests.push(MetricRequest {
                    metric: Metric {
                        namespace: entry.namespace.clone(),
                        metric_name: name.clone(),
                        dimensions: dimensions.clone(),
                    },
                    statistics: statistics.clone(),
                });
            }

            if let Some(resource_type) = resource_type {
                resolved
                    .exact
                    .resource_type_filters
                    .insert(resource_type.to_string(), tags_filter.to_vec());
            }
            continue;
        }

        let spec = NamespaceFilterSpec {
            namespace: entry.namespace.clone(),
            metric_names: (!entry.metric_names.is_empty()).then(|| entry.metric_names.clone()),
            dimensions: (!dimensions.is_empty()).then_some(dimensions),
            tags: tags_filter.to_vec(),
            resource_type: resource_type.map(str::to_string),
            statistics,
        };

        resolved
            .namespaces
            .entry(entry.namespace.clone())
            .or_default()
            .push(spec);
    }

    resolved
}

/// Collects the tag filters of every spec that names a resource type.
///
/// An empty resource type counts as none.
///
/// Specs sharing a resource type contribute all their filters to one list.
pub fn construct_tag_filters(specs: &[NamespaceFilterSpec]) -> ResourceTypeFilters {
    let mut filters = ResourceTypeFilters::new();
    for spec in specs {
        let Some(resource_type) = spec.resource_type.as_ref().filter(|t| !t.is_empty()) else {
            continue;
        };
        let entry = filters.entry(resource_type.clone()).or_default();
        for tag in &spec.tags {
            if !entry.contains(tag) {
                entry.push(tag.clone());
            }
        }
    }
    filters
}
