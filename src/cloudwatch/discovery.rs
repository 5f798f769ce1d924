//! Filters a listed metric catalog against namespace discovery specs.

use crate::cloudwatch::resolver::NamespaceFilterSpec;
use crate::core::{Dimension, DiscoveredMetric, MetricRequest, DIMENSION_WILDCARD};
use ahash::AHashMap;

/// Keeps every catalog entry accepted by at least one spec.
///
/// Each spec is matched independently, so a metric accepted by two specs is
/// returned twice, once with each spec's statistics.
pub fn filter_metrics(
    catalog: &[DiscoveredMetric],
    specs: &[NamespaceFilterSpec],
) -> Vec<MetricRequest> {
    let mut accepted = Vec::new();
    for metric in catalog {
        for spec in specs {
            if spec_accepts(spec, metric) {
                accepted.push(MetricRequest {
                    metric: metric.clone(),
                    statistics: spec.statistics.clone(),
                });
            }
        }
    }
    accepted
}

fn spec_accepts(spec: &NamespaceFilterSpec, metric: &DiscoveredMetric) -> bool {
    let name_ok = spec
        .metric_names
        .as_ref()
        .map_or(true, |names| names.iter().any(|name| *name == metric.metric_name));
    if !name_ok {
        return false;
    }

    spec.dimensions
        .as_ref()
        .map_or(true, |pattern| compare_dimensions(&metric.dimensions, pattern))
}

/// Compares discovered dimensions against a configured pattern.
///
/// Both sides must have the same number of dimensions and the same name to
/// value mapping once every wildcard in `pattern` takes the discovered value.
pub fn compare_dimensions(discovered: &[Dimension], pattern: &[Dimension]) -> bool {
    if discovered.len() != pattern.len() {
        return false;
    }

    let found: AHashMap<&str, &str> = discovered
        .iter()
        .map(|dim| (dim.name.as_str(), dim.value.as_str()))
        .collect();
    let mut wanted: AHashMap<&str, &str> = pattern
        .iter()
        .map(|dim| (dim.name.as_str(), dim.value.as_str()))
        .collect();

    for (name, value) in &found {
        if let Some(slot) = wanted.get_mut(name) {
            if *slot == DIMENSION_WILDCARD {
                *slot = *value;
            }
        }
    }

    found == wanted
}
