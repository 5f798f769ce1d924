//! Shared domain types, configuration and errors.
//!
//! Everything the collection core and its collaborators agree on lives here.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConfigBuilder, LogLevel, MetricConfig};
pub use error::{BoxError, CollectorError, Result};
pub use types::{
    dedot, AccountContext, Dimension, Dimensions, DiscoveredMetric, Metric, MetricRequest, Tag,
    TimeWindow, DIMENSION_WILDCARD,
};
