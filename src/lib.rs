//! CloudWatch collector - metric observations as per-resource events.
//!
//! The collector turns a declarative monitoring configuration (namespaces,
//! metric names, dimensions, statistics, resource-type and tag filters) into
//! one batch of events per invocation, each event holding every metric value,
//! dimension and tag known for one resource.
//!
//! # Features
//!
//! - **Exact and discovery modes**: fully specified metrics are queried
//!   directly, everything else is matched against the listed catalog,
//!   including wildcard dimensions
//! - **Batched queries**: one query batch per region and namespace, with
//!   identity carried back through the query label
//! - **Tag enrichment**: resource tags are attached to events and can gate
//!   which resources are reported at all
//! - **Partial failure tolerance**: a failing region, namespace or tag lookup
//!   never blocks events from the others
//!
//! # Architecture
//!
//! - `core`: configuration, errors and shared domain types
//! - `cloudwatch`: resolution, discovery, query building, correlation and
//!   event assembly
//! - `api`: remote API collaborator traits and a file-backed implementation
//! - `export`: event publishers
//! - `cli`: command-line interface
//!
//! # Example
//!
//! ```no_run
//! use cloudwatch_collector::api::SnapshotApi;
//! use cloudwatch_collector::core::{ConfigBuilder, MetricConfig};
//! use cloudwatch_collector::Application;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConfigBuilder::new()
//!         .metric(MetricConfig::namespace("AWS/EC2").with_statistics(["Average"]))
//!         .build()?;
//!     let api = Arc::new(SnapshotApi::from_file(Path::new("snapshot.json")).await?);
//!     let app = Application::new(config, api.clone(), api)?;
//!     app.run_once(&mut std::io::stdout()).await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod api;
pub mod application;
pub mod cli;
pub mod cloudwatch;
pub mod core;
pub mod export;

// Re-export core types for convenience
pub use crate::application::Application;
pub use crate::core::{Config, Result};
