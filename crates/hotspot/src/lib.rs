//! Hotspot Clustering
//!
//! Groups event points inside a map viewport into hotspot centroids.

mod cluster;
mod service;

pub use cluster::{detect_clusters, HotspotCluster, CLUSTER_SPAN_DEG, MIN_NEIGHBORS};
pub use service::{EventPointSource, HotspotService, HotspotView};

use thiserror::Error;

/// Hotspot errors
#[derive(Debug, Error)]
pub enum HotspotError {
    #[error("Invalid bounding box: {0}")]
    InvalidBoundingBox(String),
    #[error("Event point query failed: {0}")]
    Fetch(String),
}
