//! Pairwise neighbour clustering

use geo_track::LatLng;
use serde::{Deserialize, Serialize};

/// Max per-axis separation (degrees) for two points to be neighbours
pub const CLUSTER_SPAN_DEG: f64 = 0.01;

/// Neighbours needed beyond the anchor point itself
pub const MIN_NEIGHBORS: usize = 2;

/// Cluster centroid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HotspotCluster {
    pub lat: f64,
    pub lng: f64,
}

impl From<HotspotCluster> for LatLng {
    fn from(c: HotspotCluster) -> Self {
        LatLng::new(c.lat, c.lng)
    }
}

/// Scan each point against the points after it. A point with at least
/// [`MIN_NEIGHBORS`] later neighbours yields the midpoint of the box around
/// itself and those neighbours. Clusters may overlap, and the last point
/// never anchors one.
pub fn detect_clusters(points: &[LatLng]) -> Vec<HotspotCluster> {
    let mut clusters = Vec::new();
    if points.len() < 2 {
        return clusters;
    }

    for (i, anchor) in points[..points.len() - 1].iter().enumerate() {
        let mut matches = 0;
        let (mut min_lat, mut max_lat) = (anchor.lat, anchor.lat);
        let (mut min_lng, mut max_lng) = (anchor.lng, anchor.lng);

        for p in &points[i + 1..] {
            if (anchor.lat - p.lat).abs() <= CLUSTER_SPAN_DEG && (anchor.lng - p.lng).abs() <= CLUSTER_SPAN_DEG {
                min_lat = min_lat.min(p.lat);
                max_lat = max_lat.max(p.lat);
                min_lng = min_lng.min(p.lng);
                max_lng = max_lng.max(p.lng);
                matches += 1;
            }
        }

        if matches >= MIN_NEIGHBORS {
            clusters.push(HotspotCluster {
                lat: (min_lat + max_lat) / 2.0,
                lng: (min_lng + max_lng) / 2.0,
            });
        }
    }

    clusters
}
