//! Viewport hotspot queries

use std::future::Future;

use geo_track::{BoundingBox, LatLng};
use serde::Serialize;
use tracing::{debug, warn};

use crate::cluster::{detect_clusters, HotspotCluster};
use crate::HotspotError;

/// Supplies recorded event points inside a bounding box
pub trait EventPointSource: Send + Sync {
    fn event_points(&self, bbox: BoundingBox) -> impl Future<Output = Result<Vec<LatLng>, HotspotError>> + Send;
}

/// Result of one viewport query
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotView {
    pub bbox: BoundingBox,
    pub center: LatLng,
    /// Center-to-corner distance of the viewport (m)
    pub radius_m: f64,
    pub points: Vec<LatLng>,
    pub clusters: Vec<HotspotCluster>,
}

/// Read-only hotspot query service
pub struct HotspotService<S> {
    source: S,
}

impl<S: EventPointSource> HotspotService<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Cluster the event points inside `bbox`. A failing source yields an
    /// empty view; only a malformed box is an error.
    pub async fn query(&self, bbox: BoundingBox) -> Result<HotspotView, HotspotError> {
        if !bbox.is_valid() {
            return Err(HotspotError::InvalidBoundingBox(format!(
                "lat [{}, {}], lng [{}, {}]",
                bbox.min_lat, bbox.max_lat, bbox.min_lng, bbox.max_lng
            )));
        }

        let points = match self.source.event_points(bbox).await {
            Ok(points) => points.into_iter().filter(|p| bbox.contains(*p)).collect(),
            Err(e) => {
                warn!("Hotspot fetch failed, returning no clusters: {}", e);
                Vec::new()
            }
        };

        let clusters = detect_clusters(&points);
        debug!("{} event points, {} clusters in view", points.len(), clusters.len());

        Ok(HotspotView {
            bbox,
            center: bbox.center(),
            radius_m: bbox.viewport_radius_m(),
            points,
            clusters,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedPoints(Vec<LatLng>);

    impl EventPointSource for FixedPoints {
        async fn event_points(&self, _bbox: BoundingBox) -> Result<Vec<LatLng>, HotspotError> {
            Ok(self.0.clone())
        }
    }

    struct Offline;

    impl EventPointSource for Offline {
        async fn event_points(&self, _bbox: BoundingBox) -> Result<Vec<LatLng>, HotspotError> {
            Err(HotspotError::Fetch("connection refused".to_string()))
        }
    }

    fn downtown() -> BoundingBox {
        BoundingBox {
            min_lat: 34.0,
            max_lat: 34.1,
            min_lng: -118.3,
            max_lng: -118.2,
        }
    }

    #[tokio::test]
    async fn test_query_clusters_points_in_view() {
        let service = HotspotService::new(FixedPoints(vec![
            LatLng::new(34.050, -118.250),
            LatLng::new(34.052, -118.248),
            LatLng::new(34.051, -118.253),
            // Outside the viewport, dropped before clustering
            LatLng::new(34.051, -118.100),
        ]));

        let view = service.query(downtown()).await.unwrap();
        assert_eq!(view.points.len(), 3);
        assert_eq!(view.clusters.len(), 1);
        assert!(view.radius_m > 0.0);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_empty() {
        let service = HotspotService::new(Offline);
        let view = service.query(downtown()).await.unwrap();

        assert!(view.points.is_empty());
        assert!(view.clusters.is_empty());
    }

    #[tokio::test]
    async fn test_inverted_bbox_rejected() {
        let service = HotspotService::new(FixedPoints(Vec::new()));
        let mut bbox = downtown();
        std::mem::swap(&mut bbox.min_lat, &mut bbox.max_lat);

        assert!(matches!(
            service.query(bbox).await,
            Err(HotspotError::InvalidBoundingBox(_))
        ));
    }
}
