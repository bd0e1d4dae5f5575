//! Hotspot Routes

use axum::{
    extract::{Query, State},
    Json,
};
use geo_track::BoundingBox;
use hotspot::HotspotView;
use serde::Deserialize;

use crate::error::ApiError;
use crate::SharedState;

/// `bbox=minLat,minLng,maxLat,maxLng`
#[derive(Debug, Deserialize)]
pub struct HotspotQuery {
    pub bbox: String,
}

fn parse_bbox(raw: &str) -> Result<BoundingBox, ApiError> {
    let parts = raw
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<f64>, _>>()
        .map_err(|e| ApiError::BadRequest(format!("bbox '{}': {}", raw, e)))?;

    match parts.as_slice() {
        &[min_lat, min_lng, max_lat, max_lng] => Ok(BoundingBox {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }),
        _ => Err(ApiError::BadRequest(format!(
            "bbox '{}' needs four values: minLat,minLng,maxLat,maxLng",
            raw
        ))),
    }
}

pub async fn get_hotspots(
    State(state): State<SharedState>,
    Query(params): Query<HotspotQuery>,
) -> Result<Json<HotspotView>, ApiError> {
    let bbox = parse_bbox(&params.bbox)?;
    Ok(Json(state.hotspots.query(bbox).await?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bbox() {
        let bbox = parse_bbox("34.0, -118.3,34.1,-118.2").unwrap();
        assert_eq!(bbox.min_lat, 34.0);
        assert_eq!(bbox.min_lng, -118.3);
        assert_eq!(bbox.max_lat, 34.1);
        assert_eq!(bbox.max_lng, -118.2);

        assert!(parse_bbox("34.0,-118.3,34.1").is_err());
        assert!(parse_bbox("a,b,c,d").is_err());
    }
}
