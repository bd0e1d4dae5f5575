//! Axis-aligned lat/lng bounding box

use serde::{Deserialize, Serialize};

use crate::LatLng;

/// Metres per degree of latitude used for viewport size estimates
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Min/max latitude and longitude rectangle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Smallest box enclosing all points, `None` for an empty set
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = LatLng>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;

        let mut bbox = Self {
            min_lat: first.lat,
            max_lat: first.lat,
            min_lng: first.lng,
            max_lng: first.lng,
        };
        for p in iter {
            bbox.extend(p);
        }
        Some(bbox)
    }

    /// Grow the box to include `p`
    pub fn extend(&mut self, p: LatLng) {
        self.min_lat = self.min_lat.min(p.lat);
        self.max_lat = self.max_lat.max(p.lat);
        self.min_lng = self.min_lng.min(p.lng);
        self.max_lng = self.max_lng.max(p.lng);
    }

    /// Box centred on `center` spanning the given degree deltas (map region)
    pub fn around(center: LatLng, lat_delta: f64, lng_delta: f64) -> Self {
        Self {
            min_lat: center.lat - lat_delta / 2.0,
            max_lat: center.lat + lat_delta / 2.0,
            min_lng: center.lng - lng_delta / 2.0,
            max_lng: center.lng + lng_delta / 2.0,
        }
    }

    /// Inclusive containment test
    pub fn contains(&self, p: LatLng) -> bool {
        p.lat >= self.min_lat && p.lat <= self.max_lat && p.lng >= self.min_lng && p.lng <= self.max_lng
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// Well-formed: finite and min <= max on both axes
    pub fn is_valid(&self) -> bool {
        [self.min_lat, self.max_lat, self.min_lng, self.max_lng]
            .iter()
            .all(|v| v.is_finite())
            && self.min_lat <= self.max_lat
            && self.min_lng <= self.max_lng
    }

    /// Approximate radius (meters) of the circle circumscribing the box
    pub fn viewport_radius_m(&self) -> f64 {
        let lat_c = (self.min_lat + self.max_lat) / 2.0;
        let d_lat_m = (self.max_lat - self.min_lat) * METERS_PER_DEGREE;
        let d_lng_m = (self.max_lng - self.min_lng) * METERS_PER_DEGREE * lat_c.to_radians().cos();
        ((d_lat_m / 2.0).powi(2) + (d_lng_m / 2.0).powi(2)).sqrt()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_is_none() {
        assert!(BoundingBox::enclosing(Vec::<LatLng>::new()).is_none());
    }

    #[test]
    fn test_enclosing_points() {
        let bbox = BoundingBox::enclosing(vec![
            LatLng::new(34.2, -118.9),
            LatLng::new(34.1, -118.7),
            LatLng::new(34.15, -118.8),
        ])
        .unwrap();

        assert_eq!(bbox.min_lat, 34.1);
        assert_eq!(bbox.max_lat, 34.2);
        assert_eq!(bbox.min_lng, -118.9);
        assert_eq!(bbox.max_lng, -118.7);
        assert!(bbox.contains(LatLng::new(34.15, -118.8)));
        assert!(!bbox.contains(LatLng::new(34.25, -118.8)));
    }

    #[test]
    fn test_single_point_box() {
        let p = LatLng::new(1.5, 2.5);
        let bbox = BoundingBox::enclosing([p]).unwrap();
        assert_eq!(bbox.center(), p);
        assert!(bbox.is_valid());
    }

    #[test]
    fn test_viewport_radius() {
        let bbox = BoundingBox::around(LatLng::new(0.0, 0.0), 0.02, 0.0);
        // Half of 0.02 deg of latitude
        assert!((bbox.viewport_radius_m() - 1113.2).abs() < 0.1);
    }

    #[test]
    fn test_inverted_box_invalid() {
        let bbox = BoundingBox {
            min_lat: 1.0,
            max_lat: 0.0,
            min_lng: 0.0,
            max_lng: 1.0,
        };
        assert!(!bbox.is_valid());
    }
}
