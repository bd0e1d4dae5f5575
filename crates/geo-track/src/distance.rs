//! Great-circle distance

use crate::LatLng;

/// Mean Earth radius used for all distance math (meters)
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Meters in one statute mile
pub const METERS_PER_MILE: f64 = 1609.344;

/// Haversine distance between two points in meters
pub fn haversine_m(a: LatLng, b: LatLng) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();

    let s = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lng / 2.0).sin().powi(2);
    // Rounding can push s a hair above 1.0 for antipodal points
    2.0 * EARTH_RADIUS_M * s.sqrt().min(1.0).asin()
}

/// Convert meters to statute miles
pub fn meters_to_miles(meters: f64) -> f64 {
    meters / METERS_PER_MILE
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_one_degree_latitude() {
        let d = haversine_m(LatLng::new(0.0, 0.0), LatLng::new(1.0, 0.0));
        // 2πR / 360
        assert!((d - 111_194.93).abs() < 1.0);
    }

    #[test]
    fn test_known_city_pair() {
        // Los Angeles -> San Francisco, roughly 559 km
        let la = LatLng::new(34.0522, -118.2437);
        let sf = LatLng::new(37.7749, -122.4194);
        let km = haversine_m(la, sf) / 1000.0;
        assert!((km - 559.0).abs() < 2.0, "got {}", km);
    }

    #[test]
    fn test_miles_conversion() {
        assert!((meters_to_miles(1609.344) - 1.0).abs() < 1e-12);
    }

    proptest! {
        #[test]
        fn prop_distance_symmetric(
            lat1 in -89.0f64..89.0, lng1 in -179.0f64..179.0,
            lat2 in -89.0f64..89.0, lng2 in -179.0f64..179.0,
        ) {
            let a = LatLng::new(lat1, lng1);
            let b = LatLng::new(lat2, lng2);
            prop_assert!((haversine_m(a, b) - haversine_m(b, a)).abs() < 1e-6);
        }

        #[test]
        fn prop_distance_to_self_is_zero(lat in -90.0f64..90.0, lng in -180.0f64..180.0) {
            let a = LatLng::new(lat, lng);
            prop_assert_eq!(haversine_m(a, a), 0.0);
        }
    }
}
