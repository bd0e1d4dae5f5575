//! Polyline resampling for map rendering

use crate::{haversine_m, LatLng};

/// Default maximum rendered segment length (meters)
pub const DEFAULT_STEP_M: f64 = 5.0;

/// Densify a polyline so no rendered segment exceeds `step_m`.
///
/// For each input segment `a -> b`, `floor(d / step_m)` points are inserted
/// at evenly spaced fractions, interpolating latitude and longitude linearly.
/// Linear steps in lat/lng are not equal on the ground, so the count is
/// raised until every sub-segment is shorter than `step_m`. Input vertices
/// are always kept. Inputs with fewer than two points, or a non-positive
/// step, come back unchanged.
pub fn resample(points: &[LatLng], step_m: f64) -> Vec<LatLng> {
    if points.len() < 2 || !(step_m > 0.0) || !step_m.is_finite() {
        return points.to_vec();
    }

    let mut out = Vec::with_capacity(points.len());

    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        out.push(a);

        let d = haversine_m(a, b);
        if !d.is_finite() {
            continue;
        }
        let n = insert_count(a, b, (d / step_m).floor() as usize, step_m);
        out.extend((1..=n).map(|k| lerp(a, b, k, n)));
    }

    out.push(points[points.len() - 1]);
    out
}

/// `k`-th of `n` interior points between `a` and `b`
fn lerp(a: LatLng, b: LatLng, k: usize, n: usize) -> LatLng {
    let t = k as f64 / (n + 1) as f64;
    LatLng::new(a.lat + (b.lat - a.lat) * t, a.lng + (b.lng - a.lng) * t)
}

/// Longest ground distance between consecutive points when `n` points are
/// inserted between `a` and `b`
fn longest_sub_segment(a: LatLng, b: LatLng, n: usize) -> f64 {
    let mut prev = a;
    let mut longest = 0.0f64;
    for k in 1..=n + 1 {
        let next = if k == n + 1 { b } else { lerp(a, b, k, n) };
        longest = longest.max(haversine_m(prev, next));
        prev = next;
    }
    longest
}

fn insert_count(a: LatLng, b: LatLng, mut n: usize, step_m: f64) -> usize {
    // Bounded: each round adds at least one point and the ratio shrinks fast
    for _ in 0..64 {
        let longest = longest_sub_segment(a, b, n);
        if !longest.is_finite() || longest < step_m {
            break;
        }
        let scaled = ((n + 1) as f64 * longest / step_m).floor() as usize;
        n = scaled.max(n + 1);
    }
    n
}
