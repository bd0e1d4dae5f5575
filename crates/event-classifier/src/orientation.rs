//! Orientation tracking
//!
//! Rotates device-frame acceleration into an approximately level frame using
//! the device's Euler orientation, then resolves the horizontal part along the
//! integrated heading.
//!
//! The Euler composition order is yaw (Z, alpha), then pitch (X, beta), then
//! roll (Y, gamma): `q = qz(alpha) * qx(beta) * qy(gamma)`. Any other order
//! yields a wrong frame.

use std::f64::consts::PI;

use crate::sample::Rotation;

/// Plain 3-vector
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// Rotation quaternion, `w` is the scalar part
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quaternion {
    pub w: f64,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Quaternion {
    pub fn identity() -> Self {
        Self {
            w: 1.0,
            x: 0.0,
            y: 0.0,
            z: 0.0,
        }
    }

    /// Rotation of `angle` radians about a unit `axis`
    pub fn from_axis_angle(axis: Vec3, angle: f64) -> Self {
        let (s, c) = (angle / 2.0).sin_cos();
        Self {
            w: c,
            x: axis.x * s,
            y: axis.y * s,
            z: axis.z * s,
        }
    }

    /// Device orientation quaternion: yaw(Z) * pitch(X) * roll(Y)
    pub fn from_euler_zxy(rotation: &Rotation) -> Self {
        let qz = Self::from_axis_angle(Vec3::new(0.0, 0.0, 1.0), rotation.alpha);
        let qx = Self::from_axis_angle(Vec3::new(1.0, 0.0, 0.0), rotation.beta);
        let qy = Self::from_axis_angle(Vec3::new(0.0, 1.0, 0.0), rotation.gamma);
        qz.multiply(&qx).multiply(&qy)
    }

    /// Hamilton product `self * other`
    pub fn multiply(&self, other: &Quaternion) -> Quaternion {
        Quaternion {
            w: self.w * other.w - self.x * other.x - self.y * other.y - self.z * other.z,
            x: self.w * other.x + self.x * other.w + self.y * other.z - self.z * other.y,
            y: self.w * other.y - self.x * other.z + self.y * other.w + self.z * other.x,
            z: self.w * other.z + self.x * other.y - self.y * other.x + self.z * other.w,
        }
    }

    pub fn conjugate(&self) -> Quaternion {
        Quaternion {
            w: self.w,
            x: -self.x,
            y: -self.y,
            z: -self.z,
        }
    }

    /// Rotate a vector: `q * v * q^*`
    pub fn rotate(&self, v: Vec3) -> Vec3 {
        let p = Quaternion {
            w: 0.0,
            x: v.x,
            y: v.y,
            z: v.z,
        };
        let r = self.multiply(&p).multiply(&self.conjugate());
        Vec3::new(r.x, r.y, r.z)
    }
}

/// Wrap an angle into `(-π, π]`
pub fn wrap_pi(angle: f64) -> f64 {
    let a = (angle + PI) % (2.0 * PI);
    if a <= 0.0 {
        a + PI
    } else {
        a - PI
    }
}

/// Horizontal acceleration resolved along the heading
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HorizontalAccel {
    /// Along the direction of travel, negative when braking (m/s²)
    pub longitudinal: f64,
    /// Perpendicular to the direction of travel (m/s²)
    pub lateral: f64,
}

impl HorizontalAccel {
    /// Rotate `accel` into the level frame and project onto `heading_rad`
    pub fn resolve(accel: Vec3, rotation: &Rotation, heading_rad: f64) -> Self {
        let level = Quaternion::from_euler_zxy(rotation).rotate(accel);
        let (fy, fx) = heading_rad.sin_cos();

        Self {
            longitudinal: level.x * fx + level.y * fy,
            lateral: level.x * -fy + level.y * fx,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;

    const EPS: f64 = 1e-9;

    fn assert_vec_eq(actual: Vec3, expected: Vec3) {
        assert!(
            (actual.x - expected.x).abs() < EPS
                && (actual.y - expected.y).abs() < EPS
                && (actual.z - expected.z).abs() < EPS,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    fn rot(alpha: f64, beta: f64, gamma: f64) -> Rotation {
        Rotation { alpha, beta, gamma }
    }

    #[test]
    fn test_identity_rotation() {
        let v = Vec3::new(1.0, -2.0, 3.0);
        assert_vec_eq(Quaternion::from_euler_zxy(&rot(0.0, 0.0, 0.0)).rotate(v), v);
        assert_vec_eq(Quaternion::identity().rotate(v), v);
    }

    #[test]
    fn test_single_axis_rotations() {
        // Yaw: x -> y
        let q = Quaternion::from_euler_zxy(&rot(FRAC_PI_2, 0.0, 0.0));
        assert_vec_eq(q.rotate(Vec3::new(1.0, 0.0, 0.0)), Vec3::new(0.0, 1.0, 0.0));

        // Pitch: y -> z
        let q = Quaternion::from_euler_zxy(&rot(0.0, FRAC_PI_2, 0.0));
        assert_vec_eq(q.rotate(Vec3::new(0.0, 1.0, 0.0)), Vec3::new(0.0, 0.0, 1.0));

        // Roll: z -> x
        let q = Quaternion::from_euler_zxy(&rot(0.0, 0.0, FRAC_PI_2));
        assert_vec_eq(q.rotate(Vec3::new(0.0, 0.0, 1.0)), Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn test_yaw_applied_after_pitch() {
        // Pitch takes y to z first; yaw then leaves z alone.
        // The reverse order would give (-1, 0, 0).
        let q = Quaternion::from_euler_zxy(&rot(FRAC_PI_2, FRAC_PI_2, 0.0));
        assert_vec_eq(q.rotate(Vec3::new(0.0, 1.0, 0.0)), Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_yaw_applied_after_roll() {
        // Roll takes z to x, yaw then takes x to y
        let q = Quaternion::from_euler_zxy(&rot(FRAC_PI_2, 0.0, FRAC_PI_2));
        assert_vec_eq(q.rotate(Vec3::new(0.0, 0.0, 1.0)), Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn test_full_zxy_composition() {
        // x --roll--> (0,0,-1) --pitch--> (0,1,0) --yaw--> (-1,0,0)
        let q = Quaternion::from_euler_zxy(&rot(FRAC_PI_2, FRAC_PI_2, FRAC_PI_2));
        assert_vec_eq(q.rotate(Vec3::new(1.0, 0.0, 0.0)), Vec3::new(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_rotation_preserves_length() {
        let q = Quaternion::from_euler_zxy(&rot(0.3, -1.1, 2.4));
        let v = Vec3::new(3.0, -4.0, 12.0);
        let r = q.rotate(v);
        let len = (r.x * r.x + r.y * r.y + r.z * r.z).sqrt();
        assert!((len - 13.0).abs() < EPS);
    }

    #[test]
    fn test_wrap_pi() {
        assert!((wrap_pi(0.0)).abs() < EPS);
        assert!((wrap_pi(PI) - PI).abs() < EPS);
        assert!((wrap_pi(-PI) - PI).abs() < EPS);
        assert!((wrap_pi(1.5 * PI) + 0.5 * PI).abs() < EPS);
        assert!((wrap_pi(-1.5 * PI) - 0.5 * PI).abs() < EPS);
        assert!((wrap_pi(7.0 * PI + 0.25) - (-PI + 0.25)).abs() < 1e-6);
    }

    #[test]
    fn test_resolve_along_heading() {
        let a = Vec3::new(2.0, 0.0, 9.81);

        let ahead = HorizontalAccel::resolve(a, &Rotation::default(), 0.0);
        assert!((ahead.longitudinal - 2.0).abs() < EPS);
        assert!(ahead.lateral.abs() < EPS);

        // Heading rotated a quarter turn: the same push is now lateral
        let turned = HorizontalAccel::resolve(a, &Rotation::default(), FRAC_PI_2);
        assert!(turned.longitudinal.abs() < EPS);
        assert!((turned.lateral + 2.0).abs() < EPS);
    }
}
