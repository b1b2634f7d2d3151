pub mod simplify;

use nalgebra::{Matrix3, Rotation3, Unit, Vector3};

pub type Vec3 = Vector3<f64>;

/// Euclidean distance between two 3D locations.
pub fn distance(a: &Vec3, b: &Vec3) -> f64 {
    (a - b).norm()
}

pub fn is_finite(v: &Vec3) -> bool {
    v.iter().all(|c| c.is_finite())
}

pub fn rotation_x(angle: f64) -> Matrix3<f64> {
    *Rotation3::from_axis_angle(&Vector3::x_axis(), angle).matrix()
}

pub fn rotation_y(angle: f64) -> Matrix3<f64> {
    *Rotation3::from_axis_angle(&Vector3::y_axis(), angle).matrix()
}

pub fn rotation_z(angle: f64) -> Matrix3<f64> {
    *Rotation3::from_axis_angle(&Vector3::z_axis(), angle).matrix()
}

/// Rotation by `angle` radians about an arbitrary axis. A zero axis gives the identity.
pub fn rotation_about_axis(axis: &Vec3, angle: f64) -> Matrix3<f64> {
    if axis.norm() < 1e-12 {
        return Matrix3::identity();
    }
    let unit = Unit::new_normalize(*axis);
    *Rotation3::from_axis_angle(&unit, angle).matrix()
}

/// Shortest distance from `p` to the segment `a`-`b`.
///
/// The two angle tests clamp to the endpoints; otherwise the distance to the
/// infinite line is used (|AB x AP| / |AB|).
pub fn point_segment_distance(a: &Vec3, b: &Vec3, p: &Vec3) -> f64 {
    let ab = b - a;
    let ap = p - a;
    if ab.dot(&ap) <= 0.0 {
        return ap.norm();
    }
    let ba = a - b;
    let bp = p - b;
    if ba.dot(&bp) <= 0.0 {
        return bp.norm();
    }
    ab.cross(&ap).norm() / ab.norm()
}

/// True when the segment `a`-`b` touches the sphere of radius `radius` around `center`.
pub fn segment_crosses_sphere(a: &Vec3, b: &Vec3, center: &Vec3, radius: f64) -> bool {
    let min_dist = point_segment_distance(a, b, center);
    let max_dist = distance(center, a).max(distance(center, b));
    min_dist <= radius && radius <= max_dist
}

#[cfg(test)]
mod geometry_tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_point_segment_distance_clamps_to_endpoints() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(1.0, 0.0, 0.0);

        assert_relative_eq!(point_segment_distance(&a, &b, &Vec3::new(-1.0, 0.0, 0.0)), 1.0);
        assert_relative_eq!(point_segment_distance(&a, &b, &Vec3::new(3.0, 0.0, 0.0)), 2.0);
        assert_relative_eq!(point_segment_distance(&a, &b, &Vec3::new(0.5, 2.0, 0.0)), 2.0);
    }

    #[test]
    fn test_point_segment_distance_degenerate_segment() {
        let a = Vec3::new(1.0, 1.0, 1.0);
        let p = Vec3::new(1.0, 1.0, 3.0);
        assert_relative_eq!(point_segment_distance(&a, &a, &p), 2.0);
    }

    #[test]
    fn test_segment_crosses_sphere() {
        let center = Vec3::zeros();
        let a = Vec3::new(1.0, 0.0, 0.0);
        let b = Vec3::new(3.0, 0.0, 0.0);

        assert!(!segment_crosses_sphere(&a, &b, &center, 0.5));
        assert!(segment_crosses_sphere(&a, &b, &center, 1.0));
        assert!(segment_crosses_sphere(&a, &b, &center, 2.5));
        assert!(!segment_crosses_sphere(&a, &b, &center, 3.5));
    }

    #[test]
    fn test_rotation_z_quarter_turn() {
        let r = rotation_z(PI / 2.0);
        let rotated = r * Vec3::new(1.0, 0.0, 0.0);
        assert_relative_eq!(rotated, Vec3::new(0.0, 1.0, 0.0), epsilon = 1e-12);
    }

    #[test]
    fn test_rotation_about_zero_axis_is_identity() {
        let r = rotation_about_axis(&Vec3::zeros(), 1.0);
        assert_eq!(r, Matrix3::identity());
        let rx = rotation_about_axis(&Vec3::new(2.0, 0.0, 0.0), 0.3);
        assert_relative_eq!(rx, rotation_x(0.3), epsilon = 1e-12);
        let ry = rotation_about_axis(&Vec3::new(0.0, 5.0, 0.0), -0.7);
        assert_relative_eq!(ry, rotation_y(-0.7), epsilon = 1e-12);
    }
}
