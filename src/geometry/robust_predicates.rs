// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometric predicates shared by the intersection, split and classify stages
//! Near-zero determinants are re-evaluated with compensated arithmetic

use nalgebra::{Point2, Point3, Vector3};

/// Threshold below which determinants are recomputed with compensated sums
const REFINE_EPS: f64 = 1e-9;

/// Six times the signed volume of tetrahedron (a, b, c, d)
/// Positive when d is on the side of plane (a, b, c) its normal points to
pub fn oriented_volume(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
    d: &Point3<f64>,
) -> f64 {
    let ab = b - a;
    let ac = c - a;
    let ad = d - a;
    let result = ab.dot(&ac.cross(&ad));

    if result.abs() < REFINE_EPS {
        compensated_volume(&ab, &ac, &ad)
    } else {
        result
    }
}

fn compensated_volume(ab: &Vector3<f64>, ac: &Vector3<f64>, ad: &Vector3<f64>) -> f64 {
    let cx = diff_of_products(ac.y, ad.z, ac.z, ad.y);
    let cy = diff_of_products(ac.z, ad.x, ac.x, ad.z);
    let cz = diff_of_products(ac.x, ad.y, ac.y, ad.x);
    kahan_sum(&[ab.x * cx, ab.y * cy, ab.z * cz])
}

/// a*b - c*d with a single rounding on the dominant product
fn diff_of_products(a: f64, b: f64, c: f64, d: f64) -> f64 {
    let cd = c * d;
    let err = c.mul_add(d, -cd);
    let dop = a.mul_add(b, -cd);
    dop - err
}

/// Compensated sum, largest magnitude first
pub fn kahan_sum(terms: &[f64]) -> f64 {
    let mut sorted = terms.to_vec();
    sorted.sort_by(|a, b| b.abs().total_cmp(&a.abs()));

    let mut sum = 0.0;
    let mut c = 0.0;
    for &term in &sorted {
        let y = term - c;
        let t = sum + y;
        c = (t - sum) - y;
        sum = t;
    }
    sum
}

/// Twice the signed area of 2D triangle (a, b, c), positive when counter-clockwise
pub fn orient2d(a: &Point2<f64>, b: &Point2<f64>, c: &Point2<f64>) -> f64 {
    let result = (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x);
    if result.abs() < REFINE_EPS {
        diff_of_products(b.x - a.x, c.y - a.y, b.y - a.y, c.x - a.x)
    } else {
        result
    }
}

/// Signed distance from `point` to the plane `normal . x = d` (unit normal)
pub fn signed_plane_distance(point: &Point3<f64>, normal: &Vector3<f64>, d: f64) -> f64 {
    let distance = normal.dot(&point.coords) - d;
    if distance.abs() < REFINE_EPS {
        kahan_sum(&[
            normal.x * point.x,
            normal.y * point.y,
            normal.z * point.z,
            -d,
        ])
    } else {
        distance
    }
}

/// Classify point relative to plane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaneClassification {
    Front,
    Back,
    OnPlane,
}

/// Classify a point relative to a plane with an explicit tolerance
pub fn classify_point_plane(
    point: &Point3<f64>,
    plane_normal: &Vector3<f64>,
    plane_d: f64,
    tolerance: f64,
) -> PlaneClassification {
    let distance = signed_plane_distance(point, plane_normal, plane_d);

    if distance > tolerance {
        PlaneClassification::Front
    } else if distance < -tolerance {
        PlaneClassification::Back
    } else {
        PlaneClassification::OnPlane
    }
}

/// Area of triangle (a, b, c)
pub fn triangle_area(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    (b - a).cross(&(c - a)).norm() * 0.5
}

/// Unit normal following the a -> b -> c winding, `None` when degenerate
pub fn triangle_normal(
    a: &Point3<f64>,
    b: &Point3<f64>,
    c: &Point3<f64>,
) -> Option<Vector3<f64>> {
    let n = (b - a).cross(&(c - a));
    let len = n.norm();
    if len > 0.0 && len.is_finite() {
        Some(n / len)
    } else {
        None
    }
}

/// Signed volume of the tetrahedron spanned by the origin and triangle (a, b, c)
pub fn tetra_volume_from_origin(a: &Point3<f64>, b: &Point3<f64>, c: &Point3<f64>) -> f64 {
    a.coords.dot(&b.coords.cross(&c.coords)) / 6.0
}

pub fn triangle_centroid(corners: &[Point3<f64>; 3]) -> Point3<f64> {
    Point3::from((corners[0].coords + corners[1].coords + corners[2].coords) / 3.0)
}

/// Barycentric coordinates of `p` (assumed in the triangle plane)
pub fn barycentric(p: &Point3<f64>, tri: &[Point3<f64>; 3]) -> Option<[f64; 3]> {
    let v0 = tri[1] - tri[0];
    let v1 = tri[2] - tri[0];
    let v2 = p - tri[0];
    let d00 = v0.dot(&v0);
    let d01 = v0.dot(&v1);
    let d11 = v1.dot(&v1);
    let d20 = v2.dot(&v0);
    let d21 = v2.dot(&v1);
    let denom = d00 * d11 - d01 * d01;
    if denom.abs() < f64::EPSILON * d00 * d11 || denom == 0.0 {
        return None;
    }
    let v = (d11 * d20 - d01 * d21) / denom;
    let w = (d00 * d21 - d01 * d20) / denom;
    Some([1.0 - v - w, v, w])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_oriented_volume() {
        let a = Point3::new(0.0, 0.0, 0.0);
        let b = Point3::new(1.0, 0.0, 0.0);
        let c = Point3::new(0.0, 1.0, 0.0);
        let d = Point3::new(0.0, 0.0, 1.0);

        assert!(oriented_volume(&a, &b, &c, &d) > 0.0);
        let below = Point3::new(0.0, 0.0, -1.0);
        assert!(oriented_volume(&a, &b, &c, &below) < 0.0);
        let on = Point3::new(0.3, 0.3, 0.0);
        assert_eq!(oriented_volume(&a, &b, &c, &on), 0.0);
    }

    #[test]
    fn test_classify_point_plane() {
        let normal = Vector3::new(0.0, 0.0, 1.0);

        assert_eq!(
            classify_point_plane(&Point3::new(0.0, 0.0, 1.0), &normal, 0.0, 1e-9),
            PlaneClassification::Front
        );
        assert_eq!(
            classify_point_plane(&Point3::new(0.0, 0.0, -1.0), &normal, 0.0, 1e-9),
            PlaneClassification::Back
        );
        assert_eq!(
            classify_point_plane(&Point3::new(5.0, 2.0, 1e-12), &normal, 0.0, 1e-9),
            PlaneClassification::OnPlane
        );
    }

    #[test]
    fn test_tetra_volume_of_unit_corner() {
        let v = tetra_volume_from_origin(
            &Point3::new(1.0, 0.0, 0.0),
            &Point3::new(0.0, 1.0, 0.0),
            &Point3::new(0.0, 0.0, 1.0),
        );
        assert!((v - 1.0 / 6.0).abs() < 1e-15);
    }

    #[test]
    fn test_barycentric_corners_and_center() {
        let tri = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let b = barycentric(&tri[1], &tri).unwrap();
        assert!((b[1] - 1.0).abs() < 1e-12);
        let c = barycentric(&triangle_centroid(&tri), &tri).unwrap();
        for w in c {
            assert!((w - 1.0 / 3.0).abs() < 1e-12);
        }
        let collapsed = [tri[0], tri[1], Point3::new(2.0, 0.0, 0.0)];
        assert!(barycentric(&tri[2], &collapsed).is_none());
    }
}
