// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Triangle-triangle intersection
//!
//! Each triangle is reduced to the interval it covers on the line where the
//! two planes meet; the overlap of both intervals is the cut segment.
//! Coplanar pairs are reported but produce no segment.

use super::robust_predicates::{signed_plane_distance, triangle_normal};
use nalgebra::{Point3, Vector3};
use std::cmp::Ordering;

/// Tolerances in model units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntersectTolerance {
    /// Vertex-to-plane distances below this count as on the plane
    pub plane: f64,
    /// Shorter overlaps are treated as no intersection
    pub min_segment: f64,
}

impl Default for IntersectTolerance {
    fn default() -> Self {
        Self {
            plane: 1e-9,
            min_segment: 1e-6,
        }
    }
}

/// Result of a triangle-triangle test
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TriTriIntersection {
    None,
    /// Both triangles lie in one plane; never used for cutting
    Coplanar,
    /// Endpoints in lexicographic order
    Segment(Point3<f64>, Point3<f64>),
}

impl TriTriIntersection {
    pub fn segment(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        match self {
            Self::Segment(p, q) => Some((*p, *q)),
            _ => None,
        }
    }
}

/// Intersect two triangles; the result does not depend on argument order
pub fn intersect_triangles(
    tri_a: &[Point3<f64>; 3],
    tri_b: &[Point3<f64>; 3],
    tol: &IntersectTolerance,
) -> TriTriIntersection {
    if compare_triangles(tri_a, tri_b) == Ordering::Greater {
        intersect_ordered(tri_b, tri_a, tol)
    } else {
        intersect_ordered(tri_a, tri_b, tol)
    }
}

fn intersect_ordered(
    tri_a: &[Point3<f64>; 3],
    tri_b: &[Point3<f64>; 3],
    tol: &IntersectTolerance,
) -> TriTriIntersection {
    let (Some(normal_a), Some(normal_b)) = (
        triangle_normal(&tri_a[0], &tri_a[1], &tri_a[2]),
        triangle_normal(&tri_b[0], &tri_b[1], &tri_b[2]),
    ) else {
        return TriTriIntersection::None;
    };

    let dist_b = plane_distances(tri_b, &normal_a, normal_a.dot(&tri_a[0].coords), tol.plane);
    match side_of(&dist_b) {
        Side::Positive | Side::Negative => return TriTriIntersection::None,
        Side::OnPlane => return TriTriIntersection::Coplanar,
        Side::Straddles => {}
    }

    let dist_a = plane_distances(tri_a, &normal_b, normal_b.dot(&tri_b[0].coords), tol.plane);
    match side_of(&dist_a) {
        Side::Positive | Side::Negative => return TriTriIntersection::None,
        Side::OnPlane => return TriTriIntersection::Coplanar,
        Side::Straddles => {}
    }

    let direction = normal_a.cross(&normal_b);
    let len = direction.norm();
    if len < 1e-12 {
        // Parallel planes within tolerance of each other
        return TriTriIntersection::Coplanar;
    }
    let direction = direction / len;

    let (Some(span_a), Some(span_b)) = (
        crossing_span(tri_a, &dist_a, &direction),
        crossing_span(tri_b, &dist_b, &direction),
    ) else {
        return TriTriIntersection::None;
    };

    let low = if span_a.low.0 >= span_b.low.0 {
        span_a.low
    } else {
        span_b.low
    };
    let high = if span_a.high.0 <= span_b.high.0 {
        span_a.high
    } else {
        span_b.high
    };

    if high.0 - low.0 <= tol.min_segment || (high.1 - low.1).norm() <= tol.min_segment {
        return TriTriIntersection::None;
    }

    if compare_points(&low.1, &high.1) == Ordering::Greater {
        TriTriIntersection::Segment(high.1, low.1)
    } else {
        TriTriIntersection::Segment(low.1, high.1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Positive,
    Negative,
    OnPlane,
    Straddles,
}

fn plane_distances(
    tri: &[Point3<f64>; 3],
    normal: &Vector3<f64>,
    d: f64,
    tolerance: f64,
) -> [f64; 3] {
    tri.map(|p| {
        let dist = signed_plane_distance(&p, normal, d);
        if dist.abs() < tolerance {
            0.0
        } else {
            dist
        }
    })
}

fn side_of(dist: &[f64; 3]) -> Side {
    if dist.iter().all(|&d| d > 0.0) {
        Side::Positive
    } else if dist.iter().all(|&d| d < 0.0) {
        Side::Negative
    } else if dist.iter().all(|&d| d == 0.0) {
        Side::OnPlane
    } else {
        Side::Straddles
    }
}

struct Span {
    low: (f64, Point3<f64>),
    high: (f64, Point3<f64>),
}

/// Part of the triangle on the other plane, as a parameter range along `direction`
fn crossing_span(tri: &[Point3<f64>; 3], dist: &[f64; 3], direction: &Vector3<f64>) -> Option<Span> {
    let mut points: Vec<Point3<f64>> = Vec::with_capacity(3);
    for i in 0..3 {
        if dist[i] == 0.0 {
            points.push(tri[i]);
        }
        let j = (i + 1) % 3;
        if dist[i] * dist[j] < 0.0 {
            let t = dist[i] / (dist[i] - dist[j]);
            points.push(tri[i] + (tri[j] - tri[i]) * t);
        }
    }

    let mut iter = points.into_iter().map(|p| (direction.dot(&p.coords), p));
    let first = iter.next()?;
    let mut span = Span {
        low: first,
        high: first,
    };
    for candidate in iter {
        if candidate.0 < span.low.0 {
            span.low = candidate;
        }
        if candidate.0 > span.high.0 {
            span.high = candidate;
        }
    }
    Some(span)
}

/// Lexicographic point order
pub fn compare_points(a: &Point3<f64>, b: &Point3<f64>) -> Ordering {
    a.x.total_cmp(&b.x)
        .then(a.y.total_cmp(&b.y))
        .then(a.z.total_cmp(&b.z))
}

fn compare_triangles(a: &[Point3<f64>; 3], b: &[Point3<f64>; 3]) -> Ordering {
    a.iter()
        .zip(b.iter())
        .map(|(p, q)| compare_points(p, q))
        .find(|o| *o != Ordering::Equal)
        .unwrap_or(Ordering::Equal)
}
