// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Closed primitive surfaces with outward winding
//!
//! Used for synthetic half-model boxes, the CLI demo model, tests and
//! benchmarks.

use super::{ComponentKind, Mesh};
use nalgebra::{Point3, Vector3};
use std::f64::consts::PI;

/// Geometric primitives
#[derive(Debug, Clone, PartialEq)]
pub enum Primitive {
    Box {
        min: Point3<f64>,
        max: Point3<f64>,
    },
    Sphere {
        center: Point3<f64>,
        r: f64,
        slices: u32,
        stacks: u32,
    },
    Cylinder {
        base: Point3<f64>,
        h: f64,
        r: f64,
        segments: u32,
    },
}

impl Primitive {
    pub fn cube(size: Vector3<f64>, center: bool) -> Self {
        let min = if center {
            Point3::from(-size / 2.0)
        } else {
            Point3::origin()
        };
        Self::Box {
            min,
            max: min + size,
        }
    }

    pub fn boxed(min: Point3<f64>, max: Point3<f64>) -> Self {
        Self::Box { min, max }
    }

    pub fn sphere(center: Point3<f64>, r: f64, slices: u32, stacks: u32) -> Self {
        Self::Sphere {
            center,
            r,
            slices: slices.max(3),
            stacks: stacks.max(2),
        }
    }

    /// Cylinder along +z starting at `base`
    pub fn cylinder(base: Point3<f64>, h: f64, r: f64, segments: u32) -> Self {
        Self::Cylinder {
            base,
            h,
            r,
            segments: segments.max(3),
        }
    }

    pub fn to_triangles(&self) -> Vec<[Point3<f64>; 3]> {
        match self {
            Self::Box { min, max } => box_triangles(min, max),
            Self::Sphere {
                center,
                r,
                slices,
                stacks,
            } => sphere_triangles(center, *r, *slices, *stacks),
            Self::Cylinder {
                base,
                h,
                r,
                segments,
            } => cylinder_triangles(base, *h, *r, *segments),
        }
    }

    pub fn to_mesh(&self, name: &str, kind: ComponentKind) -> Mesh {
        Mesh::from_triangles(name, kind, 0, &self.to_triangles())
    }
}

fn box_triangles(min: &Point3<f64>, max: &Point3<f64>) -> Vec<[Point3<f64>; 3]> {
    let p = [
        Point3::new(min.x, min.y, min.z),
        Point3::new(max.x, min.y, min.z),
        Point3::new(max.x, max.y, min.z),
        Point3::new(min.x, max.y, min.z),
        Point3::new(min.x, min.y, max.z),
        Point3::new(max.x, min.y, max.z),
        Point3::new(max.x, max.y, max.z),
        Point3::new(min.x, max.y, max.z),
    ];

    // Two triangles per face, counter-clockwise seen from outside
    const FACES: [[usize; 3]; 12] = [
        [4, 5, 6],
        [4, 6, 7],
        [1, 0, 3],
        [1, 3, 2],
        [5, 1, 2],
        [5, 2, 6],
        [0, 4, 7],
        [0, 7, 3],
        [7, 6, 2],
        [7, 2, 3],
        [0, 1, 5],
        [0, 5, 4],
    ];

    FACES
        .iter()
        .map(|face| [p[face[0]], p[face[1]], p[face[2]]])
        .collect()
}

fn sphere_triangles(
    center: &Point3<f64>,
    radius: f64,
    slices: u32,
    stacks: u32,
) -> Vec<[Point3<f64>; 3]> {
    let point = |i: u32, j: u32| -> Point3<f64> {
        let phi = PI * i as f64 / stacks as f64;
        let theta = 2.0 * PI * (j % slices) as f64 / slices as f64;
        center
            + Vector3::new(
                radius * phi.sin() * theta.cos(),
                radius * phi.sin() * theta.sin(),
                radius * phi.cos(),
            )
    };

    let mut triangles = Vec::with_capacity((2 * slices * stacks) as usize);
    for i in 0..stacks {
        for j in 0..slices {
            let a = point(i, j);
            let b = point(i + 1, j);
            let c = point(i + 1, j + 1);
            let d = point(i, j + 1);

            // Pole rows collapse one corner, keep the fan triangle only
            if i + 1 < stacks {
                triangles.push([a, b, c]);
            }
            if i > 0 {
                triangles.push([a, c, d]);
            }
        }
    }
    triangles
}

fn cylinder_triangles(
    base: &Point3<f64>,
    height: f64,
    radius: f64,
    segments: u32,
) -> Vec<[Point3<f64>; 3]> {
    let ring = |j: u32, z: f64| -> Point3<f64> {
        let theta = 2.0 * PI * (j % segments) as f64 / segments as f64;
        base + Vector3::new(radius * theta.cos(), radius * theta.sin(), z)
    };
    let bottom = *base;
    let top = base + Vector3::new(0.0, 0.0, height);

    let mut triangles = Vec::with_capacity(4 * segments as usize);
    for j in 0..segments {
        let a = ring(j, 0.0);
        let b = ring(j + 1, 0.0);
        let c = ring(j + 1, height);
        let d = ring(j, height);
        triangles.push([a, b, c]);
        triangles.push([a, c, d]);
        triangles.push([bottom, b, a]);
        triangles.push([top, d, c]);
    }
    triangles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::robust_predicates::tetra_volume_from_origin;

    fn volume(triangles: &[[Point3<f64>; 3]]) -> f64 {
        triangles
            .iter()
            .map(|t| tetra_volume_from_origin(&t[0], &t[1], &t[2]))
            .sum()
    }

    #[test]
    fn test_box_is_outward() {
        let tris = Primitive::cube(Vector3::new(2.0, 3.0, 4.0), true).to_triangles();
        assert_eq!(tris.len(), 12);
        assert!((volume(&tris) - 24.0).abs() < 1e-12);
    }

    #[test]
    fn test_sphere_volume_converges() {
        let r = 2.0;
        let tris = Primitive::sphere(Point3::new(1.0, 0.0, 0.0), r, 48, 24).to_triangles();
        let expected = 4.0 / 3.0 * PI * r * r * r;
        let v = volume(&tris);
        assert!(v > 0.0);
        assert!(((v - expected) / expected).abs() < 0.02, "volume {}", v);
    }

    #[test]
    fn test_cylinder_volume() {
        let tris = Primitive::cylinder(Point3::origin(), 3.0, 1.0, 64).to_triangles();
        let expected = PI * 3.0;
        let v = volume(&tris);
        assert!(((v - expected) / expected).abs() < 0.01, "volume {}", v);
    }
}
