// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Tolerance-based point welding and the indexed output mesh

use super::mesh::Mesh;
use super::robust_predicates::{tetra_volume_from_origin, triangle_area, triangle_normal};
use super::BoundingBox;
use ahash::AHashMap;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};

/// Uniform hash grid assigning one index to points closer than `tolerance`
#[derive(Debug, Clone)]
pub struct PointIndex {
    tolerance: f64,
    cells: AHashMap<(i64, i64, i64), Vec<usize>>,
    points: Vec<Point3<f64>>,
}

impl PointIndex {
    pub fn new(tolerance: f64) -> Self {
        Self {
            tolerance: tolerance.max(f64::MIN_POSITIVE),
            cells: AHashMap::new(),
            points: Vec::new(),
        }
    }

    fn cell_of(&self, p: &Point3<f64>) -> (i64, i64, i64) {
        let inv = 1.0 / self.tolerance;
        (
            (p.x * inv).floor() as i64,
            (p.y * inv).floor() as i64,
            (p.z * inv).floor() as i64,
        )
    }

    /// Index of an existing point within tolerance, if any
    pub fn find(&self, p: &Point3<f64>) -> Option<usize> {
        let (cx, cy, cz) = self.cell_of(p);
        let tol_sq = self.tolerance * self.tolerance;
        let mut best: Option<(usize, f64)> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(bucket) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &idx in bucket {
                        let d = (self.points[idx] - p).norm_squared();
                        if d <= tol_sq && best.map_or(true, |(b, bd)| d < bd || (d == bd && idx < b)) {
                            best = Some((idx, d));
                        }
                    }
                }
            }
        }
        best.map(|(idx, _)| idx)
    }

    /// Index of `p`, inserting it when no point lies within tolerance
    pub fn insert(&mut self, p: Point3<f64>) -> usize {
        if let Some(idx) = self.find(&p) {
            return idx;
        }
        let idx = self.points.len();
        let cell = self.cell_of(&p);
        self.points.push(p);
        self.cells.entry(cell).or_default().push(idx);
        idx
    }

    pub fn points(&self) -> &[Point3<f64>] {
        &self.points
    }

    pub fn into_points(self) -> Vec<Point3<f64>> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Welded triangle mesh ready for export
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexedMesh {
    pub vertices: Vec<Point3<f64>>,
    pub triangles: Vec<[usize; 3]>,
    /// Owning component of every triangle
    pub components: Vec<usize>,
    /// Component names, indexed by component
    pub component_names: Vec<String>,
    /// Triangles dropped because welding collapsed them
    pub collapsed: usize,
}

impl IndexedMesh {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.triangles.len()
    }

    pub fn corners(&self, triangle: usize) -> [Point3<f64>; 3] {
        self.triangles[triangle].map(|i| self.vertices[i])
    }

    pub fn normal(&self, triangle: usize) -> Vector3<f64> {
        let c = self.corners(triangle);
        triangle_normal(&c[0], &c[1], &c[2]).unwrap_or_else(Vector3::zeros)
    }

    pub fn surface_area(&self) -> f64 {
        (0..self.triangles.len())
            .map(|t| {
                let c = self.corners(t);
                triangle_area(&c[0], &c[1], &c[2])
            })
            .sum()
    }

    /// Divergence-theorem volume
    pub fn volume(&self) -> f64 {
        (0..self.triangles.len())
            .map(|t| {
                let c = self.corners(t);
                tetra_volume_from_origin(&c[0], &c[1], &c[2])
            })
            .sum()
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::from_points(&self.vertices)
    }

    /// Weld a triangle soup
    pub fn from_triangles(
        triangles: &[[Point3<f64>; 3]],
        components: &[usize],
        tolerance: f64,
    ) -> Self {
        let mut index = PointIndex::new(tolerance);
        let mut mesh = IndexedMesh::default();
        for (t, corners) in triangles.iter().enumerate() {
            let ids = corners.map(|p| index.insert(p));
            if ids[0] == ids[1] || ids[1] == ids[2] || ids[0] == ids[2] {
                mesh.collapsed += 1;
                continue;
            }
            mesh.triangles.push(ids);
            mesh.components.push(components.get(t).copied().unwrap_or(0));
        }
        mesh.vertices = index.into_points();
        mesh
    }
}

/// Weld the wetted pieces of every physical mesh into one indexed mesh
///
/// The weld tolerance is `tolerance_factor` times the diagonal of the
/// combined bounding box.
pub fn build_indexed_mesh(
    meshes: &[Mesh],
    component_names: &[String],
    tolerance_factor: f64,
) -> IndexedMesh {
    let mut bbox = BoundingBox::empty();
    let mut triangles = Vec::new();
    let mut components = Vec::new();

    for mesh in meshes.iter().filter(|m| m.kind.is_physical()) {
        for piece in mesh.pieces().filter(|p| !p.ignored) {
            for corner in &piece.corners {
                bbox.expand_to_include(corner);
            }
            triangles.push(piece.corners);
            components.push(piece.component);
        }
    }

    let tolerance = (bbox.diagonal() * tolerance_factor).max(f64::MIN_POSITIVE);
    let mut indexed = IndexedMesh::from_triangles(&triangles, &components, tolerance);
    indexed.component_names = component_names.to_vec();

    if indexed.collapsed > 0 {
        tracing::debug!(
            collapsed = indexed.collapsed,
            "dropped triangles collapsed by welding"
        );
    }
    indexed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ComponentKind, Primitive};

    #[test]
    fn test_point_index_merges_within_tolerance() {
        let mut index = PointIndex::new(1e-3);
        let a = index.insert(Point3::new(0.0, 0.0, 0.0));
        let b = index.insert(Point3::new(0.0005, 0.0, 0.0));
        let c = index.insert(Point3::new(0.01, 0.0, 0.0));
        // Across a cell boundary
        let d = index.insert(Point3::new(0.0099999, 0.0, 0.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(c, d);
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_box_welds_to_eight_vertices() {
        let mesh = Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false)
            .to_mesh("box", ComponentKind::Solid);
        let indexed = build_indexed_mesh(&[mesh], &["box".to_string()], 1e-7);
        assert_eq!(indexed.vertex_count(), 8);
        assert_eq!(indexed.triangle_count(), 12);
        assert_eq!(indexed.collapsed, 0);
        assert!((indexed.volume() - 1.0).abs() < 1e-12);
        assert!((indexed.surface_area() - 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_collapsed_triangles_are_counted() {
        let tris = [
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1.0, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
            [
                Point3::new(0.0, 0.0, 0.0),
                Point3::new(1e-9, 0.0, 0.0),
                Point3::new(0.0, 1.0, 0.0),
            ],
        ];
        let indexed = IndexedMesh::from_triangles(&tris, &[0, 0], 1e-6);
        assert_eq!(indexed.triangle_count(), 1);
        assert_eq!(indexed.collapsed, 1);
    }
}
