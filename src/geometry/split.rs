// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Re-triangulation of facets along their intersection edges
//!
//! The facet is mapped into its own plane and treated as a set of convex
//! cells, starting with the triangle itself. Every cut segment splits the
//! cells it passes through along its supporting line, so cells stay convex
//! and always tile the parent. Cells are fan-triangulated at the end.

use super::intersect::IntersectStats;
use super::mesh::{Facet, FacetState, Mesh};
use super::robust_predicates::{orient2d, triangle_normal};
use super::triangle_intersection::compare_points;
use nalgebra::{Point2, Point3, Vector2, Vector3};
use rayon::prelude::*;
use tracing::debug;

/// Orthonormal frame in the plane of a facet
#[derive(Debug, Clone, Copy)]
struct PlaneFrame {
    origin: Point3<f64>,
    u: Vector3<f64>,
    v: Vector3<f64>,
}

impl PlaneFrame {
    fn of(corners: &[Point3<f64>; 3]) -> Option<Self> {
        let normal = triangle_normal(&corners[0], &corners[1], &corners[2])?;
        let u = (corners[1] - corners[0]).try_normalize(f64::EPSILON)?;
        Some(Self {
            origin: corners[0],
            u,
            v: normal.cross(&u),
        })
    }

    fn project(&self, p: &Point3<f64>) -> Point2<f64> {
        let d = p - self.origin;
        Point2::new(d.dot(&self.u), d.dot(&self.v))
    }

    fn lift(&self, p: &Point2<f64>) -> Point3<f64> {
        self.origin + self.u * p.x + self.v * p.y
    }
}

/// Merges 2D points closer than the tolerance
struct Snapper {
    points: Vec<Point2<f64>>,
    tolerance: f64,
}

impl Snapper {
    fn snap(&mut self, p: Point2<f64>) -> Point2<f64> {
        if let Some(existing) = self
            .points
            .iter()
            .find(|q| (*q - p).norm() <= self.tolerance)
        {
            return *existing;
        }
        self.points.push(p);
        p
    }
}

type Cell = Vec<Point2<f64>>;

fn cell_area(cell: &[Point2<f64>]) -> f64 {
    let mut twice = 0.0;
    for i in 0..cell.len() {
        let a = cell[i];
        let b = cell[(i + 1) % cell.len()];
        twice += a.x * b.y - b.x * a.y;
    }
    twice * 0.5
}

/// Cut `cell` along the line through `p` with direction `dir` (unit) if the
/// segment `p..p + len * dir` overlaps it by more than `tolerance`
fn cut_cell(
    cell: &[Point2<f64>],
    p: &Point2<f64>,
    dir: &Vector2<f64>,
    len: f64,
    tolerance: f64,
) -> Option<(Cell, Cell)> {
    let normal = Vector2::new(-dir.y, dir.x);
    let side: Vec<f64> = cell
        .iter()
        .map(|q| {
            let s = normal.dot(&(q - p));
            if s.abs() <= tolerance {
                0.0
            } else {
                s
            }
        })
        .collect();

    if side.iter().all(|&s| s >= 0.0) || side.iter().all(|&s| s <= 0.0) {
        return None;
    }

    // Where the line enters and leaves the cell, as distances along `dir`
    let mut crossings: Vec<Point2<f64>> = Vec::with_capacity(2);
    for i in 0..cell.len() {
        let j = (i + 1) % cell.len();
        if side[i] == 0.0 {
            crossings.push(cell[i]);
        } else if side[i] * side[j] < 0.0 {
            let t = side[i] / (side[i] - side[j]);
            crossings.push(cell[i] + (cell[j] - cell[i]) * t);
        }
    }
    let along = |q: &Point2<f64>| dir.dot(&(q - p));
    let enter = crossings.iter().map(along).fold(f64::INFINITY, f64::min);
    let leave = crossings.iter().map(along).fold(f64::NEG_INFINITY, f64::max);
    if leave.min(len) - enter.max(0.0) <= tolerance {
        return None;
    }

    let mut left = Cell::with_capacity(cell.len() + 1);
    let mut right = Cell::with_capacity(cell.len() + 1);
    for i in 0..cell.len() {
        let j = (i + 1) % cell.len();
        let (a, sa, sb) = (cell[i], side[i], side[j]);
        if sa >= 0.0 {
            left.push(a);
        }
        if sa <= 0.0 {
            right.push(a);
        }
        if sa * sb < 0.0 {
            let t = sa / (sa - sb);
            let x = a + (cell[j] - a) * t;
            left.push(x);
            right.push(x);
        }
    }

    if left.len() < 3 || right.len() < 3 {
        return None;
    }
    Some((left, right))
}

/// Children tiling `facet` along its intersection edges, `None` when the
/// edges do not cut it
pub fn split_facet(facet: &Facet, tolerance: f64) -> Option<Vec<Facet>> {
    if facet.edges.is_empty() {
        return None;
    }
    let frame = PlaneFrame::of(&facet.corners)?;

    let mut segments: Vec<(Point3<f64>, Point3<f64>)> = facet
        .edges
        .iter()
        .map(|e| {
            if compare_points(&e.start, &e.end).is_gt() {
                (e.end, e.start)
            } else {
                (e.start, e.end)
            }
        })
        .collect();
    segments.sort_by(|a, b| compare_points(&a.0, &b.0).then(compare_points(&a.1, &b.1)));

    let tri = facet.corners.map(|c| frame.project(&c));
    let mut snapper = Snapper {
        points: tri.to_vec(),
        tolerance,
    };
    let mut cells: Vec<Cell> = vec![tri.to_vec()];
    let mut seen: Vec<(Point2<f64>, Point2<f64>)> = Vec::new();

    for (start, end) in segments {
        let p = snapper.snap(frame.project(&start));
        let q = snapper.snap(frame.project(&end));
        let delta = q - p;
        let len = delta.norm();
        if len <= tolerance || seen.contains(&(p, q)) {
            continue;
        }
        seen.push((p, q));
        let dir = delta / len;

        let mut next = Vec::with_capacity(cells.len() + 2);
        for cell in cells {
            match cut_cell(&cell, &p, &dir, len, tolerance) {
                Some((left, right)) => {
                    next.push(left);
                    next.push(right);
                }
                None => next.push(cell),
            }
        }
        cells = next;
    }

    if cells.len() < 2 {
        return None;
    }

    let min_area = tolerance * tolerance;
    let mut children = Vec::new();
    for cell in &cells {
        if cell_area(cell) <= min_area {
            continue;
        }
        for k in 1..cell.len() - 1 {
            let (a, b, c) = (cell[0], cell[k], cell[k + 1]);
            if orient2d(&a, &b, &c) * 0.5 <= min_area {
                continue;
            }
            let mut child = Facet::with_normal(
                [frame.lift(&a), frame.lift(&b), frame.lift(&c)],
                facet.normal,
                facet.component,
            );
            child.tag = facet.tag;
            children.push(child);
        }
    }
    Some(children)
}

/// Split every facet of `mesh` that carries edges, then drop the edges
pub fn split_mesh(mesh: &mut Mesh, tolerance: f64) -> IntersectStats {
    let mut stats = IntersectStats::default();
    for index in 0..mesh.facets.len() {
        if !mesh.facets[index].is_leaf() {
            continue;
        }
        let Some(children) = split_facet(&mesh.facets[index], tolerance) else {
            continue;
        };
        let first = mesh.splits.len();
        stats.facets_split += 1;
        stats.children_created += children.len();
        mesh.splits.extend(children);
        mesh.facets[index].state = FacetState::Split {
            children: (first..mesh.splits.len()).collect(),
        };
    }
    mesh.clear_edges();
    stats
}

/// Split all meshes
pub fn split_all(meshes: &mut [Mesh], tolerance: f64, parallel: bool) -> IntersectStats {
    let per_mesh: Vec<IntersectStats> = if parallel {
        meshes
            .par_iter_mut()
            .map(|m| split_mesh(m, tolerance))
            .collect()
    } else {
        meshes.iter_mut().map(|m| split_mesh(m, tolerance)).collect()
    };

    let mut stats = IntersectStats::default();
    for s in &per_mesh {
        stats.merge(s);
    }
    debug!(
        facets = stats.facets_split,
        children = stats.children_created,
        "split intersected facets"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::mesh::IntersectionEdge;
    use crate::geometry::ComponentKind;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const TOL: f64 = 1e-6;

    fn facet() -> Facet {
        Facet::new(
            [
                Point3::new(0.0, 0.0, 1.0),
                Point3::new(4.0, 0.0, 1.0),
                Point3::new(0.0, 4.0, 1.0),
            ],
            3,
        )
    }

    fn edge(a: [f64; 2], b: [f64; 2]) -> IntersectionEdge {
        IntersectionEdge {
            start: Point3::new(a[0], a[1], 1.0),
            end: Point3::new(b[0], b[1], 1.0),
            mesh: 1,
        }
    }

    fn total_area(children: &[Facet]) -> f64 {
        children.iter().map(Facet::area).sum()
    }

    #[test]
    fn test_no_edges_stays_leaf() {
        assert!(split_facet(&facet(), TOL).is_none());
    }

    #[test]
    fn test_full_chord_splits_in_two_cells() {
        let mut f = facet();
        f.edges.push(edge([0.0, 1.0], [3.0, 1.0]));
        let children = split_facet(&f, TOL).unwrap();
        // Triangle above the chord, quad below fanned into two
        assert_eq!(children.len(), 3);
        assert!((total_area(&children) - f.area()).abs() < 1e-12);
        for child in &children {
            assert_eq!(child.component, 3);
            assert_eq!(child.normal, f.normal);
            let n = triangle_normal(&child.corners[0], &child.corners[1], &child.corners[2]).unwrap();
            assert!(n.dot(&f.normal) > 0.999);
        }
    }

    #[test]
    fn test_children_keep_tag() {
        let mut f = facet();
        f.tag = 2;
        f.edges.push(edge([0.0, 1.0], [3.0, 1.0]));
        f.edges.push(edge([1.0, 0.0], [1.0, 3.0]));
        let children = split_facet(&f, TOL).unwrap();
        assert!(children.len() > 3);
        assert!(children.iter().all(|c| c.tag == 2 && c.component == 3));
    }

    #[test]
    fn test_interior_segment_is_extended() {
        let mut f = facet();
        f.edges.push(edge([0.5, 0.5], [1.5, 0.5]));
        let children = split_facet(&f, TOL).unwrap();
        assert!((total_area(&children) - f.area()).abs() < 1e-12);
        // No child straddles y = 0.5
        for child in &children {
            let min = child.corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);
            let max = child.corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max);
            assert!(max <= 0.5 + 1e-9 || min >= 0.5 - 1e-9);
        }
    }

    #[test]
    fn test_edge_along_border_does_not_split() {
        let mut f = facet();
        f.edges.push(edge([0.5, 0.0], [2.5, 0.0]));
        assert!(split_facet(&f, TOL).is_none());
    }

    #[test]
    fn test_random_cuts_partition_area() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..50 {
            let mut f = facet();
            for _ in 0..rng.gen_range(1..6) {
                let a = [rng.gen_range(0.0..2.0), rng.gen_range(0.0..2.0)];
                let b = [rng.gen_range(0.0..2.0), rng.gen_range(0.0..2.0)];
                f.edges.push(edge(a, b));
            }
            if let Some(children) = split_facet(&f, TOL) {
                let area = total_area(&children);
                assert!((area - f.area()).abs() < 1e-9, "area {} vs {}", area, f.area());
            }
        }
    }

    #[test]
    fn test_split_mesh_sets_state_and_clears_edges() {
        let mut mesh = Mesh::new("m", ComponentKind::Solid);
        mesh.facets.push(facet());
        mesh.facets.push(facet());
        mesh.facets[0].edges.push(edge([0.0, 2.0], [2.0, 2.0]));

        let stats = split_mesh(&mut mesh, TOL);
        assert_eq!(stats.facets_split, 1);
        assert_eq!(stats.children_created, mesh.splits.len());
        assert!(!mesh.facets[0].is_leaf());
        assert!(mesh.facets[1].is_leaf());
        assert!(mesh.facets.iter().all(|f| f.edges.is_empty()));
        let area: f64 = mesh.pieces().map(Facet::area).sum();
        assert!((area - 16.0).abs() < 1e-9);
    }
}
