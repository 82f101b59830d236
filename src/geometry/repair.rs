// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Mesh repair: degenerate facet removal, open-edge detection and
//! merge-or-delete of open meshes

use super::dedup::PointIndex;
use super::mesh::{ComponentKind, Mesh};
use ahash::{AHashMap, AHashSet};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Edge between two welded vertex ids
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct Edge {
    v0: usize,
    v1: usize,
}

impl Edge {
    fn new(v0: usize, v1: usize) -> Self {
        // Smaller index first for consistent hashing
        if v0 < v1 {
            Self { v0, v1 }
        } else {
            Self { v0: v1, v1: v0 }
        }
    }

    fn is_collapsed(&self) -> bool {
        self.v0 == self.v1
    }
}

/// Boundary edge used by exactly one facet
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OpenEdge {
    pub facet: usize,
    pub start: Point3<f64>,
    pub end: Point3<f64>,
}

/// What the repair stage changed
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RepairReport {
    pub degenerate_removed: usize,
    pub open_meshes_removed: usize,
    pub removed_names: Vec<String>,
    pub open_meshes_merged: usize,
    pub merged_names: Vec<String>,
    /// Open meshes left in place because deletion was disabled
    pub open_meshes_kept: Vec<String>,
}

/// Zero-length edge, repeated corner, or height below `tolerance`
pub fn is_degenerate(corners: &[Point3<f64>; 3], tolerance: f64) -> bool {
    let edges = [
        corners[1] - corners[0],
        corners[2] - corners[1],
        corners[0] - corners[2],
    ];
    let longest = edges.iter().map(|e| e.norm()).fold(0.0, f64::max);
    if edges.iter().any(|e| e.norm() < tolerance) || !longest.is_finite() {
        return true;
    }
    let twice_area = edges[0].cross(&edges[1]).norm();
    twice_area / longest < tolerance
}

/// Remove degenerate facets, returning how many were dropped
pub fn remove_degenerate(mesh: &mut Mesh, tolerance: f64) -> usize {
    let before = mesh.facets.len();
    mesh.facets.retain(|f| !is_degenerate(&f.corners, tolerance));
    let removed = before - mesh.facets.len();
    if removed > 0 {
        debug!(mesh = %mesh.name, removed, "removed degenerate facets");
    }
    removed
}

fn facet_edges(mesh: &Mesh, index: &mut PointIndex) -> Vec<(Edge, usize)> {
    let mut edges = Vec::with_capacity(mesh.facets.len() * 3);
    for (f, facet) in mesh.facets.iter().enumerate() {
        let ids = facet.corners.map(|p| index.insert(p));
        for k in 0..3 {
            let edge = Edge::new(ids[k], ids[(k + 1) % 3]);
            if !edge.is_collapsed() {
                edges.push((edge, f));
            }
        }
    }
    edges
}

/// Boundary edges of `mesh`: edges used by exactly one facet after welding
/// corners closer than `tolerance`
pub fn check_if_closed(mesh: &Mesh, tolerance: f64) -> Vec<OpenEdge> {
    let mut index = PointIndex::new(tolerance);
    let edges = facet_edges(mesh, &mut index);

    let mut counts: AHashMap<Edge, (u32, usize)> = AHashMap::new();
    for (edge, facet) in &edges {
        counts.entry(*edge).or_insert((0, *facet)).0 += 1;
    }

    let points = index.points();
    let mut open: Vec<OpenEdge> = counts
        .iter()
        .filter(|(_, (count, _))| *count == 1)
        .map(|(edge, (_, facet))| OpenEdge {
            facet: *facet,
            start: points[edge.v0],
            end: points[edge.v1],
        })
        .collect();
    open.sort_by(|a, b| {
        a.facet.cmp(&b.facet).then(
            super::triangle_intersection::compare_points(&a.start, &b.start),
        )
    });
    open
}

/// Splice `other` into `mesh` when every open edge of `mesh` coincides with
/// an open edge of `other`
///
/// Returns `true` when the facets were appended; the caller then drops
/// `other`.
pub fn merge_non_closed(mesh: &mut Mesh, other: &Mesh, tolerance: f64) -> bool {
    let open = check_if_closed(mesh, tolerance);
    if open.is_empty() {
        return false;
    }
    let other_open = check_if_closed(other, tolerance);
    if other_open.is_empty() {
        return false;
    }

    let mut index = PointIndex::new(tolerance);
    let mut available: AHashSet<Edge> = AHashSet::with_capacity(other_open.len());
    for edge in &other_open {
        available.insert(Edge::new(index.insert(edge.start), index.insert(edge.end)));
    }

    let all_matched = open.iter().all(|edge| {
        match (index.find(&edge.start), index.find(&edge.end)) {
            (Some(a), Some(b)) => available.contains(&Edge::new(a, b)),
            _ => false,
        }
    });
    if !all_matched {
        return false;
    }

    let component = mesh.component;
    mesh.facets.extend(other.facets.iter().map(|facet| {
        let mut facet = facet.clone();
        facet.component = component;
        facet
    }));
    true
}

/// Tolerances for [`merge_remove_open_meshes`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RepairTolerance {
    pub degenerate: f64,
    pub merge: f64,
}

/// Remove degenerate facets, merge open meshes pairwise and, when
/// `delete_open` is set, drop solids that stay open
///
/// Only solids must be closed; shells are open surfaces by nature.
pub fn merge_remove_open_meshes(
    meshes: &mut Vec<Mesh>,
    delete_open: bool,
    tol: RepairTolerance,
) -> RepairReport {
    let mut report = RepairReport::default();

    for mesh in meshes.iter_mut() {
        report.degenerate_removed += remove_degenerate(mesh, tol.degenerate);
    }

    let needs_closure = |mesh: &Mesh| mesh.kind == ComponentKind::Solid;
    let mut open: Vec<bool> = meshes
        .iter()
        .map(|m| needs_closure(m) && !check_if_closed(m, tol.merge).is_empty())
        .collect();
    let mut merged = vec![false; meshes.len()];

    for i in 0..meshes.len() {
        if merged[i] || !open[i] {
            continue;
        }
        for j in (i + 1)..meshes.len() {
            if merged[j] || !open[j] {
                continue;
            }
            let (head, tail) = meshes.split_at_mut(j);
            if merge_non_closed(&mut head[i], &tail[0], tol.merge) {
                debug!(into = %head[i].name, from = %tail[0].name, "merged open meshes");
                merged[j] = true;
                report.open_meshes_merged += 1;
                report.merged_names.push(tail[0].name.clone());
                open[i] = !check_if_closed(&head[i], tol.merge).is_empty();
                if !open[i] {
                    break;
                }
            }
        }
    }

    let mut keep = Vec::with_capacity(meshes.len());
    for (i, mesh) in meshes.iter().enumerate() {
        if merged[i] {
            keep.push(false);
        } else if open[i] && delete_open {
            warn!(mesh = %mesh.name, "open mesh removed");
            report.open_meshes_removed += 1;
            report.removed_names.push(mesh.name.clone());
            keep.push(false);
        } else {
            if open[i] {
                report.open_meshes_kept.push(mesh.name.clone());
            }
            keep.push(true);
        }
    }
    let mut flags = keep.into_iter();
    meshes.retain(|_| flags.next().unwrap_or(true));

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use nalgebra::Vector3;

    const TOL: RepairTolerance = RepairTolerance {
        degenerate: 1e-9,
        merge: 1e-7,
    };

    fn unit_box(name: &str) -> Mesh {
        Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_mesh(name, ComponentKind::Solid)
    }

    #[test]
    fn test_closed_box_has_no_open_edges() {
        assert!(check_if_closed(&unit_box("box"), 1e-7).is_empty());
    }

    #[test]
    fn test_missing_facet_opens_three_edges() {
        let mut mesh = unit_box("box");
        mesh.facets.remove(0);
        let open = check_if_closed(&mesh, 1e-7);
        assert_eq!(open.len(), 3);
    }

    #[test]
    fn test_degenerate_facets_removed() {
        let mut mesh = unit_box("box");
        let p = mesh.facets[0].corners[0];
        mesh.add_facet([p, p, mesh.facets[0].corners[1]]);
        mesh.add_facet([
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(2.0, 0.0, 0.0),
        ]);
        assert_eq!(remove_degenerate(&mut mesh, 1e-9), 2);
        assert_eq!(mesh.facet_count(), 12);
    }

    #[test]
    fn test_split_box_halves_merge() {
        let whole = unit_box("box");
        // Faces 0..6 are z+, z- and x+; the rest is the other half
        let mut first = Mesh::new("first", ComponentKind::Solid);
        first.facets = whole.facets[..6].to_vec();
        let mut second = Mesh::new("second", ComponentKind::Solid);
        second.component = 1;
        second.facets = whole.facets[6..].to_vec();

        let mut meshes = vec![first, second];
        let report = merge_remove_open_meshes(&mut meshes, true, TOL);
        assert_eq!(report.open_meshes_merged, 1);
        assert_eq!(report.merged_names, vec!["second".to_string()]);
        assert_eq!(report.open_meshes_removed, 0);
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].facet_count(), 12);
        assert!(meshes[0].facets.iter().all(|f| f.component == 0));
    }

    #[test]
    fn test_open_mesh_removed_or_kept() {
        let mut open_box = unit_box("open");
        open_box.facets.pop();

        let mut meshes = vec![open_box.clone(), unit_box("closed")];
        let report = merge_remove_open_meshes(&mut meshes, true, TOL);
        assert_eq!(report.open_meshes_removed, 1);
        assert_eq!(report.removed_names, vec!["open".to_string()]);
        assert_eq!(meshes.len(), 1);
        assert_eq!(meshes[0].name, "closed");

        let mut meshes = vec![open_box];
        let report = merge_remove_open_meshes(&mut meshes, false, TOL);
        assert_eq!(report.open_meshes_removed, 0);
        assert_eq!(report.open_meshes_kept, vec!["open".to_string()]);
        assert_eq!(meshes.len(), 1);
    }
}
