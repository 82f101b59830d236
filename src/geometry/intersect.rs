// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Pairwise mesh intersection sweep
//!
//! Cut segments are computed per mesh pair from read-only geometry and then
//! appended to the facets of both meshes in pair order, so the sequential
//! and parallel sweeps leave identical edge lists behind.

use super::bvh::Bvh;
use super::mesh::{IntersectionEdge, Mesh};
use super::triangle_intersection::{intersect_triangles, IntersectTolerance, TriTriIntersection};
use super::BoundingBox;
use crate::error::{CompGeomError, CompGeomResult};
use nalgebra::Point3;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Cooperative cancellation flag shared with a running pipeline
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once [`CancelToken::cancel`] was called
    pub fn check(&self) -> CompGeomResult<()> {
        if self.is_cancelled() {
            Err(CompGeomError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Counters of the intersect and split stages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntersectStats {
    pub mesh_pairs_tested: usize,
    pub facet_pairs_tested: usize,
    pub segments: usize,
    pub coplanar_pairs: usize,
    pub facets_split: usize,
    pub children_created: usize,
}

impl IntersectStats {
    pub fn merge(&mut self, other: &IntersectStats) {
        self.mesh_pairs_tested += other.mesh_pairs_tested;
        self.facet_pairs_tested += other.facet_pairs_tested;
        self.segments += other.segments;
        self.coplanar_pairs += other.coplanar_pairs;
        self.facets_split += other.facets_split;
        self.children_created += other.children_created;
    }
}

/// One cut between facet `facet_a` of the first mesh and `facet_b` of the second
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FacetHit {
    pub facet_a: usize,
    pub facet_b: usize,
    pub start: Point3<f64>,
    pub end: Point3<f64>,
}

/// Everything one mesh pair produced
#[derive(Debug, Clone, Default)]
pub struct PairHits {
    pub hits: Vec<FacetHit>,
    pub facet_pairs_tested: usize,
    pub coplanar_pairs: usize,
}

/// BVH over the input facets of `mesh`, boxes grown by `margin`
pub fn facet_tree(mesh: &Mesh, margin: f64) -> Bvh {
    Bvh::build(
        mesh.facets
            .iter()
            .enumerate()
            .map(|(idx, facet)| (idx, facet.bounding_box().inflated(margin)))
            .collect(),
    )
}

fn margin(tol: &IntersectTolerance) -> f64 {
    tol.plane.max(tol.min_segment)
}

/// Intersect every facet of `a` with the facets of `b` found through `tree_b`
pub fn intersect_pair(a: &Mesh, b: &Mesh, tree_b: &Bvh, tol: &IntersectTolerance) -> PairHits {
    let mut result = PairHits::default();
    let margin = margin(tol);

    for (ia, facet_a) in a.facets.iter().enumerate() {
        let search = facet_a.bounding_box().inflated(margin);
        let mut candidates = tree_b.query(&search);
        candidates.sort_unstable();

        for ib in candidates {
            let Some(facet_b) = b.facets.get(ib) else {
                continue;
            };
            result.facet_pairs_tested += 1;
            match intersect_triangles(&facet_a.corners, &facet_b.corners, tol) {
                TriTriIntersection::Segment(start, end) => result.hits.push(FacetHit {
                    facet_a: ia,
                    facet_b: ib,
                    start,
                    end,
                }),
                TriTriIntersection::Coplanar => result.coplanar_pairs += 1,
                TriTriIntersection::None => {}
            }
        }
    }
    result
}

/// Overlapping mesh pairs `(i, j)` with `i < j`, in order
fn candidate_pairs(boxes: &[BoundingBox]) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    for i in 0..boxes.len() {
        for j in (i + 1)..boxes.len() {
            if !boxes[i].is_empty() && !boxes[j].is_empty() && boxes[i].intersects(&boxes[j]) {
                pairs.push((i, j));
            }
        }
    }
    pairs
}

/// Intersect all mesh pairs and record the segments on both facets
pub fn intersect_all(
    meshes: &mut [Mesh],
    tol: &IntersectTolerance,
    parallel: bool,
    cancel: Option<&CancelToken>,
) -> CompGeomResult<IntersectStats> {
    let margin = margin(tol);
    let boxes: Vec<BoundingBox> = meshes
        .iter()
        .map(|m| m.bounding_box().inflated(margin))
        .collect();
    let pairs = candidate_pairs(&boxes);

    let snapshot: &[Mesh] = meshes;
    let trees: Vec<Bvh> = if parallel {
        snapshot.par_iter().map(|m| facet_tree(m, margin)).collect()
    } else {
        snapshot.iter().map(|m| facet_tree(m, margin)).collect()
    };

    let run_pair = |&(i, j): &(usize, usize)| -> CompGeomResult<PairHits> {
        if let Some(token) = cancel {
            token.check()?;
        }
        Ok(intersect_pair(&snapshot[i], &snapshot[j], &trees[j], tol))
    };
    let results: Vec<PairHits> = if parallel {
        pairs.par_iter().map(run_pair).collect::<CompGeomResult<_>>()?
    } else {
        pairs.iter().map(run_pair).collect::<CompGeomResult<_>>()?
    };

    let mut stats = IntersectStats {
        mesh_pairs_tested: pairs.len(),
        ..Default::default()
    };
    for (&(i, j), pair) in pairs.iter().zip(results) {
        stats.facet_pairs_tested += pair.facet_pairs_tested;
        stats.coplanar_pairs += pair.coplanar_pairs;
        stats.segments += pair.hits.len();
        for hit in pair.hits {
            meshes[i].facets[hit.facet_a].edges.push(IntersectionEdge {
                start: hit.start,
                end: hit.end,
                mesh: j,
            });
            meshes[j].facets[hit.facet_b].edges.push(IntersectionEdge {
                start: hit.start,
                end: hit.end,
                mesh: i,
            });
        }
    }

    debug!(
        pairs = stats.mesh_pairs_tested,
        facet_pairs = stats.facet_pairs_tested,
        segments = stats.segments,
        coplanar = stats.coplanar_pairs,
        "intersection sweep done"
    );
    Ok(stats)
}

/// Intersect `target` with every mesh in `others`, recording cuts on
/// `target` only
///
/// Used for slice planes, which must not leave edges on the model.
pub fn intersect_into(target: &mut Mesh, others: &[Mesh], tol: &IntersectTolerance) -> IntersectStats {
    let margin = margin(tol);
    let target_box = target.bounding_box().inflated(margin);
    let mut stats = IntersectStats::default();
    let mut cuts: Vec<(usize, IntersectionEdge)> = Vec::new();

    for (index, other) in others.iter().enumerate() {
        if !other.bounding_box().inflated(margin).intersects(&target_box) {
            continue;
        }
        stats.mesh_pairs_tested += 1;
        let tree = facet_tree(other, margin);
        let pair = intersect_pair(target, other, &tree, tol);
        stats.facet_pairs_tested += pair.facet_pairs_tested;
        stats.coplanar_pairs += pair.coplanar_pairs;
        stats.segments += pair.hits.len();
        cuts.extend(pair.hits.into_iter().map(|hit| {
            (
                hit.facet_a,
                IntersectionEdge {
                    start: hit.start,
                    end: hit.end,
                    mesh: index,
                },
            )
        }));
    }

    for (facet, edge) in cuts {
        target.facets[facet].edges.push(edge);
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{ComponentKind, Primitive};
    use nalgebra::Vector3;

    fn overlapping_boxes() -> Vec<Mesh> {
        let a = Primitive::boxed(Point3::new(0.0, 0.0, 0.0), Point3::new(1.0, 1.0, 1.0))
            .to_mesh("a", ComponentKind::Solid);
        let mut b = Primitive::boxed(Point3::new(0.5, 0.25, 0.25), Point3::new(1.5, 0.75, 0.75))
            .to_mesh("b", ComponentKind::Solid);
        b.component = 1;
        vec![a, b]
    }

    #[test]
    fn test_crossing_boxes_get_edges_on_both() {
        let mut meshes = overlapping_boxes();
        let stats = intersect_all(&mut meshes, &IntersectTolerance::default(), false, None).unwrap();
        assert_eq!(stats.mesh_pairs_tested, 1);
        assert!(stats.segments > 0);

        let count = |m: &Mesh| m.facets.iter().map(|f| f.edges.len()).sum::<usize>();
        assert_eq!(count(&meshes[0]), stats.segments);
        assert_eq!(count(&meshes[1]), stats.segments);

        // Only the x = 1 face of `a` is pierced
        for facet in &meshes[0].facets {
            if !facet.edges.is_empty() {
                assert!(facet.corners.iter().all(|p| (p.x - 1.0).abs() < 1e-12));
                assert!(facet.edges.iter().all(|e| e.mesh == 1));
            }
        }
    }

    #[test]
    fn test_parallel_sweep_matches_sequential() {
        let mut sequential = overlapping_boxes();
        let mut parallel = overlapping_boxes();
        sequential.push(
            Primitive::sphere(Point3::new(1.0, 0.5, 0.5), 0.4, 16, 9).to_mesh("s", ComponentKind::Solid),
        );
        parallel.push(sequential[2].clone());

        let tol = IntersectTolerance::default();
        let a = intersect_all(&mut sequential, &tol, false, None).unwrap();
        let b = intersect_all(&mut parallel, &tol, true, None).unwrap();
        assert_eq!(a, b);
        for (m, n) in sequential.iter().zip(&parallel) {
            for (f, g) in m.facets.iter().zip(&n.facets) {
                assert_eq!(f.edges, g.edges);
            }
        }
    }

    #[test]
    fn test_disjoint_meshes_are_not_paired() {
        let mut meshes = vec![
            Primitive::cube(Vector3::new(1.0, 1.0, 1.0), false).to_mesh("a", ComponentKind::Solid),
            Primitive::boxed(Point3::new(3.0, 0.0, 0.0), Point3::new(4.0, 1.0, 1.0))
                .to_mesh("b", ComponentKind::Solid),
        ];
        let stats = intersect_all(&mut meshes, &IntersectTolerance::default(), false, None).unwrap();
        assert_eq!(stats.mesh_pairs_tested, 0);
        assert_eq!(stats.segments, 0);
    }

    #[test]
    fn test_cancelled_sweep() {
        let mut meshes = overlapping_boxes();
        let token = CancelToken::new();
        token.cancel();
        let result = intersect_all(&mut meshes, &IntersectTolerance::default(), false, Some(&token));
        assert!(matches!(result, Err(CompGeomError::Cancelled)));
        assert!(meshes[0].facets.iter().all(|f| f.edges.is_empty()));
    }

    #[test]
    fn test_intersect_into_leaves_others_untouched() {
        let meshes = overlapping_boxes();
        let mut plane = Mesh::from_triangles(
            "slice",
            ComponentKind::Slice,
            0,
            &[
                [
                    Point3::new(0.25, -1.0, -1.0),
                    Point3::new(0.25, 2.0, -1.0),
                    Point3::new(0.25, 2.0, 2.0),
                ],
                [
                    Point3::new(0.25, -1.0, -1.0),
                    Point3::new(0.25, 2.0, 2.0),
                    Point3::new(0.25, -1.0, 2.0),
                ],
            ],
        );
        let stats = intersect_into(&mut plane, &meshes, &IntersectTolerance::default());
        assert_eq!(stats.mesh_pairs_tested, 1);
        assert!(stats.segments >= 4);
        assert!(meshes.iter().all(|m| m.facets.iter().all(|f| f.edges.is_empty())));
    }
}
