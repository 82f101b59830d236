// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Interior/exterior classification by ray parity
//!
//! A piece is interior to a closed mesh when a ray from its centroid crosses
//! that mesh an odd number of times. Pieces lying on another mesh's surface
//! are settled by orientation: opposed faces are both interior, coincident
//! faces with the same orientation are kept once, on the lower mesh index.

use super::bvh::Bvh;
use super::mesh::{Facet, Mesh, PieceRef};
use super::robust_predicates::barycentric;
use super::BoundingBox;
use crate::config::EngineConfig;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Offsets added to the primary ray direction on successive attempts
const PERTURBATIONS: [[f64; 3]; 4] = [
    [0.0, 0.0, 0.0],
    [0.0091, 0.0123, 0.0271],
    [-0.0057, -0.0317, 0.0149],
    [0.0133, 0.0213, -0.0389],
];

/// Barycentric slack for on-surface and near-edge tests
const BARY_EPS: f64 = 1e-9;

/// Tolerances for classification, in model units
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifyTolerance {
    /// Distance under which a centroid counts as lying on a facet
    pub on_surface: f64,
    /// Barycentric distance to a facet border that makes a hit ambiguous
    pub edge: f64,
    /// Hits closer than this along the ray count once
    pub dedup: f64,
    pub max_attempts: usize,
    pub direction: Vector3<f64>,
}

impl Default for ClassifyTolerance {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for ClassifyTolerance {
    fn from(config: &EngineConfig) -> Self {
        let dir = Vector3::from(config.ray_direction);
        Self {
            on_surface: config.min_segment_length,
            edge: 1e-7,
            dedup: config.ray_dedup_tolerance,
            max_attempts: config.max_ray_attempts.max(1),
            direction: dir.try_normalize(f64::EPSILON).unwrap_or_else(Vector3::x),
        }
    }
}

/// Counters of one classification pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifyStats {
    pub pieces: usize,
    pub interior: usize,
    pub ignored: usize,
    /// Rays cast again because a hit grazed a facet border
    pub recasts: usize,
    /// Rays still ambiguous after every attempt
    pub unresolved: usize,
}

impl ClassifyStats {
    fn merge(&mut self, other: &ClassifyStats) {
        self.pieces += other.pieces;
        self.interior += other.interior;
        self.ignored += other.ignored;
        self.recasts += other.recasts;
        self.unresolved += other.unresolved;
    }
}

/// Closed mesh indexed for point containment queries
struct Enclosure<'a> {
    index: usize,
    mesh: &'a Mesh,
    bbox: BoundingBox,
    tree: Bvh,
}

enum RayCount {
    Clean(usize),
    Ambiguous(usize),
}

/// Ray-triangle intersection, returns `(t, barycentric)`
fn ray_triangle(
    origin: &Point3<f64>,
    dir: &Vector3<f64>,
    tri: &[Point3<f64>; 3],
) -> Option<(f64, [f64; 3])> {
    let e1 = tri[1] - tri[0];
    let e2 = tri[2] - tri[0];
    let p = dir.cross(&e2);
    let det = e1.dot(&p);
    if det.abs() < 1e-14 * e1.norm() * e2.norm() {
        return None;
    }
    let inv = 1.0 / det;
    let s = origin - tri[0];
    let u = s.dot(&p) * inv;
    if u < -BARY_EPS || u > 1.0 + BARY_EPS {
        return None;
    }
    let q = s.cross(&e1);
    let v = dir.dot(&q) * inv;
    if v < -BARY_EPS || u + v > 1.0 + BARY_EPS {
        return None;
    }
    let t = e2.dot(&q) * inv;
    Some((t, [1.0 - u - v, u, v]))
}

impl<'a> Enclosure<'a> {
    fn new(index: usize, mesh: &'a Mesh, margin: f64) -> Self {
        let tree = Bvh::build(
            mesh.facets
                .iter()
                .enumerate()
                .map(|(i, f)| (i, f.bounding_box().inflated(margin)))
                .collect(),
        );
        Self {
            index,
            mesh,
            bbox: mesh.bounding_box().inflated(margin),
            tree,
        }
    }

    /// Facet of this mesh the point lies on, if any
    fn surface_facet(&self, point: &Point3<f64>, tol: f64) -> Option<&'a Facet> {
        let search = BoundingBox::new(*point, *point).inflated(tol);
        let mut candidates = self.tree.query(&search);
        candidates.sort_unstable();
        candidates.into_iter().find_map(|i| {
            let facet = self.mesh.facets.get(i)?;
            let distance = facet.normal.dot(&(point - facet.corners[0]));
            if distance.abs() > tol {
                return None;
            }
            let w = barycentric(point, &facet.corners)?;
            w.iter().all(|&c| c >= -BARY_EPS).then_some(facet)
        })
    }

    fn count_crossings(&self, origin: &Point3<f64>, dir: &Vector3<f64>, tol: &ClassifyTolerance) -> RayCount {
        let mut candidates = self.tree.query_ray(origin, dir);
        candidates.sort_unstable();

        let mut hits: Vec<f64> = Vec::new();
        let mut grazing = false;
        for i in candidates {
            let Some(facet) = self.mesh.facets.get(i) else {
                continue;
            };
            let Some((t, w)) = ray_triangle(origin, dir, &facet.corners) else {
                continue;
            };
            if t <= tol.dedup {
                continue;
            }
            if w.iter().any(|&c| c < tol.edge) {
                grazing = true;
            }
            hits.push(t);
        }

        hits.sort_by(f64::total_cmp);
        hits.dedup_by(|b, a| (*b - *a).abs() < tol.dedup);
        if grazing {
            RayCount::Ambiguous(hits.len())
        } else {
            RayCount::Clean(hits.len())
        }
    }

    /// Whether a piece of mesh `owner` with the given centroid and normal is
    /// interior to this mesh; second value counts recasts, third flags an
    /// unresolved ray
    fn contains(
        &self,
        owner: Option<usize>,
        point: &Point3<f64>,
        normal: &Vector3<f64>,
        tol: &ClassifyTolerance,
    ) -> (bool, usize, bool) {
        if !self.bbox.contains_point(point) {
            return (false, 0, false);
        }

        if let Some(facet) = self.surface_facet(point, tol.on_surface) {
            let inside = if facet.normal.dot(normal) < 0.0 {
                true
            } else {
                owner.map_or(true, |o| o > self.index)
            };
            return (inside, 0, false);
        }

        let mut recasts = 0;
        let mut last = 0;
        for offset in PERTURBATIONS.iter().take(tol.max_attempts) {
            let dir = (tol.direction + Vector3::from(*offset)).normalize();
            match self.count_crossings(point, &dir, tol) {
                RayCount::Clean(count) => return (count % 2 == 1, recasts, false),
                RayCount::Ambiguous(count) => {
                    last = count;
                    recasts += 1;
                }
            }
        }
        (last % 2 == 1, recasts, true)
    }
}

/// Point containment against every closed mesh of an assembly
pub struct Classifier<'a> {
    enclosures: Vec<Enclosure<'a>>,
    tol: ClassifyTolerance,
}

impl<'a> Classifier<'a> {
    /// Index every mesh whose kind encloses volume
    pub fn new(meshes: &'a [Mesh], tol: ClassifyTolerance) -> Self {
        let margin = tol.on_surface.max(tol.dedup);
        let enclosures = meshes
            .iter()
            .enumerate()
            .filter(|(_, m)| m.kind.encloses_volume() && !m.is_empty())
            .map(|(i, m)| Enclosure::new(i, m, margin))
            .collect();
        Self { enclosures, tol }
    }

    /// Indices of the enclosing meshes other than `owner`
    pub fn enclosing(
        &self,
        owner: Option<usize>,
        point: &Point3<f64>,
        normal: &Vector3<f64>,
        stats: &mut ClassifyStats,
    ) -> Vec<usize> {
        let mut inside = Vec::new();
        for enclosure in &self.enclosures {
            if Some(enclosure.index) == owner {
                continue;
            }
            let (hit, recasts, unresolved) = enclosure.contains(owner, point, normal, &self.tol);
            stats.recasts += recasts;
            if unresolved {
                stats.unresolved += 1;
            }
            if hit {
                inside.push(enclosure.index);
            }
        }
        inside
    }

    /// Classification of every piece of `mesh`, not yet applied
    fn classify_pieces(&self, owner: Option<usize>, mesh: &Mesh) -> (Vec<(PieceRef, Vec<usize>)>, ClassifyStats) {
        let mut stats = ClassifyStats::default();
        let result = mesh
            .piece_refs()
            .into_iter()
            .filter_map(|piece| {
                let facet = mesh.piece(piece)?;
                let inside = self.enclosing(owner, &facet.centroid(), &facet.normal, &mut stats);
                Some((piece, inside))
            })
            .collect();
        (result, stats)
    }
}

fn apply(mesh: &mut Mesh, pieces: Vec<(PieceRef, Vec<usize>)>, stats: &mut ClassifyStats) {
    let kind = mesh.kind;
    for (piece, inside) in pieces {
        let Some(facet) = mesh.piece_mut(piece) else {
            continue;
        };
        facet.inside = inside;
        facet.ignored = kind.ignores(facet.is_interior());
        stats.pieces += 1;
        if facet.is_interior() {
            stats.interior += 1;
        }
        if facet.ignored {
            stats.ignored += 1;
        }
    }
}

/// Classify every piece of every mesh against all other closed meshes
pub fn classify_all(meshes: &mut [Mesh], tol: ClassifyTolerance, parallel: bool) -> ClassifyStats {
    let (results, mut stats) = {
        let classifier = Classifier::new(meshes, tol);
        let run = |(i, mesh): (usize, &Mesh)| classifier.classify_pieces(Some(i), mesh);
        let results: Vec<_> = if parallel {
            meshes.par_iter().enumerate().map(run).collect()
        } else {
            meshes.iter().enumerate().map(run).collect()
        };
        let mut stats = ClassifyStats::default();
        for (_, s) in &results {
            stats.merge(s);
        }
        (results, stats)
    };

    for (mesh, (pieces, _)) in meshes.iter_mut().zip(results) {
        apply(mesh, pieces, &mut stats);
    }

    if stats.unresolved > 0 {
        warn!(rays = stats.unresolved, "ambiguous rays left after every recast");
    }
    debug!(
        pieces = stats.pieces,
        interior = stats.interior,
        recasts = stats.recasts,
        "classified pieces"
    );
    stats
}

/// Classify the pieces of a mesh that is not part of `meshes` (a slice)
pub fn classify_against(target: &mut Mesh, meshes: &[Mesh], tol: ClassifyTolerance) -> ClassifyStats {
    let classifier = Classifier::new(meshes, tol);
    let (pieces, mut stats) = classifier.classify_pieces(None, target);
    apply(target, pieces, &mut stats);
    stats
}

/// Enclosing volume that owns a piece for mass purposes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassOwner {
    pub piece: PieceRef,
    /// Index of the owning mesh
    pub mesh: usize,
    pub component: usize,
    pub density: f64,
}

/// Classify a slice against `meshes` and resolve, for every interior piece,
/// the enclosing mesh that owns it: highest priority first, lower index on ties
pub fn mass_classify(slice: &mut Mesh, meshes: &[Mesh], tol: ClassifyTolerance) -> Vec<MassOwner> {
    classify_against(slice, meshes, tol);

    slice
        .piece_refs()
        .into_iter()
        .filter_map(|piece| {
            let facet = slice.piece(piece)?;
            let owner = facet
                .inside
                .iter()
                .copied()
                .filter_map(|i| meshes.get(i).map(|m| (i, m)))
                .max_by(|(ia, a), (ib, b)| a.priority.cmp(&b.priority).then(ib.cmp(ia)))?;
            Some(MassOwner {
                piece,
                mesh: owner.0,
                component: owner.1.component,
                density: owner.1.density,
            })
        })
        .collect()
}
