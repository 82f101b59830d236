// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Area and volume integration over classified meshes
//! Volumes use the divergence theorem (signed tetrahedra against the origin)

use super::mesh::{ComponentInfo, ComponentKind, Mesh, SurfaceTag};
use super::robust_predicates::tetra_volume_from_origin;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Raw sums over one mesh
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshIntegrals {
    pub theo_area: f64,
    pub wet_area: f64,
    pub theo_vol: f64,
    /// Volume of the wetted pieces alone, an open surface in general
    pub trim_vol: f64,
    /// Area-weighted sum of wetted centroids
    pub area_moment: Vector3<f64>,
}

impl Default for MeshIntegrals {
    fn default() -> Self {
        Self {
            theo_area: 0.0,
            wet_area: 0.0,
            theo_vol: 0.0,
            trim_vol: 0.0,
            area_moment: Vector3::zeros(),
        }
    }
}

impl MeshIntegrals {
    fn add(&mut self, other: &MeshIntegrals) {
        self.theo_area += other.theo_area;
        self.wet_area += other.wet_area;
        self.theo_vol += other.theo_vol;
        self.trim_vol += other.trim_vol;
        self.area_moment += other.area_moment;
    }
}

pub fn integrate_mesh(mesh: &Mesh) -> MeshIntegrals {
    let closed = mesh.kind.encloses_volume();
    let mut sums = MeshIntegrals::default();

    for facet in &mesh.facets {
        sums.theo_area += facet.area();
        if closed {
            let [a, b, c] = &facet.corners;
            sums.theo_vol += tetra_volume_from_origin(a, b, c);
        }
    }

    for piece in mesh.pieces().filter(|p| !p.ignored) {
        let area = piece.area();
        sums.wet_area += area;
        sums.area_moment += piece.centroid().coords * area;
        if closed {
            let [a, b, c] = &piece.corners;
            sums.trim_vol += tetra_volume_from_origin(a, b, c);
        }
    }
    sums
}

/// Totals and wetted values of one component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentResult {
    pub name: String,
    pub id: String,
    pub kind: ComponentKind,
    pub theo_area: f64,
    pub wet_area: f64,
    pub theo_vol: f64,
    /// Share of the assembly's wetted volume apportioned to this component
    pub wet_vol: f64,
    pub area_center: Point3<f64>,
}

/// Areas of one sub-surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TagResult {
    pub name: String,
    /// Name of the component that declared the tag
    pub component: String,
    pub theo_area: f64,
    pub wet_area: f64,
}

/// Output of a CompGeom run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompGeomResults {
    pub components: Vec<ComponentResult>,
    #[serde(default)]
    pub tags: Vec<TagResult>,
    pub total_theo_area: f64,
    pub total_wet_area: f64,
    pub total_theo_vol: f64,
    pub total_wet_vol: f64,
    pub area_center: Point3<f64>,
}

impl Default for CompGeomResults {
    fn default() -> Self {
        Self {
            components: Vec::new(),
            tags: Vec::new(),
            total_theo_area: 0.0,
            total_wet_area: 0.0,
            total_theo_vol: 0.0,
            total_wet_vol: 0.0,
            area_center: Point3::origin(),
        }
    }
}

/// How the wetted volume split converged
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Apportionment {
    pub iterations: usize,
    /// Volume left unassigned after the last pass
    pub residual: f64,
    /// Leftover dropped below the tolerance before the pass limit
    pub converged: bool,
}

/// Distribute `total_wet_vol` over components in proportion to
/// `theo_vol * wet_area / theo_area`, never giving a component more than its
/// theoretical volume
///
/// The split follows wetted-area ratios, not geometry: two unit cubes
/// overlapping by half share 1.5 as 0.9375 / 0.5625, since the lower-index
/// cube keeps the coincident faces (5/6 wetted against 3/6).
pub fn apportion_volume(
    theo_vol: &[f64],
    theo_area: &[f64],
    wet_area: &[f64],
    total_wet_vol: f64,
    max_iterations: usize,
    tolerance: f64,
) -> (Vec<f64>, Apportionment) {
    let guess: Vec<f64> = theo_vol
        .iter()
        .zip(theo_area)
        .zip(wet_area)
        .map(|((v, ta), wa)| if *ta > 0.0 { v * wa / ta } else { 0.0 })
        .collect();
    let guess_total: f64 = guess.iter().sum();

    let mut wet = vec![0.0; theo_vol.len()];
    let mut report = Apportionment {
        iterations: 0,
        residual: total_wet_vol,
        converged: total_wet_vol < tolerance,
    };
    if guess_total == 0.0 {
        return (wet, report);
    }

    let mut leftover = total_wet_vol;
    while report.iterations < max_iterations {
        report.iterations += 1;

        for (i, w) in wet.iter_mut().enumerate() {
            *w += guess[i] / guess_total * leftover;
            let sign = theo_vol[i].signum();
            if sign * *w > sign * theo_vol[i] {
                *w = theo_vol[i];
            }
        }

        let assigned: f64 = wet.iter().sum();
        leftover = if assigned < total_wet_vol {
            total_wet_vol - assigned
        } else {
            0.0
        };
        if leftover < tolerance {
            report.converged = true;
            break;
        }
    }
    report.residual = leftover;
    (wet, report)
}

/// Theoretical and wetted area per sub-surface, indexed like `tags`
pub fn tag_areas(meshes: &[Mesh], tags: &[SurfaceTag]) -> Vec<(f64, f64)> {
    let mut areas = vec![(0.0, 0.0); tags.len()];
    for mesh in meshes.iter().filter(|m| m.kind.is_physical()) {
        for facet in mesh.facets.iter().filter(|f| f.tag > 0) {
            if let Some(slot) = areas.get_mut(facet.tag - 1) {
                slot.0 += facet.area();
            }
        }
        for piece in mesh.pieces().filter(|p| p.tag > 0 && !p.ignored) {
            if let Some(slot) = areas.get_mut(piece.tag - 1) {
                slot.1 += piece.area();
            }
        }
    }
    areas
}

/// Integrate every physical mesh and aggregate per component and sub-surface
///
/// Components without a remaining mesh (removed or merged away) are left out.
/// Tags are always listed; a tag whose part was removed reports zero area.
pub fn integrate(
    meshes: &[Mesh],
    components: &[ComponentInfo],
    tags: &[SurfaceTag],
    max_iterations: usize,
    tolerance: f64,
) -> (CompGeomResults, Apportionment) {
    let mut sums = vec![MeshIntegrals::default(); components.len()];
    let mut present = vec![false; components.len()];
    for mesh in meshes.iter().filter(|m| m.kind.is_physical()) {
        let Some(slot) = sums.get_mut(mesh.component) else {
            continue;
        };
        slot.add(&integrate_mesh(mesh));
        present[mesh.component] = true;
    }

    let used: Vec<usize> = (0..components.len()).filter(|&i| present[i]).collect();
    let theo_vol: Vec<f64> = used.iter().map(|&i| sums[i].theo_vol).collect();
    let theo_area: Vec<f64> = used.iter().map(|&i| sums[i].theo_area).collect();
    let wet_area: Vec<f64> = used.iter().map(|&i| sums[i].wet_area).collect();
    let total_wet_vol: f64 = used.iter().map(|&i| sums[i].trim_vol).sum();

    let (wet_vol, apportionment) = apportion_volume(
        &theo_vol,
        &theo_area,
        &wet_area,
        total_wet_vol,
        max_iterations,
        tolerance,
    );

    let mut results = CompGeomResults {
        total_wet_vol,
        ..Default::default()
    };
    let mut moment = Vector3::zeros();
    for (k, &i) in used.iter().enumerate() {
        let s = &sums[i];
        let info = &components[i];
        results.total_theo_area += s.theo_area;
        results.total_wet_area += s.wet_area;
        results.total_theo_vol += s.theo_vol;
        moment += s.area_moment;
        results.components.push(ComponentResult {
            name: info.name.clone(),
            id: info.id.clone(),
            kind: info.kind,
            theo_area: s.theo_area,
            wet_area: s.wet_area,
            theo_vol: s.theo_vol,
            wet_vol: wet_vol[k],
            area_center: center(&s.area_moment, s.wet_area),
        });
    }
    results.area_center = center(&moment, results.total_wet_area);
    results.tags = tags
        .iter()
        .zip(tag_areas(meshes, tags))
        .map(|(tag, (theo_area, wet_area))| TagResult {
            name: tag.name.clone(),
            component: components
                .get(tag.component)
                .map(|c| c.name.clone())
                .unwrap_or_default(),
            theo_area,
            wet_area,
        })
        .collect();

    debug!(
        wet_area = results.total_wet_area,
        wet_vol = results.total_wet_vol,
        iterations = apportionment.iterations,
        "integrated assembly"
    );
    (results, apportionment)
}

fn center(moment: &Vector3<f64>, area: f64) -> Point3<f64> {
    if area > 0.0 {
        Point3::from(moment / area)
    } else {
        Point3::origin()
    }
}
