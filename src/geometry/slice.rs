// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Slicing driver: planar area cuts, wave-drag cuts and mass slabs
//!
//! Every driver works on meshes already scaled by `scale` into the
//! normalized model space and reports results in the caller's units.

use super::classify::{classify_against, classify_all, mass_classify, ClassifyTolerance};
use super::intersect::{intersect_all, intersect_into, CancelToken};
use super::mass::{
    fill_stations, prism_mass_props, shell_mass_props, ComponentMass, MassElement, MassProperties,
    MassResults,
};
use super::mesh::{Axis, ComponentInfo, ComponentKind, Mesh};
use super::split::{split_all, split_mesh};
use super::triangle_intersection::IntersectTolerance;
use super::BoundingBox;
use crate::config::{MassConfig, SliceConfig};
use crate::error::CompGeomResult;
use nalgebra::{Point3, Vector3};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{debug, info};

/// Amount the automatic slicing range extends past the model
const BOUNDS_OFFSET: f64 = 1e-4;
/// Amount wave-drag ranges are pulled inside the model
const WAVE_INSET: f64 = 1e-3;

/// Tolerances shared by all slicing drivers
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SliceTolerance {
    pub intersect: IntersectTolerance,
    pub classify: ClassifyTolerance,
}

/// Cross-section at one station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceStation {
    pub location: f64,
    pub area: f64,
    pub area_center: Point3<f64>,
}

/// Output of a planar slicing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SliceResults {
    pub axis: Axis,
    pub stations: Vec<SliceStation>,
}

/// Cuts of one roll angle in a wave-drag run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveRotation {
    /// Roll angle in radians
    pub theta: f64,
    pub start: f64,
    pub end: f64,
    /// Projected area per station
    pub areas: Vec<f64>,
    /// Projected area per station and component
    pub component_areas: Vec<Vec<f64>>,
}

/// Output of a wave-drag slicing run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveDragResults {
    pub mach: f64,
    /// Mach angle in degrees
    pub cut_angle: f64,
    pub component_names: Vec<String>,
    /// Station positions normalized to [0, 1] along each rotation's range
    pub x_norm: Vec<f64>,
    pub rotations: Vec<WaveRotation>,
    /// Area per station averaged over the rotations
    pub mean_areas: Vec<f64>,
}

/// Evenly spaced stations along `axis`: model extent widened by a small
/// offset, or `bounds` when given
pub fn planar_stations(bbox: &BoundingBox, axis: Axis, count: usize, bounds: Option<(f64, f64)>) -> Vec<f64> {
    let (min, max) = match bounds {
        Some((start, end)) => (start - BOUNDS_OFFSET, end + BOUNDS_OFFSET),
        None => {
            let i = axis.index();
            (bbox.min[i] - BOUNDS_OFFSET, bbox.max[i] + BOUNDS_OFFSET)
        }
    };
    if count <= 1 {
        return vec![min; count];
    }
    let step = (max - min) / (count - 1) as f64;
    (0..count).map(|s| min + s as f64 * step).collect()
}

/// Tessellated square spanning the model cross-section at `location`
///
/// The square covers the bounding box extent in the other two axes
/// enlarged by 2%, split into `tessellation`² quads of two triangles each.
/// Its normal points along `axis`.
pub fn make_slice_plane(axis: Axis, location: f64, bbox: &BoundingBox, tessellation: usize) -> Mesh {
    let (d1, d2) = axis.others();
    let fallback = bbox.largest_dimension().max(1.0);
    let extent = |a: Axis| {
        let size = bbox.max[a.index()] - bbox.min[a.index()];
        let del = 1.02 * if size > 0.0 { size } else { fallback };
        (bbox.min[a.index()] - 0.01 * del, del)
    };
    let (s1, del1) = extent(d1);
    let (s2, del2) = extent(d2);

    let n = tessellation.max(1);
    let ds = 1.0 / n as f64;
    let point = |a: f64, b: f64| {
        let mut p = Point3::origin();
        p[axis.index()] = location;
        p[d1.index()] = a;
        p[d2.index()] = b;
        p
    };

    let mut triangles = Vec::with_capacity(2 * n * n);
    for i in 0..n {
        let a0 = s1 + del1 * ds * i as f64;
        let a1 = s1 + del1 * ds * (i + 1) as f64;
        for j in 0..n {
            let b0 = s2 + del2 * ds * j as f64;
            let b1 = s2 + del2 * ds * (j + 1) as f64;
            let (p1, p2, p3, p4) = (point(a0, b0), point(a1, b0), point(a1, b1), point(a0, b1));
            triangles.push([p1, p2, p3]);
            triangles.push([p1, p3, p4]);
        }
    }
    Mesh::from_triangles(format!("slice_{}_{}", axis, location), ComponentKind::Slice, 0, &triangles)
}

/// Intersect, split and classify a slice mesh against `meshes`
fn cut_slice(slice: &mut Mesh, meshes: &[Mesh], tol: &SliceTolerance) {
    intersect_into(slice, meshes, &tol.intersect);
    split_mesh(slice, tol.intersect.min_segment);
    classify_against(slice, meshes, tol.classify);
}

fn wetted_area(slice: &Mesh) -> (f64, Vector3<f64>) {
    slice
        .pieces()
        .filter(|p| !p.ignored)
        .fold((0.0, Vector3::zeros()), |(area, moment), p| {
            let a = p.area();
            (area + a, moment + p.centroid().coords * a)
        })
}

fn model_box(meshes: &[Mesh]) -> BoundingBox {
    let mut bbox = BoundingBox::empty();
    for mesh in meshes.iter().filter(|m| m.kind.is_physical()) {
        bbox.merge(&mesh.bounding_box());
    }
    bbox
}

fn map_stations<T: Send>(count: usize, parallel: bool, f: impl Fn(usize) -> T + Sync + Send) -> Vec<T> {
    if parallel {
        (0..count).into_par_iter().map(f).collect()
    } else {
        (0..count).map(f).collect()
    }
}

/// Cross-sectional area at evenly spaced stations
pub fn area_slices(
    meshes: &[Mesh],
    scale: f64,
    config: &SliceConfig,
    tol: &SliceTolerance,
    parallel: bool,
) -> SliceResults {
    let model = model_box(meshes);
    let caller_box = BoundingBox::new(
        Point3::from(model.min.coords / scale),
        Point3::from(model.max.coords / scale),
    );
    let bounds = (!config.auto_bounds).then_some((config.start, config.end));
    let locations = planar_stations(&caller_box, config.axis, config.count, bounds);

    let stations = map_stations(locations.len(), parallel, |s| {
        let location = locations[s];
        let mut slice = make_slice_plane(config.axis, location * scale, &model, config.tessellation);
        cut_slice(&mut slice, meshes, tol);
        let (area, moment) = wetted_area(&slice);
        SliceStation {
            location,
            area: area / (scale * scale),
            area_center: if area > 0.0 {
                Point3::from(moment / area / scale)
            } else {
                Point3::origin()
            },
        }
    });

    info!(axis = %config.axis, stations = stations.len(), "area slicing done");
    SliceResults {
        axis: config.axis,
        stations,
    }
}

/// Roll angles of the wave-drag cuts
pub fn wave_thetas(rotations: usize, symmetric: bool) -> Vec<f64> {
    (0..rotations)
        .map(|i| {
            if symmetric && rotations > 1 {
                PI * i as f64 / (rotations - 1) as f64
            } else {
                2.0 * PI * i as f64 / rotations as f64
            }
        })
        .collect()
}

/// Plane square of half-size `half` through `center`, normal
/// `(sin mu, -cos mu sin theta, -cos mu cos theta)`
fn make_wave_plane(center: &Point3<f64>, mu: f64, theta: f64, half: f64, tessellation: usize) -> Mesh {
    let u = Vector3::new(0.0, theta.cos(), -theta.sin());
    let w = Vector3::new(mu.cos(), theta.sin() * mu.sin(), theta.cos() * mu.sin());
    let n = tessellation.max(1);
    let step = 2.0 * half / n as f64;
    let point = |i: usize, j: usize| center + u * (-half + step * i as f64) + w * (-half + step * j as f64);

    let mut triangles = Vec::with_capacity(2 * n * n);
    for i in 0..n {
        for j in 0..n {
            let (p1, p2, p3, p4) = (point(i, j), point(i + 1, j), point(i + 1, j + 1), point(i, j + 1));
            triangles.push([p1, p2, p3]);
            triangles.push([p1, p3, p4]);
        }
    }
    Mesh::from_triangles("wave_slice", ComponentKind::Slice, 0, &triangles)
}

/// Free-stream projected area of Mach-angle cuts
///
/// Pieces are credited to the first mesh that encloses them.
pub fn wave_drag_slices(
    meshes: &[Mesh],
    components: &[ComponentInfo],
    scale: f64,
    config: &SliceConfig,
    tol: &SliceTolerance,
    parallel: bool,
) -> WaveDragResults {
    let mu = (1.0 / config.mach).asin();
    let beta = (config.mach * config.mach - 1.0).sqrt();
    let model = model_box(meshes);
    let center = model.center();
    let half = 2.5 * model.largest_dimension() * 1.02;
    let thetas = wave_thetas(config.rotations, config.symmetric);

    let count = config.count.max(1);
    let x_norm: Vec<f64> = (0..count)
        .map(|i| if count > 1 { i as f64 / (count - 1) as f64 } else { 0.5 })
        .collect();

    let physical: Vec<&Mesh> = meshes.iter().filter(|m| m.kind.is_physical()).collect();
    let inset = WAVE_INSET * scale;

    let mut rotations = Vec::with_capacity(thetas.len());
    for &theta in &thetas {
        let (sin_t, cos_t) = theta.sin_cos();
        let (mut start, mut end) = (f64::INFINITY, f64::NEG_INFINITY);
        for mesh in &physical {
            for corner in mesh.facets.iter().flat_map(|f| f.corners.iter()) {
                let xcon = beta * (sin_t * (corner.y - center.y) + cos_t * (corner.z - center.z));
                let xwave = corner.x - xcon;
                start = start.min(xwave);
                end = end.max(xwave);
            }
        }
        start += inset;
        end -= inset;

        let per_station = map_stations(count, parallel, |i| {
            let x = start + x_norm[i] * (end - start);
            let mut slice = make_wave_plane(
                &Point3::new(x, center.y, center.z),
                mu,
                theta,
                half,
                config.tessellation,
            );
            cut_slice(&mut slice, meshes, tol);

            let mut by_component = vec![0.0; components.len()];
            let mut total = 0.0;
            for piece in slice.pieces().filter(|p| !p.ignored) {
                let area = piece.area() * mu.sin() / (scale * scale);
                total += area;
                let owner = piece.inside.first().and_then(|&m| meshes.get(m));
                if let Some(slot) = owner.and_then(|m| by_component.get_mut(m.component)) {
                    *slot += area;
                }
            }
            (total, by_component)
        });

        let (areas, component_areas): (Vec<f64>, Vec<Vec<f64>>) = per_station.into_iter().unzip();
        rotations.push(WaveRotation {
            theta,
            start: start / scale,
            end: end / scale,
            areas,
            component_areas,
        });
    }

    let mean_areas = (0..count)
        .map(|i| rotations.iter().map(|r| r.areas[i]).sum::<f64>() / rotations.len().max(1) as f64)
        .collect();

    info!(mach = config.mach, stations = count, rotations = thetas.len(), "wave-drag slicing done");
    WaveDragResults {
        mach: config.mach,
        cut_angle: mu.to_degrees(),
        component_names: components.iter().map(|c| c.name.clone()).collect(),
        x_norm,
        rotations,
        mean_areas,
    }
}

/// Mass properties from slabs along `config.axis` plus shell elements and
/// point masses
///
/// Solid slabs come from mid-plane slices extruded into prisms with the
/// density of the enclosing solid. Shells contribute their wetted pieces
/// after the whole assembly has been intersected and classified. The fill
/// stations accumulate solid slabs only.
#[allow(clippy::too_many_arguments)]
pub fn mass_slices(
    meshes: &[Mesh],
    components: &[ComponentInfo],
    scale: f64,
    config: &MassConfig,
    tessellation: usize,
    tol: &SliceTolerance,
    parallel: bool,
    cancel: Option<&CancelToken>,
) -> CompGeomResult<MassResults> {
    let num_slices = config.slices.max(3);
    let axis = config.axis;
    let k = axis.index();
    let solids: Vec<Mesh> = meshes
        .iter()
        .filter(|m| m.kind == ComponentKind::Solid)
        .cloned()
        .collect();
    let model = model_box(meshes);
    let width = (model.max[k] - model.min[k]) / num_slices as f64;
    let half_width = 0.5 * width / scale;

    let slabs = map_stations(num_slices, parallel, |s| {
        let location = model.min[k] + (s as f64 + 0.5) * width;
        let mut slice = make_slice_plane(axis, location, &model, tessellation);
        intersect_into(&mut slice, &solids, &tol.intersect);
        split_mesh(&mut slice, tol.intersect.min_segment);
        let owners = mass_classify(&mut slice, &solids, tol.classify);

        let mut elements = Vec::with_capacity(owners.len() * 3);
        for owner in owners {
            let Some(piece) = slice.piece(owner.piece) else {
                continue;
            };
            let corners = piece.corners.map(|p| Point3::from(p.coords / scale));
            elements.extend(prism_mass_props(
                &corners,
                &axis.unit(),
                half_width,
                owner.density,
                owner.component,
            ));
        }
        elements
    });
    if let Some(token) = cancel {
        token.check()?;
    }
    let fills = fill_stations(&slabs, model.min[k] / scale, width / scale);
    let mut elements: Vec<MassElement> = slabs.into_iter().flatten().collect();
    let solid_volume: f64 = elements.iter().map(|e| e.volume).sum();

    if meshes.iter().any(|m| m.kind == ComponentKind::Shell) {
        let mut assembly = meshes.to_vec();
        intersect_all(&mut assembly, &tol.intersect, parallel, cancel)?;
        split_all(&mut assembly, tol.intersect.min_segment, parallel);
        classify_all(&mut assembly, tol.classify, parallel);
        for mesh in assembly.iter().filter(|m| m.kind == ComponentKind::Shell) {
            for piece in mesh.pieces().filter(|p| !p.ignored) {
                let [a, b, c] = piece.corners.map(|p| Point3::from(p.coords / scale));
                elements.push(shell_mass_props(&a, &b, &c, mesh.density, mesh.component));
            }
        }
    }

    // Point masses take the component slots after the parts
    let points: Vec<MassElement> = config
        .point_masses
        .iter()
        .enumerate()
        .map(|(i, point)| point.element(components.len() + i))
        .collect();
    elements.extend_from_slice(&points);

    let mut results = MassResults {
        total: MassProperties::accumulate(elements.iter()),
        solid_volume,
        num_slices,
        slice_width: width / scale,
        axis,
        fills,
        ..Default::default()
    };
    for (index, info) in components.iter().enumerate() {
        let own: Vec<&MassElement> = elements.iter().filter(|e| e.component == index).collect();
        if own.is_empty() {
            continue;
        }
        results.components.push(ComponentMass {
            name: info.name.clone(),
            id: info.id.clone(),
            properties: MassProperties::accumulate(own.iter().copied()),
        });
    }
    for (point, element) in config.point_masses.iter().zip(&points) {
        results.point_masses.push(ComponentMass {
            name: point.name.clone(),
            id: point.id.clone(),
            properties: MassProperties::accumulate(std::iter::once(element)),
        });
    }

    debug!(
        elements = elements.len(),
        point_masses = points.len(),
        mass = results.total.mass,
        "mass properties accumulated"
    );
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Primitive;
    use approx::assert_relative_eq;

    fn tol() -> SliceTolerance {
        SliceTolerance {
            intersect: IntersectTolerance::default(),
            classify: ClassifyTolerance::default(),
        }
    }

    #[test]
    fn test_stations_cover_the_model() {
        let bbox = BoundingBox::new(Point3::new(0.0, -1.0, -1.0), Point3::new(10.0, 1.0, 1.0));
        let stations = planar_stations(&bbox, Axis::X, 6, None);
        assert_eq!(stations.len(), 6);
        assert_relative_eq!(stations[0], -1e-4);
        assert_relative_eq!(stations[5], 10.0 + 1e-4, epsilon = 1e-12);
        assert_relative_eq!(stations[1] - stations[0], (10.0 + 2e-4) / 5.0, epsilon = 1e-12);

        let fixed = planar_stations(&bbox, Axis::X, 3, Some((2.0, 4.0)));
        assert_relative_eq!(fixed[1], 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_slice_plane_spans_cross_section() {
        let bbox = BoundingBox::new(Point3::new(0.0, -1.0, -2.0), Point3::new(10.0, 1.0, 2.0));
        let plane = make_slice_plane(Axis::X, 5.0, &bbox, 4);
        assert_eq!(plane.facet_count(), 32);
        assert_relative_eq!(plane.theoretical_area(), 2.04 * 4.08, epsilon = 1e-9);
        assert!(plane.facets.iter().all(|f| (f.normal - Vector3::x()).norm() < 1e-12));
        assert!(plane.facets.iter().all(|f| f.corners.iter().all(|p| p.x == 5.0)));
    }

    #[test]
    fn test_box_cross_section() {
        let meshes = vec![
            Primitive::boxed(Point3::new(0.0, 0.0, 0.0), Point3::new(4.0, 2.0, 3.0)).to_mesh("b", ComponentKind::Solid),
        ];
        let config = SliceConfig {
            count: 3,
            auto_bounds: false,
            start: 1.0,
            end: 3.0,
            tessellation: 3,
            ..SliceConfig::default()
        };
        let results = area_slices(&meshes, 1.0, &config, &tol(), false);
        assert_eq!(results.stations.len(), 3);
        for station in &results.stations {
            assert_relative_eq!(station.area, 6.0, epsilon = 1e-9);
            assert_relative_eq!(station.area_center.y, 1.0, epsilon = 1e-9);
            assert_relative_eq!(station.area_center.z, 1.5, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_wave_thetas() {
        let full = wave_thetas(4, false);
        assert_relative_eq!(full[1], PI / 2.0);
        let half = wave_thetas(3, true);
        assert_relative_eq!(half[2], PI);
    }

    #[test]
    fn test_wave_drag_near_mach_one() {
        // Just above Mach 1 the cuts are near normal and recover the frontal area
        let mut mesh = Primitive::boxed(Point3::new(0.0, -1.0, -1.0), Point3::new(8.0, 1.0, 1.0))
            .to_mesh("b", ComponentKind::Solid);
        mesh.component = 0;
        let components = vec![ComponentInfo {
            name: "b".into(),
            id: "b".into(),
            kind: ComponentKind::Solid,
            density: 1.0,
            priority: 0,
        }];
        let config = SliceConfig {
            count: 5,
            mach: 1.0001,
            rotations: 2,
            tessellation: 2,
            ..SliceConfig::default()
        };
        let results = wave_drag_slices(&[mesh], &components, 1.0, &config, &tol(), false);
        assert_eq!(results.rotations.len(), 2);
        assert_eq!(results.mean_areas.len(), 5);
        let mid = results.mean_areas[2];
        assert!((mid - 4.0).abs() < 1e-3, "mid-station area {}", mid);
        let per_component: f64 = results.rotations[0].component_areas[2].iter().sum();
        assert_relative_eq!(per_component, results.rotations[0].areas[2], epsilon = 1e-12);
    }
}
