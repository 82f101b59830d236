// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Pipeline entry points
//!
//! Every run follows the same stages: prepare (validate, convert to facet
//! arenas, normalize scale) → repair → intersect/split → classify →
//! integrate or slice. Each stage is a plain function over
//! `&mut [Mesh]`, so the stages can also be driven one by one.

use crate::config::{CompGeomConfig, EngineConfig};
use crate::error::{CompGeomError, CompGeomResult};
use crate::geometry::classify::{classify_all, ClassifyStats, ClassifyTolerance};
use crate::geometry::dedup::{build_indexed_mesh, IndexedMesh};
use crate::geometry::integrate::{integrate, Apportionment, CompGeomResults};
use crate::geometry::intersect::{intersect_all, IntersectStats};
use crate::geometry::mass::MassResults;
use crate::geometry::repair::{
    check_if_closed, is_degenerate, merge_remove_open_meshes, RepairReport, RepairTolerance,
};
use crate::geometry::slice::{
    area_slices, mass_slices, wave_drag_slices, SliceResults, SliceTolerance, WaveDragResults,
};
use crate::geometry::split::split_all;
use crate::geometry::triangle_intersection::IntersectTolerance;
use crate::geometry::{BoundingBox, ComponentInfo, ComponentKind, Mesh, Primitive, SurfaceTag};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span, warn};

pub use crate::geometry::intersect::CancelToken;

/// Pieces of a half model lying below this y (caller units) are dropped
const HALF_MODEL_Y: f64 = 1e-5;

/// One part handed to the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartInput {
    pub name: String,
    /// Component identifier, defaults to the name
    pub id: String,
    /// `Solid` or `Shell`
    pub kind: ComponentKind,
    /// Volumetric density for solids, areal density for shells
    pub density: f64,
    /// Higher priority owns overlapping volume in mass properties
    pub priority: i32,
    pub triangles: Vec<[Point3<f64>; 3]>,
    /// Sub-surface names, referenced 1-based by `tags`
    #[serde(default)]
    pub tag_names: Vec<String>,
    /// Per-triangle sub-surface, 0 for the base surface; empty leaves every triangle untagged
    #[serde(default)]
    pub tags: Vec<usize>,
}

impl PartInput {
    pub fn new(name: impl Into<String>, kind: ComponentKind, triangles: Vec<[Point3<f64>; 3]>) -> Self {
        let name = name.into();
        Self {
            id: name.clone(),
            name,
            kind,
            density: 1.0,
            priority: 0,
            triangles,
            tag_names: Vec::new(),
            tags: Vec::new(),
        }
    }

    /// Closed solid built from a primitive
    pub fn solid(name: impl Into<String>, primitive: &Primitive) -> Self {
        Self::new(name, ComponentKind::Solid, primitive.to_triangles())
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_density(mut self, density: f64) -> Self {
        self.density = density;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Mark `triangles` (indices into `self.triangles`) as the sub-surface `name`
    pub fn with_tag(mut self, name: impl Into<String>, triangles: impl IntoIterator<Item = usize>) -> Self {
        self.tag_names.push(name.into());
        self.tags.resize(self.triangles.len(), 0);
        let tag = self.tag_names.len();
        for index in triangles {
            if let Some(slot) = self.tags.get_mut(index) {
                *slot = tag;
            }
        }
        self
    }

    /// Reject parts the engine cannot use at all
    pub fn validate(&self) -> CompGeomResult<()> {
        let fail = |details: String| CompGeomError::InvalidInput {
            part: self.name.clone(),
            details,
        };
        if self.id.trim().is_empty() {
            return Err(fail("component id is empty".into()));
        }
        if !matches!(self.kind, ComponentKind::Solid | ComponentKind::Shell) {
            return Err(fail(format!("kind {:?} is reserved for synthetic meshes", self.kind)));
        }
        if !self.density.is_finite() || self.density < 0.0 {
            return Err(fail(format!("density {} is not a non-negative number", self.density)));
        }
        let bad = self
            .triangles
            .iter()
            .position(|t| t.iter().any(|p| !p.coords.iter().all(|c| c.is_finite())));
        if let Some(index) = bad {
            return Err(fail(format!("triangle {} has a non-finite coordinate", index)));
        }
        if !self.tags.is_empty() && self.tags.len() != self.triangles.len() {
            return Err(fail(format!(
                "{} tags for {} triangles",
                self.tags.len(),
                self.triangles.len()
            )));
        }
        if let Some(tag) = self.tags.iter().find(|&&t| t > self.tag_names.len()) {
            return Err(fail(format!("tag {} has no name", tag)));
        }
        Ok(())
    }
}

/// Counters collected over a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    /// Factor applied to caller units during the run
    pub scale: f64,
    pub repair: RepairReport,
    pub intersect: IntersectStats,
    pub classify: ClassifyStats,
    pub apportionment: Apportionment,
    /// Exported triangles dropped because welding collapsed them
    pub collapsed_triangles: usize,
}

impl Diagnostics {
    /// Human-readable warnings for the report
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if self.repair.degenerate_removed > 0 {
            warnings.push(format!(
                "{} degenerate triangles removed",
                self.repair.degenerate_removed
            ));
        }
        if self.repair.open_meshes_removed > 0 {
            warnings.push(format!(
                "{} open meshes removed: {}",
                self.repair.open_meshes_removed,
                self.repair.removed_names.join(", ")
            ));
        }
        if self.repair.open_meshes_merged > 0 {
            warnings.push(format!(
                "{} open meshes merged: {}",
                self.repair.open_meshes_merged,
                self.repair.merged_names.join(", ")
            ));
        }
        if self.classify.unresolved > 0 {
            warnings.push(format!(
                "{} ambiguous rays left after every recast",
                self.classify.unresolved
            ));
        }
        if self.collapsed_triangles > 0 {
            warnings.push(format!(
                "{} collapsed triangles dropped",
                self.collapsed_triangles
            ));
        }
        if !self.apportionment.converged && self.apportionment.iterations > 0 {
            warnings.push(format!(
                "wetted volume apportionment left {:.3e} unassigned",
                self.apportionment.residual
            ));
        }
        warnings
    }
}

/// Result of [`run_comp_geom`]
#[derive(Debug, Clone)]
pub struct CompGeomOutcome {
    pub results: CompGeomResults,
    pub diagnostics: Diagnostics,
    /// Welded wetted skin in caller units
    pub mesh: IndexedMesh,
}

/// Result of a slicing or mass-properties run
#[derive(Debug, Clone)]
pub struct Outcome<T> {
    pub results: T,
    pub diagnostics: Diagnostics,
}

/// Prepared meshes plus the component table they refer to
#[derive(Debug, Clone)]
pub struct Assembly {
    pub components: Vec<ComponentInfo>,
    /// Sub-surfaces of every part, in part order
    pub tags: Vec<SurfaceTag>,
    pub meshes: Vec<Mesh>,
    /// Caller units times `scale` gives model units
    pub scale: f64,
}

impl Assembly {
    /// Validate parts, build one mesh per part and normalize the scale
    pub fn prepare(parts: &[PartInput], config: &EngineConfig) -> CompGeomResult<Self> {
        let mut components = Vec::with_capacity(parts.len());
        let mut tags = Vec::new();
        let mut meshes = Vec::with_capacity(parts.len());

        for (index, part) in parts.iter().enumerate() {
            part.validate()?;
            components.push(ComponentInfo {
                name: part.name.clone(),
                id: part.id.clone(),
                kind: part.kind,
                density: part.density,
                priority: part.priority,
            });

            let mut mesh = Mesh::from_triangles(part.name.clone(), part.kind, index, &part.triangles);
            mesh.component_id = part.id.clone();
            mesh.density = part.density;
            mesh.priority = part.priority;

            let offset = tags.len();
            tags.extend(part.tag_names.iter().map(|name| SurfaceTag {
                name: name.clone(),
                component: index,
            }));
            for (facet, &tag) in mesh.facets.iter_mut().zip(&part.tags) {
                if tag > 0 {
                    facet.tag = offset + tag;
                }
            }
            if config.half_mesh {
                snap_symmetry_plane(&mut mesh);
            }
            meshes.push(mesh);
        }

        let mut bbox = BoundingBox::empty();
        for mesh in &meshes {
            bbox.merge(&mesh.bounding_box());
        }
        let largest = bbox.largest_dimension();
        let scale = if config.normalized_size > 0.0 && largest > 0.0 && largest.is_finite() {
            config.normalized_size / largest
        } else {
            1.0
        };
        for mesh in &mut meshes {
            mesh.scale(scale);
        }

        debug!(parts = parts.len(), scale, "assembly prepared");
        Ok(Self {
            components,
            tags,
            meshes,
            scale,
        })
    }

    pub fn component_names(&self) -> Vec<String> {
        self.components.iter().map(|c| c.name.clone()).collect()
    }

    /// Run repair; `delete_open` drops solids that stay open
    pub fn repair(&mut self, delete_open: bool, config: &EngineConfig) -> RepairReport {
        merge_remove_open_meshes(
            &mut self.meshes,
            delete_open,
            RepairTolerance {
                degenerate: config.degenerate_tolerance,
                merge: config.merge_tolerance,
            },
        )
    }

    /// Append the box that removes everything at y < 0
    pub fn add_half_box(&mut self) {
        if let Some(mesh) = half_box(&self.meshes) {
            self.meshes.push(mesh);
        }
    }

    /// Return every mesh to caller units
    pub fn unscale(&mut self) {
        if self.scale != 1.0 {
            for mesh in &mut self.meshes {
                mesh.scale(1.0 / self.scale);
            }
        }
    }
}

fn snap_symmetry_plane(mesh: &mut Mesh) {
    for corner in mesh.facets.iter_mut().flat_map(|f| f.corners.iter_mut()) {
        if corner.y.abs() < HALF_MODEL_Y {
            corner.y = 0.0;
        }
    }
}

/// Closed box covering the y < 0 side of the assembly, twice its size
fn half_box(meshes: &[Mesh]) -> Option<Mesh> {
    let mut bbox = BoundingBox::empty();
    for mesh in meshes {
        bbox.merge(&mesh.bounding_box());
    }
    if bbox.is_empty() {
        return None;
    }
    let center = bbox.center();
    let half = bbox.size();
    let ymin = (center.y - half.y).min(-bbox.largest_dimension());
    let min = Point3::new(center.x - half.x, ymin, center.z - half.z);
    let max = Point3::new(center.x + half.x, 0.0, center.z + half.z);

    let mut mesh = Primitive::boxed(min, max).to_mesh("NEGATIVE_HALF", ComponentKind::HalfBox);
    mesh.component = usize::MAX;
    for facet in &mut mesh.facets {
        facet.component = usize::MAX;
    }
    Some(mesh)
}

fn intersect_tolerance(config: &EngineConfig) -> IntersectTolerance {
    IntersectTolerance {
        plane: config.plane_tolerance,
        min_segment: config.min_segment_length,
    }
}

fn slice_tolerance(config: &EngineConfig) -> SliceTolerance {
    SliceTolerance {
        intersect: intersect_tolerance(config),
        classify: ClassifyTolerance::from(config),
    }
}

fn check_cancel(cancel: Option<&CancelToken>) -> CompGeomResult<()> {
    match cancel {
        Some(token) => token.check(),
        None => Ok(()),
    }
}

/// Wetted area, wetted volume and the trimmed skin of an assembly
pub fn run_comp_geom(
    parts: &[PartInput],
    config: &CompGeomConfig,
    cancel: Option<&CancelToken>,
) -> CompGeomResult<CompGeomOutcome> {
    config.validate()?;
    let engine = &config.engine;
    let _span = info_span!("comp_geom", parts = parts.len()).entered();

    let mut assembly = Assembly::prepare(parts, engine)?;
    let mut diagnostics = Diagnostics {
        scale: assembly.scale,
        repair: assembly.repair(true, engine),
        ..Default::default()
    };
    if engine.half_mesh {
        assembly.add_half_box();
    }
    check_cancel(cancel)?;

    let tol = intersect_tolerance(engine);
    diagnostics.intersect = intersect_all(&mut assembly.meshes, &tol, engine.parallel, cancel)?;
    let split = split_all(&mut assembly.meshes, tol.min_segment, engine.parallel);
    diagnostics.intersect.merge(&split);
    check_cancel(cancel)?;

    diagnostics.classify = classify_all(
        &mut assembly.meshes,
        ClassifyTolerance::from(engine),
        engine.parallel,
    );

    assembly.unscale();
    if engine.half_mesh {
        trim_half_model(&mut assembly.meshes);
    }

    let (results, apportionment) = integrate(
        &assembly.meshes,
        &assembly.components,
        &assembly.tags,
        engine.apportion_iterations,
        engine.apportion_tolerance,
    );
    diagnostics.apportionment = apportionment;

    let mesh = build_indexed_mesh(
        &assembly.meshes,
        &assembly.component_names(),
        engine.weld_tolerance_factor,
    );
    diagnostics.collapsed_triangles = mesh.collapsed;

    for warning in diagnostics.warnings() {
        warn!("{}", warning);
    }
    info!(
        wet_area = results.total_wet_area,
        wet_vol = results.total_wet_vol,
        "comp geom done"
    );
    Ok(CompGeomOutcome {
        results,
        diagnostics,
        mesh,
    })
}

/// Ignore the pieces on the removed side and drop the half box itself
fn trim_half_model(meshes: &mut Vec<Mesh>) {
    meshes.retain(|m| m.kind != ComponentKind::HalfBox);
    for mesh in meshes.iter_mut() {
        for piece in mesh.piece_refs() {
            if let Some(facet) = mesh.piece_mut(piece) {
                if facet.corners.iter().all(|p| p.y < HALF_MODEL_Y) {
                    facet.ignored = true;
                }
            }
        }
    }
}

fn prepare_for_slicing(
    parts: &[PartInput],
    config: &CompGeomConfig,
) -> CompGeomResult<(Assembly, Diagnostics)> {
    config.validate()?;
    let mut assembly = Assembly::prepare(parts, &config.engine)?;
    let diagnostics = Diagnostics {
        scale: assembly.scale,
        repair: assembly.repair(false, &config.engine),
        ..Default::default()
    };
    Ok((assembly, diagnostics))
}

/// Cross-sectional area at stations along an axis
pub fn run_area_slice(
    parts: &[PartInput],
    config: &CompGeomConfig,
    cancel: Option<&CancelToken>,
) -> CompGeomResult<Outcome<SliceResults>> {
    let _span = info_span!("area_slice", parts = parts.len()).entered();
    let (assembly, diagnostics) = prepare_for_slicing(parts, config)?;
    check_cancel(cancel)?;

    let results = area_slices(
        &assembly.meshes,
        assembly.scale,
        &config.slicing,
        &slice_tolerance(&config.engine),
        config.engine.parallel,
    );
    check_cancel(cancel)?;
    Ok(Outcome {
        results,
        diagnostics,
    })
}

/// Mach-angle cuts for the wave-drag area distribution
pub fn run_wave_drag(
    parts: &[PartInput],
    config: &CompGeomConfig,
    cancel: Option<&CancelToken>,
) -> CompGeomResult<Outcome<WaveDragResults>> {
    let _span = info_span!("wave_drag", parts = parts.len(), mach = config.slicing.mach).entered();
    let (assembly, diagnostics) = prepare_for_slicing(parts, config)?;
    check_cancel(cancel)?;

    let results = wave_drag_slices(
        &assembly.meshes,
        &assembly.components,
        assembly.scale,
        &config.slicing,
        &slice_tolerance(&config.engine),
        config.engine.parallel,
    );
    check_cancel(cancel)?;
    Ok(Outcome {
        results,
        diagnostics,
    })
}

/// Mass, center of gravity and inertia tensor from slabs and shells
pub fn run_mass_properties(
    parts: &[PartInput],
    config: &CompGeomConfig,
    cancel: Option<&CancelToken>,
) -> CompGeomResult<Outcome<MassResults>> {
    config.validate()?;
    let engine = &config.engine;
    let _span = info_span!(
        "mass_properties",
        parts = parts.len(),
        slices = config.mass.slices,
        axis = %config.mass.axis
    )
    .entered();

    let mut assembly = Assembly::prepare(parts, engine)?;
    let diagnostics = Diagnostics {
        scale: assembly.scale,
        // Open meshes are kept
        repair: assembly.repair(false, engine),
        ..Default::default()
    };
    check_cancel(cancel)?;

    let results = mass_slices(
        &assembly.meshes,
        &assembly.components,
        assembly.scale,
        &config.mass,
        config.slicing.tessellation,
        &slice_tolerance(engine),
        engine.parallel,
        cancel,
    )?;
    info!(mass = results.total.mass, "mass properties done");
    Ok(Outcome {
        results,
        diagnostics,
    })
}

/// Closure state of one part before repair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshCheck {
    pub name: String,
    pub kind: ComponentKind,
    pub facets: usize,
    pub degenerate: usize,
    pub open_edges: usize,
}

/// Output of [`check_meshes`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckReport {
    pub meshes: Vec<MeshCheck>,
    pub repair: RepairReport,
}

/// Inspect every part, then run repair as a CompGeom run would
pub fn check_meshes(parts: &[PartInput], config: &CompGeomConfig) -> CompGeomResult<CheckReport> {
    config.validate()?;
    let engine = &config.engine;
    let mut assembly = Assembly::prepare(parts, engine)?;

    let meshes = assembly
        .meshes
        .iter()
        .map(|mesh| MeshCheck {
            name: mesh.name.clone(),
            kind: mesh.kind,
            facets: mesh.facet_count(),
            degenerate: mesh
                .facets
                .iter()
                .filter(|f| is_degenerate(&f.corners, engine.degenerate_tolerance))
                .count(),
            open_edges: check_if_closed(mesh, engine.merge_tolerance).len(),
        })
        .collect();

    let repair = assembly.repair(true, engine);
    Ok(CheckReport { meshes, repair })
}
